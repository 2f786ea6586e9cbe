use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use docsync_core::config::{Config, WarnLevel};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show configured sources and catalogs
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;

    if json {
        return print_json(&config);
    }

    println!("Output dir: {}", config.output_dir.display());
    println!(
        "Fetch:      timeout {}s, {} attempt(s), backoff {}..{}ms, spacing {}ms",
        config.fetch.timeout_secs,
        config.fetch.max_attempts,
        config.fetch.backoff_base_ms,
        config.fetch.backoff_max_ms,
        config.fetch.min_interval_ms,
    );

    println!();
    if config.sources.is_empty() {
        println!("No sources configured.");
    } else {
        let rows = config
            .sources
            .iter()
            .map(|s| {
                vec![
                    s.id.clone(),
                    s.format.to_string(),
                    config.doc_path(s).display().to_string(),
                    s.url.clone(),
                ]
            })
            .collect();
        print_table(&["SOURCE", "FORMAT", "PATH", "URL"], rows);
    }

    println!();
    let rows = config
        .catalogs
        .iter()
        .map(|c| {
            vec![
                c.kind.to_string(),
                c.dir.display().to_string(),
                c.file_name.clone().unwrap_or_else(|| "*.md".to_string()),
            ]
        })
        .collect();
    print_table(&["KIND", "DIR", "FILES"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
