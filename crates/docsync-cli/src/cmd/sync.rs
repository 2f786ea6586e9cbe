use crate::output::print_report;
use anyhow::Context;
use docsync_core::{
    config::Config, frontmatter::ExtractorRegistry, manifest::ManifestStore, paths,
    sync::Orchestrator,
};
use std::path::Path;

/// Rescan catalogs and drop orphaned doc entries. Never fetches.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let mut store = ManifestStore::load_or_recover(paths::manifest_path(root))
        .context("failed to load manifest")?;

    let orchestrator = Orchestrator::offline(root, &config);
    let mut report = orchestrator
        .sync_catalogs(&mut store, &ExtractorRegistry::default())
        .context("catalog scan failed")?;
    report.pruned.extend(orchestrator.prune_docs(&mut store));

    if store.is_dirty() {
        store.save().context("failed to save manifest")?;
    }

    print_report(&report, json)?;
    if !report.is_success() {
        anyhow::bail!("{} artifact(s) failed", report.failures());
    }
    Ok(())
}
