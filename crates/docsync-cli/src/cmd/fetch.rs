use crate::output::print_report;
use anyhow::Context;
use docsync_core::{
    config::Config,
    fetch::{HttpFetcher, SystemClock},
    manifest::ManifestStore,
    paths,
    sync::{Orchestrator, SourceSelection},
};
use std::path::Path;

pub fn run(root: &Path, source: &str, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let mut store = ManifestStore::load_or_recover(paths::manifest_path(root))
        .context("failed to load manifest")?;
    let fetcher = HttpFetcher::new(config.fetch.timeout(), &config.fetch.user_agent)
        .context("failed to build http client")?;

    let selection = SourceSelection::parse(source);
    let report = Orchestrator::new(root, &config, &fetcher, &SystemClock)
        .fetch_sources(&mut store, &selection)
        .with_context(|| format!("fetch '{source}' failed"))?;

    if store.is_dirty() {
        store.save().context("failed to save manifest")?;
    }

    print_report(&report, json)?;
    if !report.is_success() {
        anyhow::bail!("{} source(s) failed", report.failures());
    }
    Ok(())
}
