//! The sync pass: enumerate sources, detect changes, convert, and reconcile
//! the manifest.
//!
//! Remote sources and local catalogs are processed one at a time. A failure
//! on one source is logged, recorded in the [`SyncReport`], and leaves that
//! source's manifest entry untouched; the pass carries on with the rest.
//! Nothing here saves the manifest, the caller decides when to persist.

use crate::config::{CatalogConfig, Config, SourceConfig};
use crate::convert::converter_for;
use crate::error::{FetchError, Result, SyncError};
use crate::fetch::{with_retry, Clock, Fetcher, RateLimiter, RetryPolicy, SystemClock};
use crate::frontmatter::ExtractorRegistry;
use crate::hash::{content_hash, is_changed};
use crate::manifest::{ManifestEntry, ManifestStore};
use crate::paths;
use crate::types::ArtifactKind;
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

// ---------------------------------------------------------------------------
// SyncReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub identifier: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Entries created or rewritten this pass.
    pub updated: Vec<String>,
    /// Sources whose content matched the stored hash.
    pub unchanged: Vec<String>,
    pub failed: Vec<SourceFailure>,
    /// Orphan entries removed from the manifest.
    pub pruned: Vec<String>,
}

impl SyncReport {
    pub fn processed(&self) -> usize {
        self.updated.len()
    }

    pub fn skipped(&self) -> usize {
        self.unchanged.len()
    }

    pub fn failures(&self) -> usize {
        self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Whether the pass changed the manifest.
    pub fn changed_manifest(&self) -> bool {
        !self.updated.is_empty() || !self.pruned.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} processed, {} skipped, {} failed",
            self.processed(),
            self.skipped(),
            self.failures()
        )
    }

    fn record(&mut self, identifier: &str, outcome: Result<Outcome>) {
        match outcome {
            Ok(Outcome::Updated) => self.updated.push(identifier.to_string()),
            Ok(Outcome::Unchanged) => self.unchanged.push(identifier.to_string()),
            Err(e) => {
                warn!("skipping '{identifier}': {e}");
                self.failed.push(SourceFailure {
                    identifier: identifier.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    All,
    One(String),
}

impl SourceSelection {
    /// `all` selects every configured source; anything else is a source id.
    pub fn parse(s: &str) -> Self {
        if s == "all" {
            SourceSelection::All
        } else {
            SourceSelection::One(s.to_string())
        }
    }
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'a> {
    root: &'a Path,
    config: &'a Config,
    fetcher: &'a dyn Fetcher,
    clock: &'a dyn Clock,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        root: &'a Path,
        config: &'a Config,
        fetcher: &'a dyn Fetcher,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            root,
            config,
            fetcher,
            clock,
            limiter: RateLimiter::new(config.fetch.min_interval()),
            retry: config.fetch.retry_policy(),
        }
    }

    /// An orchestrator for passes that never touch the network. Fetching
    /// through it fails every source.
    pub fn offline(root: &'a Path, config: &'a Config) -> Self {
        Self::new(root, config, &OfflineFetcher, &SystemClock)
    }

    // -----------------------------------------------------------------------
    // Remote sources
    // -----------------------------------------------------------------------

    /// Fetch the selected sources and upsert whatever changed. With
    /// [`SourceSelection::All`], doc entries for sources no longer in the
    /// config are pruned afterwards.
    pub fn fetch_sources(
        &mut self,
        store: &mut ManifestStore,
        selection: &SourceSelection,
    ) -> Result<SyncReport> {
        let config = self.config;
        let selected: Vec<&SourceConfig> = match selection {
            SourceSelection::All => config.sources.iter().collect(),
            SourceSelection::One(id) => vec![config
                .source(id)
                .ok_or_else(|| SyncError::SourceNotFound(id.clone()))?],
        };

        let mut report = SyncReport::default();
        for source in selected {
            let outcome = self.fetch_one(store, source);
            report.record(&source.id, outcome);
        }

        if *selection == SourceSelection::All {
            report.pruned = self.prune_where(store, |entry, config| {
                entry.kind == ArtifactKind::Doc && config.source(&entry.identifier).is_none()
            });
        }
        Ok(report)
    }

    fn fetch_one(&mut self, store: &mut ManifestStore, source: &SourceConfig) -> Result<Outcome> {
        paths::validate_identifier(&source.id)?;
        if ArtifactKind::catalog_prefix_of(&source.id).is_some() {
            return Err(SyncError::InvalidIdentifier(source.id.clone()));
        }

        let body = {
            let limiter = &mut self.limiter;
            let fetcher = self.fetcher;
            let clock = self.clock;
            with_retry(&self.retry, clock, || {
                limiter.acquire(clock);
                fetcher.fetch(&source.url)
            })?
        };

        let local = self.root.join(self.config.doc_path(source));
        let local_path = paths::to_manifest_path(self.root, &local);

        if let Some(existing) = store.get(&source.id) {
            let fresh = !is_changed(&body, Some(&existing.content_hash))
                && existing.local_path == local_path
                && existing.source.as_deref() == Some(source.url.as_str())
                && source
                    .metadata
                    .iter()
                    .all(|(k, v)| existing.metadata.get(k) == Some(v))
                && local.exists();
            if fresh {
                debug!("'{}' unchanged", source.id);
                return Ok(Outcome::Unchanged);
            }
        }

        let converted = converter_for(source.format).convert(&body, &source.id)?;
        crate::io::atomic_write(&local, converted.markdown.as_bytes())?;

        // Configured metadata overrides anything derived from the page.
        let mut metadata = BTreeMap::new();
        if let Some(title) = converted.title {
            metadata.insert("title".to_string(), title);
        }
        if let Some(description) = converted.description {
            metadata.insert("description".to_string(), description);
        }
        metadata.insert("format".to_string(), source.format.to_string());
        metadata.extend(source.metadata.clone());

        store.upsert(ManifestEntry {
            identifier: source.id.clone(),
            local_path,
            content_hash: content_hash(&body),
            last_synced: now(),
            kind: ArtifactKind::Doc,
            source: Some(source.url.clone()),
            metadata,
        });
        info!("updated '{}' -> {}", source.id, local.display());
        Ok(Outcome::Updated)
    }

    /// Drop doc entries whose source left the config or whose converted file
    /// is gone. No network access.
    pub fn prune_docs(&self, store: &mut ManifestStore) -> Vec<String> {
        let root = self.root;
        self.prune_where(store, |entry, config| {
            entry.kind == ArtifactKind::Doc
                && (config.source(&entry.identifier).is_none()
                    || !paths::resolve_manifest_path(root, &entry.local_path).exists())
        })
    }

    fn prune_where<F>(&self, store: &mut ManifestStore, is_orphan: F) -> Vec<String>
    where
        F: Fn(&ManifestEntry, &Config) -> bool,
    {
        let orphans: Vec<String> = store
            .entries()
            .filter(|e| is_orphan(e, self.config))
            .map(|e| e.identifier.clone())
            .collect();
        for id in &orphans {
            store.remove(id);
            info!("pruned orphan entry '{id}'");
        }
        orphans
    }

    // -----------------------------------------------------------------------
    // Local catalogs
    // -----------------------------------------------------------------------

    /// Scan every configured catalog, upsert changed artifacts, and prune
    /// catalog entries that were not found.
    pub fn sync_catalogs(
        &self,
        store: &mut ManifestStore,
        extractors: &ExtractorRegistry,
    ) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut incomplete: HashSet<ArtifactKind> = HashSet::new();

        for catalog in &self.config.catalogs {
            let dir = self.root.join(&catalog.dir);
            if !dir.is_dir() {
                debug!("catalog dir {} does not exist", dir.display());
                continue;
            }
            for item in WalkDir::new(&dir).sort_by_file_name() {
                let item = match item {
                    Ok(item) => item,
                    Err(e) => {
                        incomplete.insert(catalog.kind);
                        let at = e
                            .path()
                            .map(|p| paths::to_manifest_path(self.root, p))
                            .unwrap_or_else(|| paths::to_manifest_path(self.root, &dir));
                        report.record(&at, Err(SyncError::Io(e.into())));
                        continue;
                    }
                };
                if !item.file_type().is_file() || !is_artifact_file(catalog, item.path()) {
                    continue;
                }
                let identifier = catalog_identifier(catalog, &dir, item.path());
                if !seen.insert(identifier.clone()) {
                    debug!("'{identifier}' already seen in another catalog");
                    continue;
                }
                let outcome = self.sync_artifact(store, extractors, catalog, &identifier, item.path());
                if outcome.is_err() {
                    incomplete.insert(catalog.kind);
                }
                report.record(&identifier, outcome);
            }
        }

        report.pruned = self.prune_where(store, |entry, _| {
            entry.kind.is_catalog()
                && !seen.contains(&entry.identifier)
                && !incomplete.contains(&entry.kind)
        });
        Ok(report)
    }

    fn sync_artifact(
        &self,
        store: &mut ManifestStore,
        extractors: &ExtractorRegistry,
        catalog: &CatalogConfig,
        identifier: &str,
        path: &Path,
    ) -> Result<Outcome> {
        let data = std::fs::read(path)?;
        let local_path = paths::to_manifest_path(self.root, path);

        if let Some(existing) = store.get(identifier) {
            if existing.kind == catalog.kind
                && existing.local_path == local_path
                && !is_changed(&data, Some(&existing.content_hash))
            {
                return Ok(Outcome::Unchanged);
            }
        }

        let text = String::from_utf8_lossy(&data);
        let mut metadata: BTreeMap<String, String> = extractors.get(catalog.kind).extract(&text);
        let default_name = identifier.rsplit('/').next().unwrap_or(identifier);
        metadata
            .entry("name".to_string())
            .or_insert_with(|| default_name.to_string());

        store.upsert(ManifestEntry {
            identifier: identifier.to_string(),
            local_path,
            content_hash: content_hash(&data),
            last_synced: now(),
            kind: catalog.kind,
            source: None,
            metadata,
        });
        info!("updated {} '{identifier}'", catalog.kind);
        Ok(Outcome::Updated)
    }
}

struct OfflineFetcher;

impl Fetcher for OfflineFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        Err(FetchError::Permanent {
            url: url.to_string(),
            message: "network access disabled for this pass".to_string(),
        })
    }
}

fn is_artifact_file(catalog: &CatalogConfig, path: &Path) -> bool {
    match &catalog.file_name {
        Some(name) => path.file_name().is_some_and(|f| f == name.as_str()),
        None => path.extension().is_some_and(|e| e == "md"),
    }
}

/// `<kind>/<path>` where `<path>` is the artifact's directory (for catalogs
/// with a fixed file name) or its file path without extension, relative to
/// the catalog dir.
fn catalog_identifier(catalog: &CatalogConfig, dir: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(dir).unwrap_or(path);
    let key: PathBuf = if catalog.file_name.is_some() {
        rel.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        rel.with_extension("")
    };
    let mut key = paths::to_manifest_path(Path::new(""), &key);
    if key.is_empty() {
        key = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    format!("{}/{}", catalog.kind, key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{FakeClock, FakeFetcher};
    use crate::types::SourceFormat;
    use std::time::Duration;
    use tempfile::TempDir;

    const PAGE_ONE: &str = "<html><head><title>One</title></head><body><p>first</p></body></html>";
    const PAGE_TWO: &str = "<html><head><title>Two</title></head><body><p>second</p></body></html>";
    const PAGE_THREE: &str = "<html><body><h1>Three</h1><p>third</p></body></html>";

    fn source(id: &str) -> SourceConfig {
        SourceConfig {
            id: id.to_string(),
            url: format!("https://docs.test/{id}"),
            format: SourceFormat::Html,
            path: None,
            metadata: BTreeMap::new(),
        }
    }

    fn config(ids: &[&str]) -> Config {
        let mut cfg = Config::default();
        cfg.fetch.min_interval_ms = 250;
        cfg.fetch.backoff_base_ms = 100;
        cfg.sources = ids.iter().map(|id| source(id)).collect();
        cfg
    }

    fn store(dir: &TempDir) -> ManifestStore {
        ManifestStore::load(paths::manifest_path(dir.path())).unwrap()
    }

    fn write(dir: &TempDir, rel: &str, body: &str) {
        let p = dir.path().join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, body).unwrap();
    }

    #[test]
    fn first_sync_creates_single_entry_with_content_hash() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&["one"]);
        let fetcher = FakeFetcher::default().page("https://docs.test/one", PAGE_ONE);
        let clock = FakeClock::new();
        let mut store = store(&dir);
        assert_eq!(store.schema_version(), "1.0");
        assert!(store.is_empty());

        let report = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock)
            .fetch_sources(&mut store, &SourceSelection::All)
            .unwrap();

        assert_eq!(report.updated, vec!["one"]);
        assert_eq!(store.len(), 1);
        let entry = store.get("one").unwrap();
        assert_eq!(entry.content_hash, content_hash(PAGE_ONE.as_bytes()));
        assert_eq!(entry.local_path, "docs/one.md");
        assert_eq!(entry.metadata["title"], "One");
        assert_eq!(entry.source.as_deref(), Some("https://docs.test/one"));
        let md = std::fs::read_to_string(dir.path().join("docs/one.md")).unwrap();
        assert!(md.contains("first"));
    }

    #[test]
    fn second_pass_without_changes_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&["one", "two"]);
        let fetcher = FakeFetcher::default()
            .page("https://docs.test/one", PAGE_ONE)
            .page("https://docs.test/two", PAGE_TWO);
        let clock = FakeClock::new();

        let mut first = store(&dir);
        Orchestrator::new(dir.path(), &cfg, &fetcher, &clock)
            .fetch_sources(&mut first, &SourceSelection::All)
            .unwrap();
        first.save().unwrap();
        let before = std::fs::read(first.path()).unwrap();

        let mut second = store(&dir);
        let report = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock)
            .fetch_sources(&mut second, &SourceSelection::All)
            .unwrap();
        assert_eq!(report.processed(), 0);
        assert_eq!(report.skipped(), 2);
        assert!(!second.is_dirty());
        second.save().unwrap();
        assert_eq!(before, std::fs::read(second.path()).unwrap());
    }

    #[test]
    fn configured_title_wins_and_stays_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&["one"]);
        cfg.sources[0]
            .metadata
            .insert("title".to_string(), "My Title".to_string());
        let fetcher = FakeFetcher::default().page("https://docs.test/one", PAGE_ONE);
        let clock = FakeClock::new();
        let mut store = store(&dir);

        let first = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock)
            .fetch_sources(&mut store, &SourceSelection::All)
            .unwrap();
        assert_eq!(first.processed(), 1);
        assert_eq!(store.get("one").unwrap().metadata["title"], "My Title");
        store.save().unwrap();

        let second = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock)
            .fetch_sources(&mut store, &SourceSelection::All)
            .unwrap();
        assert_eq!(second.processed(), 0);
        assert_eq!(second.skipped(), 1);
        assert!(!store.is_dirty());
    }

    #[test]
    fn catalog_prefixed_source_id_fails_without_fetching() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&["skill/pdf"]);
        let fetcher = FakeFetcher::default().page("https://docs.test/skill/pdf", PAGE_ONE);
        let clock = FakeClock::new();
        let mut store = store(&dir);

        let report = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock)
            .fetch_sources(&mut store, &SourceSelection::All)
            .unwrap();
        assert_eq!(report.failures(), 1);
        assert_eq!(report.failed[0].identifier, "skill/pdf");
        assert_eq!(fetcher.call_count("https://docs.test/skill/pdf"), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn absolute_output_path_outside_root_is_not_pruned() {
        let dir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let target = elsewhere.path().join("one.md");
        let mut cfg = config(&["one"]);
        cfg.sources[0].path = Some(target.clone());
        let fetcher = FakeFetcher::default().page("https://docs.test/one", PAGE_ONE);
        let clock = FakeClock::new();
        let mut store = store(&dir);

        let orchestrator = {
            let mut o = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock);
            o.fetch_sources(&mut store, &SourceSelection::All).unwrap();
            o
        };
        assert!(target.exists());
        let entry = store.get("one").unwrap();
        assert_eq!(
            paths::resolve_manifest_path(dir.path(), &entry.local_path),
            target
        );

        assert!(orchestrator.prune_docs(&mut store).is_empty());
        assert!(store.get("one").is_some());
    }

    #[test]
    fn changed_content_updates_entry() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&["one"]);
        let fetcher = FakeFetcher::default().page("https://docs.test/one", PAGE_ONE);
        let clock = FakeClock::new();
        let mut store = store(&dir);
        let mut orch = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock);
        orch.fetch_sources(&mut store, &SourceSelection::All).unwrap();

        fetcher.set("https://docs.test/one", PAGE_TWO);
        let report = orch.fetch_sources(&mut store, &SourceSelection::All).unwrap();
        assert_eq!(report.updated, vec!["one"]);
        assert_eq!(
            store.get("one").unwrap().content_hash,
            content_hash(PAGE_TWO.as_bytes())
        );
        let md = std::fs::read_to_string(dir.path().join("docs/one.md")).unwrap();
        assert!(md.contains("second"));
    }

    #[test]
    fn missing_local_file_is_rewritten_even_if_hash_matches() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&["one"]);
        let fetcher = FakeFetcher::default().page("https://docs.test/one", PAGE_ONE);
        let clock = FakeClock::new();
        let mut store = store(&dir);
        let mut orch = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock);
        orch.fetch_sources(&mut store, &SourceSelection::All).unwrap();

        std::fs::remove_file(dir.path().join("docs/one.md")).unwrap();
        let report = orch.fetch_sources(&mut store, &SourceSelection::All).unwrap();
        assert_eq!(report.processed(), 1);
        assert!(dir.path().join("docs/one.md").exists());
    }

    #[test]
    fn one_failing_source_does_not_stop_the_others() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&["one", "two", "three"]);
        let fetcher = FakeFetcher::default()
            .page("https://docs.test/one", PAGE_ONE)
            .script("https://docs.test/two", vec![Err(false)])
            .page("https://docs.test/three", PAGE_THREE);
        let clock = FakeClock::new();
        let mut store = store(&dir);

        let report = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock)
            .fetch_sources(&mut store, &SourceSelection::All)
            .unwrap();

        assert_eq!(report.failures(), 1);
        assert_eq!(report.failed[0].identifier, "two");
        assert_eq!(report.updated, vec!["one", "three"]);
        assert!(store.get("one").is_some());
        assert!(store.get("two").is_none());
        assert!(store.get("three").is_some());
        assert!(!report.is_success());
        assert_eq!(report.summary(), "2 processed, 0 skipped, 1 failed");
    }

    #[test]
    fn failed_fetch_leaves_existing_entry_untouched() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&["one"]);
        let fetcher = FakeFetcher::default().page("https://docs.test/one", PAGE_ONE);
        let clock = FakeClock::new();
        let mut store = store(&dir);
        let mut orch = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock);
        orch.fetch_sources(&mut store, &SourceSelection::All).unwrap();
        let before = store.get("one").cloned().unwrap();

        fetcher
            .pages
            .borrow_mut()
            .insert("https://docs.test/one".into(), vec![Err(false)]);
        let report = orch.fetch_sources(&mut store, &SourceSelection::All).unwrap();
        assert_eq!(report.failures(), 1);
        assert_eq!(store.get("one"), Some(&before));
    }

    #[test]
    fn conversion_error_skips_source_and_keeps_entry() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&["one"]);
        let fetcher = FakeFetcher::default().page("https://docs.test/one", PAGE_ONE);
        let clock = FakeClock::new();
        let mut store = store(&dir);
        let mut orch = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock);
        orch.fetch_sources(&mut store, &SourceSelection::All).unwrap();
        let before = store.get("one").cloned().unwrap();

        fetcher.set("https://docs.test/one", "   ");
        let report = orch.fetch_sources(&mut store, &SourceSelection::All).unwrap();
        assert_eq!(report.failures(), 1);
        assert!(report.failed[0].error.contains("cannot convert 'one'"));
        assert_eq!(store.get("one"), Some(&before));
    }

    #[test]
    fn transient_failures_are_retried_with_backoff() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&["one"]);
        let fetcher = FakeFetcher::default().script(
            "https://docs.test/one",
            vec![Err(true), Err(true), Ok(PAGE_ONE.as_bytes().to_vec())],
        );
        let clock = FakeClock::new();
        let mut store = store(&dir);

        let report = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock)
            .fetch_sources(&mut store, &SourceSelection::All)
            .unwrap();
        assert!(report.is_success());
        assert_eq!(fetcher.call_count("https://docs.test/one"), 3);
        // Backoff sleeps of 100ms and 200ms, each topped up by the limiter
        // to the 250ms request spacing.
        assert_eq!(clock.total_slept(), Duration::from_millis(100 + 150 + 200 + 50));
    }

    #[test]
    fn requests_are_spaced_by_rate_limiter() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&["one", "two", "three"]);
        let fetcher = FakeFetcher::default()
            .page("https://docs.test/one", PAGE_ONE)
            .page("https://docs.test/two", PAGE_TWO)
            .page("https://docs.test/three", PAGE_THREE);
        let clock = FakeClock::new();
        let mut store = store(&dir);

        Orchestrator::new(dir.path(), &cfg, &fetcher, &clock)
            .fetch_sources(&mut store, &SourceSelection::All)
            .unwrap();
        assert_eq!(clock.total_slept(), Duration::from_millis(500));
    }

    #[test]
    fn single_source_selection() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&["one", "two"]);
        let fetcher = FakeFetcher::default()
            .page("https://docs.test/one", PAGE_ONE)
            .page("https://docs.test/two", PAGE_TWO);
        let clock = FakeClock::new();
        let mut store = store(&dir);
        let mut orch = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock);

        let report = orch
            .fetch_sources(&mut store, &SourceSelection::parse("two"))
            .unwrap();
        assert_eq!(report.updated, vec!["two"]);
        assert_eq!(fetcher.call_count("https://docs.test/one"), 0);

        let err = orch
            .fetch_sources(&mut store, &SourceSelection::parse("missing"))
            .unwrap_err();
        assert!(matches!(err, SyncError::SourceNotFound(id) if id == "missing"));
    }

    #[test]
    fn removed_source_is_pruned_on_full_pass() {
        let dir = TempDir::new().unwrap();
        let fetcher = FakeFetcher::default()
            .page("https://docs.test/one", PAGE_ONE)
            .page("https://docs.test/two", PAGE_TWO);
        let clock = FakeClock::new();
        let mut store = store(&dir);

        let cfg = config(&["one", "two"]);
        Orchestrator::new(dir.path(), &cfg, &fetcher, &clock)
            .fetch_sources(&mut store, &SourceSelection::All)
            .unwrap();

        let cfg = config(&["one"]);
        let mut orch = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock);
        let report = orch
            .fetch_sources(&mut store, &SourceSelection::parse("one"))
            .unwrap();
        assert!(report.pruned.is_empty(), "single-source pass never prunes");

        let report = orch.fetch_sources(&mut store, &SourceSelection::All).unwrap();
        assert_eq!(report.pruned, vec!["two"]);
        assert!(store.get("two").is_none());
    }

    #[test]
    fn prune_docs_drops_entries_with_deleted_files() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&["one", "two"]);
        let fetcher = FakeFetcher::default()
            .page("https://docs.test/one", PAGE_ONE)
            .page("https://docs.test/two", PAGE_TWO);
        let clock = FakeClock::new();
        let mut store = store(&dir);
        let mut orch = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock);
        orch.fetch_sources(&mut store, &SourceSelection::All).unwrap();

        std::fs::remove_file(dir.path().join("docs/two.md")).unwrap();
        assert_eq!(orch.prune_docs(&mut store), vec!["two"]);
        assert!(store.get("one").is_some());
    }

    #[test]
    fn invalid_source_id_fails_only_that_source() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&["one"]);
        cfg.sources.push(SourceConfig {
            id: "../escape".to_string(),
            ..source("x")
        });
        let fetcher = FakeFetcher::default().page("https://docs.test/one", PAGE_ONE);
        let clock = FakeClock::new();
        let mut store = store(&dir);
        let report = Orchestrator::new(dir.path(), &cfg, &fetcher, &clock)
            .fetch_sources(&mut store, &SourceSelection::All)
            .unwrap();
        assert_eq!(report.updated, vec!["one"]);
        assert_eq!(report.failed[0].identifier, "../escape");
        assert_eq!(fetcher.call_count("https://docs.test/x"), 0);
    }

    #[test]
    fn markdown_source_is_passed_through_with_config_metadata() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&[]);
        cfg.sources.push(SourceConfig {
            format: SourceFormat::Markdown,
            path: Some(PathBuf::from("ref/guide.md")),
            metadata: BTreeMap::from([("category".to_string(), "guides".to_string())]),
            ..source("guide")
        });
        let fetcher =
            FakeFetcher::default().page("https://docs.test/guide", "# Guide\n\nHello\n");
        let clock = FakeClock::new();
        let mut store = store(&dir);
        Orchestrator::new(dir.path(), &cfg, &fetcher, &clock)
            .fetch_sources(&mut store, &SourceSelection::All)
            .unwrap();

        let entry = store.get("guide").unwrap();
        assert_eq!(entry.local_path, "ref/guide.md");
        assert_eq!(entry.metadata["category"], "guides");
        assert_eq!(entry.metadata["title"], "Guide");
        assert_eq!(entry.metadata["format"], "markdown");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("ref/guide.md")).unwrap(),
            "# Guide\n\nHello\n"
        );
    }

    // -----------------------------------------------------------------------
    // Catalogs
    // -----------------------------------------------------------------------

    fn seed_catalogs(dir: &TempDir) {
        write(
            dir,
            ".claude/skills/pdf-tools/SKILL.md",
            "---\nname: pdf-tools\ndescription: Work with PDFs\n---\n# PDF\n",
        );
        write(
            dir,
            ".claude/skills/pdf-tools/reference.md",
            "not an artifact",
        );
        write(
            dir,
            ".claude/commands/create-pr.md",
            "---\ndescription: Open a pull request\nargument-hint: <branch>\n---\nBody\n",
        );
        write(
            dir,
            ".claude/commands/git/commit.md",
            "Commit staged changes\n",
        );
        write(
            dir,
            ".claude/agents/reviewer.md",
            "---\nname: code-reviewer\ndescription: Reviews diffs\nmodel: sonnet\n---\n",
        );
    }

    fn catalog_pass(dir: &TempDir, cfg: &Config, store: &mut ManifestStore) -> SyncReport {
        let fetcher = FakeFetcher::default();
        let clock = FakeClock::new();
        Orchestrator::new(dir.path(), cfg, &fetcher, &clock)
            .sync_catalogs(store, &ExtractorRegistry::default())
            .unwrap()
    }

    #[test]
    fn catalog_scan_discovers_each_kind() {
        let dir = TempDir::new().unwrap();
        seed_catalogs(&dir);
        let cfg = Config::default();
        let mut store = store(&dir);

        let report = catalog_pass(&dir, &cfg, &mut store);
        assert_eq!(
            report.updated,
            vec![
                "skill/pdf-tools",
                "command/create-pr",
                "command/git/commit",
                "agent/reviewer"
            ]
        );

        let skill = store.get("skill/pdf-tools").unwrap();
        assert_eq!(skill.kind, ArtifactKind::Skill);
        assert_eq!(skill.local_path, ".claude/skills/pdf-tools/SKILL.md");
        assert_eq!(skill.metadata["description"], "Work with PDFs");

        let cmd = store.get("command/create-pr").unwrap();
        assert_eq!(cmd.metadata["argument-hint"], "<branch>");
        assert_eq!(cmd.metadata["name"], "create-pr");

        let nested = store.get("command/git/commit").unwrap();
        assert_eq!(nested.metadata["name"], "commit");

        let agent = store.get("agent/reviewer").unwrap();
        assert_eq!(agent.metadata["name"], "code-reviewer");
        assert_eq!(agent.metadata["model"], "sonnet");
    }

    #[test]
    fn catalog_rescan_is_idempotent() {
        let dir = TempDir::new().unwrap();
        seed_catalogs(&dir);
        let cfg = Config::default();

        let mut first = store(&dir);
        catalog_pass(&dir, &cfg, &mut first);
        first.save().unwrap();
        let before = std::fs::read(first.path()).unwrap();

        let mut second = store(&dir);
        let report = catalog_pass(&dir, &cfg, &mut second);
        assert_eq!(report.processed(), 0);
        assert_eq!(report.skipped(), 4);
        assert!(!report.changed_manifest());
        second.save().unwrap();
        assert_eq!(before, std::fs::read(second.path()).unwrap());
    }

    #[test]
    fn edited_artifact_is_updated() {
        let dir = TempDir::new().unwrap();
        seed_catalogs(&dir);
        let cfg = Config::default();
        let mut store = store(&dir);
        catalog_pass(&dir, &cfg, &mut store);

        write(
            &dir,
            ".claude/agents/reviewer.md",
            "---\nname: code-reviewer\ndescription: Reviews diffs\nmodel: opus\n---\n",
        );
        let report = catalog_pass(&dir, &cfg, &mut store);
        assert_eq!(report.updated, vec!["agent/reviewer"]);
        assert_eq!(store.get("agent/reviewer").unwrap().metadata["model"], "opus");
    }

    #[test]
    fn deleted_artifact_is_pruned() {
        let dir = TempDir::new().unwrap();
        seed_catalogs(&dir);
        let cfg = Config::default();
        let mut store = store(&dir);
        catalog_pass(&dir, &cfg, &mut store);

        std::fs::remove_file(dir.path().join(".claude/commands/create-pr.md")).unwrap();
        let report = catalog_pass(&dir, &cfg, &mut store);
        assert_eq!(report.pruned, vec!["command/create-pr"]);
        assert!(store.get("command/create-pr").is_none());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn catalog_pass_leaves_doc_entries_alone() {
        let dir = TempDir::new().unwrap();
        seed_catalogs(&dir);
        let cfg = config(&["one"]);
        let fetcher = FakeFetcher::default().page("https://docs.test/one", PAGE_ONE);
        let clock = FakeClock::new();
        let mut store = store(&dir);
        Orchestrator::new(dir.path(), &cfg, &fetcher, &clock)
            .fetch_sources(&mut store, &SourceSelection::All)
            .unwrap();

        let report = catalog_pass(&dir, &cfg, &mut store);
        assert!(report.pruned.is_empty());
        assert!(store.get("one").is_some());
    }

    #[test]
    fn catalog_identifier_forms() {
        let skills = CatalogConfig {
            kind: ArtifactKind::Skill,
            dir: PathBuf::from(".claude/skills"),
            file_name: Some("SKILL.md".into()),
        };
        let dir = Path::new("/p/.claude/skills");
        assert_eq!(
            catalog_identifier(&skills, dir, &dir.join("a/b/SKILL.md")),
            "skill/a/b"
        );
        assert_eq!(
            catalog_identifier(&skills, dir, &dir.join("SKILL.md")),
            "skill/skills"
        );

        let commands = CatalogConfig {
            kind: ArtifactKind::Command,
            dir: PathBuf::from(".claude/commands"),
            file_name: None,
        };
        let dir = Path::new("/p/.claude/commands");
        assert_eq!(
            catalog_identifier(&commands, dir, &dir.join("review.md")),
            "command/review"
        );
    }

    #[test]
    fn report_summary_counts() {
        let report = SyncReport {
            updated: vec!["x".into()],
            unchanged: vec!["y".into()],
            pruned: vec!["z".into()],
            ..Default::default()
        };
        assert_eq!(report.summary(), "1 processed, 1 skipped, 0 failed");
        assert!(report.changed_manifest());
        assert!(report.is_success());
    }

    #[test]
    fn offline_orchestrator_fails_fetches() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&["one"]);
        let mut store = store(&dir);
        let report = Orchestrator::offline(dir.path(), &cfg)
            .fetch_sources(&mut store, &SourceSelection::All)
            .unwrap();
        assert_eq!(report.failures(), 1);
        assert!(store.is_empty());
    }
}
