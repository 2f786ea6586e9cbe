//! The persisted JSON manifest of tracked artifacts.
//!
//! All mutation happens in memory through [`ManifestStore::upsert`] and
//! [`ManifestStore::remove`]; [`ManifestStore::save`] is the only operation
//! that touches the file, and it replaces it atomically.

use crate::error::{Result, SyncError};
use crate::types::ArtifactKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// ManifestEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Map key in the persisted form; filled in on load.
    #[serde(skip)]
    pub identifier: String,
    pub local_path: String,
    pub content_hash: String,
    pub last_synced: DateTime<Utc>,
    #[serde(default = "default_kind")]
    pub kind: ArtifactKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_kind() -> ArtifactKind {
    ArtifactKind::Doc
}

impl ManifestEntry {
    /// Whether this entry matches a `key=value` list filter. `kind` and
    /// `identifier` are matched against the entry itself, anything else
    /// against its metadata.
    pub fn matches(&self, key: &str, value: &str) -> bool {
        match key {
            "kind" => self.kind.as_str() == value,
            "identifier" | "id" => self.identifier == value,
            "local_path" | "path" => self.local_path == value,
            _ => self.metadata.get(key).is_some_and(|v| v == value),
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: String,
    #[serde(default)]
    pub entries: BTreeMap<String, ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            entries: BTreeMap::new(),
        }
    }
}

impl Manifest {
    fn from_slice(data: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        let mut manifest: Manifest = serde_json::from_slice(data)?;
        for (id, entry) in manifest.entries.iter_mut() {
            entry.identifier = id.clone();
        }
        Ok(manifest)
    }

    fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

// ---------------------------------------------------------------------------
// ManifestStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ManifestStore {
    path: PathBuf,
    manifest: Manifest,
    dirty: bool,
    recovered_backup: Option<PathBuf>,
}

impl ManifestStore {
    /// Load the manifest at `path`. An absent file yields an empty manifest;
    /// unparsable JSON is [`SyncError::ManifestCorrupt`].
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let manifest = match std::fs::read(&path) {
            Ok(data) => Manifest::from_slice(&data).map_err(|source| {
                SyncError::ManifestCorrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Manifest::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            manifest,
            dirty: false,
            recovered_backup: None,
        })
    }

    /// Like [`load`](Self::load), but a corrupt manifest is moved aside to
    /// `<name>.corrupt-<timestamp>` and replaced by an empty one.
    pub fn load_or_recover(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match Self::load(path.clone()) {
            Err(SyncError::ManifestCorrupt { source, .. }) => {
                let backup = backup_path(&path, Utc::now());
                std::fs::rename(&path, &backup)?;
                tracing::warn!(
                    "manifest {} is corrupt ({source}); moved to {} and starting fresh",
                    path.display(),
                    backup.display()
                );
                Ok(Self {
                    path,
                    manifest: Manifest::default(),
                    dirty: true,
                    recovered_backup: Some(backup),
                })
            }
            other => other,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn schema_version(&self) -> &str {
        &self.manifest.schema_version
    }

    /// Where a corrupt manifest was moved by [`load_or_recover`](Self::load_or_recover).
    pub fn recovered_backup(&self) -> Option<&Path> {
        self.recovered_backup.as_deref()
    }

    pub fn get(&self, identifier: &str) -> Option<&ManifestEntry> {
        self.manifest.entries.get(identifier)
    }

    /// Insert or replace the entry keyed by `entry.identifier`.
    pub fn upsert(&mut self, entry: ManifestEntry) {
        self.dirty = true;
        self.manifest
            .entries
            .insert(entry.identifier.clone(), entry);
    }

    pub fn remove(&mut self, identifier: &str) -> Option<ManifestEntry> {
        let removed = self.manifest.entries.remove(identifier);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.manifest.entries.values()
    }

    /// Entries matching every `(key, value)` pair.
    pub fn filter<'a>(&'a self, filters: &'a [(String, String)]) -> Vec<&'a ManifestEntry> {
        self.entries()
            .filter(|e| filters.iter().all(|(k, v)| e.matches(k, v)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.manifest.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.entries.is_empty()
    }

    /// Whether there are in-memory changes not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Persist via temp file + rename in the manifest's directory.
    pub fn save(&mut self) -> Result<()> {
        let json = self.manifest.to_json()?;
        crate::io::atomic_write(&self.path, json.as_bytes())?;
        self.dirty = false;
        Ok(())
    }
}

fn backup_path(path: &Path, at: DateTime<Utc>) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "manifest.json".to_string());
    path.with_file_name(format!("{name}.corrupt-{}", at.format("%Y%m%dT%H%M%SZ")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
