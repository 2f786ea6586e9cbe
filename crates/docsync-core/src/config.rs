use crate::error::{Result, SyncError};
use crate::fetch::RetryPolicy;
use crate::paths;
use crate::types::{ArtifactKind, SourceFormat};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// FetchConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Minimum spacing between successive requests.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    8_000
}

fn default_min_interval_ms() -> u64 {
    1_000
}

fn default_user_agent() -> String {
    format!("docsync/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            min_interval_ms: default_min_interval_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.backoff_base_ms),
            max_delay: Duration::from_millis(self.backoff_max_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// SourceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub format: SourceFormat,
    /// Where the converted Markdown lands, relative to the project root or
    /// absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// CatalogConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub kind: ArtifactKind,
    pub dir: PathBuf,
    /// Exact file name each artifact lives in (e.g. `SKILL.md`). When unset,
    /// every `*.md` file under `dir` is an artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

fn default_catalogs() -> Vec<CatalogConfig> {
    vec![
        CatalogConfig {
            kind: ArtifactKind::Skill,
            dir: PathBuf::from(paths::SKILLS_DIR),
            file_name: Some(paths::SKILL_FILE.to_string()),
        },
        CatalogConfig {
            kind: ArtifactKind::Command,
            dir: PathBuf::from(paths::COMMANDS_DIR),
            file_name: None,
        },
        CatalogConfig {
            kind: ArtifactKind::Agent,
            dir: PathBuf::from(paths::AGENTS_DIR),
            file_name: None,
        },
    ]
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default = "default_catalogs")]
    pub catalogs: Vec<CatalogConfig>,
}

fn default_version() -> u32 {
    1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_OUTPUT_DIR)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            output_dir: default_output_dir(),
            fetch: FetchConfig::default(),
            sources: Vec::new(),
            catalogs: default_catalogs(),
        }
    }
}

impl Config {
    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Root-relative location of a source's converted Markdown.
    pub fn doc_path(&self, source: &SourceConfig) -> PathBuf {
        source
            .path
            .clone()
            .unwrap_or_else(|| paths::default_doc_path(&self.output_dir, &source.id))
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(SyncError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let error = |message: String| ConfigWarning {
            level: WarnLevel::Error,
            message,
        };
        let warning = |message: String| ConfigWarning {
            level: WarnLevel::Warning,
            message,
        };

        let mut seen_ids = HashSet::new();
        for source in &self.sources {
            if paths::validate_identifier(&source.id).is_err() {
                warnings.push(error(format!("invalid source id '{}'", source.id)));
            }
            if let Some(kind) = ArtifactKind::catalog_prefix_of(&source.id) {
                warnings.push(error(format!(
                    "source id '{}' uses the '{}/' prefix reserved for catalog artifacts",
                    source.id, kind
                )));
            }
            if !seen_ids.insert(source.id.as_str()) {
                warnings.push(error(format!("duplicate source id '{}'", source.id)));
            }
            if !(source.url.starts_with("http://") || source.url.starts_with("https://")) {
                warnings.push(error(format!(
                    "source '{}' has non-http url '{}'",
                    source.id, source.url
                )));
            }
        }

        if self.fetch.max_attempts == 0 {
            warnings.push(error("fetch.max_attempts must be at least 1".to_string()));
        }
        if self.fetch.timeout_secs == 0 {
            warnings.push(warning(
                "fetch.timeout_secs is 0; requests will time out immediately".to_string(),
            ));
        }

        let mut seen_dirs = HashSet::new();
        for catalog in &self.catalogs {
            if catalog.kind == ArtifactKind::Doc {
                warnings.push(warning(format!(
                    "catalog '{}' uses kind 'doc', which is reserved for fetched sources",
                    catalog.dir.display()
                )));
            }
            if !seen_dirs.insert(&catalog.dir) {
                warnings.push(warning(format!(
                    "catalog dir '{}' is listed more than once",
                    catalog.dir.display()
                )));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
