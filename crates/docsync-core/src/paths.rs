use crate::error::{Result, SyncError};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const DOCSYNC_DIR: &str = ".docsync";
pub const CONFIG_FILE: &str = ".docsync/config.yaml";
pub const MANIFEST_FILE: &str = ".docsync/manifest.json";

pub const DEFAULT_OUTPUT_DIR: &str = "docs";
pub const SKILLS_DIR: &str = ".claude/skills";
pub const COMMANDS_DIR: &str = ".claude/commands";
pub const AGENTS_DIR: &str = ".claude/agents";
pub const SKILL_FILE: &str = "SKILL.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn docsync_dir(root: &Path) -> PathBuf {
    root.join(DOCSYNC_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE)
}

/// Default on-disk location of a fetched source, relative to the root.
pub fn default_doc_path(output_dir: &Path, id: &str) -> PathBuf {
    output_dir.join(format!("{id}.md"))
}

/// Render a path relative to `root` with `/` separators, the form stored
/// in the manifest. Paths outside `root` are kept as given.
pub fn to_manifest_path(root: &Path, path: &Path) -> String {
    let rel = match path.strip_prefix(root) {
        Ok(rel) => rel,
        Err(_) if path.is_absolute() => return path.to_string_lossy().into_owned(),
        Err(_) => path,
    };
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve a manifest `local_path` back to an absolute path under `root`.
pub fn resolve_manifest_path(root: &Path, local_path: &str) -> PathBuf {
    let p = Path::new(local_path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

// ---------------------------------------------------------------------------
// Identifier validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9](?:[a-z0-9._\-/]*[a-z0-9])?$").expect("identifier regex is valid")
    })
}

pub fn validate_identifier(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 128 || !id_re().is_match(id) || id.contains("//") {
        return Err(SyncError::InvalidIdentifier(id.to_string()));
    }
    if id.split('/').any(|seg| seg == "." || seg == "..") {
        return Err(SyncError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
