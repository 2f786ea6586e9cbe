use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ArtifactKind
// ---------------------------------------------------------------------------

/// What a manifest entry tracks. Remote documentation is `Doc`; the other
/// kinds are local catalog artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Doc,
    Skill,
    Command,
    Agent,
}

impl ArtifactKind {
    pub fn all() -> &'static [ArtifactKind] {
        &[
            ArtifactKind::Doc,
            ArtifactKind::Skill,
            ArtifactKind::Command,
            ArtifactKind::Agent,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Doc => "doc",
            ArtifactKind::Skill => "skill",
            ArtifactKind::Command => "command",
            ArtifactKind::Agent => "agent",
        }
    }

    /// Catalog kinds are discovered by scanning the filesystem.
    pub fn is_catalog(self) -> bool {
        !matches!(self, ArtifactKind::Doc)
    }

    /// The catalog kind whose `<kind>/` identifier prefix `id` starts with.
    pub fn catalog_prefix_of(id: &str) -> Option<ArtifactKind> {
        Self::all().iter().copied().find(|k| {
            k.is_catalog()
                && id
                    .strip_prefix(k.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = crate::error::SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doc" => Ok(ArtifactKind::Doc),
            "skill" => Ok(ArtifactKind::Skill),
            "command" => Ok(ArtifactKind::Command),
            "agent" => Ok(ArtifactKind::Agent),
            _ => Err(crate::error::SyncError::InvalidKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// SourceFormat
// ---------------------------------------------------------------------------

/// Format of a remote source as served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    #[default]
    Html,
    Markdown,
}

impl SourceFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Html => "html",
            SourceFormat::Markdown => "markdown",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
