//! YAML frontmatter extraction for catalog artifacts.
//!
//! Every artifact kind supplies its own [`MetadataExtractor`] through an
//! [`ExtractorRegistry`], so the sync pass never branches on kind.

use crate::types::ArtifactKind;
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap};

pub type Metadata = BTreeMap<String, String>;

pub trait MetadataExtractor {
    fn extract(&self, raw_text: &str) -> Metadata;
}

/// Split `text` into its leading `---` YAML block (if any) and the body.
pub fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, text)
}

/// Keeps selected keys from a frontmatter block, stringified.
#[derive(Debug, Clone, Default)]
pub struct FrontmatterExtractor {
    keys: Vec<String>,
}

impl FrontmatterExtractor {
    /// An empty key list keeps every scalar or list-of-scalars key.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    fn wants(&self, key: &str) -> bool {
        self.keys.is_empty() || self.keys.iter().any(|k| k == key)
    }
}

impl MetadataExtractor for FrontmatterExtractor {
    fn extract(&self, raw_text: &str) -> Metadata {
        let mut out = Metadata::new();
        let (Some(yaml), _) = split_frontmatter(raw_text) else {
            return out;
        };
        let mapping = match serde_yaml::from_str::<Value>(yaml) {
            Ok(Value::Mapping(m)) => m,
            Ok(_) => return out,
            Err(e) => {
                tracing::debug!("ignoring unparsable frontmatter: {e}");
                return out;
            }
        };
        for (k, v) in mapping {
            let Some(key) = k.as_str() else { continue };
            if !self.wants(key) {
                continue;
            }
            if let Some(value) = stringify(&v) {
                out.insert(key.to_string(), value);
            }
        }
        out
    }
}

fn stringify(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Sequence(items) => {
            let parts: Vec<String> = items.iter().filter_map(stringify).collect();
            Some(parts.join(", "))
        }
        Value::Null | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

// ---------------------------------------------------------------------------
// ExtractorRegistry
// ---------------------------------------------------------------------------

pub struct ExtractorRegistry {
    extractors: HashMap<ArtifactKind, Box<dyn MetadataExtractor>>,
    fallback: FrontmatterExtractor,
}

impl ExtractorRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
            fallback: FrontmatterExtractor::default(),
        }
    }

    pub fn register(&mut self, kind: ArtifactKind, extractor: Box<dyn MetadataExtractor>) {
        self.extractors.insert(kind, extractor);
    }

    /// Extractor for `kind`; kinds without one keep every frontmatter key.
    pub fn get(&self, kind: ArtifactKind) -> &dyn MetadataExtractor {
        self.extractors
            .get(&kind)
            .map(|e| &**e as &dyn MetadataExtractor)
            .unwrap_or(&self.fallback)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let mut reg = Self::empty();
        reg.register(
            ArtifactKind::Skill,
            Box::new(FrontmatterExtractor::new([
                "name",
                "description",
                "license",
                "allowed-tools",
            ])),
        );
        reg.register(
            ArtifactKind::Command,
            Box::new(FrontmatterExtractor::new([
                "description",
                "argument-hint",
                "allowed-tools",
                "model",
            ])),
        );
        reg.register(
            ArtifactKind::Agent,
            Box::new(FrontmatterExtractor::new([
                "name",
                "description",
                "tools",
                "model",
                "color",
            ])),
        );
        reg
    }
}
