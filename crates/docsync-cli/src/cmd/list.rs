use crate::output::{print_json, print_table};
use anyhow::Context;
use docsync_core::{
    manifest::{ManifestEntry, ManifestStore},
    paths,
    types::ArtifactKind,
    SyncError,
};
use std::path::Path;
use std::str::FromStr;

fn parse_filter(raw: &str) -> anyhow::Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("invalid filter '{raw}': expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("invalid filter '{raw}': empty key");
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn entry_json(e: &ManifestEntry) -> serde_json::Value {
    serde_json::json!({
        "identifier": e.identifier,
        "kind": e.kind,
        "local_path": e.local_path,
        "content_hash": e.content_hash,
        "last_synced": e.last_synced,
        "source": e.source,
        "metadata": e.metadata,
    })
}

pub fn run(root: &Path, filters: &[String], kind: Option<&str>, json: bool) -> anyhow::Result<()> {
    let mut parsed = filters
        .iter()
        .map(|f| parse_filter(f))
        .collect::<anyhow::Result<Vec<_>>>()?;
    if let Some(kind) = kind {
        let kind = ArtifactKind::from_str(kind).with_context(|| format!("unknown kind: {kind}"))?;
        parsed.push(("kind".to_string(), kind.to_string()));
    }

    let store = ManifestStore::load(paths::manifest_path(root)).context("failed to load manifest")?;
    let entries = store.filter(&parsed);

    if json {
        let list: Vec<_> = entries.iter().map(|e| entry_json(e)).collect();
        print_json(&list)?;
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }

    let rows = entries
        .iter()
        .map(|e| {
            let label = e
                .metadata
                .get("title")
                .or_else(|| e.metadata.get("name"))
                .cloned()
                .unwrap_or_default();
            vec![
                e.identifier.clone(),
                e.kind.to_string(),
                e.local_path.clone(),
                e.last_synced.format("%Y-%m-%d %H:%M").to_string(),
                label,
            ]
        })
        .collect();
    print_table(&["IDENTIFIER", "KIND", "PATH", "SYNCED", "TITLE"], rows);
    Ok(())
}

pub fn show(root: &Path, identifier: &str, json: bool) -> anyhow::Result<()> {
    let store = ManifestStore::load(paths::manifest_path(root)).context("failed to load manifest")?;
    let entry = store
        .get(identifier)
        .ok_or_else(|| SyncError::EntryNotFound(identifier.to_string()))?;

    if json {
        print_json(&entry_json(entry))?;
        return Ok(());
    }

    println!("Identifier:  {}", entry.identifier);
    println!("Kind:        {}", entry.kind);
    println!("Path:        {}", entry.local_path);
    println!("Hash:        {}", entry.content_hash);
    println!("Last synced: {}", entry.last_synced.to_rfc3339());
    if let Some(source) = &entry.source {
        println!("Source:      {source}");
    }
    if !entry.metadata.is_empty() {
        println!("Metadata:");
        for (k, v) in &entry.metadata {
            println!("  {k}: {v}");
        }
    }
    Ok(())
}
