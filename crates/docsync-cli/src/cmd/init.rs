use anyhow::Context;
use docsync_core::{config::Config, io, manifest::ManifestStore, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing docsync in: {}", root.display());

    let dir = paths::docsync_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    if !paths::config_path(root).exists() {
        Config::default()
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    let manifest_path = paths::manifest_path(root);
    if !manifest_path.exists() {
        let mut store = ManifestStore::load(&manifest_path).context("failed to load manifest")?;
        store.save().context("failed to write manifest.json")?;
        println!("  created: {}", paths::MANIFEST_FILE);
    } else {
        println!("  exists:  {}", paths::MANIFEST_FILE);
    }

    println!("Next: add sources to {} and run `docsync fetch`", paths::CONFIG_FILE);
    Ok(())
}
