use crate::output::{print_json, print_table};
use anyhow::Context;
use skillcheck_core::config::Config;
use skillcheck_core::registry::Registry;
use std::path::{Path, PathBuf};

pub fn run(root: &Path, files: &[PathBuf], json: bool) -> anyhow::Result<()> {
    if files.is_empty() {
        anyhow::bail!("no files given: pass the changed paths to resolve");
    }
    let config = Config::load(root).context("failed to load config")?;
    let registry = Registry::load(&config.resolved_skill_dirs(root))?;
    let resolution = registry.resolve(files);

    if json {
        print_json(&resolution)?;
        return Ok(());
    }

    let rows = resolution
        .affected
        .iter()
        .map(|m| vec![m.skill.clone(), m.files.join(", ")])
        .collect();
    print_table(&["skill", "files"], rows);

    if !resolution.uncovered.is_empty() {
        println!();
        println!("Uncovered:");
        for file in &resolution.uncovered {
            println!("  {file}");
        }
    }
    Ok(())
}
