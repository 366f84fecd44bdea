use crate::output::print_json;
use anyhow::Context;
use skillcheck_core::config::Config;
use skillcheck_core::maintenance::{analyze, Recommendation};
use skillcheck_core::registry::Registry;
use skillcheck_core::walk::walk_files;
use std::path::{Path, PathBuf};

pub fn run(root: &Path, files: &[PathBuf], json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let registry = Registry::load(&config.resolved_skill_dirs(root))?;
    let tree = walk_files(root)?;
    let analysis = analyze(root, &config, &registry, files, &tree)?;

    if json {
        print_json(&analysis)?;
        return Ok(());
    }

    if !analysis.uncovered.is_empty() {
        println!("Uncovered files:");
        for file in &analysis.uncovered {
            println!("  {file}");
        }
        println!();
    }
    if !analysis.stale_references.is_empty() {
        println!("Stale related-file references:");
        for s in &analysis.stale_references {
            println!("  {}: {}", s.skill, s.path);
        }
        println!();
    }
    if !analysis.stale_checks.is_empty() {
        println!("Stale checks:");
        for s in &analysis.stale_checks {
            println!("  {}/{}: {}", s.skill, s.check, s.reason);
        }
        println!();
    }
    if !analysis.index_issues.is_empty() {
        println!("Index inconsistencies:");
        for issue in &analysis.index_issues {
            println!("  {}: {}", issue.document, issue.issue);
        }
        println!();
    }

    if analysis.recommendations.is_empty() {
        println!("No recommendations.");
    } else {
        println!("Recommendations:");
        for rec in &analysis.recommendations {
            match rec {
                Recommendation::UpdateSkill { skill, files } => {
                    println!("  update {skill} to cover: {}", files.join(", "));
                }
                Recommendation::CreateSkill { directory, files } => {
                    println!(
                        "  create a new skill for {directory}/ ({} files) — \
                         run 'skillcheck skill new verify-<name>'",
                        files.len()
                    );
                }
                Recommendation::Exempt { files } => {
                    println!("  exempt: {}", files.join(", "));
                }
            }
        }
    }
    Ok(())
}
