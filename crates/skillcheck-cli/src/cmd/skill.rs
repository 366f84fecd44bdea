use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use serde::Serialize;
use skillcheck_core::config::Config;
use skillcheck_core::maintenance::create_skill;
use skillcheck_core::registry::Registry;
use std::path::Path;

#[derive(Subcommand)]
pub enum SkillSubcommand {
    /// List registered skills
    List,

    /// Show one skill's metadata, checks, and exceptions
    Show { id: String },

    /// Parse skill documents and report definition errors without running
    Validate {
        /// Restrict validation to one skill
        id: Option<String>,
    },

    /// Scaffold a new skill document and add it to every index document
    New {
        id: String,

        #[arg(long, default_value = "Describe what this skill verifies")]
        description: String,
    },
}

#[derive(Serialize)]
struct SkillSummary {
    name: String,
    description: String,
    auto: bool,
    checks: usize,
    exceptions: usize,
}

pub fn run(root: &Path, subcommand: SkillSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    match subcommand {
        SkillSubcommand::List => {
            let registry = Registry::load(&config.resolved_skill_dirs(root))?;
            let summaries: Vec<SkillSummary> = registry
                .skills
                .iter()
                .map(|s| SkillSummary {
                    name: s.name.clone(),
                    description: s.description.clone(),
                    auto: s.auto,
                    checks: s.checks.len(),
                    exceptions: s.exceptions.len(),
                })
                .collect();
            if json {
                print_json(&summaries)?;
            } else {
                let rows = summaries
                    .iter()
                    .map(|s| {
                        vec![
                            s.name.clone(),
                            s.checks.to_string(),
                            s.exceptions.to_string(),
                            s.description.clone(),
                        ]
                    })
                    .collect();
                print_table(&["skill", "checks", "exceptions", "description"], rows);
                if !registry.broken.is_empty() {
                    println!();
                    for broken in &registry.broken {
                        println!("broken: {} ({})", broken.name, broken.problems.join("; "));
                    }
                }
            }
        }
        SkillSubcommand::Show { id } => {
            let registry = Registry::load(&config.resolved_skill_dirs(root))?;
            let skill = registry
                .get(&id)
                .ok_or_else(|| anyhow::anyhow!("skill '{id}' not found"))?;
            println!("Skill:       {}", skill.name);
            println!("Description: {}", skill.description);
            if let Some(trigger) = &skill.trigger {
                println!("Trigger:     {trigger}");
            }
            println!("Auto:        {}", skill.auto);
            println!("Source:      {}", skill.source.display());
            println!();
            println!("Checks:");
            for (i, check) in skill.checks.iter().enumerate() {
                println!(
                    "  {}. {} — target `{}`, detect `{}` ({})",
                    i + 1,
                    check.id,
                    check.target,
                    check.pattern,
                    check.engine,
                );
            }
            println!();
            println!("Exceptions:");
            for exception in &skill.exceptions {
                println!("  - {}", exception.describe());
            }
        }
        SkillSubcommand::Validate { id } => {
            let registry = Registry::load(&config.resolved_skill_dirs(root))?;
            let mut rows = Vec::new();
            for skill in &registry.skills {
                if id.as_deref().is_some_and(|i| i != skill.name) {
                    continue;
                }
                let warnings = skill.coverage_warnings(root);
                let detail = if warnings.is_empty() {
                    "ok".to_string()
                } else {
                    warnings.join("; ")
                };
                rows.push(vec![skill.name.clone(), "valid".to_string(), detail]);
            }
            for broken in &registry.broken {
                if id.as_deref().is_some_and(|i| i != broken.name) {
                    continue;
                }
                rows.push(vec![
                    broken.name.clone(),
                    "malformed".to_string(),
                    broken.problems.join("; "),
                ]);
            }
            if rows.is_empty() {
                anyhow::bail!("no skill documents matched");
            }
            print_table(&["skill", "status", "details"], rows);
        }
        SkillSubcommand::New { id, description } => {
            let path = create_skill(root, &config, &id, &description)?;
            println!("created {}", path.display());
            for index in &config.index_documents {
                println!("indexed in {index}");
            }
        }
    }
    Ok(())
}
