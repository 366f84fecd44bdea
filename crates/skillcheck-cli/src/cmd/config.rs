use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use skillcheck_core::config::{Config, WarnLevel};
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Check the configuration for problems
    Validate,
}

pub fn run(root: &Path, subcommand: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcommand {
        ConfigSubcommand::Validate => {
            let config = Config::load(root).context("failed to load config")?;
            let warnings = config.validate(root);
            if json {
                print_json(&warnings)?;
                return Ok(());
            }
            if warnings.is_empty() {
                println!("config ok");
                return Ok(());
            }
            for w in &warnings {
                let level = match w.level {
                    WarnLevel::Warning => "warning",
                    WarnLevel::Error => "error",
                };
                println!("{level}: {}", w.message);
            }
            if warnings.iter().any(|w| w.level == WarnLevel::Error) {
                anyhow::bail!("configuration has errors");
            }
        }
    }
    Ok(())
}
