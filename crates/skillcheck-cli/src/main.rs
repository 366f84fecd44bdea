mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, skill::SkillSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "skillcheck",
    about = "Skill-driven verification runner — parse verify-* skill documents, run their checks, report and fix",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .skillcheck/ or .git/)
    #[arg(long, global = true, env = "SKILLCHECK_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize skillcheck in the current project
    Init,

    /// Run the checks of every registered skill, or of one named skill
    Run {
        /// Restrict the run to one skill
        skill: Option<String>,

        /// Fix decision to apply without prompting (fix-all, fix-individually, skip)
        #[arg(long)]
        decision: Option<String>,
    },

    /// Inspect and maintain skill documents
    Skill {
        #[command(subcommand)]
        subcommand: SkillSubcommand,
    },

    /// Map changed files to the skills covering them
    Resolve {
        /// Changed file paths, relative to the project root
        files: Vec<PathBuf>,
    },

    /// Gap analysis: uncovered files, stale references, index consistency
    Gaps {
        /// Files changed in the working session
        files: Vec<PathBuf>,
    },

    /// Validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root_path = cli.root.as_deref();
    let root = root::resolve_root(root_path);

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Run { skill, decision } => {
            cmd::run::run(&root, skill.as_deref(), decision.as_deref(), cli.json)
        }
        Commands::Skill { subcommand } => cmd::skill::run(&root, subcommand, cli.json),
        Commands::Resolve { files } => cmd::resolve::run(&root, &files, cli.json),
        Commands::Gaps { files } => cmd::gaps::run(&root, &files, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
