use crate::output::{print_json, print_table};
use anyhow::Context;
use skillcheck_core::config::Config;
use skillcheck_core::registry::Registry;
use skillcheck_core::report::{Finding, Report, ISSUE_HEADERS, NO_SKILLS_GUIDANCE, SUMMARY_HEADERS};
use skillcheck_core::runner::{DecisionProvider, PolicyDecision, Runner, RunOutcome};
use skillcheck_core::types::FixDecision;
use skillcheck_core::Result as CoreResult;
use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;
use std::str::FromStr;

pub fn run(
    root: &Path,
    skill: Option<&str>,
    decision: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let registry =
        Registry::load(&config.resolved_skill_dirs(root)).context("failed to scan skills")?;
    let runner = Runner::new(root, &registry).with_default_engine(config.default_engine);

    let mut provider = select_provider(decision, &config, json)?;
    let outcome = runner.run(skill, provider.as_mut())?;

    if json {
        print_json(&outcome)?;
        return Ok(());
    }
    render(&outcome);
    Ok(())
}

/// Decision precedence: --decision flag, then the configured default, then
/// an interactive prompt when attached to a terminal, else skip.
fn select_provider(
    flag: Option<&str>,
    config: &Config,
    json: bool,
) -> anyhow::Result<Box<dyn DecisionProvider>> {
    if let Some(s) = flag {
        return Ok(Box::new(PolicyDecision(FixDecision::from_str(s)?)));
    }
    if let Some(d) = config.default_decision {
        return Ok(Box::new(PolicyDecision(d)));
    }
    if !json && std::io::stdin().is_terminal() {
        return Ok(Box::new(PromptDecision));
    }
    Ok(Box::new(PolicyDecision(FixDecision::Skip)))
}

fn render(outcome: &RunOutcome) {
    if outcome.report.no_skills {
        println!("{NO_SKILLS_GUIDANCE}");
        return;
    }

    println!("Summary");
    print_table(SUMMARY_HEADERS, outcome.report.summary_rows());

    if outcome.report.has_issues() {
        println!();
        println!("Issues");
        print_table(ISSUE_HEADERS, outcome.report.issue_rows());
    }

    if let Some(cycle) = &outcome.fix_cycle {
        println!();
        println!(
            "Fixes applied: {} ({} -> {} issues)",
            cycle.applied.iter().filter(|a| a.changed).count(),
            cycle.issues_before,
            cycle.issues_after,
        );
        if !cycle.residual.is_empty() {
            println!("Requiring manual resolution:");
            for finding in &cycle.residual {
                let location = finding
                    .evidence
                    .first()
                    .map(|e| e.location())
                    .unwrap_or_else(|| finding.target.clone());
                println!("  {} ({location}): {}", finding.check, finding.fix);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Interactive decision gate
// ---------------------------------------------------------------------------

/// Blocks on stdin until the operator chooses. This is the run's only
/// suspension point; there is no timeout.
struct PromptDecision;

impl DecisionProvider for PromptDecision {
    fn decide(&mut self, report: &Report) -> CoreResult<FixDecision> {
        println!("Found {} issue(s)", report.total_issues);
        print_table(ISSUE_HEADERS, report.issue_rows());
        loop {
            print!("\nApply fixes? [a]ll / [i]ndividually / [s]kip: ");
            let _ = std::io::stdout().flush();
            let Some(answer) = read_line()? else {
                return Ok(FixDecision::Skip);
            };
            match answer.trim() {
                "a" | "all" => return Ok(FixDecision::FixAll),
                "i" | "individually" => return Ok(FixDecision::FixIndividually),
                "s" | "skip" => return Ok(FixDecision::Skip),
                other => println!("unrecognized choice '{other}'"),
            }
        }
    }

    fn confirm_fix(&mut self, skill: &str, finding: &Finding) -> CoreResult<bool> {
        print!("fix {skill}/{} ({})? [y/N]: ", finding.check, finding.detail);
        let _ = std::io::stdout().flush();
        let answer = read_line()?.unwrap_or_default();
        Ok(matches!(answer.trim(), "y" | "yes"))
    }
}

fn read_line() -> CoreResult<Option<String>> {
    let mut line = String::new();
    let n = std::io::stdin().lock().read_line(&mut line)?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
