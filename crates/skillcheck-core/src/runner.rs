use crate::error::{Result, SkillcheckError};
use crate::fixer::{apply_fix, AppliedFix};
use crate::matcher;
use crate::registry::Registry;
use crate::report::{Finding, Report, SkillReport};
use crate::skill::Skill;
use crate::types::{Engine, FindingStatus, FixDecision, RunPhase};
use crate::walk::walk_files;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// DecisionProvider
// ---------------------------------------------------------------------------

/// The human-in-the-loop gate between report generation and fix
/// application. The runner blocks on `decide` until an answer arrives; in
/// automated contexts `PolicyDecision` supplies a configured default so the
/// state machine stays testable without a live operator.
pub trait DecisionProvider {
    fn decide(&mut self, report: &Report) -> Result<FixDecision>;

    /// Per-check confirmation used by fix-individually. Defaults to yes.
    fn confirm_fix(&mut self, _skill: &str, _finding: &Finding) -> Result<bool> {
        Ok(true)
    }
}

pub struct PolicyDecision(pub FixDecision);

impl DecisionProvider for PolicyDecision {
    fn decide(&mut self, _report: &Report) -> Result<FixDecision> {
        Ok(self.0)
    }
}

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixCycle {
    pub decision: FixDecision,
    pub applied: Vec<AppliedFix>,
    pub issues_before: usize,
    pub issues_after: usize,
    /// Checks still failing after reverification; these require manual
    /// resolution — the runner reports and stops, it does not retry.
    pub residual: Vec<Finding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub report: Report,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_cycle: Option<FixCycle>,
    /// The states visited, in order. Terminal state is always last.
    pub phases: Vec<RunPhase>,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Executes the checks of the selected skills strictly sequentially: skills
/// in registry order, checks in declaration order. The file tree is read
/// during evaluation and mutated only inside the fix phase, which completes
/// (or is skipped) before reverification reads it again.
pub struct Runner<'a> {
    root: &'a Path,
    registry: &'a Registry,
    default_engine: Engine,
}

impl<'a> Runner<'a> {
    pub fn new(root: &'a Path, registry: &'a Registry) -> Self {
        Self {
            root,
            registry,
            default_engine: Engine::Literal,
        }
    }

    pub fn with_default_engine(mut self, engine: Engine) -> Self {
        self.default_engine = engine;
        self
    }

    pub fn run(
        &self,
        only: Option<&str>,
        decisions: &mut dyn DecisionProvider,
    ) -> Result<RunOutcome> {
        let mut phases = vec![RunPhase::Idle];

        if let Some(name) = only {
            let known = self.registry.get(name).is_some()
                || self.registry.broken.iter().any(|b| b.name == name);
            if !known {
                return Err(SkillcheckError::SkillNotFound(name.to_string()));
            }
        }

        phases.push(RunPhase::ListingSkills);
        if self.registry.is_empty() {
            phases.push(RunPhase::NoSkills);
            return Ok(RunOutcome {
                report: Report::empty_registry(),
                fix_cycle: None,
                phases,
            });
        }

        let tree = walk_files(self.root)?;

        phases.push(RunPhase::Evaluating);
        let mut entries: Vec<SkillReport> = Vec::new();
        for skill in &self.registry.skills {
            if only.is_some_and(|n| n != skill.name) {
                continue;
            }
            debug!(skill = %skill.name, checks = skill.checks.len(), "evaluating skill");
            entries.push(self.evaluate_skill(skill, &tree)?);
        }
        for broken in &self.registry.broken {
            if only.is_some_and(|n| n != broken.name) {
                continue;
            }
            entries.push(SkillReport::broken(&broken.name, broken.problems.clone()));
        }

        phases.push(RunPhase::Summarizing);
        let report = Report::new(entries);
        info!(
            skills = report.skills.len(),
            issues = report.total_issues,
            "run summarized"
        );

        if !report.has_issues() {
            phases.push(RunPhase::Done);
            return Ok(RunOutcome {
                report,
                fix_cycle: None,
                phases,
            });
        }

        phases.push(RunPhase::AwaitingDecision);
        let decision = decisions.decide(&report)?;

        if decision == FixDecision::Skip {
            phases.push(RunPhase::Done);
            return Ok(RunOutcome {
                report,
                fix_cycle: None,
                phases,
            });
        }

        phases.push(RunPhase::ApplyingFixes);
        let applied = self.apply_fixes(&report, decision, decisions, &tree)?;

        phases.push(RunPhase::Reverifying);
        let fix_cycle = self.reverify(&report, decision, applied)?;

        phases.push(RunPhase::Done);
        Ok(RunOutcome {
            report,
            fix_cycle: Some(fix_cycle),
            phases,
        })
    }

    fn evaluate_skill(&self, skill: &Skill, tree: &[std::path::PathBuf]) -> Result<SkillReport> {
        let mut findings = Vec::new();
        for check in &skill.checks {
            let engine = if check.engine == Engine::Regex {
                Engine::Regex
            } else {
                self.default_engine
            };
            let finding = check.evaluate(
                self.root,
                tree,
                matcher::for_engine(engine),
                &skill.exceptions,
            )?;
            findings.push(finding);
        }
        let warnings = skill.coverage_warnings(self.root);
        Ok(SkillReport::passed(&skill.name, findings, warnings))
    }

    fn apply_fixes(
        &self,
        report: &Report,
        decision: FixDecision,
        decisions: &mut dyn DecisionProvider,
        tree: &[std::path::PathBuf],
    ) -> Result<Vec<AppliedFix>> {
        let mut applied = Vec::new();
        for entry in &report.skills {
            let Some(skill) = self.registry.get(&entry.skill) else {
                continue;
            };
            for finding in entry.failing_findings() {
                let Some(check) = skill.checks.iter().find(|c| c.id == finding.check) else {
                    continue;
                };
                if decision == FixDecision::FixIndividually
                    && !decisions.confirm_fix(&entry.skill, finding)?
                {
                    continue;
                }
                match apply_fix(self.root, check, finding, tree) {
                    Ok(fixes) => applied.extend(fixes),
                    Err(e) => {
                        // An unfixable check stays failing and shows up in
                        // the residual list after reverification.
                        debug!(check = %check.id, error = %e, "fix not applied");
                    }
                }
            }
        }
        Ok(applied)
    }

    /// Re-run only the skills that had failures and compare counts.
    fn reverify(
        &self,
        report: &Report,
        decision: FixDecision,
        applied: Vec<AppliedFix>,
    ) -> Result<FixCycle> {
        let tree = walk_files(self.root)?;
        let mut residual = Vec::new();
        let mut issues_after = 0;

        for entry in &report.skills {
            if entry.failing_findings().next().is_none() {
                continue;
            }
            let Some(skill) = self.registry.get(&entry.skill) else {
                continue;
            };
            let after = self.evaluate_skill(skill, &tree)?;
            for finding in after.findings {
                if finding.status == FindingStatus::Fail {
                    issues_after += finding.evidence.len().max(1);
                    residual.push(finding);
                }
            }
        }

        Ok(FixCycle {
            decision,
            applied,
            issues_before: report.total_issues,
            issues_after,
            residual,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SKILL_TODO: &str = r#"---
name: verify-todos
description: No stray TODO markers
---

# verify-todos

## Purpose

- **Hygiene**: finished work carries no TODO markers.
- **Traceability**: outstanding work lives in the tracker.

## When to Run

- Before committing
- Before opening a review
- After resolving review feedback

## Related Files

| Path | Purpose |
| ---- | ------- |
| src/ | sources under check |

## Workflow

### 1. no-todo

- Target: `src/**/*.rs`
- Detect: `TODO`
- Pass: no matches
- Fail: a TODO marker is present
- Fix: replace with `DONE`

## Output Format

| # | Check | Target | Status | Details |
| - | ----- | ------ | ------ | ------- |

## Exceptions

- Path `src/fixtures/**` - fixture data
- Line matching `tracked` - already tracked
"#;

    fn project(skill_docs: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("skills")).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        for (name, doc) in skill_docs {
            std::fs::write(dir.path().join(format!("skills/{name}.md")), doc).unwrap();
        }
        dir
    }

    fn registry_for(dir: &TempDir) -> Registry {
        Registry::load(&[dir.path().join("skills")]).unwrap()
    }

    #[test]
    fn scenario_a_zero_skills_guidance_only() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::default();
        let runner = Runner::new(dir.path(), &registry);
        let outcome = runner
            .run(None, &mut PolicyDecision(FixDecision::Skip))
            .unwrap();
        assert!(outcome.report.no_skills);
        assert!(outcome.report.summary_rows().is_empty());
        assert_eq!(outcome.phases.last(), Some(&RunPhase::NoSkills));
    }

    #[test]
    fn scenario_b_absent_pattern_passes() {
        let dir = project(&[("verify-todos", SKILL_TODO)]);
        std::fs::write(dir.path().join("src/lib.rs"), "fn clean() {}\n").unwrap();
        let registry = registry_for(&dir);
        let runner = Runner::new(dir.path(), &registry);
        let outcome = runner
            .run(None, &mut PolicyDecision(FixDecision::Skip))
            .unwrap();
        assert_eq!(outcome.report.total_issues, 0);
        assert_eq!(outcome.report.summary_rows()[0][3], "PASS");
        assert_eq!(outcome.phases.last(), Some(&RunPhase::Done));
        assert!(!outcome.phases.contains(&RunPhase::AwaitingDecision));
    }

    #[test]
    fn scenario_c_match_fails_with_location() {
        let dir = project(&[("verify-todos", SKILL_TODO)]);
        std::fs::write(dir.path().join("src/lib.rs"), "// TODO finish\n").unwrap();
        let registry = registry_for(&dir);
        let runner = Runner::new(dir.path(), &registry);
        let outcome = runner
            .run(None, &mut PolicyDecision(FixDecision::Skip))
            .unwrap();
        assert_eq!(outcome.report.total_issues, 1);
        let issues = outcome.report.issue_rows();
        assert_eq!(issues[0][3], "src/lib.rs:1");
        assert!(outcome.phases.contains(&RunPhase::AwaitingDecision));
    }

    #[test]
    fn scenario_d_excepted_path_reports_exempt() {
        let dir = project(&[("verify-todos", SKILL_TODO)]);
        std::fs::create_dir_all(dir.path().join("src/fixtures")).unwrap();
        std::fs::write(dir.path().join("src/fixtures/sample.rs"), "// TODO ok\n").unwrap();
        let registry = registry_for(&dir);
        let runner = Runner::new(dir.path(), &registry);
        let outcome = runner
            .run(None, &mut PolicyDecision(FixDecision::Skip))
            .unwrap();
        let finding = &outcome.report.skills[0].findings[0];
        assert_eq!(finding.status, FindingStatus::Exempt);
        assert!(finding.exempted_by.is_some());
        assert_eq!(outcome.report.total_issues, 0);
    }

    #[test]
    fn scenario_e_fix_all_then_reverify_passes() {
        let dir = project(&[("verify-todos", SKILL_TODO)]);
        std::fs::write(dir.path().join("src/lib.rs"), "// TODO finish\n").unwrap();
        let registry = registry_for(&dir);
        let runner = Runner::new(dir.path(), &registry);
        let outcome = runner
            .run(None, &mut PolicyDecision(FixDecision::FixAll))
            .unwrap();

        let cycle = outcome.fix_cycle.unwrap();
        assert_eq!(cycle.issues_before, 1);
        assert_eq!(cycle.issues_after, 0);
        assert!(cycle.residual.is_empty());
        assert!(cycle.applied.iter().any(|a| a.changed));

        let content = std::fs::read_to_string(dir.path().join("src/lib.rs")).unwrap();
        assert!(content.contains("DONE"));
        assert!(!content.contains("TODO"));
        assert_eq!(outcome.phases.last(), Some(&RunPhase::Done));
        assert!(outcome.phases.contains(&RunPhase::Reverifying));
    }

    #[test]
    fn skip_preserves_report_and_files() {
        let dir = project(&[("verify-todos", SKILL_TODO)]);
        std::fs::write(dir.path().join("src/lib.rs"), "// TODO finish\n").unwrap();
        let registry = registry_for(&dir);
        let runner = Runner::new(dir.path(), &registry);
        let outcome = runner
            .run(None, &mut PolicyDecision(FixDecision::Skip))
            .unwrap();
        assert!(outcome.fix_cycle.is_none());
        assert_eq!(outcome.report.total_issues, 1);
        let content = std::fs::read_to_string(dir.path().join("src/lib.rs")).unwrap();
        assert!(content.contains("TODO"));
    }

    #[test]
    fn idempotent_over_unchanged_tree() {
        let dir = project(&[("verify-todos", SKILL_TODO)]);
        std::fs::write(dir.path().join("src/lib.rs"), "// TODO finish\n").unwrap();
        let registry = registry_for(&dir);
        let runner = Runner::new(dir.path(), &registry);
        let first = runner
            .run(None, &mut PolicyDecision(FixDecision::Skip))
            .unwrap();
        let second = runner
            .run(None, &mut PolicyDecision(FixDecision::Skip))
            .unwrap();
        assert_eq!(first.report.total_issues, second.report.total_issues);
        assert_eq!(first.report.summary_rows(), second.report.summary_rows());
        assert_eq!(first.report.issue_rows(), second.report.issue_rows());
    }

    #[test]
    fn run_unknown_skill_errors() {
        let dir = project(&[("verify-todos", SKILL_TODO)]);
        let registry = registry_for(&dir);
        let runner = Runner::new(dir.path(), &registry);
        let result = runner.run(Some("verify-nope"), &mut PolicyDecision(FixDecision::Skip));
        assert!(matches!(result, Err(SkillcheckError::SkillNotFound(_))));
    }

    #[test]
    fn broken_skill_reported_alongside_healthy_ones() {
        let dir = project(&[("verify-todos", SKILL_TODO)]);
        std::fs::write(dir.path().join("skills/verify-broken.md"), "# nothing\n").unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "fn clean() {}\n").unwrap();
        let registry = registry_for(&dir);
        let runner = Runner::new(dir.path(), &registry);
        let outcome = runner
            .run(None, &mut PolicyDecision(FixDecision::Skip))
            .unwrap();
        let summary = outcome.report.summary_rows();
        assert_eq!(summary.len(), 2);
        assert!(summary.iter().any(|r| r[3] == "ERROR"));
        assert!(summary.iter().any(|r| r[3] == "PASS"));
    }

    #[test]
    fn fix_individually_respects_refusal() {
        struct RefuseAll;
        impl DecisionProvider for RefuseAll {
            fn decide(&mut self, _report: &Report) -> Result<FixDecision> {
                Ok(FixDecision::FixIndividually)
            }
            fn confirm_fix(&mut self, _skill: &str, _finding: &Finding) -> Result<bool> {
                Ok(false)
            }
        }

        let dir = project(&[("verify-todos", SKILL_TODO)]);
        std::fs::write(dir.path().join("src/lib.rs"), "// TODO finish\n").unwrap();
        let registry = registry_for(&dir);
        let runner = Runner::new(dir.path(), &registry);
        let outcome = runner.run(None, &mut RefuseAll).unwrap();

        let cycle = outcome.fix_cycle.unwrap();
        assert!(cycle.applied.is_empty());
        assert_eq!(cycle.issues_after, 1);
        assert_eq!(cycle.residual.len(), 1);
        let content = std::fs::read_to_string(dir.path().join("src/lib.rs")).unwrap();
        assert!(content.contains("TODO"));
    }

    #[test]
    fn restricting_to_one_skill_runs_only_it() {
        let other = SKILL_TODO
            .replace("verify-todos", "verify-other")
            .replace("TODO", "FIXME");
        let dir = project(&[("verify-todos", SKILL_TODO), ("verify-other", &other)]);
        std::fs::write(dir.path().join("src/lib.rs"), "fn clean() {}\n").unwrap();
        let registry = registry_for(&dir);
        let runner = Runner::new(dir.path(), &registry);
        let outcome = runner
            .run(Some("verify-todos"), &mut PolicyDecision(FixDecision::Skip))
            .unwrap();
        assert_eq!(outcome.report.skills.len(), 1);
        assert_eq!(outcome.report.skills[0].skill, "verify-todos");
    }
}
