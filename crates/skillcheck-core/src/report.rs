use crate::types::{FindingStatus, SkillStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Evidence / Finding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub file: String,
    pub line: usize,
    pub text: String,
}

impl Evidence {
    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// The result of evaluating one check. Belongs to exactly one check, which
/// belongs to exactly one skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub check: String,
    pub target: String,
    pub status: FindingStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    /// Description of the exception that suppressed the match(es).
    /// Present exactly when status is exempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exempted_by: Option<String>,
    /// Short machine-independent summary ("pattern absent", "2 matches").
    pub detail: String,
    /// The skill document's fail description.
    pub problem: String,
    /// The skill document's fix suggestion.
    pub fix: String,
}

// ---------------------------------------------------------------------------
// SkillReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillReport {
    pub skill: String,
    pub status: SkillStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
    /// Coverage warnings (e.g. a related file that no longer exists).
    /// Never fatal.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Definition errors. When present, no checks were run for this skill.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<String>,
}

impl SkillReport {
    pub fn passed(skill: &str, findings: Vec<Finding>, warnings: Vec<String>) -> Self {
        let status = if findings.iter().any(|f| f.status == FindingStatus::Fail) {
            SkillStatus::Fail
        } else {
            SkillStatus::Pass
        };
        Self {
            skill: skill.to_string(),
            status,
            findings,
            warnings,
            problems: Vec::new(),
        }
    }

    pub fn broken(skill: &str, problems: Vec<String>) -> Self {
        Self {
            skill: skill.to_string(),
            status: SkillStatus::Error,
            findings: Vec::new(),
            warnings: Vec::new(),
            problems,
        }
    }

    pub fn failing_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.status == FindingStatus::Fail)
    }

}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

pub const NO_SKILLS_GUIDANCE: &str =
    "No skills registered. Add verify-*.md documents to a configured skills \
     directory, or run 'skillcheck skill new <id>' to scaffold one.";

pub const SUMMARY_HEADERS: &[&str] = &["#", "skill/check", "target", "status", "details"];
pub const ISSUE_HEADERS: &[&str] = &["#", "skill", "check", "location", "problem", "fix"];

/// Terminal artifact of a run. Skills appear in registry order, findings in
/// declaration order; re-running over an unchanged tree yields an identical
/// report apart from the timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub skills: Vec<SkillReport>,
    pub total_issues: usize,
    /// True when the registry was empty: the report carries only guidance.
    #[serde(default)]
    pub no_skills: bool,
}

impl Report {
    pub fn new(skills: Vec<SkillReport>) -> Self {
        let mut report = Self {
            generated_at: Utc::now(),
            skills,
            total_issues: 0,
            no_skills: false,
        };
        report.total_issues = report.issue_rows().len();
        report
    }

    pub fn empty_registry() -> Self {
        Self {
            generated_at: Utc::now(),
            skills: Vec::new(),
            total_issues: 0,
            no_skills: true,
        }
    }

    pub fn has_issues(&self) -> bool {
        self.total_issues > 0
    }

    /// One row per check, in skill order then declaration order, plus
    /// warning rows for coverage problems and an ERROR row per malformed
    /// document.
    pub fn summary_rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        for skill in &self.skills {
            if skill.status == SkillStatus::Error {
                rows.push(vec![
                    String::new(),
                    skill.skill.clone(),
                    "-".to_string(),
                    skill.status.label().to_string(),
                    skill
                        .problems
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "malformed document".to_string()),
                ]);
                continue;
            }
            for finding in &skill.findings {
                let details = match finding.status {
                    FindingStatus::Exempt => format!(
                        "{} (via {})",
                        finding.detail,
                        finding.exempted_by.as_deref().unwrap_or("exception")
                    ),
                    _ => finding.detail.clone(),
                };
                rows.push(vec![
                    String::new(),
                    format!("{}/{}", skill.skill, finding.check),
                    finding.target.clone(),
                    finding.status.label().to_string(),
                    details,
                ]);
            }
            for warning in &skill.warnings {
                rows.push(vec![
                    String::new(),
                    skill.skill.clone(),
                    "-".to_string(),
                    "WARN".to_string(),
                    warning.clone(),
                ]);
            }
        }
        for (i, row) in rows.iter_mut().enumerate() {
            row[0] = (i + 1).to_string();
        }
        rows
    }

    /// One row per failing piece of evidence. Skills with zero failing
    /// checks contribute no rows here.
    pub fn issue_rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        for skill in &self.skills {
            for finding in skill.failing_findings() {
                if finding.evidence.is_empty() {
                    rows.push(vec![
                        String::new(),
                        skill.skill.clone(),
                        finding.check.clone(),
                        finding.target.clone(),
                        finding.problem.clone(),
                        finding.fix.clone(),
                    ]);
                } else {
                    for ev in &finding.evidence {
                        rows.push(vec![
                            String::new(),
                            skill.skill.clone(),
                            finding.check.clone(),
                            ev.location(),
                            finding.problem.clone(),
                            finding.fix.clone(),
                        ]);
                    }
                }
            }
        }
        for (i, row) in rows.iter_mut().enumerate() {
            row[0] = (i + 1).to_string();
        }
        rows
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn pass_finding(check: &str) -> Finding {
        Finding {
            check: check.to_string(),
            target: "src/**/*.rs".to_string(),
            status: FindingStatus::Pass,
            evidence: Vec::new(),
            exempted_by: None,
            detail: "pattern absent".to_string(),
            problem: String::new(),
            fix: String::new(),
        }
    }

    fn fail_finding(check: &str, evidence: Vec<Evidence>) -> Finding {
        Finding {
            check: check.to_string(),
            target: "src/**/*.rs".to_string(),
            status: FindingStatus::Fail,
            evidence,
            exempted_by: None,
            detail: "1 match".to_string(),
            problem: "forbidden pattern present".to_string(),
            fix: "remove it".to_string(),
        }
    }

    #[test]
    fn passing_skill_absent_from_issues() {
        let report = Report::new(vec![SkillReport::passed(
            "verify-imports",
            vec![pass_finding("no-wildcards")],
            Vec::new(),
        )]);
        assert_eq!(report.total_issues, 0);
        assert!(report.issue_rows().is_empty());
        let summary = report.summary_rows();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0][3], "PASS");
    }

    #[test]
    fn failing_evidence_becomes_issue_rows() {
        let ev = Evidence {
            file: "src/lib.rs".to_string(),
            line: 4,
            text: "use foo::*;".to_string(),
        };
        let report = Report::new(vec![SkillReport::passed(
            "verify-imports",
            vec![fail_finding("no-wildcards", vec![ev])],
            Vec::new(),
        )]);
        assert_eq!(report.total_issues, 1);
        let issues = report.issue_rows();
        assert_eq!(issues[0][3], "src/lib.rs:4");
        assert_eq!(issues[0][1], "verify-imports");
    }

    #[test]
    fn evidence_free_failure_names_target() {
        let report = Report::new(vec![SkillReport::passed(
            "verify-docs",
            vec![fail_finding("changelog-exists", Vec::new())],
            Vec::new(),
        )]);
        let issues = report.issue_rows();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0][3], "src/**/*.rs");
    }

    #[test]
    fn broken_skill_reports_error_status() {
        let report = Report::new(vec![SkillReport::broken(
            "verify-broken",
            vec!["missing required section: Workflow".to_string()],
        )]);
        let summary = report.summary_rows();
        assert_eq!(summary[0][3], "ERROR");
        assert!(summary[0][4].contains("Workflow"));
        // Definition errors are not check failures.
        assert!(report.issue_rows().is_empty());
    }

    #[test]
    fn summary_rows_cover_exempt_and_warnings() {
        let exempt = Finding {
            check: "no-wildcards".to_string(),
            target: "src/**/*.rs".to_string(),
            status: FindingStatus::Exempt,
            evidence: Vec::new(),
            exempted_by: Some("path `tests/**`".to_string()),
            detail: "1 suppressed match(es)".to_string(),
            problem: String::new(),
            fix: String::new(),
        };
        let report = Report::new(vec![SkillReport::passed(
            "verify-imports",
            vec![exempt],
            vec!["related file 'src/gone.rs' does not exist".to_string()],
        )]);
        let summary = report.summary_rows();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0][1], "verify-imports/no-wildcards");
        assert_eq!(summary[0][3], "EXEMPT");
        assert!(summary[0][4].contains("path `tests/**`"));
        assert_eq!(summary[1][3], "WARN");
        assert!(summary[1][4].contains("src/gone.rs"));
    }

    #[test]
    fn empty_registry_report() {
        let report = Report::empty_registry();
        assert!(report.no_skills);
        assert!(report.summary_rows().is_empty());
        assert!(!report.has_issues());
    }

    #[test]
    fn issue_rows_are_sequenced() {
        let ev1 = Evidence {
            file: "a.rs".into(),
            line: 1,
            text: "x".into(),
        };
        let ev2 = Evidence {
            file: "b.rs".into(),
            line: 2,
            text: "y".into(),
        };
        let report = Report::new(vec![SkillReport::passed(
            "verify-imports",
            vec![fail_finding("no-wildcards", vec![ev1, ev2])],
            Vec::new(),
        )]);
        let issues = report.issue_rows();
        assert_eq!(issues[0][0], "1");
        assert_eq!(issues[1][0], "2");
    }
}
