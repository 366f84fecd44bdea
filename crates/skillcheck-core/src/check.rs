use crate::error::{Result, SkillcheckError};
use crate::exception::{matching_exception, Exception};
use crate::matcher::Matcher;
use crate::report::{Evidence, Finding};
use crate::types::{Engine, FindingStatus};
use globset::{Glob, GlobMatcher};
use std::path::{Path, PathBuf};
use tracing::warn;

// ---------------------------------------------------------------------------
// PassCondition
// ---------------------------------------------------------------------------

/// What the detection result must look like for the check to pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassCondition {
    /// Zero unsuppressed matches pass (a forbidden pattern).
    Absence,
    /// At least one match is required (a mandatory pattern).
    Presence,
}

impl PassCondition {
    /// Classify the free-text `Pass:` field of a workflow step.
    pub fn classify(text: &str) -> Option<PassCondition> {
        let lower = text.to_lowercase();
        if lower.contains("no match")
            || lower.contains("absent")
            || lower.contains("absence")
            || lower.contains("zero match")
        {
            return Some(PassCondition::Absence);
        }
        if lower.contains("at least one")
            || lower.contains("present")
            || lower.contains("must exist")
            || lower.contains("exists")
            || lower.contains("required")
        {
            return Some(PassCondition::Presence);
        }
        None
    }
}

// ---------------------------------------------------------------------------
// FixAction
// ---------------------------------------------------------------------------

/// Machine-applicable remediation derived from the `Fix:` field. Anything
/// the classifier cannot express stays `Manual` and survives reverification
/// as an item requiring human action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixAction {
    /// Replace the detected pattern on each offending line.
    ReplacePattern { with: String },
    /// Delete each offending line outright.
    DeleteLine,
    /// Append a snippet to the target file (presence checks).
    Append { snippet: String },
    Manual,
}

impl FixAction {
    /// Classify fix text plus any inline code spans extracted from it.
    pub fn classify(text: &str, codes: &[String]) -> FixAction {
        let lower = text.to_lowercase();
        if lower.contains("replace") && lower.contains("with") {
            if let Some(code) = codes.first() {
                return FixAction::ReplacePattern {
                    with: code.clone(),
                };
            }
        }
        if lower.contains("delete the line") || lower.contains("remove the line") {
            return FixAction::DeleteLine;
        }
        if (lower.starts_with("add") || lower.starts_with("append")) && !codes.is_empty() {
            return FixAction::Append {
                snippet: codes[0].clone(),
            };
        }
        FixAction::Manual
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, FixAction::Manual)
    }
}

// ---------------------------------------------------------------------------
// Check
// ---------------------------------------------------------------------------

/// One detection rule: target glob, search pattern, pass predicate, fix
/// hint. Immutable once parsed from its skill document.
#[derive(Debug, Clone)]
pub struct Check {
    pub id: String,
    pub target: String,
    pub pattern: String,
    pub engine: Engine,
    pub pass: PassCondition,
    pub fail_text: String,
    pub fix_text: String,
    pub fix_action: FixAction,
}

impl Check {
    fn target_matcher(&self) -> Result<GlobMatcher> {
        Ok(Glob::new(&self.target)
            .map_err(|_| SkillcheckError::InvalidGlob(self.target.clone()))?
            .compile_matcher())
    }

    /// The target as a plain path, when it contains no glob metacharacters.
    pub fn literal_target(&self) -> Option<&str> {
        if self.target.contains(['*', '?', '[', '{']) {
            None
        } else {
            Some(&self.target)
        }
    }

    /// Files from the scanned tree that this check's target covers.
    pub fn resolve_targets(&self, tree: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let matcher = self.target_matcher()?;
        Ok(tree
            .iter()
            .filter(|p| matcher.is_match(p))
            .cloned()
            .collect())
    }

    /// Evaluate this check against the file tree. Read-only: the only side
    /// effect is reading target files.
    pub fn evaluate(
        &self,
        root: &Path,
        tree: &[PathBuf],
        matcher: &dyn Matcher,
        exceptions: &[Exception],
    ) -> Result<Finding> {
        let files = self.resolve_targets(tree)?;

        if files.is_empty() {
            return Ok(match self.pass {
                PassCondition::Absence => self.finding(
                    FindingStatus::Pass,
                    Vec::new(),
                    None,
                    "no files matched target".to_string(),
                ),
                PassCondition::Presence => self.finding(
                    FindingStatus::Fail,
                    Vec::new(),
                    None,
                    format!("target '{}' matched no files", self.target),
                ),
            });
        }

        let mut violations: Vec<Evidence> = Vec::new();
        let mut suppressed: Vec<(Evidence, String)> = Vec::new();
        let mut present = false;

        for file in &files {
            let content = match std::fs::read_to_string(root.join(file)) {
                Ok(c) => c,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            for m in matcher.search(&content, &self.pattern)? {
                let evidence = Evidence {
                    file: file.display().to_string(),
                    line: m.line,
                    text: m.text.clone(),
                };
                match matching_exception(exceptions, file, &m.text) {
                    Some(exc) => suppressed.push((evidence, exc.describe())),
                    None => {
                        present = true;
                        violations.push(evidence);
                    }
                }
            }
        }

        Ok(match self.pass {
            PassCondition::Presence => {
                if present {
                    self.finding(
                        FindingStatus::Pass,
                        Vec::new(),
                        None,
                        "required pattern present".to_string(),
                    )
                } else {
                    self.finding(
                        FindingStatus::Fail,
                        Vec::new(),
                        None,
                        format!("required pattern absent from {} file(s)", files.len()),
                    )
                }
            }
            PassCondition::Absence => {
                if !violations.is_empty() {
                    let detail = format!("{} match(es)", violations.len());
                    self.finding(FindingStatus::Fail, violations, None, detail)
                } else if !suppressed.is_empty() {
                    let (evidence, descriptions): (Vec<_>, Vec<_>) =
                        suppressed.into_iter().unzip();
                    let detail = format!("{} suppressed match(es)", evidence.len());
                    self.finding(
                        FindingStatus::Exempt,
                        evidence,
                        descriptions.into_iter().next(),
                        detail,
                    )
                } else {
                    self.finding(
                        FindingStatus::Pass,
                        Vec::new(),
                        None,
                        "pattern absent".to_string(),
                    )
                }
            }
        })
    }

    fn finding(
        &self,
        status: FindingStatus,
        evidence: Vec<Evidence>,
        exempted_by: Option<String>,
        detail: String,
    ) -> Finding {
        let problem = if self.fail_text.is_empty() {
            detail.clone()
        } else {
            self.fail_text.clone()
        };
        Finding {
            check: self.id.clone(),
            target: self.target.clone(),
            status,
            evidence,
            exempted_by,
            detail,
            problem,
            fix: self.fix_text.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
