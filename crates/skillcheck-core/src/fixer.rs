use crate::check::{Check, FixAction};
use crate::error::{Result, SkillcheckError};
use crate::io::atomic_write;
use crate::report::Finding;
use crate::types::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

// ---------------------------------------------------------------------------
// AppliedFix
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedFix {
    pub check: String,
    pub file: String,
    pub action: String,
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// Fix application
// ---------------------------------------------------------------------------

/// Apply a check's machine-applicable fix to the files named by its failing
/// finding. Only the evidence lines are touched; every write is atomic.
/// Manual fixes report `changed: false` and survive to the residual list.
pub fn apply_fix(
    root: &Path,
    check: &Check,
    finding: &Finding,
    tree: &[PathBuf],
) -> Result<Vec<AppliedFix>> {
    match &check.fix_action {
        FixAction::Manual => Ok(vec![AppliedFix {
            check: check.id.clone(),
            file: finding
                .evidence
                .first()
                .map(|e| e.file.clone())
                .unwrap_or_else(|| check.target.clone()),
            action: "manual".to_string(),
            changed: false,
        }]),
        FixAction::ReplacePattern { with } => {
            rewrite_evidence_lines(root, check, finding, "replace", |line| {
                replace_on_line(line, &check.pattern, check.engine, with)
            })
        }
        FixAction::DeleteLine => rewrite_evidence_lines(root, check, finding, "delete", |_| None),
        FixAction::Append { snippet } => append_snippet(root, check, tree, snippet),
    }
}

/// Group evidence by file and rewrite each named line. `edit` returns the
/// replacement line, or None to drop the line entirely.
fn rewrite_evidence_lines(
    root: &Path,
    check: &Check,
    finding: &Finding,
    action: &str,
    edit: impl Fn(&str) -> Option<String>,
) -> Result<Vec<AppliedFix>> {
    let mut by_file: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for ev in &finding.evidence {
        by_file.entry(ev.file.as_str()).or_default().push(ev.line);
    }

    let mut applied = Vec::new();
    for (file, lines) in by_file {
        let path = root.join(file);
        let content = std::fs::read_to_string(&path)?;
        let had_trailing_newline = content.ends_with('\n');

        let mut out: Vec<String> = Vec::new();
        let mut changed = false;
        for (idx, line) in content.lines().enumerate() {
            if lines.contains(&(idx + 1)) {
                match edit(line) {
                    Some(new_line) => {
                        changed = changed || new_line != line;
                        out.push(new_line);
                    }
                    None => changed = true,
                }
            } else {
                out.push(line.to_string());
            }
        }

        if changed {
            let mut data = out.join("\n");
            if had_trailing_newline && !data.is_empty() {
                data.push('\n');
            }
            atomic_write(&path, data.as_bytes())?;
            info!(check = %check.id, file, action, "applied fix");
        }
        applied.push(AppliedFix {
            check: check.id.clone(),
            file: file.to_string(),
            action: action.to_string(),
            changed,
        });
    }
    Ok(applied)
}

fn replace_on_line(line: &str, pattern: &str, engine: Engine, with: &str) -> Option<String> {
    match engine {
        Engine::Literal => Some(line.replace(pattern, with)),
        Engine::Regex => {
            // Pattern validity was established during evaluation.
            match Regex::new(pattern) {
                Ok(re) => Some(re.replace_all(line, with).into_owned()),
                Err(_) => Some(line.to_string()),
            }
        }
    }
}

/// Satisfy a presence check by appending the snippet to its target: the
/// literal target path when the target is a plain path, otherwise the first
/// existing file the glob resolves to. A pure glob with no resolvable file
/// cannot be fixed automatically.
fn append_snippet(
    root: &Path,
    check: &Check,
    tree: &[PathBuf],
    snippet: &str,
) -> Result<Vec<AppliedFix>> {
    let target: Option<PathBuf> = match check.literal_target() {
        Some(path) => Some(PathBuf::from(path)),
        None => check.resolve_targets(tree)?.into_iter().next(),
    };
    let Some(target) = target else {
        return Err(SkillcheckError::Decision(format!(
            "cannot apply append fix: target '{}' names no file",
            check.target
        )));
    };

    let path = root.join(&target);
    let mut content = if path.exists() {
        std::fs::read_to_string(&path)?
    } else {
        String::new()
    };
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(snippet);
    content.push('\n');
    atomic_write(&path, content.as_bytes())?;
    info!(check = %check.id, file = %target.display(), "appended snippet");

    Ok(vec![AppliedFix {
        check: check.id.clone(),
        file: target.display().to_string(),
        action: "append".to_string(),
        changed: true,
    }])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
