use crate::config::Config;
use crate::error::{Result, SkillcheckError};
use crate::io::{append_text, write_if_missing};
use crate::paths;
use crate::registry::Registry;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Gap analysis output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleReference {
    pub skill: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleCheck {
    pub skill: String,
    pub check: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexIssue {
    pub document: String,
    pub issue: String,
}

/// Advisory only: recommendations never mutate anything. Creating a skill
/// requires an explicit `create_skill` call naming a valid identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    UpdateSkill { skill: String, files: Vec<String> },
    CreateSkill { directory: String, files: Vec<String> },
    Exempt { files: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub uncovered: Vec<String>,
    pub stale_references: Vec<StaleReference>,
    pub stale_checks: Vec<StaleCheck>,
    pub index_issues: Vec<IndexIssue>,
    pub recommendations: Vec<Recommendation>,
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Minimum group size before a new skill is recommended for a shared
/// concern; smaller groups are marked exempt.
const NEW_SKILL_THRESHOLD: usize = 3;

pub fn analyze(
    root: &Path,
    config: &Config,
    registry: &Registry,
    changed: &[PathBuf],
    tree: &[PathBuf],
) -> Result<GapAnalysis> {
    let resolution = registry.resolve(changed);

    let mut stale_references = Vec::new();
    let mut stale_checks = Vec::new();
    for skill in &registry.skills {
        for rf in &skill.related_files {
            if !root.join(&rf.path).exists() {
                stale_references.push(StaleReference {
                    skill: skill.name.clone(),
                    path: rf.path.clone(),
                });
            }
        }
        for check in &skill.checks {
            if check.resolve_targets(tree)?.is_empty() && check.literal_target().is_none() {
                stale_checks.push(StaleCheck {
                    skill: skill.name.clone(),
                    check: check.id.clone(),
                    reason: format!("target '{}' matches no files", check.target),
                });
            }
        }
    }

    let index_issues = check_indexes(root, config, registry);
    let recommendations = recommend(registry, &resolution.uncovered);

    Ok(GapAnalysis {
        uncovered: resolution.uncovered,
        stale_references,
        stale_checks,
        index_issues,
        recommendations,
    })
}

/// Grouping policy: uncovered files inside an existing skill's declared
/// domain (the top-level directories of its related files) suggest updating
/// that skill; otherwise groups of three or more files sharing a top-level
/// directory suggest a new skill; everything left is exempt.
fn recommend(registry: &Registry, uncovered: &[String]) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let mut remaining: Vec<&String> = uncovered.iter().collect();

    for skill in &registry.skills {
        let domains: Vec<String> = skill
            .related_files
            .iter()
            .filter_map(|rf| first_component(&rf.path))
            .collect();
        let (inside, outside): (Vec<&String>, Vec<&String>) = remaining
            .into_iter()
            .partition(|f| top_component(f).is_some_and(|top| domains.contains(&top)));
        if !inside.is_empty() {
            recommendations.push(Recommendation::UpdateSkill {
                skill: skill.name.clone(),
                files: inside.into_iter().cloned().collect(),
            });
        }
        remaining = outside;
    }

    let mut by_dir: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut loose: Vec<String> = Vec::new();
    for file in remaining {
        match top_component(file) {
            Some(dir) => by_dir.entry(dir).or_default().push(file.clone()),
            None => loose.push(file.clone()),
        }
    }
    for (directory, files) in by_dir {
        if files.len() >= NEW_SKILL_THRESHOLD {
            recommendations.push(Recommendation::CreateSkill { directory, files });
        } else {
            loose.extend(files);
        }
    }
    if !loose.is_empty() {
        loose.sort();
        recommendations.push(Recommendation::Exempt { files: loose });
    }

    recommendations
}

fn first_component(path: &str) -> Option<String> {
    Path::new(path)
        .components()
        .next()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
}

/// The file's top-level directory. A bare file name has no directory to
/// group under.
fn top_component(path: &str) -> Option<String> {
    let mut components = Path::new(path).components();
    let first = components.next()?;
    components.next()?;
    Some(first.as_os_str().to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// Index consistency
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"verify-[a-z0-9]+(?:-[a-z0-9]+)*").unwrap())
}

/// Every index document must enumerate exactly the registered skills:
/// missing entries and entries for skills that no longer exist are both
/// warning-level findings.
fn check_indexes(root: &Path, config: &Config, registry: &Registry) -> Vec<IndexIssue> {
    let mut issues = Vec::new();
    for doc in &config.index_documents {
        let path = root.join(doc);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => {
                issues.push(IndexIssue {
                    document: doc.clone(),
                    issue: "index document does not exist".to_string(),
                });
                continue;
            }
        };
        let mentioned: Vec<&str> = name_re().find_iter(&content).map(|m| m.as_str()).collect();
        for skill in &registry.skills {
            if !mentioned.contains(&skill.name.as_str()) {
                issues.push(IndexIssue {
                    document: doc.clone(),
                    issue: format!("missing entry for '{}'", skill.name),
                });
            }
        }
        for name in &mentioned {
            let known = registry.get(name).is_some()
                || registry.broken.iter().any(|b| b.name == *name);
            if !known {
                issues.push(IndexIssue {
                    document: doc.clone(),
                    issue: format!("stale entry '{name}' names no known skill"),
                });
            }
        }
    }
    issues
}

// ---------------------------------------------------------------------------
// Skill creation
// ---------------------------------------------------------------------------

/// Scaffold a new skill document and record it in every index document.
/// Requires an explicit, valid identifier; gap analysis never calls this.
pub fn create_skill(
    root: &Path,
    config: &Config,
    id: &str,
    description: &str,
) -> Result<PathBuf> {
    paths::validate_skill_id(id)?;
    let dir = config
        .skill_dirs
        .first()
        .ok_or_else(|| SkillcheckError::NotInitialized)?;
    let path = paths::skill_doc_path(root, dir, id);
    if path.exists() {
        return Err(SkillcheckError::SkillExists(id.to_string()));
    }

    let doc = skill_template(id, description);
    write_if_missing(&path, doc.as_bytes())?;

    for index in &config.index_documents {
        let index_path = root.join(index);
        append_text(&index_path, &format!("- {id}: {description}\n"))?;
    }

    Ok(path)
}

pub fn skill_template(id: &str, description: &str) -> String {
    format!(
        r#"---
name: {id}
description: {description}
trigger: Describe when a session should reach for this skill
auto: false
---

# {id}

## Purpose

- **Correctness**: state the first category this skill protects.
- **Consistency**: state the second category this skill protects.

## When to Run

- After changing the covered files
- Before opening a review
- When a related check fails elsewhere

## Related Files

| Path | Purpose |
| ---- | ------- |
| src/ | project sources |

## Workflow

### 1. placeholder

- Target: `src/**`
- Detect: `REPLACE-ME`
- Pass: no matches
- Fail: the placeholder marker is still present
- Fix: replace this starter check with a real one

## Output Format

| # | Check | Target | Status | Details |
| - | ----- | ------ | ------ | ------- |

## Exceptions

- Path `tests/**` - test code is out of scope
- Line matching `skillcheck:allow` - explicitly waived
"#
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
