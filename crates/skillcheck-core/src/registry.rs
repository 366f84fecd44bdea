use crate::error::Result;
use crate::paths::SKILL_PREFIX;
use crate::skill::Skill;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// BrokenSkill
// ---------------------------------------------------------------------------

/// A skill document that failed to parse. It is reported but never blocks
/// the other skills from loading or running.
#[derive(Debug, Clone)]
pub struct BrokenSkill {
    pub name: String,
    pub source: PathBuf,
    pub problems: Vec<String>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The set of skills known to one run: an explicit, ordered configuration
/// object loaded once from the configured directories and passed to the
/// runner. Duplicate names keep the first document and break the later one.
#[derive(Debug, Default)]
pub struct Registry {
    pub skills: Vec<Skill>,
    pub broken: Vec<BrokenSkill>,
}

impl Registry {
    /// Scan the given directories, in order, for `verify-*.md` documents.
    /// Missing directories are skipped with a warning; malformed documents
    /// land in `broken`.
    pub fn load(dirs: &[PathBuf]) -> Result<Registry> {
        let mut registry = Registry::default();
        for dir in dirs {
            if !dir.is_dir() {
                warn!(dir = %dir.display(), "skill directory does not exist, skipping");
                continue;
            }
            let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.is_file()
                        && p.extension().and_then(|e| e.to_str()) == Some("md")
                        && p.file_stem()
                            .and_then(|s| s.to_str())
                            .is_some_and(|s| s.starts_with(SKILL_PREFIX))
                })
                .collect();
            entries.sort();
            for path in entries {
                registry.load_document(&path);
            }
        }
        info!(
            skills = registry.skills.len(),
            broken = registry.broken.len(),
            "registry scan complete"
        );
        Ok(registry)
    }

    fn load_document(&mut self, path: &Path) {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                self.broken.push(BrokenSkill {
                    name: stem,
                    source: path.to_path_buf(),
                    problems: vec![format!("unreadable document: {e}")],
                });
                return;
            }
        };
        match Skill::parse(&content, path) {
            Ok(skill) => {
                if self.get(&skill.name).is_some() {
                    self.broken.push(BrokenSkill {
                        name: skill.name.clone(),
                        source: path.to_path_buf(),
                        problems: vec![format!(
                            "duplicate skill name '{}': first definition wins",
                            skill.name
                        )],
                    });
                } else {
                    self.skills.push(skill);
                }
            }
            Err(problems) => {
                warn!(skill = %stem, path = %path.display(), "malformed skill document");
                self.broken.push(BrokenSkill {
                    name: stem,
                    source: path.to_path_buf(),
                    problems,
                });
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.skills.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.broken.is_empty()
    }

    /// Map changed files to the skills covering them. Every input file ends
    /// up either under at least one skill or in `uncovered` — never dropped.
    pub fn resolve(&self, files: &[PathBuf]) -> Resolution {
        let mut affected: Vec<SkillMatch> = Vec::new();
        let mut uncovered: Vec<String> = Vec::new();

        for skill in &self.skills {
            let matched: Vec<String> = files
                .iter()
                .filter(|f| skill.covers(f))
                .map(|f| f.display().to_string())
                .collect();
            if !matched.is_empty() {
                affected.push(SkillMatch {
                    skill: skill.name.clone(),
                    files: matched,
                });
            }
        }

        for file in files {
            if !self.skills.iter().any(|s| s.covers(file)) {
                uncovered.push(file.display().to_string());
            }
        }

        Resolution { affected, uncovered }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMatch {
    pub skill: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub affected: Vec<SkillMatch>,
    pub uncovered: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
