use crate::error::{Result, SkillcheckError};
use crate::paths;
use crate::types::{Engine, FixDecision};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

/// Per-project configuration, loaded once per run and passed explicitly to
/// the registry and runner. There is no ambient global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    /// Directories scanned for verify-*.md documents, in order.
    #[serde(default = "default_skill_dirs")]
    pub skill_dirs: Vec<String>,
    /// Also scan ~/.skillcheck/skills after the project directories.
    #[serde(default)]
    pub include_user_skills: bool,
    /// Decision applied at the fix gate when no interactive operator and no
    /// --decision flag is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_decision: Option<FixDecision>,
    /// Engine used when a check does not mark its pattern as regex.
    #[serde(default)]
    pub default_engine: Engine,
    /// Index documents that must enumerate every registered skill: the
    /// runner index, the maintenance catalog, and the project guideline
    /// index. Consistency is checked by `skillcheck gaps`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index_documents: Vec<String>,
}

fn default_version() -> u32 {
    1
}

fn default_skill_dirs() -> Vec<String> {
    vec![paths::DEFAULT_SKILLS_DIR.to_string()]
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            skill_dirs: default_skill_dirs(),
            include_user_skills: false,
            default_decision: None,
            default_engine: Engine::Literal,
            index_documents: Vec::new(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(SkillcheckError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// All skill directories to scan, in resolution order.
    pub fn resolved_skill_dirs(&self, root: &Path) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.skill_dirs.iter().map(|d| root.join(d)).collect();
        if self.include_user_skills {
            if let Some(user) = paths::user_skills_dir() {
                dirs.push(user);
            }
        }
        dirs
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, root: &Path) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.skill_dirs.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "skill_dirs is empty: no skills can ever be registered".to_string(),
            });
        }

        for dir in &self.skill_dirs {
            if !root.join(dir).is_dir() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("skill directory '{dir}' does not exist"),
                });
            }
        }

        for (i, doc) in self.index_documents.iter().enumerate() {
            if self.index_documents[..i].contains(doc) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("index document '{doc}' listed more than once"),
                });
            }
            if !root.join(doc).exists() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("index document '{doc}' does not exist"),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::new("my-project");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.project.name, "my-project");
        assert_eq!(parsed.skill_dirs, vec!["skills"]);
        assert_eq!(parsed.default_engine, Engine::Literal);
    }

    #[test]
    fn minimal_yaml_backward_compat() {
        let yaml = "version: 1\nproject:\n  name: my-project\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.skill_dirs, vec!["skills"]);
        assert!(cfg.default_decision.is_none());
        assert!(!cfg.include_user_skills);

        // Optional keys are not re-serialized when unset.
        let out = serde_yaml::to_string(&cfg).unwrap();
        assert!(!out.contains("default_decision"));
        assert!(!out.contains("index_documents"));
    }

    #[test]
    fn decision_parsed_from_kebab() {
        let yaml = "version: 1\nproject:\n  name: p\ndefault_decision: fix-all\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.default_decision, Some(FixDecision::FixAll));
    }

    #[test]
    fn load_save_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new("proj");
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.project.name, "proj");
    }

    #[test]
    fn load_uninitialized_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(SkillcheckError::NotInitialized)
        ));
    }

    #[test]
    fn validate_missing_dir_warns() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new("proj");
        let warnings = cfg.validate(dir.path());
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("'skills' does not exist")));
    }

    #[test]
    fn validate_empty_skill_dirs_errors() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("proj");
        cfg.skill_dirs.clear();
        let warnings = cfg.validate(dir.path());
        assert!(warnings.iter().any(|w| w.level == WarnLevel::Error));
    }

    #[test]
    fn validate_duplicate_index_documents() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("skills")).unwrap();
        let mut cfg = Config::new("proj");
        cfg.index_documents = vec!["INDEX.md".to_string(), "INDEX.md".to_string()];
        std::fs::write(dir.path().join("INDEX.md"), "").unwrap();
        let warnings = cfg.validate(dir.path());
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("more than once")));
    }
}
