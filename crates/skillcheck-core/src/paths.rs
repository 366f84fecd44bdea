use crate::error::{Result, SkillcheckError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SKILLCHECK_DIR: &str = ".skillcheck";
pub const CONFIG_FILE: &str = ".skillcheck/config.yaml";
pub const DEFAULT_SKILLS_DIR: &str = "skills";

/// Every skill identifier must begin with this reserved prefix.
pub const SKILL_PREFIX: &str = "verify-";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn skillcheck_dir(root: &Path) -> PathBuf {
    root.join(SKILLCHECK_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn skill_doc_path(root: &Path, skills_dir: &str, id: &str) -> PathBuf {
    root.join(skills_dir).join(format!("{id}.md"))
}

/// Optional user-level skills directory (`~/.skillcheck/skills`), scanned
/// after the project directories when the config enables it.
pub fn user_skills_dir() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(SKILLCHECK_DIR).join(DEFAULT_SKILLS_DIR))
}

// ---------------------------------------------------------------------------
// Skill id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$").unwrap())
}

pub fn validate_skill_id(id: &str) -> Result<()> {
    if !id.starts_with(SKILL_PREFIX)
        || id.len() <= SKILL_PREFIX.len()
        || id.len() > 64
        || !id_re().is_match(id)
        || id.contains("--")
    {
        return Err(SkillcheckError::InvalidSkillId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
