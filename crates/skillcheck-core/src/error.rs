use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkillcheckError {
    #[error("not initialized: run 'skillcheck init'")]
    NotInitialized,

    #[error("skill not found: {0}")]
    SkillNotFound(String),

    #[error("skill already exists: {0}")]
    SkillExists(String),

    #[error("invalid skill id '{0}': must be kebab-case and start with 'verify-'")]
    InvalidSkillId(String),

    #[error("malformed skill document '{skill}': {problem}")]
    Definition { skill: String, problem: String },

    #[error("invalid detection pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("invalid glob '{0}'")]
    InvalidGlob(String),

    #[error("invalid fix decision '{0}': expected fix-all, fix-individually, or skip")]
    InvalidDecision(String),

    #[error("invalid matcher engine '{0}': expected literal or regex")]
    InvalidEngine(String),

    #[error("decision provider failed: {0}")]
    Decision(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SkillcheckError>;
