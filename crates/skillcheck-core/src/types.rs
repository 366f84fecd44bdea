use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// FindingStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Pass,
    Fail,
    Exempt,
}

impl FindingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingStatus::Pass => "pass",
            FindingStatus::Fail => "fail",
            FindingStatus::Exempt => "exempt",
        }
    }

    /// Uppercase form used in report tables.
    pub fn label(self) -> &'static str {
        match self {
            FindingStatus::Pass => "PASS",
            FindingStatus::Fail => "FAIL",
            FindingStatus::Exempt => "EXEMPT",
        }
    }
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SkillStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillStatus {
    Pass,
    Fail,
    /// The skill document could not be parsed; no checks were run.
    Error,
}

impl SkillStatus {
    pub fn label(self) -> &'static str {
        match self {
            SkillStatus::Pass => "PASS",
            SkillStatus::Fail => "FAIL",
            SkillStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for SkillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkillStatus::Pass => "pass",
            SkillStatus::Fail => "fail",
            SkillStatus::Error => "error",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// RunPhase
// ---------------------------------------------------------------------------

/// States of the runner state machine, in the order a full run visits them.
/// `NoSkills` is the terminal short-circuit when the registry is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunPhase {
    Idle,
    ListingSkills,
    Evaluating,
    Summarizing,
    AwaitingDecision,
    ApplyingFixes,
    Reverifying,
    Done,
    NoSkills,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::ListingSkills => "listing-skills",
            RunPhase::Evaluating => "evaluating",
            RunPhase::Summarizing => "summarizing",
            RunPhase::AwaitingDecision => "awaiting-decision",
            RunPhase::ApplyingFixes => "applying-fixes",
            RunPhase::Reverifying => "reverifying",
            RunPhase::Done => "done",
            RunPhase::NoSkills => "no-skills",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::NoSkills)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FixDecision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixDecision {
    FixAll,
    FixIndividually,
    Skip,
}

impl FixDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            FixDecision::FixAll => "fix-all",
            FixDecision::FixIndividually => "fix-individually",
            FixDecision::Skip => "skip",
        }
    }
}

impl fmt::Display for FixDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FixDecision {
    type Err = crate::error::SkillcheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fix-all" | "all" => Ok(FixDecision::FixAll),
            "fix-individually" | "individual" => Ok(FixDecision::FixIndividually),
            "skip" => Ok(FixDecision::Skip),
            _ => Err(crate::error::SkillcheckError::InvalidDecision(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Detection engine a check's pattern is interpreted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    #[default]
    Literal,
    Regex,
}

impl Engine {
    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Literal => "literal",
            Engine::Regex => "regex",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Engine {
    type Err = crate::error::SkillcheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "literal" => Ok(Engine::Literal),
            "regex" => Ok(Engine::Regex),
            _ => Err(crate::error::SkillcheckError::InvalidEngine(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn finding_status_labels() {
        assert_eq!(FindingStatus::Pass.label(), "PASS");
        assert_eq!(FindingStatus::Fail.label(), "FAIL");
        assert_eq!(FindingStatus::Exempt.label(), "EXEMPT");
        assert_eq!(FindingStatus::Exempt.to_string(), "exempt");
    }

    #[test]
    fn run_phase_terminal() {
        assert!(RunPhase::Done.is_terminal());
        assert!(RunPhase::NoSkills.is_terminal());
        assert!(!RunPhase::Evaluating.is_terminal());
        assert_eq!(RunPhase::AwaitingDecision.as_str(), "awaiting-decision");
    }

    #[test]
    fn fix_decision_roundtrip() {
        for d in [
            FixDecision::FixAll,
            FixDecision::FixIndividually,
            FixDecision::Skip,
        ] {
            let parsed = FixDecision::from_str(d.as_str()).unwrap();
            assert_eq!(parsed, d);
        }
    }

    #[test]
    fn fix_decision_short_forms() {
        assert_eq!(FixDecision::from_str("all").unwrap(), FixDecision::FixAll);
        assert_eq!(
            FixDecision::from_str("individual").unwrap(),
            FixDecision::FixIndividually
        );
        assert!(FixDecision::from_str("bogus").is_err());
    }

    #[test]
    fn engine_roundtrip() {
        assert_eq!(Engine::from_str("literal").unwrap(), Engine::Literal);
        assert_eq!(Engine::from_str("regex").unwrap(), Engine::Regex);
        assert!(Engine::from_str("ast").is_err());
        assert_eq!(Engine::default(), Engine::Literal);
    }

    #[test]
    fn fix_decision_serde_kebab() {
        let json = serde_json::to_string(&FixDecision::FixAll).unwrap();
        assert_eq!(json, "\"fix-all\"");
    }
}
