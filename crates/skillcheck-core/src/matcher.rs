use crate::error::{Result, SkillcheckError};
use crate::types::Engine;
use regex::Regex;

// ---------------------------------------------------------------------------
// RawMatch
// ---------------------------------------------------------------------------

/// One detection hit inside a file, before exception filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    /// 1-based line number.
    pub line: usize,
    /// The matching line, trailing whitespace trimmed.
    pub text: String,
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Detection procedure seam: one capability, `search(content, pattern)`.
/// The runner never assumes how matching works, so engines can be swapped
/// (literal scan, regex, or anything richer) without touching it.
pub trait Matcher {
    fn search(&self, content: &str, pattern: &str) -> Result<Vec<RawMatch>>;
}

/// Substring scan, line by line.
pub struct LiteralMatcher;

impl Matcher for LiteralMatcher {
    fn search(&self, content: &str, pattern: &str) -> Result<Vec<RawMatch>> {
        let mut matches = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.contains(pattern) {
                matches.push(RawMatch {
                    line: idx + 1,
                    text: line.trim_end().to_string(),
                });
            }
        }
        Ok(matches)
    }
}

/// Regex scan, line by line. The pattern is compiled per search; check
/// evaluation compiles once per file set via `search`, which is cheap at
/// this tool's scale.
pub struct RegexMatcher;

impl Matcher for RegexMatcher {
    fn search(&self, content: &str, pattern: &str) -> Result<Vec<RawMatch>> {
        let re = Regex::new(pattern).map_err(|e| SkillcheckError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        let mut matches = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if re.is_match(line) {
                matches.push(RawMatch {
                    line: idx + 1,
                    text: line.trim_end().to_string(),
                });
            }
        }
        Ok(matches)
    }
}

/// Default matcher for an engine selector.
pub fn for_engine(engine: Engine) -> &'static dyn Matcher {
    match engine {
        Engine::Literal => &LiteralMatcher,
        Engine::Regex => &RegexMatcher,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_finds_lines() {
        let content = "fn main() {\n    foo.unwrap();\n}\n";
        let matches = LiteralMatcher.search(content, ".unwrap()").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line, 2);
        assert!(matches[0].text.contains("unwrap"));
    }

    #[test]
    fn literal_no_match_empty() {
        let matches = LiteralMatcher.search("clean code", "unwrap").unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn regex_finds_lines() {
        let content = "use a::*;\nuse b::c;\nuse d::*;\n";
        let matches = RegexMatcher.search(content, r"use .*::\*;").unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].line, 1);
        assert_eq!(matches[1].line, 3);
    }

    #[test]
    fn regex_invalid_pattern_errors() {
        let result = RegexMatcher.search("anything", "(unclosed");
        assert!(matches!(
            result,
            Err(SkillcheckError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn line_numbers_are_one_based() {
        let matches = LiteralMatcher.search("hit", "hit").unwrap();
        assert_eq!(matches[0].line, 1);
    }

    #[test]
    fn engine_dispatch() {
        let literal = for_engine(Engine::Literal);
        // A regex metacharacter is matched literally by the literal engine.
        let matches = literal.search("price is $5", "$5").unwrap();
        assert_eq!(matches.len(), 1);
    }
}
