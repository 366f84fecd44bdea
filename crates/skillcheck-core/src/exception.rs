use crate::error::{Result, SkillcheckError};
use globset::{Glob, GlobMatcher};
use regex::Regex;
use std::path::Path;

// ---------------------------------------------------------------------------
// Exception
// ---------------------------------------------------------------------------

/// A suppression condition owned by a skill and shared across all of its
/// checks. Exceptions form a set: evaluation is order-independent and the
/// first match reported is only a convenience for evidence.
#[derive(Debug, Clone)]
pub enum Exception {
    /// Matches when the file path satisfies a glob.
    Path {
        glob: String,
        matcher: GlobMatcher,
        reason: String,
    },
    /// Matches when the file path sits under a directory prefix.
    Directory { prefix: String, reason: String },
    /// Matches when the line content matches a regex.
    Line {
        pattern: String,
        re: Regex,
        reason: String,
    },
}

impl Exception {
    pub fn path(glob: &str, reason: &str) -> Result<Self> {
        let matcher = Glob::new(glob)
            .map_err(|_| SkillcheckError::InvalidGlob(glob.to_string()))?
            .compile_matcher();
        Ok(Exception::Path {
            glob: glob.to_string(),
            matcher,
            reason: reason.to_string(),
        })
    }

    pub fn directory(prefix: &str, reason: &str) -> Self {
        Exception::Directory {
            prefix: prefix.trim_end_matches('/').to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn line(pattern: &str, reason: &str) -> Result<Self> {
        let re = Regex::new(pattern).map_err(|e| SkillcheckError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Exception::Line {
            pattern: pattern.to_string(),
            re,
            reason: reason.to_string(),
        })
    }

    /// Does this exception suppress a match at `path` with content `line`?
    pub fn matches(&self, path: &Path, line: &str) -> bool {
        match self {
            Exception::Path { matcher, .. } => matcher.is_match(path),
            Exception::Directory { prefix, .. } => {
                path.starts_with(prefix)
            }
            Exception::Line { re, .. } => re.is_match(line),
        }
    }

    /// Short description used as evidence on exempt findings.
    pub fn describe(&self) -> String {
        match self {
            Exception::Path { glob, .. } => format!("path `{glob}`"),
            Exception::Directory { prefix, .. } => format!("directory `{prefix}/`"),
            Exception::Line { pattern, .. } => format!("line matching `{pattern}`"),
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Exception::Path { reason, .. }
            | Exception::Directory { reason, .. }
            | Exception::Line { reason, .. } => reason,
        }
    }
}

/// First exception in the set that suppresses the given match, if any.
pub fn matching_exception<'a>(
    exceptions: &'a [Exception],
    path: &Path,
    line: &str,
) -> Option<&'a Exception> {
    exceptions.iter().find(|e| e.matches(path, line))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
