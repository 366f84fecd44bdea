use crate::check::{Check, FixAction, PassCondition};
use crate::document::{find_section, parse_sections, split_frontmatter, Item, Metadata, Section};
use crate::exception::Exception;
use crate::paths;
use crate::types::Engine;
use globset::Glob;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// RelatedFile
// ---------------------------------------------------------------------------

/// One row of the Related Files table: a path the skill watches over.
#[derive(Debug, Clone)]
pub struct RelatedFile {
    pub path: String,
    pub purpose: String,
}

impl RelatedFile {
    /// Whether a changed file falls under this entry: exact match, or the
    /// entry names a directory the file sits in.
    pub fn covers(&self, file: &Path) -> bool {
        let entry = Path::new(self.path.trim_end_matches('/'));
        file == entry || file.starts_with(entry)
    }
}

// ---------------------------------------------------------------------------
// Skill
// ---------------------------------------------------------------------------

/// A named bundle of checks plus exceptions and metadata, parsed from a
/// single markdown document. The document is the sole persisted form.
#[derive(Debug, Clone)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub trigger: Option<String>,
    pub auto: bool,
    pub purpose: Vec<String>,
    pub triggers: Vec<String>,
    pub related_files: Vec<RelatedFile>,
    pub checks: Vec<Check>,
    pub exceptions: Vec<Exception>,
    pub source: PathBuf,
}

impl Skill {
    /// Parse and structurally validate a skill document. All definition
    /// problems are collected so the author sees the full list at once; any
    /// problem blocks the skill from running.
    pub fn parse(content: &str, source: &Path) -> Result<Skill, Vec<String>> {
        let mut problems = Vec::new();

        let Some((frontmatter, body)) = split_frontmatter(content) else {
            return Err(vec!["missing frontmatter header".to_string()]);
        };
        let meta: Metadata = match serde_yaml::from_str(frontmatter) {
            Ok(m) => m,
            Err(e) => return Err(vec![format!("invalid frontmatter: {e}")]),
        };
        if paths::validate_skill_id(&meta.name).is_err() {
            problems.push(format!(
                "name '{}' must be kebab-case and start with '{}'",
                meta.name,
                paths::SKILL_PREFIX
            ));
        }
        if let Some(stem) = source.file_stem().and_then(|s| s.to_str()) {
            if stem != meta.name {
                problems.push(format!(
                    "name '{}' does not match file name '{stem}'",
                    meta.name
                ));
            }
        }

        let sections = parse_sections(body);

        let purpose = section_items(&sections, "Purpose");
        if purpose.len() < 2 {
            problems.push("Purpose must list at least 2 categories".to_string());
        }

        let triggers = section_items(&sections, "When to Run");
        if !(3..=5).contains(&triggers.len()) {
            problems.push(format!(
                "When to Run must list 3-5 triggers, found {}",
                triggers.len()
            ));
        }

        let related_files = parse_related_files(&sections, &mut problems);
        let checks = parse_workflow(&sections, &mut problems);
        let exceptions = parse_exceptions(&sections, &mut problems);

        if find_section(&sections, "Output Format").is_none() {
            problems.push("missing required section: Output Format".to_string());
        }

        if !problems.is_empty() {
            return Err(problems);
        }

        Ok(Skill {
            name: meta.name,
            description: meta.description,
            trigger: meta.trigger,
            auto: meta.auto,
            purpose,
            triggers,
            related_files,
            checks,
            exceptions,
            source: source.to_path_buf(),
        })
    }

    /// Coverage warnings: related-file entries that no longer exist on disk.
    /// Warning-level only, never fatal to a run.
    pub fn coverage_warnings(&self, root: &Path) -> Vec<String> {
        self.related_files
            .iter()
            .filter(|rf| !root.join(&rf.path).exists())
            .map(|rf| format!("related file '{}' does not exist", rf.path))
            .collect()
    }

    /// Whether this skill covers a changed file: a related-files entry
    /// matches exactly or as a directory prefix, or any check's target glob
    /// matches.
    pub fn covers(&self, file: &Path) -> bool {
        if self.related_files.iter().any(|rf| rf.covers(file)) {
            return true;
        }
        self.checks.iter().any(|c| {
            Glob::new(&c.target)
                .map(|g| g.compile_matcher().is_match(file))
                .unwrap_or(false)
        })
    }
}

// ---------------------------------------------------------------------------
// Section parsers
// ---------------------------------------------------------------------------

fn section_items(sections: &[Section], title: &str) -> Vec<String> {
    find_section(sections, title)
        .map(|s| s.items.iter().map(|i| i.text.trim().to_string()).collect())
        .unwrap_or_default()
}

fn parse_related_files(sections: &[Section], problems: &mut Vec<String>) -> Vec<RelatedFile> {
    let Some(section) = find_section(sections, "Related Files") else {
        problems.push("missing required section: Related Files".to_string());
        return Vec::new();
    };
    let Some(table) = section.tables.first() else {
        problems.push("Related Files must contain a path/purpose table".to_string());
        return Vec::new();
    };
    if table.rows.is_empty() {
        problems.push("Related Files table has no rows".to_string());
        return Vec::new();
    }
    let mut out = Vec::new();
    for row in &table.rows {
        if row.len() < 2 || row[0].is_empty() {
            problems.push("Related Files table row is missing a path or purpose".to_string());
            continue;
        }
        out.push(RelatedFile {
            path: row[0].clone(),
            purpose: row[1].clone(),
        });
    }
    out
}

fn parse_workflow(sections: &[Section], problems: &mut Vec<String>) -> Vec<Check> {
    let Some(section) = find_section(sections, "Workflow") else {
        problems.push("missing required section: Workflow".to_string());
        return Vec::new();
    };
    if section.subsections.is_empty() {
        problems.push("Workflow declares no checks".to_string());
        return Vec::new();
    }
    let mut checks = Vec::new();
    for step in &section.subsections {
        let id = step
            .title
            .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ' ')
            .to_string();
        if let Some(check) = parse_check(&id, &step.items, problems) {
            checks.push(check);
        }
    }
    checks
}

fn parse_check(id: &str, items: &[Item], problems: &mut Vec<String>) -> Option<Check> {
    let mut target = None;
    let mut pattern = None;
    let mut engine = Engine::Literal;
    let mut pass = None;
    let mut fail_text = String::new();
    let mut fix_text = String::new();
    let mut fix_codes: Vec<String> = Vec::new();

    for item in items {
        if let Some((rest, codes)) = item.field("target") {
            target = codes.first().cloned().or(Some(rest));
        } else if let Some((rest, codes)) = item.field("detect") {
            pattern = codes.first().cloned();
            if pattern.is_none() && !rest.is_empty() {
                pattern = Some(rest.clone());
            }
            if rest.to_lowercase().contains("regex") {
                engine = Engine::Regex;
            }
        } else if let Some((rest, _)) = item.field("pass") {
            match PassCondition::classify(&rest) {
                Some(p) => pass = Some(p),
                None => problems.push(format!(
                    "check '{id}': cannot classify pass condition '{rest}'"
                )),
            }
        } else if let Some((rest, _)) = item.field("fail") {
            fail_text = rest;
        } else if let Some((rest, codes)) = item.field("fix") {
            fix_text = rest;
            fix_codes = codes.to_vec();
        }
    }

    let mut missing = Vec::new();
    if target.is_none() {
        missing.push("Target");
    }
    if pattern.is_none() {
        missing.push("Detect");
    }
    if pass.is_none() {
        missing.push("Pass");
    }
    if !missing.is_empty() {
        problems.push(format!("check '{id}': missing field(s) {}", missing.join(", ")));
        return None;
    }

    let fix_action = FixAction::classify(&fix_text, &fix_codes);
    Some(Check {
        id: id.to_string(),
        target: target.unwrap(),
        pattern: pattern.unwrap(),
        engine,
        pass: pass.unwrap(),
        fail_text,
        fix_text,
        fix_action,
    })
}

fn parse_exceptions(sections: &[Section], problems: &mut Vec<String>) -> Vec<Exception> {
    let Some(section) = find_section(sections, "Exceptions") else {
        problems.push("missing required section: Exceptions".to_string());
        return Vec::new();
    };
    let mut out = Vec::new();
    for item in &section.items {
        match parse_exception(item) {
            Ok(e) => out.push(e),
            Err(msg) => problems.push(msg),
        }
    }
    if out.len() < 2 {
        problems.push(format!(
            "Exceptions must list at least 2 entries, found {}",
            out.len()
        ));
    }
    out
}

fn parse_exception(item: &Item) -> Result<Exception, String> {
    let text = item.text.trim();
    let keyword = text
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let Some(code) = item.codes.first() else {
        return Err(format!(
            "exception '{text}' must name its subject in backticks"
        ));
    };
    let reason = text
        .rsplit_once(" - ")
        .map(|(_, r)| r.trim().to_string())
        .unwrap_or_default();
    match keyword.as_str() {
        "path" => Exception::path(code, &reason).map_err(|e| e.to_string()),
        "directory" | "dir" => Ok(Exception::directory(code, &reason)),
        "line" => Exception::line(code, &reason).map_err(|e| e.to_string()),
        _ => Err(format!(
            "exception '{text}' must start with Path, Directory, or Line"
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) const VALID_DOC: &str = r#"---
name: verify-imports
description: Keep import hygiene consistent
trigger: After editing module imports
auto: true
---

# verify-imports

## Purpose

- **Consistency**: imports follow one style across the tree.
- **Clarity**: no wildcard imports hiding provenance.

## When to Run

- After adding a module
- After moving code between crates
- Before opening a review

## Related Files

| Path | Purpose |
| ---- | ------- |
| src/ | library sources |
| src/lib.rs | module exports |

## Workflow

### 1. no-wildcards

- Target: `src/**/*.rs`
- Detect: `use .*::\*;` (regex)
- Pass: no matches
- Fail: a wildcard import is present
- Fix: replace with explicit imports

### 2. lib-exists

- Target: `src/lib.rs`
- Detect: `pub mod`
- Pass: at least one match
- Fail: the crate root exports no modules
- Fix: add `pub mod` declarations to src/lib.rs

## Output Format

| # | Check | Target | Status | Details |
| - | ----- | ------ | ------ | ------- |

## Exceptions

- Path `tests/**` - test code is exempt
- Line matching `#\[allow\(` - explicitly waived
"#;

    #[test]
    fn parses_valid_document() {
        let skill = Skill::parse(VALID_DOC, Path::new("skills/verify-imports.md")).unwrap();
        assert_eq!(skill.name, "verify-imports");
        assert!(skill.auto);
        assert_eq!(skill.trigger.as_deref(), Some("After editing module imports"));
        assert_eq!(skill.purpose.len(), 2);
        assert_eq!(skill.triggers.len(), 3);
        assert_eq!(skill.related_files.len(), 2);
        assert_eq!(skill.checks.len(), 2);
        assert_eq!(skill.exceptions.len(), 2);
    }

    #[test]
    fn check_fields_parsed() {
        let skill = Skill::parse(VALID_DOC, Path::new("skills/verify-imports.md")).unwrap();
        let c = &skill.checks[0];
        assert_eq!(c.id, "no-wildcards");
        assert_eq!(c.target, "src/**/*.rs");
        assert_eq!(c.engine, Engine::Regex);
        assert_eq!(c.pass, PassCondition::Absence);
        assert!(c.fail_text.contains("wildcard"));

        let c2 = &skill.checks[1];
        assert_eq!(c2.engine, Engine::Literal);
        assert_eq!(c2.pass, PassCondition::Presence);
        assert!(matches!(c2.fix_action, FixAction::Append { .. }));
    }

    #[test]
    fn missing_section_is_definition_error() {
        let doc = VALID_DOC.replace("## Workflow", "## Steps");
        let err = Skill::parse(&doc, Path::new("skills/verify-imports.md")).unwrap_err();
        assert!(err.iter().any(|p| p.contains("Workflow")));
    }

    #[test]
    fn too_few_exceptions_rejected() {
        let doc = VALID_DOC.replace("- Line matching `#\\[allow\\(` - explicitly waived\n", "");
        let err = Skill::parse(&doc, Path::new("skills/verify-imports.md")).unwrap_err();
        assert!(err.iter().any(|p| p.contains("at least 2")));
    }

    #[test]
    fn name_mismatch_rejected() {
        let err = Skill::parse(VALID_DOC, Path::new("skills/verify-other.md")).unwrap_err();
        assert!(err.iter().any(|p| p.contains("does not match file name")));
    }

    #[test]
    fn bad_prefix_rejected() {
        let doc = VALID_DOC.replace("name: verify-imports", "name: check-imports");
        let err = Skill::parse(&doc, Path::new("skills/check-imports.md")).unwrap_err();
        assert!(err.iter().any(|p| p.contains("verify-")));
    }

    #[test]
    fn no_frontmatter_rejected() {
        let err = Skill::parse("# no header\n", Path::new("skills/verify-x.md")).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err[0].contains("frontmatter"));
    }

    #[test]
    fn unclassifiable_pass_condition_reported() {
        let doc = VALID_DOC.replace("- Pass: no matches", "- Pass: vibes");
        let err = Skill::parse(&doc, Path::new("skills/verify-imports.md")).unwrap_err();
        assert!(err.iter().any(|p| p.contains("cannot classify")));
    }

    #[test]
    fn coverage_warnings_for_missing_related_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        let skill = Skill::parse(VALID_DOC, Path::new("skills/verify-imports.md")).unwrap();
        assert!(skill.coverage_warnings(dir.path()).is_empty());

        std::fs::remove_file(dir.path().join("src/lib.rs")).unwrap();
        let warnings = skill.coverage_warnings(dir.path());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("src/lib.rs"));
    }

    #[test]
    fn coverage_by_related_prefix_and_target_glob() {
        let skill = Skill::parse(VALID_DOC, Path::new("skills/verify-imports.md")).unwrap();
        assert!(skill.covers(Path::new("src/deep/module.rs")));
        assert!(skill.covers(Path::new("src/lib.rs")));
        assert!(!skill.covers(Path::new("docs/readme.md")));
    }
}
