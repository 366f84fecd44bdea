use anyhow::Context;
use skillcheck_core::config::Config;
use skillcheck_core::io::{ensure_dir, write_if_missing};
use skillcheck_core::paths;
use std::path::Path;

const RUNNER_INDEX: &str = "skills/INDEX.md";
const CATALOG_INDEX: &str = "docs/SKILLS.md";
const GUIDELINE_INDEX: &str = "GUIDELINES.md";

pub fn run(root: &Path) -> anyhow::Result<()> {
    ensure_dir(&paths::skillcheck_dir(root)).context("failed to create .skillcheck/")?;
    ensure_dir(&root.join(paths::DEFAULT_SKILLS_DIR)).context("failed to create skills/")?;
    ensure_dir(&root.join("docs")).context("failed to create docs/")?;

    let mut config = Config::new(project_name(root));
    config.index_documents = vec![
        RUNNER_INDEX.to_string(),
        CATALOG_INDEX.to_string(),
        GUIDELINE_INDEX.to_string(),
    ];

    let config_path = paths::config_path(root);
    if config_path.exists() {
        println!("already initialized: {}", config_path.display());
        return Ok(());
    }
    config.save(root).context("failed to write config")?;

    // Starter skill plus the three index documents it is listed in.
    let starter = "verify-todos";
    write_if_missing(
        &paths::skill_doc_path(root, paths::DEFAULT_SKILLS_DIR, starter),
        STARTER_SKILL.as_bytes(),
    )?;

    let entry = format!("- {starter}: No stray TODO markers in finished work\n");
    write_if_missing(
        &root.join(RUNNER_INDEX),
        format!("# Skills run by skillcheck\n\n{entry}").as_bytes(),
    )?;
    write_if_missing(
        &root.join(CATALOG_INDEX),
        format!("# Skill catalog\n\n{entry}").as_bytes(),
    )?;
    write_if_missing(
        &root.join(GUIDELINE_INDEX),
        format!("# Project guidelines\n\n## Verification skills\n\n{entry}").as_bytes(),
    )?;

    println!("initialized skillcheck in {}", root.display());
    println!("  config: {}", config_path.display());
    println!("  starter skill: skills/{starter}.md");
    Ok(())
}

fn project_name(root: &Path) -> String {
    root.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project")
        .to_string()
}

const STARTER_SKILL: &str = r#"---
name: verify-todos
description: No stray TODO markers in finished work
trigger: Before committing or opening a review
auto: true
---

# verify-todos

## Purpose

- **Hygiene**: finished work carries no TODO markers.
- **Traceability**: outstanding work lives in the tracker, not in comments.

## When to Run

- Before committing
- Before opening a review
- After resolving review feedback

## Related Files

| Path | Purpose |
| ---- | ------- |
| src/ | project sources |

## Workflow

### 1. no-todo

- Target: `src/**`
- Detect: `TODO`
- Pass: no matches
- Fail: a TODO marker is present in finished work
- Fix: move the item to the tracker and delete the line

## Output Format

| # | Check | Target | Status | Details |
| - | ----- | ------ | ------ | ------- |

## Exceptions

- Path `src/fixtures/**` - fixture data may carry markers
- Line matching `skillcheck:allow` - explicitly waived

"#;
