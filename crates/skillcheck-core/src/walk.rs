use crate::error::Result;
use std::path::{Path, PathBuf};

/// Directory names never scanned by check evaluation.
const SKIP_DIRS: &[&str] = &["target", "node_modules"];

/// Walk the project tree and return file paths relative to `root`, sorted
/// for deterministic evaluation order. Hidden directories (including
/// `.git` and `.skillcheck`) and build output are skipped.
pub fn walk_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_into(root, Path::new(""), &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_into(root: &Path, rel: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let dir = root.join(rel);
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        let child = rel.join(&name);
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if name_str.starts_with('.') || SKIP_DIRS.contains(&name_str.as_ref()) {
                continue;
            }
            walk_into(root, &child, files)?;
        } else if file_type.is_file() {
            if name_str.starts_with('.') {
                continue;
            }
            files.push(child);
        }
    }
    Ok(())
}
