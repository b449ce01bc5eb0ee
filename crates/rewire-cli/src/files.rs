use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

const PHP_EXTENSION: &str = "php";

/// Expands `paths` into the PHP files to process, sorted and deduplicated.
///
/// Files named explicitly are always included; directories are walked
/// recursively for `*.php` files, skipping hidden directories.
pub fn collect_php_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            anyhow::bail!("path does not exist: {}", path.display());
        }
        let walker = WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()));
        for entry in walker {
            let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
            if entry.file_type().is_file() && is_php(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    tracing::debug!(target: "rewire.cli", files = files.len(), "collected php files");
    Ok(files)
}

fn is_php(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PHP_EXTENSION))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn walks_directories_for_php_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("src/a.php"), "<?php").unwrap();
        fs::write(root.join("src/nested/b.PHP"), "<?php").unwrap();
        fs::write(root.join("src/readme.md"), "").unwrap();
        fs::write(root.join(".cache/c.php"), "<?php").unwrap();
        fs::write(root.join("script"), "#!/usr/bin/env php").unwrap();

        let files = collect_php_files(&[root.to_path_buf(), root.join("script")]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["script", "src/a.php", "src/nested/b.PHP"]);
    }

    #[test]
    fn missing_paths_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_php_files(&[dir.path().join("missing")]).is_err());
    }
}
