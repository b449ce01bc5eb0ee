use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

const BEFORE_SUFFIX: &str = ".before.php";
const AFTER_SUFFIX: &str = ".after.php";

/// A `<name>.before.php` / `<name>.after.php` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixturePair {
    pub name: String,
    pub before_path: PathBuf,
    pub after_path: PathBuf,
    pub before: String,
    /// `None` when the expected file has not been written yet.
    pub after: Option<String>,
}

/// Names of all fixture pairs in `dir`, sorted.
pub fn fixture_names(dir: &Path) -> Vec<String> {
    let entries = fs::read_dir(dir)
        .unwrap_or_else(|err| panic!("failed to read fixture dir {}: {err}", dir.display()));
    let mut names: Vec<String> = entries
        .filter_map(|entry| {
            let name = entry.ok()?.file_name().into_string().ok()?;
            name.strip_suffix(BEFORE_SUFFIX).map(str::to_owned)
        })
        .collect();
    names.sort();
    names
}

pub fn load_fixture_pair(dir: &Path, name: &str) -> FixturePair {
    let before_path = dir.join(format!("{name}{BEFORE_SUFFIX}"));
    let after_path = dir.join(format!("{name}{AFTER_SUFFIX}"));
    let before = fs::read_to_string(&before_path)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", before_path.display()));
    let after = fs::read_to_string(&after_path).ok();
    FixturePair {
        name: name.to_owned(),
        before_path,
        after_path,
        before,
        after,
    }
}

/// Runs `transform` on the `before` text of a fixture pair and compares the
/// result with the `after` text.
///
/// With `BLESS=1` the `after` file is (re)written instead of failing.
pub fn assert_fixture_pair(dir: &Path, name: &str, transform: impl FnOnce(&str) -> String) {
    let pair = load_fixture_pair(dir, name);
    let actual = transform(&pair.before);

    match &pair.after {
        Some(expected) if *expected == actual => {}
        _ if bless_enabled() => {
            tracing::info!(fixture = %name, path = %pair.after_path.display(), "blessing fixture");
            fs::write(&pair.after_path, &actual).unwrap_or_else(|err| {
                panic!("failed to write fixture {}: {err}", pair.after_path.display())
            });
        }
        Some(expected) => assert_eq!(
            actual,
            *expected,
            "fixture {name} differs (run with `BLESS=1` to update)"
        ),
        None => panic!(
            "missing expected fixture {} (run with `BLESS=1` to write it)",
            pair.after_path.display()
        ),
    }
}

pub fn bless_enabled() -> bool {
    let Ok(val) = env::var("BLESS") else {
        return false;
    };
    let val = val.trim().to_ascii_lowercase();
    !(val.is_empty() || val == "0" || val == "false")
}
