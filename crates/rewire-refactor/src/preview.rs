use similar::TextDiff;

use crate::report::MigrationOutcome;

/// A changed file as shown by `--diff` and `--dry-run`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePreview {
    pub path: String,
    pub original: String,
    pub modified: String,
    pub unified_diff: String,
    pub rewritten_calls: usize,
}

/// Builds a preview for `outcome`, or `None` when the file is unchanged.
pub fn generate_preview(path: &str, original: &str, outcome: &MigrationOutcome) -> Option<FilePreview> {
    if !outcome.changed {
        return None;
    }
    Some(FilePreview {
        path: path.to_owned(),
        original: original.to_owned(),
        modified: outcome.output.clone(),
        unified_diff: unified_diff(path, original, &outcome.output),
        rewritten_calls: outcome.report.rewritten.len(),
    })
}

/// Unified diff with `a/` and `b/` headers and three lines of context.
pub fn unified_diff(path: &str, original: &str, modified: &str) -> String {
    TextDiff::from_lines(original, modified)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MigrationReport;
    use pretty_assertions::assert_eq;

    #[test]
    fn diff_has_headers_and_hunks() {
        let diff = unified_diff("src/a.php", "<?php\n$a = 1;\n", "<?php\n$a = 2;\n");
        assert_eq!(
            diff,
            "--- a/src/a.php\n+++ b/src/a.php\n@@ -1,2 +1,2 @@\n <?php\n-$a = 1;\n+$a = 2;\n"
        );
    }

    #[test]
    fn unchanged_files_have_no_preview() {
        let outcome = MigrationOutcome {
            output: "<?php\n".to_owned(),
            changed: false,
            report: MigrationReport::default(),
        };
        assert_eq!(generate_preview("a.php", "<?php\n", &outcome), None);
    }
}
