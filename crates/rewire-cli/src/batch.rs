use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use rewire_refactor::{generate_preview, MigrationReport, Migrator};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Write changed files back to disk.
    pub write: bool,
    /// Attach a unified diff to every changed file.
    pub diff: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    pub changed: bool,
    pub written: bool,
    pub report: MigrationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub files: usize,
    pub changed_files: usize,
    pub rewritten_calls: usize,
    pub skipped_calls: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileResult>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn any_changed(&self) -> bool {
        self.summary.changed_files > 0
    }
}

/// Migrates `files` in parallel. Results keep the input order.
///
/// The first I/O or introspection failure aborts the batch; files already
/// written stay written.
pub fn migrate_files(
    migrator: &Migrator<'_>,
    files: &[PathBuf],
    options: BatchOptions,
) -> Result<BatchReport> {
    let results = files
        .par_iter()
        .map(|path| migrate_file(migrator, path, options))
        .collect::<Result<Vec<_>>>()?;

    let summary = results.iter().fold(
        BatchSummary {
            files: results.len(),
            ..BatchSummary::default()
        },
        |mut summary, result| {
            summary.changed_files += usize::from(result.changed);
            summary.rewritten_calls += result.report.rewritten.len();
            summary.skipped_calls += result.report.skipped.len();
            summary
        },
    );
    tracing::info!(
        target: "rewire.cli",
        files = summary.files,
        changed = summary.changed_files,
        rewritten = summary.rewritten_calls,
        skipped = summary.skipped_calls,
        "batch finished"
    );

    Ok(BatchReport {
        files: results,
        summary,
    })
}

fn migrate_file(migrator: &Migrator<'_>, path: &Path, options: BatchOptions) -> Result<FileResult> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let outcome = migrator
        .migrate_source(&source)
        .with_context(|| format!("failed to migrate {}", path.display()))?;

    let written = options.write && outcome.changed;
    if written {
        fs::write(path, &outcome.output)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    let diff = options
        .diff
        .then(|| generate_preview(&display_path(path), &source, &outcome))
        .flatten()
        .map(|preview| preview.unified_diff);

    tracing::debug!(
        target: "rewire.cli",
        path = %path.display(),
        rewritten = outcome.report.rewritten.len(),
        skipped = outcome.report.skipped.len(),
        written,
        "processed file"
    );

    Ok(FileResult {
        path: path.to_path_buf(),
        changed: outcome.changed,
        written,
        report: outcome.report,
        diff,
    })
}

/// Forward-slash path used in diff headers.
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewire_refactor::CatalogOptions;
    use rewire_test_utils::test_introspector;

    const LEGACY: &str = "<?php\nuse Google\\Cloud\\Dlp\\V2\\DlpServiceClient;\n\n$dlp = new DlpServiceClient();\n$dlp->getDlpJob('jobs/1');\n";

    #[test]
    fn dry_run_reports_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("legacy.php");
        let clean = dir.path().join("clean.php");
        fs::write(&legacy, LEGACY).unwrap();
        fs::write(&clean, "<?php\necho 1;\n").unwrap();

        let types = test_introspector();
        let migrator = Migrator::new(&types, CatalogOptions::default()).unwrap();
        let report = migrate_files(
            &migrator,
            &[clean.clone(), legacy.clone()],
            BatchOptions {
                write: false,
                diff: true,
            },
        )
        .unwrap();

        assert_eq!(
            report.summary,
            BatchSummary {
                files: 2,
                changed_files: 1,
                rewritten_calls: 1,
                skipped_calls: 0,
            }
        );
        assert_eq!(report.files[0].path, clean);
        assert!(report.files[0].diff.is_none());
        let diff = report.files[1].diff.as_deref().unwrap();
        assert!(diff.contains("+$getDlpJobRequest = (new GetDlpJobRequest())"), "{diff}");
        assert_eq!(fs::read_to_string(&legacy).unwrap(), LEGACY);
    }

    #[test]
    fn write_mode_updates_changed_files() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("legacy.php");
        fs::write(&legacy, LEGACY).unwrap();

        let types = test_introspector();
        let migrator = Migrator::new(&types, CatalogOptions::default()).unwrap();
        let report = migrate_files(
            &migrator,
            &[legacy.clone()],
            BatchOptions {
                write: true,
                diff: false,
            },
        )
        .unwrap();

        assert!(report.files[0].written);
        let text = fs::read_to_string(&legacy).unwrap();
        assert!(text.contains("$dlp->getDlpJob($getDlpJobRequest);"), "{text}");
    }
}
