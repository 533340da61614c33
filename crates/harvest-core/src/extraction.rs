//! Batch extraction over a directory of downloaded job pages.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::error::{AppError, ExtractionFailure};
use crate::manifest::{DownloadManifest, MANIFEST_FILE_NAME};
use crate::traits::RecordExtractor;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub total: usize,
    pub extracted: usize,
    pub error_pages: usize,
    pub missing_fields: usize,
    /// Records that failed their own invariants.
    pub invalid_records: usize,
    pub io_failures: usize,
    pub cancelled: bool,
}

/// Runs a [`RecordExtractor`] over every `.html` file in a directory and
/// writes one `<stem>.json` per produced record.
pub struct ExtractionService<E: RecordExtractor> {
    extractor: E,
    html_dir: PathBuf,
    output_dir: PathBuf,
}

impl<E: RecordExtractor> ExtractionService<E> {
    pub fn new(extractor: E, html_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            html_dir: html_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    fn html_files(&self) -> Result<Vec<PathBuf>, AppError> {
        if !self.html_dir.is_dir() {
            return Err(AppError::InputError(format!(
                "HTML directory {} does not exist",
                self.html_dir.display()
            )));
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.html_dir)? {
            let path = entry?.path();
            let is_html = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("html"));
            if path.is_file() && is_html {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn run(&self, cancel_token: &CancellationToken) -> Result<ExtractionSummary, AppError> {
        let files = self.html_files()?;
        let manifest = DownloadManifest::load(&self.html_dir)?;
        if manifest.is_empty() {
            tracing::warn!(
                dir = %self.html_dir.display(),
                "No {MANIFEST_FILE_NAME} found; source URLs will be empty"
            );
        }
        std::fs::create_dir_all(&self.output_dir)?;

        let mut summary = ExtractionSummary {
            total: files.len(),
            ..Default::default()
        };
        tracing::info!(total = files.len(), dir = %self.html_dir.display(), "Starting extraction");

        for path in &files {
            if cancel_token.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            self.process_file(path, &manifest, &mut summary);
        }

        tracing::info!(
            extracted = summary.extracted,
            error_pages = summary.error_pages,
            missing_fields = summary.missing_fields,
            "Extraction finished"
        );
        Ok(summary)
    }

    fn process_file(&self, path: &Path, manifest: &DownloadManifest, summary: &mut ExtractionSummary) {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let html = match std::fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::error!(file = %file_name, error = %e, "Failed to read page");
                summary.io_failures += 1;
                return;
            }
        };
        let source_url = manifest.source_url(&file_name).unwrap_or_default();

        let record = match self.extractor.extract(&html, source_url, &file_name) {
            Ok(record) => record,
            Err(failure) => {
                match &failure {
                    ExtractionFailure::ErrorPage { .. } => summary.error_pages += 1,
                    ExtractionFailure::MissingField { .. } => summary.missing_fields += 1,
                }
                tracing::warn!(file = %file_name, reason = %failure, "No record produced");
                return;
            }
        };

        if let Err(reason) = record.validate() {
            tracing::warn!(file = %file_name, %reason, "Record failed validation");
            summary.invalid_records += 1;
            return;
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("record");
        let out_path = self.output_dir.join(format!("{stem}.json"));
        let written = serde_json::to_string_pretty(&record)
            .map_err(AppError::from)
            .and_then(|json| std::fs::write(&out_path, json).map_err(AppError::from));
        match written {
            Ok(()) => {
                tracing::debug!(file = %file_name, job_id = %record.job_id, "Record written");
                summary.extracted += 1;
            }
            Err(e) => {
                tracing::error!(path = %out_path.display(), error = %e, "Failed to write record");
                summary.io_failures += 1;
            }
        }
    }
}
