//! Download job pages to disk, skipping pages already on disk.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::manifest::{DownloadManifest, ManifestEntry};
use crate::models::{DownloadedPage, compute_hash};
use crate::traits::Fetcher;
use crate::util::derive_file_name;

/// One page to download.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DownloadTarget {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub job_id: String,
}

#[derive(Deserialize)]
struct JobList {
    #[serde(default)]
    jobs: Vec<DownloadTarget>,
}

/// Read the `jobs` array of a validated-jobs (or frontier) artifact.
pub fn load_targets(path: &Path) -> Result<Vec<DownloadTarget>, AppError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::InputError(format!("Failed to read job list {}: {e}", path.display()))
    })?;
    let list: JobList = serde_json::from_str(&raw).map_err(|e| {
        AppError::InputError(format!("Invalid job list {}: {e}", path.display()))
    })?;
    Ok(list.jobs)
}

/// What happened to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded { file_name: String },
    /// File already on disk for this URL; no request made.
    AlreadyPresent { file_name: String },
    /// File on disk belongs to a different URL; no request made.
    NameCollision {
        file_name: String,
        existing_url: String,
    },
    /// The server refused the request (4xx).
    Rejected { error: String },
    Failed { error: String },
    MissingUrl,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub total: usize,
    pub downloaded: usize,
    pub skipped_existing: usize,
    pub collisions: usize,
    pub rejected: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl DownloadSummary {
    fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { .. } => self.downloaded += 1,
            DownloadOutcome::AlreadyPresent { .. } => self.skipped_existing += 1,
            DownloadOutcome::NameCollision { .. } => self.collisions += 1,
            DownloadOutcome::Rejected { .. } => self.rejected += 1,
            DownloadOutcome::Failed { .. } | DownloadOutcome::MissingUrl => self.failed += 1,
        }
    }

    /// Pages now present on disk.
    pub fn succeeded(&self) -> usize {
        self.downloaded + self.skipped_existing
    }
}

/// Fetches job pages into an output directory.
///
/// Generic over the fetcher; retries and politeness spacing are layered on
/// by wrapping it in [`RetryingFetcher`](crate::retry::RetryingFetcher) and
/// [`ThrottledFetcher`](crate::throttle::ThrottledFetcher).
pub struct DownloadService<F: Fetcher> {
    fetcher: F,
    output_dir: PathBuf,
}

impl<F: Fetcher> DownloadService<F> {
    pub fn new(fetcher: F, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.into(),
        }
    }

    /// Download every target in order. Per-item failures are logged and
    /// counted; only directory and manifest I/O errors abort the batch.
    pub async fn run(
        &self,
        targets: &[DownloadTarget],
        cancel_token: &CancellationToken,
    ) -> Result<DownloadSummary, AppError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let mut manifest = DownloadManifest::load(&self.output_dir)?;
        let mut summary = DownloadSummary {
            total: targets.len(),
            ..Default::default()
        };

        tracing::info!(total = targets.len(), dir = %self.output_dir.display(), "Starting downloads");

        for (i, target) in targets.iter().enumerate() {
            if cancel_token.is_cancelled() {
                tracing::warn!(done = i, total = targets.len(), "Downloads cancelled");
                summary.cancelled = true;
                break;
            }

            let outcome = tokio::select! {
                outcome = self.download_one(target, &mut manifest) => outcome?,
                () = cancel_token.cancelled() => {
                    summary.cancelled = true;
                    break;
                }
            };
            log_outcome(i + 1, targets.len(), target, &outcome);
            summary.record(&outcome);
        }

        Ok(summary)
    }

    /// Download a single target, updating the manifest on success.
    pub async fn download_one(
        &self,
        target: &DownloadTarget,
        manifest: &mut DownloadManifest,
    ) -> Result<DownloadOutcome, AppError> {
        if target.url.trim().is_empty() {
            return Ok(DownloadOutcome::MissingUrl);
        }

        let file_name = derive_file_name(&target.url, &target.job_id);
        let path = self.output_dir.join(&file_name);

        if path.exists() {
            return Ok(match manifest.get(&file_name) {
                Some(entry) if entry.url != target.url => DownloadOutcome::NameCollision {
                    existing_url: entry.url.clone(),
                    file_name,
                },
                _ => DownloadOutcome::AlreadyPresent { file_name },
            });
        }

        let content = match self.fetcher.fetch(&target.url).await {
            Ok(content) => content,
            Err(e) if e.is_client_rejection() => {
                return Ok(DownloadOutcome::Rejected {
                    error: e.to_string(),
                });
            }
            Err(e) => {
                return Ok(DownloadOutcome::Failed {
                    error: e.to_string(),
                });
            }
        };

        let page = DownloadedPage {
            url: target.url.clone(),
            job_id: target.job_id.clone(),
            file_name,
            content,
        };
        if let Err(e) = write_page(&path, &page.content) {
            return Ok(DownloadOutcome::Failed {
                error: format!("Failed to write {}: {e}", path.display()),
            });
        }

        manifest.record(
            page.file_name.clone(),
            ManifestEntry {
                url: page.url,
                job_id: page.job_id,
                content_hash: compute_hash(&page.content),
                downloaded_at: Utc::now().to_rfc3339(),
            },
        );
        manifest.save()?;

        Ok(DownloadOutcome::Downloaded {
            file_name: page.file_name,
        })
    }
}

/// Write through a temp file so a torn write never shows up under the final
/// name, where it would be taken for a finished download.
fn write_page(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("html.tmp");
    let written = std::fs::write(&tmp, content).and_then(|()| std::fs::rename(&tmp, path));
    if written.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    written
}

fn log_outcome(index: usize, total: usize, target: &DownloadTarget, outcome: &DownloadOutcome) {
    match outcome {
        DownloadOutcome::Downloaded { file_name } => {
            tracing::info!(index, total, url = %target.url, %file_name, "Saved");
        }
        DownloadOutcome::AlreadyPresent { file_name } => {
            tracing::info!(index, total, %file_name, "Already downloaded, skipping");
        }
        DownloadOutcome::NameCollision {
            file_name,
            existing_url,
        } => {
            tracing::warn!(
                index,
                total,
                url = %target.url,
                %existing_url,
                %file_name,
                "File name already used by another URL, skipping"
            );
        }
        DownloadOutcome::Rejected { error } => {
            tracing::warn!(index, total, url = %target.url, %error, "Server rejected request");
        }
        DownloadOutcome::Failed { error } => {
            tracing::error!(index, total, url = %target.url, %error, "Download failed");
        }
        DownloadOutcome::MissingUrl => {
            tracing::warn!(index, total, job_id = %target.job_id, "Job has no URL");
        }
    }
}
