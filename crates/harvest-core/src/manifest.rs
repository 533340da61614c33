//! `.manifest.json`: which URL each downloaded file came from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const MANIFEST_FILE_NAME: &str = ".manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub url: String,
    #[serde(default)]
    pub job_id: String,
    /// SHA-256 of the stored page.
    pub content_hash: String,
    pub downloaded_at: String,
}

/// File name → source entry for one download directory.
#[derive(Debug, Clone, Default)]
pub struct DownloadManifest {
    path: PathBuf,
    entries: BTreeMap<String, ManifestEntry>,
}

impl DownloadManifest {
    /// Load the manifest of `dir`; a missing manifest is empty.
    pub fn load(dir: &Path) -> Result<Self, AppError> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| {
                AppError::InputError(format!("Invalid manifest {}: {e}", path.display()))
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn get(&self, file_name: &str) -> Option<&ManifestEntry> {
        self.entries.get(file_name)
    }

    pub fn source_url(&self, file_name: &str) -> Option<&str> {
        self.get(file_name).map(|e| e.url.as_str())
    }

    pub fn record(&mut self, file_name: impl Into<String>, entry: ManifestEntry) {
        self.entries.insert(file_name.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str) -> ManifestEntry {
        ManifestEntry {
            url: url.into(),
            job_id: "1".into(),
            content_hash: "abc".into(),
            downloaded_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = DownloadManifest::load(dir.path()).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = DownloadManifest::load(dir.path()).unwrap();
        manifest.record("1_jobs_1.html", entry("https://example.com/jobs/1"));
        manifest.save().unwrap();

        let reloaded = DownloadManifest::load(dir.path()).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(
            reloaded.source_url("1_jobs_1.html"),
            Some("https://example.com/jobs/1")
        );
        assert_eq!(reloaded.source_url("other.html"), None);
    }

    #[test]
    fn corrupt_manifest_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE_NAME), "[").unwrap();
        assert!(matches!(
            DownloadManifest::load(dir.path()),
            Err(AppError::InputError(_))
        ));
    }
}
