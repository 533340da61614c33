use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::PaginationConfig;

/// A shallow job reference harvested from a listing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawJobStub {
    pub url: String,
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub job_type: String,
    #[serde(default)]
    pub posted_date: String,
    #[serde(default)]
    pub company: String,
    /// Listing page the stub was found on.
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
}

/// Running state of one crawl session. Serialized as the frontier artifact.
///
/// The unique-URL index is rebuilt from `jobs` on load, so an artifact
/// written by an earlier run can be resumed directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontierState {
    pub source_url: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub total_jobs: usize,
    #[serde(default)]
    pub total_pages_crawled: u32,
    /// Total pages estimated from a result-count banner, when one was seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages_attempted: Option<u32>,
    #[serde(default)]
    pub extraction_timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationConfig>,
    #[serde(default)]
    pub visited_pages: BTreeSet<u32>,
    #[serde(default)]
    pub consecutive_empty_pages: u32,
    #[serde(default)]
    pub jobs: Vec<RawJobStub>,
    #[serde(skip)]
    unique_urls: HashSet<String>,
}

impl FrontierState {
    pub fn new(source_url: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            company_name: company_name.into(),
            ..Default::default()
        }
    }

    /// Rebuild the unique-URL index after deserialization.
    ///
    /// Stubs repeating an earlier URL are dropped so the restored state
    /// upholds the same uniqueness invariant as a live one.
    pub fn reindex(mut self) -> Self {
        let jobs = std::mem::take(&mut self.jobs);
        self.unique_urls.clear();
        for stub in jobs {
            self.insert_stub(stub);
        }
        self.total_jobs = self.jobs.len();
        self
    }

    /// Append a stub unless its URL was already seen. Returns true if inserted.
    pub fn insert_stub(&mut self, stub: RawJobStub) -> bool {
        if self.unique_urls.contains(&stub.url) {
            return false;
        }
        self.unique_urls.insert(stub.url.clone());
        self.jobs.push(stub);
        true
    }

    /// Record one crawled page: merge its stubs and update the counters.
    ///
    /// Returns the number of stubs that were new to this session.
    pub fn merge_page(&mut self, page: u32, stubs: Vec<RawJobStub>) -> usize {
        let mut new_count = 0;
        for stub in stubs {
            if self.insert_stub(stub) {
                new_count += 1;
            }
        }

        if new_count == 0 {
            self.consecutive_empty_pages += 1;
        } else {
            self.consecutive_empty_pages = 0;
        }

        self.visited_pages.insert(page);
        self.total_pages_crawled += 1;
        self.total_jobs = self.jobs.len();
        self.extraction_timestamp = Utc::now().to_rfc3339();
        new_count
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.unique_urls.contains(url)
    }

    pub fn unique_count(&self) -> usize {
        self.unique_urls.len()
    }
}

/// A job that passed URL validation, carrying its canonical identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatedJob {
    pub url: String,
    pub job_id: String,
    #[serde(default)]
    pub team: String,
    /// Title recovered from the URL slug, title-cased.
    #[serde(default)]
    pub job_title: String,
    /// Title shown on the listing page, if any.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub job_type: String,
    #[serde(default)]
    pub posted_date: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
    #[serde(default)]
    pub extracted_fields: IndexMap<String, String>,
}

impl ValidatedJob {
    pub fn from_stub(stub: RawJobStub, extracted_fields: IndexMap<String, String>) -> Self {
        let field = |name: &str| extracted_fields.get(name).cloned().unwrap_or_default();
        Self {
            job_id: field("job_id"),
            team: field("team"),
            job_title: field("job_title"),
            url: stub.url,
            title: stub.title,
            location: stub.location,
            department: stub.department,
            job_type: stub.job_type,
            posted_date: stub.posted_date,
            company: stub.company,
            source_url: stub.source_url,
            metadata: stub.metadata,
            extracted_fields,
        }
    }
}

/// Counters emitted by the validation/deduplication pass.
///
/// Always satisfies `original = valid + invalid` and `valid = final + duplicate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub original_count: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub duplicate_count: usize,
    pub final_count: usize,
}

impl ProcessingStats {
    pub fn is_consistent(&self) -> bool {
        self.original_count == self.valid_count + self.invalid_count
            && self.valid_count == self.final_count + self.duplicate_count
    }
}

/// The validated-jobs artifact written by `harvest validate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatedJobsArtifact {
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub original_total_jobs: usize,
    #[serde(default)]
    pub processed_total_jobs: usize,
    #[serde(default)]
    pub processing_stats: ProcessingStats,
    #[serde(default)]
    pub processing_timestamp: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub total_pages_crawled: u32,
    pub jobs: Vec<ValidatedJob>,
}

/// A job page fetched from the network and written to the download directory.
#[derive(Debug, Clone)]
pub struct DownloadedPage {
    pub url: String,
    pub job_id: String,
    pub file_name: String,
    pub content: String,
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
