use std::future::Future;

use crate::error::{AppError, ExtractionFailure};
use crate::models::{FrontierState, RawJobStub};
use crate::record::NormalizedJobRecord;

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// A listing page after navigation and rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Final URL after redirects.
    pub url: String,
    pub html: String,
}

/// Opens a listing page and waits until its job table is rendered.
pub trait PageNavigator: Send + Sync + Clone {
    fn open(&self, url: &str) -> impl Future<Output = Result<RenderedPage, AppError>> + Send;
}

/// Turns a rendered listing page into job stubs.
pub trait ListingParser: Send + Sync + Clone {
    /// `page_url` is the URL the page was opened at; stubs record it as their source.
    fn parse(&self, html: &str, page_url: &str) -> Vec<RawJobStub>;
}

/// Outcome of a next-page check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPage {
    Available,
    Exhausted,
    /// The check has no opinion; the next one in the chain decides.
    Unknown,
}

/// One strategy for deciding whether the crawl should continue past `page`.
pub trait NextPageCheck: Send + Sync {
    fn check(&self, page: &RenderedPage, page_number: u32) -> NextPage;

    fn name(&self) -> &'static str;

    /// Total page count, when the strategy can estimate one.
    fn total_pages(&self, _page: &RenderedPage) -> Option<u32> {
        None
    }
}

/// Persists the frontier so an interrupted crawl can resume.
pub trait FrontierStore: Send + Sync + Clone {
    fn save(&self, state: &FrontierState) -> Result<(), AppError>;

    fn load(&self) -> Result<Option<FrontierState>, AppError>;
}

/// Converts one downloaded job page into a normalized record.
pub trait RecordExtractor: Send + Sync + Clone {
    fn extract(
        &self,
        html: &str,
        source_url: &str,
        file_name: &str,
    ) -> Result<NormalizedJobRecord, ExtractionFailure>;
}
