//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests. All mocks use
//! `Arc<Mutex<_>>` so clones share state and tests can assert on recorded
//! calls.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{AppError, ExtractionFailure};
use crate::frontier::{CrawlEvent, CrawlReporter};
use crate::models::{FrontierState, RawJobStub};
use crate::record::NormalizedJobRecord;
use crate::traits::{
    Fetcher, FrontierStore, ListingParser, NextPage, NextPageCheck, PageNavigator,
    RecordExtractor, RenderedPage,
};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher returning queued responses, then a default page.
#[derive(Clone)]
pub struct MockFetcher {
    responses: Arc<Mutex<VecDeque<Result<String, AppError>>>>,
    requested: Arc<Mutex<Vec<String>>>,
    fallback: Option<String>,
}

impl MockFetcher {
    /// Always answers with `html`.
    pub fn new(html: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requested: Arc::new(Mutex::new(Vec::new())),
            fallback: Some(html.to_string()),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    /// Answers from the queue, then with a default page.
    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            requested: Arc::new(Mutex::new(Vec::new())),
            fallback: None,
        }
    }

    pub fn call_count(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        if let Some(html) = &self.fallback {
            return Ok(html.clone());
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("<html><body>default</body></html>".to_string()))
    }
}

// ---------------------------------------------------------------------------
// MockNavigator
// ---------------------------------------------------------------------------

/// Serves a fixed number of pages, then fails with a network error.
#[derive(Clone)]
pub struct MockNavigator {
    remaining: Arc<Mutex<usize>>,
    opened: Arc<Mutex<Vec<String>>>,
}

impl MockNavigator {
    pub fn new(pages: usize) -> Self {
        Self {
            remaining: Arc::new(Mutex::new(pages)),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// URLs opened successfully, in order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl PageNavigator for MockNavigator {
    async fn open(&self, url: &str) -> Result<RenderedPage, AppError> {
        let mut remaining = self.remaining.lock().unwrap();
        if *remaining == 0 {
            return Err(AppError::NetworkError(format!("no page scripted for {url}")));
        }
        *remaining -= 1;
        self.opened.lock().unwrap().push(url.to_string());
        Ok(RenderedPage {
            url: url.to_string(),
            html: "<html><body></body></html>".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// MockListingParser
// ---------------------------------------------------------------------------

/// Returns one scripted stub list per call; empty once the script runs out.
#[derive(Clone)]
pub struct MockListingParser {
    pages: Arc<Mutex<VecDeque<Vec<RawJobStub>>>>,
}

impl MockListingParser {
    pub fn with_pages(pages: Vec<Vec<RawJobStub>>) -> Self {
        Self {
            pages: Arc::new(Mutex::new(pages.into())),
        }
    }
}

impl ListingParser for MockListingParser {
    fn parse(&self, _html: &str, page_url: &str) -> Vec<RawJobStub> {
        let mut stubs = self.pages.lock().unwrap().pop_front().unwrap_or_default();
        for stub in &mut stubs {
            stub.source_url = page_url.to_string();
        }
        stubs
    }
}

// ---------------------------------------------------------------------------
// ScriptedCheck
// ---------------------------------------------------------------------------

/// Next-page check answering from a script, then with a fixed value.
pub struct ScriptedCheck {
    script: Mutex<VecDeque<NextPage>>,
    then: NextPage,
}

impl ScriptedCheck {
    pub fn new(script: Vec<NextPage>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            then: NextPage::Exhausted,
        }
    }

    pub fn always(answer: NextPage) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            then: answer,
        }
    }
}

impl NextPageCheck for ScriptedCheck {
    fn check(&self, _page: &RenderedPage, _page_number: u32) -> NextPage {
        self.script.lock().unwrap().pop_front().unwrap_or(self.then)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// MockFrontierStore
// ---------------------------------------------------------------------------

/// In-memory frontier store.
#[derive(Clone, Default)]
pub struct MockFrontierStore {
    saved: Arc<Mutex<Vec<FrontierState>>>,
}

impl MockFrontierStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    pub fn last_saved(&self) -> Option<FrontierState> {
        self.saved.lock().unwrap().last().cloned()
    }
}

impl FrontierStore for MockFrontierStore {
    fn save(&self, state: &FrontierState) -> Result<(), AppError> {
        self.saved.lock().unwrap().push(state.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<FrontierState>, AppError> {
        Ok(self.last_saved().map(FrontierState::reindex))
    }
}

// ---------------------------------------------------------------------------
// MockRecordExtractor
// ---------------------------------------------------------------------------

type ExtractResult = Result<NormalizedJobRecord, ExtractionFailure>;

/// Returns scripted results and records `(file_name, source_url)` per call.
#[derive(Clone)]
pub struct MockRecordExtractor {
    results: Arc<Mutex<VecDeque<ExtractResult>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockRecordExtractor {
    pub fn with_results(results: Vec<ExtractResult>) -> Self {
        Self {
            results: Arc::new(Mutex::new(results.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl RecordExtractor for MockRecordExtractor {
    fn extract(&self, _html: &str, source_url: &str, file_name: &str) -> ExtractResult {
        self.calls
            .lock()
            .unwrap()
            .push((file_name.to_string(), source_url.to_string()));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ExtractionFailure::MissingField { field: "job_id" }))
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Crawl reporter that keeps a short text line per event.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl CrawlReporter for RecordingReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        let line = match event {
            CrawlEvent::Started { start_page, .. } => format!("started:{start_page}"),
            CrawlEvent::PageStarted { page, .. } => format!("page_started:{page}"),
            CrawlEvent::PageCrawled { page, new, .. } => format!("page_crawled:{page}:{new}"),
            CrawlEvent::NavigationFailed { page, .. } => format!("navigation_failed:{page}"),
            CrawlEvent::Stopped { reason, .. } => format!("stopped:{reason}"),
        };
        self.events.lock().unwrap().push(line);
    }
}
