//! Page-by-page discovery of job stubs on a career site.
//!
//! The controller is a plain loop: navigate, parse, decide, persist. Page
//! N+1 is never requested before page N's next-page check has run, since
//! that check reads the rendered state of page N.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{HarvestConfig, PaginationConfig, compile_patterns};
use crate::error::AppError;
use crate::models::FrontierState;
use crate::retry::RetryPolicy;
use crate::traits::{FrontierStore, ListingParser, NextPage, NextPageCheck, PageNavigator};

/// Path fragments that identify a job posting link.
pub const DEFAULT_JOB_URL_PATTERNS: &[&str] = &[
    "/jobs?/",
    "/careers?/",
    "/positions?/",
    "/openings?/",
    "/details/",
    "/listing/",
    "/apply",
];

/// Substrings that rule a link out regardless of the patterns above.
pub const EXCLUDED_URL_FRAGMENTS: &[&str] = &[
    ".pdf",
    ".jpg",
    ".jpeg",
    ".png",
    ".gif",
    "locationpicker",
    "/apply/",
    "/profile/",
    "/search",
    "/filter",
    "javascript:",
    "mailto:",
    "tel:",
];

/// Decides whether a resolved link looks like a job posting.
#[derive(Debug, Clone)]
pub struct JobUrlFilter {
    patterns: Vec<Regex>,
}

impl JobUrlFilter {
    pub fn from_config(config: &HarvestConfig) -> Result<Self, AppError> {
        let patterns = match &config.job_url_patterns {
            Some(patterns) if !patterns.is_empty() => compile_patterns(patterns, "job_url_patterns")?,
            _ => {
                let defaults: Vec<String> =
                    DEFAULT_JOB_URL_PATTERNS.iter().map(|p| p.to_string()).collect();
                compile_patterns(&defaults, "job_url_patterns")?
            }
        };
        Ok(Self { patterns })
    }

    pub fn accepts(&self, url: &str) -> bool {
        let lowered = url.to_lowercase();
        if EXCLUDED_URL_FRAGMENTS.iter().any(|f| lowered.contains(f)) {
            return false;
        }
        self.patterns.iter().any(|re| re.is_match(url))
    }
}

/// URL of listing page `page`. Page 1 is the home URL itself unless the
/// home URL already carries the page parameter.
pub fn build_page_url(home: &Url, page_param: &str, page: u32) -> Url {
    let has_param = home.query_pairs().any(|(k, _)| k == page_param);
    if page <= 1 && !has_param {
        return home.clone();
    }

    let mut pairs: Vec<(String, String)> = home
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    match pairs.iter_mut().find(|(k, _)| k == page_param) {
        Some(pair) => pair.1 = page.to_string(),
        None => pairs.push((page_param.to_string(), page.to_string())),
    }

    let mut url = home.clone();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url
}

/// Why a crawl ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    NoNextPage,
    EmptyPageLimit,
    PageCap,
    PaginationDisabled,
    NavigationFailed(String),
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::NoNextPage => write!(f, "no next page"),
            StopReason::EmptyPageLimit => write!(f, "too many consecutive empty pages"),
            StopReason::PageCap => write!(f, "page cap reached"),
            StopReason::PaginationDisabled => write!(f, "pagination disabled"),
            StopReason::NavigationFailed(e) => write!(f, "navigation failed: {e}"),
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Events emitted by the crawl loop for monitoring/logging.
#[derive(Debug, Clone)]
pub enum CrawlEvent<'a> {
    Started {
        home_url: &'a str,
        start_page: u32,
        resumed_jobs: usize,
    },
    PageStarted {
        page: u32,
        url: &'a str,
    },
    PageCrawled {
        page: u32,
        found: usize,
        new: usize,
        total: usize,
    },
    NavigationFailed {
        page: u32,
        url: &'a str,
        error: &'a str,
    },
    Stopped {
        reason: &'a StopReason,
        total_jobs: usize,
        pages_crawled: u32,
    },
}

/// Receives crawl events (decoupled logging).
pub trait CrawlReporter: Send + Sync {
    fn report(&self, event: CrawlEvent<'_>) {
        let _ = event;
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCrawlReporter;

impl CrawlReporter for TracingCrawlReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        match event {
            CrawlEvent::Started {
                home_url,
                start_page,
                resumed_jobs,
            } => {
                tracing::info!(%home_url, start_page, resumed_jobs, "Crawl started");
            }
            CrawlEvent::PageStarted { page, url } => {
                tracing::info!(page, %url, "Opening listing page");
            }
            CrawlEvent::PageCrawled {
                page,
                found,
                new,
                total,
            } => {
                tracing::info!(page, found, new, total, "Listing page processed");
            }
            CrawlEvent::NavigationFailed { page, url, error } => {
                tracing::error!(page, %url, %error, "Listing page failed");
            }
            CrawlEvent::Stopped {
                reason,
                total_jobs,
                pages_crawled,
            } => {
                tracing::info!(%reason, total_jobs, pages_crawled, "Crawl stopped");
            }
        }
    }
}

/// Result of one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub state: FrontierState,
    pub stop: StopReason,
    pub pages_this_run: u32,
    pub new_stubs: usize,
}

/// Drives pagination over a career site's listing pages.
pub struct FrontierController<N, P, C, S>
where
    N: PageNavigator,
    P: ListingParser,
    C: NextPageCheck,
    S: FrontierStore,
{
    navigator: N,
    parser: P,
    next_check: C,
    store: S,
    pagination: PaginationConfig,
    retry: RetryPolicy,
}

impl<N, P, C, S> FrontierController<N, P, C, S>
where
    N: PageNavigator,
    P: ListingParser,
    C: NextPageCheck,
    S: FrontierStore,
{
    pub fn new(navigator: N, parser: P, next_check: C, store: S, pagination: PaginationConfig) -> Self {
        Self {
            navigator,
            parser,
            next_check,
            store,
            pagination,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Crawl from `start_page` (1 when `None`), merging into `state`.
    ///
    /// The state is persisted after every page, so a failed or cancelled
    /// run can be resumed from the stored artifact.
    pub async fn run<R: CrawlReporter>(
        &self,
        home_url: &Url,
        mut state: FrontierState,
        start_page: Option<u32>,
        cancel_token: &CancellationToken,
        reporter: &R,
    ) -> Result<CrawlOutcome, AppError> {
        let mut page = start_page.unwrap_or(1).max(1);
        state.pagination = Some(self.pagination.clone());
        if state.source_url.is_empty() {
            state.source_url = home_url.to_string();
        }

        reporter.report(CrawlEvent::Started {
            home_url: home_url.as_str(),
            start_page: page,
            resumed_jobs: state.jobs.len(),
        });

        let mut pages_this_run = 0;
        let mut new_stubs = 0;

        let stop = loop {
            if cancel_token.is_cancelled() {
                break StopReason::Cancelled;
            }
            if let Some(max) = self.pagination.max_pages {
                if page > max {
                    break StopReason::PageCap;
                }
            }

            let url = build_page_url(home_url, &self.pagination.page_param, page);
            let url_str = url.to_string();
            reporter.report(CrawlEvent::PageStarted {
                page,
                url: &url_str,
            });

            let rendered = match self
                .retry
                .run(&url_str, || self.navigator.open(&url_str))
                .await
            {
                Ok(rendered) => rendered,
                Err(e) => {
                    let error = e.to_string();
                    reporter.report(CrawlEvent::NavigationFailed {
                        page,
                        url: &url_str,
                        error: &error,
                    });
                    break StopReason::NavigationFailed(error);
                }
            };

            let stubs = self.parser.parse(&rendered.html, &url_str);
            let found = stubs.len();
            let decision = if self.pagination.enabled {
                self.next_check.check(&rendered, page)
            } else {
                NextPage::Exhausted
            };
            if state.total_pages_attempted.is_none() && self.pagination.enabled {
                state.total_pages_attempted = self.next_check.total_pages(&rendered);
            }

            let new = state.merge_page(page, stubs);
            self.store.save(&state)?;
            pages_this_run += 1;
            new_stubs += new;

            reporter.report(CrawlEvent::PageCrawled {
                page,
                found,
                new,
                total: state.total_jobs,
            });

            if !self.pagination.enabled {
                break StopReason::PaginationDisabled;
            }
            if decision != NextPage::Available {
                break StopReason::NoNextPage;
            }
            if state.consecutive_empty_pages >= self.pagination.max_empty_pages {
                tracing::warn!(
                    empty_pages = state.consecutive_empty_pages,
                    "Stopping after consecutive pages without new jobs"
                );
                break StopReason::EmptyPageLimit;
            }

            page += 1;
            let delay = Duration::from_millis(self.pagination.page_delay_ms);
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel_token.cancelled() => break StopReason::Cancelled,
            }
        };

        reporter.report(CrawlEvent::Stopped {
            reason: &stop,
            total_jobs: state.total_jobs,
            pages_crawled: state.total_pages_crawled,
        });

        Ok(CrawlOutcome {
            state,
            stop,
            pages_this_run,
            new_stubs,
        })
    }
}

/// Frontier persisted as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrontierStore for JsonFileStore {
    fn save(&self, state: &FrontierState) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<FrontierState>, AppError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let state: FrontierState = serde_json::from_str(&raw).map_err(|e| {
            AppError::InputError(format!(
                "Invalid frontier artifact {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(Some(state.reindex()))
    }
}
