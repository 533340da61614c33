//! robots.txt enforcement as a navigator wrapper.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use harvest_core::error::AppError;
use harvest_core::traits::{Fetcher, PageNavigator, RenderedPage};
use robotstxt::DefaultMatcher;
use url::Url;

/// Product token matched against `User-agent:` lines.
pub const ROBOTS_AGENT: &str = "harvest";

/// Refuses to open pages the site's robots.txt disallows.
///
/// robots.txt is fetched once per origin. An origin whose robots.txt cannot
/// be fetched is treated as allowing everything.
#[derive(Clone)]
pub struct RobotsGuard<N: PageNavigator, F: Fetcher> {
    inner: N,
    fetcher: F,
    agent: String,
    // origin -> robots.txt body (None when unavailable)
    cache: Arc<Mutex<HashMap<String, Option<String>>>>,
}

impl<N: PageNavigator, F: Fetcher> RobotsGuard<N, F> {
    pub fn new(inner: N, fetcher: F) -> Self {
        Self {
            inner,
            fetcher,
            agent: ROBOTS_AGENT.to_string(),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    fn cached(&self, origin: &str) -> Option<Option<String>> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(origin).cloned())
    }

    async fn robots_body(&self, url: &Url) -> Option<String> {
        let origin = url.origin().ascii_serialization();
        if let Some(body) = self.cached(&origin) {
            return body;
        }

        let robots_url = format!("{origin}/robots.txt");
        let body = match self.fetcher.fetch(&robots_url).await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::debug!(url = %robots_url, error = %e, "robots.txt unavailable; allowing all");
                None
            }
        };
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(origin, body.clone());
        }
        body
    }

    pub async fn allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return true;
        };
        match self.robots_body(&parsed).await {
            Some(body) => {
                DefaultMatcher::default().one_agent_allowed_by_robots(&body, &self.agent, url)
            }
            None => true,
        }
    }
}

impl<N: PageNavigator, F: Fetcher> PageNavigator for RobotsGuard<N, F> {
    async fn open(&self, url: &str) -> Result<RenderedPage, AppError> {
        if !self.allowed(url).await {
            tracing::warn!(%url, agent = %self.agent, "Blocked by robots.txt");
            return Err(AppError::Disallowed(url.to_string()));
        }
        self.inner.open(url).await
    }
}
