//! Per-host request spacing for polite downloading.
//!
//! [`ThrottledFetcher`] wraps any [`Fetcher`] and makes sure two requests to
//! the same host are at least `delay` apart. Skipped downloads never reach
//! the fetcher, so they never pay the delay.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::error::AppError;
use crate::traits::Fetcher;

/// Spacing between consecutive requests to one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub delay: Duration,
    /// Upper bound of a random extra wait added to each delay.
    pub jitter: Duration,
}

impl ThrottleConfig {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay from fractional seconds, as given on the command line.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::new(Duration::from_secs_f64(secs.max(0.0)))
    }

    fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            self.delay
        } else {
            self.delay + Duration::from_millis(jitter_ms(self.jitter.as_millis() as u64))
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[derive(Clone)]
pub struct ThrottledFetcher<F> {
    inner: F,
    config: ThrottleConfig,
    /// Earliest instant the next request to each host may start.
    next_slot: Arc<Mutex<HashMap<String, Instant>>>,
}

impl<F: Fetcher> ThrottledFetcher<F> {
    pub fn new(inner: F, config: ThrottleConfig) -> Self {
        Self {
            inner,
            config,
            next_slot: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// `scheme://host:port` of a URL.
    fn host_key(raw: &str) -> Option<String> {
        let url = Url::parse(raw).ok()?;
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(format!("{}://{host}:{port}", url.scheme()))
    }

    /// Reserve the next slot for `host` and sleep until it arrives.
    async fn wait_turn(&self, host: String) {
        let now = Instant::now();
        let start = {
            let mut slots = self.next_slot.lock().await;
            let start = slots.get(&host).copied().filter(|s| *s > now).unwrap_or(now);
            slots.insert(host.clone(), start + self.config.next_delay());
            start
        };

        if start > now {
            tracing::debug!(
                host = %host,
                sleep_ms = (start - now).as_millis() as u64,
                "Spacing request"
            );
            tokio::time::sleep_until(start).await;
        }
    }
}

impl<F: Fetcher> Fetcher for ThrottledFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        if let Some(host) = Self::host_key(url) {
            self.wait_turn(host).await;
        }
        self.inner.fetch(url).await
    }
}

/// Cheap clock-seeded xorshift; jitter only needs to be unpredictable-ish.
fn jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
        | 1;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockFetcher;

    #[test]
    fn host_key_includes_default_port() {
        assert_eq!(
            ThrottledFetcher::<MockFetcher>::host_key("https://jobs.example.com/a?b=1"),
            Some("https://jobs.example.com:443".to_string())
        );
        assert_eq!(
            ThrottledFetcher::<MockFetcher>::host_key("http://localhost:8080/x"),
            Some("http://localhost:8080".to_string())
        );
        assert_eq!(ThrottledFetcher::<MockFetcher>::host_key("not a url"), None);
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let config = ThrottleConfig::new(Duration::from_millis(100))
            .with_jitter(Duration::from_millis(50));
        for _ in 0..50 {
            let d = config.next_delay();
            assert!(d >= Duration::from_millis(100) && d < Duration::from_millis(150));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn same_host_requests_are_spaced() {
        let fetcher = ThrottledFetcher::new(
            MockFetcher::new("<html/>"),
            ThrottleConfig::new(Duration::from_secs(1)),
        );

        let start = Instant::now();
        fetcher.fetch("https://example.com/jobs/1").await.unwrap();
        fetcher.fetch("https://example.com/jobs/2").await.unwrap();
        fetcher.fetch("https://example.com/jobs/3").await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn different_hosts_are_independent() {
        let fetcher = ThrottledFetcher::new(
            MockFetcher::new("<html/>"),
            ThrottleConfig::new(Duration::from_secs(5)),
        );

        let start = Instant::now();
        fetcher.fetch("https://a.example.com/1").await.unwrap();
        fetcher.fetch("https://b.example.com/1").await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let fetcher = ThrottledFetcher::new(
            MockFetcher::with_error(AppError::NetworkError("down".into())),
            ThrottleConfig::new(Duration::ZERO),
        );
        let err = fetcher.fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, AppError::NetworkError(_)));
    }

    #[test]
    fn fractional_seconds() {
        assert_eq!(
            ThrottleConfig::from_secs_f64(1.5).delay,
            Duration::from_millis(1500)
        );
        assert_eq!(ThrottleConfig::from_secs_f64(-2.0).delay, Duration::ZERO);
    }
}
