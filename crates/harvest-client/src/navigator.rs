use harvest_core::error::AppError;
use harvest_core::traits::{Fetcher, PageNavigator, RenderedPage};

/// Navigator for server-rendered listings: a page is whatever the fetcher
/// returns.
#[derive(Clone)]
pub struct HttpNavigator<F: Fetcher> {
    fetcher: F,
}

impl<F: Fetcher> HttpNavigator<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

impl<F: Fetcher> PageNavigator for HttpNavigator<F> {
    async fn open(&self, url: &str) -> Result<RenderedPage, AppError> {
        let html = self.fetcher.fetch(url).await?;
        Ok(RenderedPage {
            url: url.to_string(),
            html,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::testutil::MockFetcher;

    #[tokio::test]
    async fn wraps_fetched_html() {
        let fetcher = MockFetcher::new("<html>listing</html>");
        let navigator = HttpNavigator::new(fetcher.clone());
        let page = navigator.open("https://example.com/jobs?page=2").await.unwrap();
        assert_eq!(page.url, "https://example.com/jobs?page=2");
        assert_eq!(page.html, "<html>listing</html>");
        assert_eq!(fetcher.requested(), vec!["https://example.com/jobs?page=2"]);
    }

    #[tokio::test]
    async fn propagates_fetch_errors() {
        let navigator = HttpNavigator::new(MockFetcher::with_error(AppError::Timeout(30)));
        assert!(matches!(
            navigator.open("https://example.com").await,
            Err(AppError::Timeout(30))
        ));
    }
}
