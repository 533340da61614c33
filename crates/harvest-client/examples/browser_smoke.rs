/// Smoke test for `BrowserNavigator`.
///
/// Launches headless Chromium, renders a listing page, waits for a selector,
/// and runs the next-page chain against the rendered DOM.
///
/// Run with:
///   cargo run -p harvest-client --example browser_smoke --features browser -- [URL] [SELECTOR]
use harvest_client::{BrowserNavigator, DEFAULT_USER_AGENT, next_page};
use harvest_core::config::{PaginationConfig, WaitCondition};
use harvest_core::traits::{NextPageCheck, PageNavigator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "https://example.com".to_string());
    let wait_selector = args.next().unwrap_or_else(|| "h1".to_string());

    let pagination = PaginationConfig {
        enabled: true,
        next_button_selector: Some("a[rel=next], button.next".to_string()),
        next_button_timeout_ms: 2_000,
        ..Default::default()
    };

    println!("Launching headless browser");
    let navigator = BrowserNavigator::launch(DEFAULT_USER_AGENT)
        .await?
        .with_wait_for(Some(WaitCondition::Selector(wait_selector.clone())))
        .with_pagination(&pagination);

    let page = navigator.open(&url).await?;
    anyhow::ensure!(
        page.html.len() > 200,
        "rendered HTML suspiciously short ({} bytes)",
        page.html.len()
    );

    let chain = next_page::from_config(&pagination)?;
    println!(
        "OK: {} bytes rendered, wait selector {wait_selector:?}, next page: {:?}",
        page.html.len(),
        chain.check(&page, 1)
    );
    Ok(())
}
