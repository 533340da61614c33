pub mod extractor;
pub mod fetcher;
pub mod fields;
pub mod html;
pub mod listing;
pub mod navigator;
pub mod next_page;
pub mod robots;

#[cfg(feature = "browser")]
pub mod browser_navigator;

pub use extractor::JobPageExtractor;
pub use fetcher::{DEFAULT_USER_AGENT, ReqwestFetcher};
pub use listing::SelectorListingParser;
pub use navigator::HttpNavigator;
pub use next_page::{ControlStateProbe, ResultCountCheck};
pub use robots::RobotsGuard;

#[cfg(feature = "browser")]
pub use browser_navigator::BrowserNavigator;
