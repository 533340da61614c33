//! Next-page decisions for the frontier controller.
//!
//! Individual strategies implement [`NextPageCheck`]; [`NextPageChain`] asks
//! them in order and takes the first definite answer. When nobody knows,
//! the crawl stops.

use regex::Regex;

use crate::traits::{NextPage, NextPageCheck, RenderedPage};

/// Stops once `max_pages` pages have been crawled.
#[derive(Debug, Clone, Copy)]
pub struct PageCap {
    pub max_pages: u32,
}

impl NextPageCheck for PageCap {
    fn check(&self, _page: &RenderedPage, page_number: u32) -> NextPage {
        if page_number < self.max_pages {
            NextPage::Available
        } else {
            NextPage::Exhausted
        }
    }

    fn name(&self) -> &'static str {
        "page_cap"
    }

    fn total_pages(&self, _page: &RenderedPage) -> Option<u32> {
        Some(self.max_pages)
    }
}

/// Ordered fallback over several checks.
#[derive(Default)]
pub struct NextPageChain {
    checks: Vec<Box<dyn NextPageCheck>>,
}

impl NextPageChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, check: impl NextPageCheck + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl NextPageCheck for NextPageChain {
    fn check(&self, page: &RenderedPage, page_number: u32) -> NextPage {
        for check in &self.checks {
            match check.check(page, page_number) {
                NextPage::Unknown => continue,
                decided => {
                    tracing::debug!(
                        check = check.name(),
                        page = page_number,
                        decision = ?decided,
                        "Next-page check decided"
                    );
                    return decided;
                }
            }
        }
        NextPage::Exhausted
    }

    fn name(&self) -> &'static str {
        "chain"
    }

    fn total_pages(&self, page: &RenderedPage) -> Option<u32> {
        self.checks.iter().find_map(|c| c.total_pages(page))
    }
}

/// A "first - last of total" results banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultCount {
    pub first: u64,
    pub last: u64,
    pub total: u64,
}

impl ResultCount {
    /// Parse the first banner match in `text`. The regex needs three
    /// groups: first, last and total. Thousands separators are ignored.
    pub fn parse(text: &str, pattern: &Regex) -> Option<Self> {
        let caps = pattern.captures(text)?;
        let number = |i: usize| -> Option<u64> {
            caps.get(i)?.as_str().replace(',', "").trim().parse().ok()
        };
        let count = Self {
            first: number(1)?,
            last: number(2)?,
            total: number(3)?,
        };
        (count.first <= count.last).then_some(count)
    }

    pub fn has_more(&self) -> bool {
        self.last < self.total
    }

    /// Page count implied by the banner, rounded up.
    pub fn total_pages(&self) -> u32 {
        let page_size = self.last - self.first + 1;
        let pages = self.total.div_ceil(page_size.max(1));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_RESULTS_COUNT_PATTERN;

    fn page() -> RenderedPage {
        RenderedPage {
            url: "https://example.com/search?page=1".into(),
            html: String::new(),
        }
    }

    struct Fixed(NextPage);

    impl NextPageCheck for Fixed {
        fn check(&self, _page: &RenderedPage, _n: u32) -> NextPage {
            self.0
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn chain_takes_first_definite_answer() {
        let chain = NextPageChain::new()
            .push(Fixed(NextPage::Unknown))
            .push(Fixed(NextPage::Available))
            .push(Fixed(NextPage::Exhausted));
        assert_eq!(chain.check(&page(), 1), NextPage::Available);
    }

    #[test]
    fn chain_of_unknowns_is_exhausted() {
        let chain = NextPageChain::new().push(Fixed(NextPage::Unknown));
        assert_eq!(chain.check(&page(), 1), NextPage::Exhausted);
        assert_eq!(NextPageChain::new().check(&page(), 1), NextPage::Exhausted);
    }

    #[test]
    fn page_cap_allows_up_to_max() {
        let cap = PageCap { max_pages: 3 };
        assert_eq!(cap.check(&page(), 2), NextPage::Available);
        assert_eq!(cap.check(&page(), 3), NextPage::Exhausted);
        assert_eq!(cap.total_pages(&page()), Some(3));
    }

    #[test]
    fn result_count_banner() {
        let re = Regex::new(DEFAULT_RESULTS_COUNT_PATTERN).unwrap();
        let count = ResultCount::parse("Showing 1 – 20 of 1,234 results", &re).unwrap();
        assert_eq!(
            count,
            ResultCount {
                first: 1,
                last: 20,
                total: 1234
            }
        );
        assert!(count.has_more());
        assert_eq!(count.total_pages(), 62);

        let last = ResultCount::parse("1221 - 1234 of 1,234", &re).unwrap();
        assert!(!last.has_more());
    }

    #[test]
    fn result_count_without_banner() {
        let re = Regex::new(DEFAULT_RESULTS_COUNT_PATTERN).unwrap();
        assert_eq!(ResultCount::parse("No results", &re), None);
    }
}
