//! DOM-backed next-page checks.

use harvest_core::config::PaginationConfig;
use harvest_core::error::AppError;
use harvest_core::pagination::{NextPageChain, PageCap, ResultCount};
use harvest_core::traits::{NextPage, NextPageCheck, RenderedPage};
use regex::Regex;
use scraper::{Html, Selector};

use crate::html::{document_text, parse_selector};

/// Reads the state of the "next page" control.
///
/// A missing control says nothing; a present control is exhausted when it
/// carries the disabled attribute or `aria-disabled="true"`.
#[derive(Debug)]
pub struct ControlStateProbe {
    selector: Selector,
    disabled_attribute: String,
}

impl ControlStateProbe {
    pub fn new(selector: &str, disabled_attribute: &str) -> Result<Self, AppError> {
        Ok(Self {
            selector: parse_selector(selector, "pagination.next_button_selector")?,
            disabled_attribute: disabled_attribute.to_string(),
        })
    }
}

impl NextPageCheck for ControlStateProbe {
    fn check(&self, page: &RenderedPage, _page_number: u32) -> NextPage {
        let document = Html::parse_document(&page.html);
        let Some(control) = document.select(&self.selector).next() else {
            return NextPage::Unknown;
        };
        let element = control.value();
        let disabled = element.attr(&self.disabled_attribute).is_some()
            || element
                .attr("aria-disabled")
                .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if disabled {
            NextPage::Exhausted
        } else {
            NextPage::Available
        }
    }

    fn name(&self) -> &'static str {
        "control_state"
    }
}

/// Reads a "1 - 20 of 345" banner from the page text.
#[derive(Debug)]
pub struct ResultCountCheck {
    pattern: Regex,
}

impl ResultCountCheck {
    pub fn new(pattern: Regex) -> Self {
        Self { pattern }
    }

    fn count(&self, page: &RenderedPage) -> Option<ResultCount> {
        let document = Html::parse_document(&page.html);
        ResultCount::parse(&document_text(&document), &self.pattern)
    }
}

impl NextPageCheck for ResultCountCheck {
    fn check(&self, page: &RenderedPage, _page_number: u32) -> NextPage {
        match self.count(page) {
            Some(count) if count.has_more() => NextPage::Available,
            Some(_) => NextPage::Exhausted,
            None => NextPage::Unknown,
        }
    }

    fn name(&self) -> &'static str {
        "result_count"
    }

    fn total_pages(&self, page: &RenderedPage) -> Option<u32> {
        self.count(page).map(|c| c.total_pages())
    }
}

/// The standard chain: control state, then results banner, then page cap.
pub fn from_config(pagination: &PaginationConfig) -> Result<NextPageChain, AppError> {
    let mut chain = NextPageChain::new();
    if let Some(selector) = &pagination.next_button_selector {
        chain = chain.push(ControlStateProbe::new(
            selector,
            &pagination.next_button_disabled_attribute,
        )?);
    }
    chain = chain.push(ResultCountCheck::new(pagination.results_count_regex()?));
    if let Some(max_pages) = pagination.max_pages {
        chain = chain.push(PageCap { max_pages });
    }
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> RenderedPage {
        RenderedPage {
            url: "https://example.com/search".into(),
            html: html.to_string(),
        }
    }

    #[test]
    fn control_state_reads_disabled_markers() {
        let probe = ControlStateProbe::new("button.next", "disabled").unwrap();
        assert_eq!(
            probe.check(&page(r#"<button class="next">Next</button>"#), 1),
            NextPage::Available
        );
        assert_eq!(
            probe.check(&page(r#"<button class="next" disabled>Next</button>"#), 1),
            NextPage::Exhausted
        );
        assert_eq!(
            probe.check(&page(r#"<button class="next" aria-disabled="TRUE">Next</button>"#), 1),
            NextPage::Exhausted
        );
        assert_eq!(probe.check(&page("<p>no control</p>"), 1), NextPage::Unknown);
    }

    #[test]
    fn control_state_honours_custom_disabled_attribute() {
        let probe = ControlStateProbe::new("a.next", "data-inactive").unwrap();
        assert_eq!(
            probe.check(&page(r#"<a class="next" data-inactive="">Next</a>"#), 1),
            NextPage::Exhausted
        );
    }

    #[test]
    fn result_count_check_and_total_pages() {
        let check = ResultCountCheck::new(PaginationConfig::default().results_count_regex().unwrap());
        let middle = page("<div><span>21</span> - <span>40</span> of <span>95</span> results</div>");
        assert_eq!(check.check(&middle, 2), NextPage::Available);
        assert_eq!(check.total_pages(&middle), Some(5));

        let last = page("<div>81 - 95 of 95 results</div>");
        assert_eq!(check.check(&last, 5), NextPage::Exhausted);
        assert_eq!(check.check(&page("<div>Jobs</div>"), 1), NextPage::Unknown);
    }

    #[test]
    fn chain_falls_back_to_page_cap() {
        let config = PaginationConfig {
            enabled: true,
            next_button_selector: Some("button.next".into()),
            max_pages: Some(3),
            ..Default::default()
        };
        let chain = from_config(&config).unwrap();
        assert_eq!(chain.len(), 3);

        let bare = page("<ul><li>job</li></ul>");
        assert_eq!(chain.check(&bare, 2), NextPage::Available);
        assert_eq!(chain.check(&bare, 3), NextPage::Exhausted);
        assert_eq!(chain.total_pages(&bare), Some(3));

        // The control outranks the cap.
        let disabled = page(r#"<button class="next" disabled>Next</button>"#);
        assert_eq!(chain.check(&disabled, 1), NextPage::Exhausted);
    }

    #[test]
    fn without_cap_unknown_means_stop() {
        let chain = from_config(&PaginationConfig::default()).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.check(&page("<p>jobs</p>"), 1), NextPage::Exhausted);
    }
}
