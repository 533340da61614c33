//! Small helpers over `scraper` shared by the listing parser, the next-page
//! checks and the job page extractor.

use harvest_core::config::Attribute;
use harvest_core::error::AppError;
use scraper::{ElementRef, Html, Selector};

/// Parse a CSS selector, reporting `context` on failure.
pub fn parse_selector(selector: &str, context: &str) -> Result<Selector, AppError> {
    Selector::parse(selector)
        .map_err(|e| AppError::ConfigError(format!("Invalid CSS selector in {context} '{selector}': {e}")))
}

/// Visible text of an element. Each text node is trimmed and the non-empty
/// ones are joined with a space; spacing inside a node is left as is.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of an element, one line per block-level child.
///
/// Used for qualification sections where line structure carries meaning.
pub fn element_lines(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn read_attribute(element: ElementRef<'_>, attribute: &Attribute) -> Option<String> {
    let value = match attribute {
        Attribute::Text => element_text(element),
        Attribute::Named(name) => element.value().attr(name)?.trim().to_string(),
    };
    (!value.is_empty()).then_some(value)
}

/// Text of the whole document body, or of the root when there is no body.
pub fn document_text(document: &Html) -> String {
    match Selector::parse("body") {
        Ok(body) => match document.select(&body).next() {
            Some(body) => element_text(body),
            None => element_text(document.root_element()),
        },
        Err(_) => element_text(document.root_element()),
    }
}

/// Decoded text of the whole document with runs of whitespace collapsed.
///
/// Text nodes are concatenated without separators, so a phrase split across
/// inline elements reads the same as it does in the browser.
pub fn page_text(document: &Html) -> String {
    document
        .root_element()
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Closest ancestor of `element` (itself included) matching `selector`.
pub fn closest<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    if selector.matches(&element) {
        return Some(element);
    }
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| selector.matches(ancestor))
}
