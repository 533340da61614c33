//! Job stub discovery on listing pages.

use std::collections::HashSet;
use std::sync::Arc;

use harvest_core::config::{Attribute, HarvestConfig, StubSelectorRule};
use harvest_core::error::AppError;
use harvest_core::frontier::JobUrlFilter;
use harvest_core::models::RawJobStub;
use harvest_core::traits::ListingParser;
use harvest_core::transform::TransformSet;
use scraper::{Html, Selector};
use url::Url;

use crate::fields::CompiledField;
use crate::html::{closest, element_text, parse_selector, read_attribute};

#[derive(Debug)]
struct StubRule {
    selector: Selector,
    attribute: Attribute,
    container: Option<Selector>,
    metadata: Vec<(String, CompiledField)>,
}

impl StubRule {
    fn compile(rule: &StubSelectorRule, index: usize) -> Result<Self, AppError> {
        let context = format!("job_url_selectors[{index}]");
        let container = rule
            .container
            .as_deref()
            .map(|c| parse_selector(c, &context))
            .transpose()?;
        let transforms = TransformSet::builtins();
        let mut metadata = Vec::with_capacity(rule.metadata.len());
        for (key, field) in &rule.metadata {
            let field_context = format!("{context}.metadata.{key}");
            transforms.check(field.transforms(), &field_context)?;
            metadata.push((key.clone(), CompiledField::compile(field, &field_context)?));
        }
        Ok(Self {
            selector: parse_selector(&rule.selector, &context)?,
            attribute: rule.attribute.clone(),
            container,
            metadata,
        })
    }
}

/// Finds job links with the configured selector rules and reads per-link
/// metadata from the surrounding markup.
#[derive(Debug, Clone)]
pub struct SelectorListingParser {
    rules: Arc<Vec<StubRule>>,
    filter: JobUrlFilter,
    transforms: TransformSet,
    company_name: String,
}

impl SelectorListingParser {
    pub fn from_config(config: &HarvestConfig) -> Result<Self, AppError> {
        let rules = config
            .require_stub_selectors()?
            .iter()
            .enumerate()
            .map(|(i, rule)| StubRule::compile(rule, i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules: Arc::new(rules),
            filter: JobUrlFilter::from_config(config)?,
            transforms: TransformSet::builtins(),
            company_name: config.company_name.clone(),
        })
    }

    fn resolve_link(&self, raw: &str, base: Option<&Url>) -> Option<Url> {
        if raw.starts_with('#') {
            return None;
        }
        let mut url = match base {
            Some(base) => base.join(raw).ok()?,
            None => Url::parse(raw).ok()?,
        };
        url.set_fragment(None);
        self.filter.accepts(url.as_str()).then_some(url)
    }
}

fn assign(stub: &mut RawJobStub, key: &str, value: String) {
    match key {
        "job_id" => stub.job_id = value,
        "title" => stub.title = value,
        "location" => stub.location = value,
        "department" => stub.department = value,
        "job_type" => stub.job_type = value,
        "posted_date" => stub.posted_date = value,
        "company" => stub.company = value,
        _ => {
            stub.metadata.insert(key.to_string(), value);
        }
    }
}

impl ListingParser for SelectorListingParser {
    fn parse(&self, html: &str, page_url: &str) -> Vec<RawJobStub> {
        let document = Html::parse_document(html);
        let base = Url::parse(page_url).ok();
        let now = chrono::Utc::now().to_rfc3339();
        let mut seen = HashSet::new();
        let mut stubs = Vec::new();

        for rule in self.rules.iter() {
            for link in document.select(&rule.selector) {
                let Some(raw) = read_attribute(link, &rule.attribute) else {
                    continue;
                };
                let Some(url) = self.resolve_link(&raw, base.as_ref()) else {
                    continue;
                };
                if !seen.insert(url.to_string()) {
                    continue;
                }

                let scope = rule
                    .container
                    .as_ref()
                    .and_then(|container| closest(link, container))
                    .unwrap_or(link);

                let mut stub = RawJobStub {
                    url: url.to_string(),
                    source_url: page_url.to_string(),
                    ..Default::default()
                };
                for (key, field) in &rule.metadata {
                    if let Some(value) = field.resolve(scope, Some(&url), &self.transforms, &now) {
                        assign(&mut stub, key, value.into_text());
                    }
                }
                if stub.title.is_empty() && matches!(rule.attribute, Attribute::Named(_)) {
                    stub.title = element_text(link);
                }
                if stub.company.is_empty() {
                    stub.company = self.company_name.clone();
                }
                stubs.push(stub);
            }
        }

        tracing::debug!(page = %page_url, found = stubs.len(), "Parsed listing page");
        stubs
    }
}
