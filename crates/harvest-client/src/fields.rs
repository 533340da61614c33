//! Compiled field rules evaluated against a DOM scope.

use harvest_core::config::{Attribute, DefaultValue, FieldRule};
use harvest_core::error::AppError;
use harvest_core::transform::{Extracted, TransformSet};
use scraper::{ElementRef, Selector};
use url::Url;

use crate::html::{parse_selector, read_attribute};

#[derive(Debug, Clone)]
pub enum CompiledField {
    Selectors {
        selectors: Vec<Selector>,
        attribute: Attribute,
        transforms: Vec<String>,
        default: Option<DefaultValue>,
    },
    UrlParam(String),
    Default(DefaultValue),
}

impl CompiledField {
    pub fn compile(rule: &FieldRule, context: &str) -> Result<Self, AppError> {
        Ok(match rule {
            FieldRule::Selector {
                selector,
                attribute,
                transforms,
            } => CompiledField::Selectors {
                selectors: vec![parse_selector(selector, context)?],
                attribute: attribute.clone(),
                transforms: transforms.clone(),
                default: None,
            },
            FieldRule::SelectorWithFallbacks {
                selectors,
                attribute,
                transforms,
                default,
            } => CompiledField::Selectors {
                selectors: selectors
                    .iter()
                    .map(|s| parse_selector(s, context))
                    .collect::<Result<_, _>>()?,
                attribute: attribute.clone(),
                transforms: transforms.clone(),
                default: default.clone(),
            },
            FieldRule::UrlParam { param } => CompiledField::UrlParam(param.clone()),
            FieldRule::Default(value) => CompiledField::Default(value.clone()),
        })
    }

    /// First element, over the selectors in order, that carries a value.
    pub fn find<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        let CompiledField::Selectors {
            selectors,
            attribute,
            ..
        } = self
        else {
            return None;
        };
        selectors.iter().find_map(|selector| {
            scope
                .select(selector)
                .find(|el| read_attribute(*el, attribute).is_some())
        })
    }

    /// Resolve the field to its attribute text.
    pub fn resolve(
        &self,
        scope: ElementRef<'_>,
        page_url: Option<&Url>,
        transforms: &TransformSet,
        now: &str,
    ) -> Option<Extracted> {
        self.resolve_with(scope, page_url, transforms, now, |el, attribute| {
            read_attribute(el, attribute).map(Extracted::Text)
        })
    }

    /// Resolve with a custom reader for the matched element. Transforms run
    /// on the read value; the default only applies when nothing survives.
    pub fn resolve_with<R>(
        &self,
        scope: ElementRef<'_>,
        page_url: Option<&Url>,
        transforms: &TransformSet,
        now: &str,
        read: R,
    ) -> Option<Extracted>
    where
        R: Fn(ElementRef<'_>, &Attribute) -> Option<Extracted>,
    {
        match self {
            CompiledField::Selectors {
                attribute,
                transforms: chain,
                default,
                ..
            } => {
                let value = self
                    .find(scope)
                    .and_then(|el| read(el, attribute))
                    .map(|raw| transforms.apply_chain(chain, raw, page_url))
                    .filter(|v| !v.is_empty());
                value.or_else(|| default.as_ref().map(|d| default_value(d, now)))
            }
            CompiledField::UrlParam(param) => page_url.and_then(|url| {
                url.query_pairs()
                    .find(|(k, _)| k == param)
                    .map(|(_, v)| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .map(Extracted::Text)
            }),
            CompiledField::Default(value) => Some(default_value(value, now)),
        }
    }
}

fn default_value(value: &DefaultValue, now: &str) -> Extracted {
    match value {
        DefaultValue::Literal(s) => Extracted::Text(s.clone()),
        DefaultValue::CurrentTimestamp => Extracted::Text(now.to_string()),
    }
}
