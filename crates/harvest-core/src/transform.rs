//! Value transforms applied to raw extracted text.

use std::collections::HashMap;

use indexmap::IndexMap;
use regex::Regex;
use url::Url;

use crate::config::{TransformSpec, compile_pattern};
use crate::error::AppError;

const BULLET_GLYPHS: &[char] = &['•', '-', '*', '▪', '‣', '▸'];

/// Minimum length of an unbulleted line to count as a list item.
const IMPLICIT_ITEM_MIN_LEN: usize = 10;

/// A raw value moving through a transform chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Text(String),
    List(Vec<String>),
}

impl Extracted {
    pub fn is_empty(&self) -> bool {
        match self {
            Extracted::Text(s) => s.trim().is_empty(),
            Extracted::List(items) => items.iter().all(|i| i.trim().is_empty()),
        }
    }

    /// Collapse to text; list items are joined by newlines.
    pub fn into_text(self) -> String {
        match self {
            Extracted::Text(s) => s,
            Extracted::List(items) => items.join("\n"),
        }
    }

    pub fn into_list(self) -> Vec<String> {
        match self {
            Extracted::Text(s) => split_bullets(&s),
            Extracted::List(items) => items,
        }
    }
}

/// A compiled transform.
#[derive(Debug, Clone)]
pub enum Transform {
    RegexReplace { regex: Regex, replacement: String },
    WhitespaceNormalize,
    BulletList,
    AbsoluteUrl { base_url: Option<Url> },
    Trim,
    Lowercase,
    Uppercase,
}

impl Transform {
    pub fn from_spec(name: &str, spec: &TransformSpec) -> Result<Self, AppError> {
        Ok(match spec {
            TransformSpec::RegexReplace {
                pattern,
                replacement,
            } => Transform::RegexReplace {
                regex: compile_pattern(pattern, &format!("transformations.{name}"))?,
                replacement: replacement.clone(),
            },
            TransformSpec::WhitespaceNormalize => Transform::WhitespaceNormalize,
            TransformSpec::BulletPointsToList => Transform::BulletList,
            TransformSpec::AbsoluteUrl { base_url } => {
                let base_url = match base_url {
                    Some(raw) => Some(Url::parse(raw).map_err(|e| {
                        AppError::ConfigError(format!(
                            "Invalid base_url in transformations.{name}: {e}"
                        ))
                    })?),
                    None => None,
                };
                Transform::AbsoluteUrl { base_url }
            }
            TransformSpec::Strip => Transform::Trim,
            TransformSpec::Lower => Transform::Lowercase,
            TransformSpec::Upper => Transform::Uppercase,
        })
    }

    /// Transforms usable by name without a `transformations` entry.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "strip" | "trim" => Some(Transform::Trim),
            "lower" => Some(Transform::Lowercase),
            "upper" => Some(Transform::Uppercase),
            "whitespace_normalize" => Some(Transform::WhitespaceNormalize),
            "bullet_points_to_list" => Some(Transform::BulletList),
            "absolute_url" => Some(Transform::AbsoluteUrl { base_url: None }),
            _ => None,
        }
    }

    /// Apply to a value. `page_url` is the base for relative URLs when the
    /// transform has no base of its own.
    pub fn apply(&self, value: Extracted, page_url: Option<&Url>) -> Extracted {
        match (self, value) {
            (Transform::BulletList, Extracted::Text(text)) => Extracted::List(split_bullets(&text)),
            (Transform::BulletList, list) => list,
            (_, Extracted::List(items)) => Extracted::List(
                items
                    .into_iter()
                    .map(|item| self.apply_text(item, page_url))
                    .collect(),
            ),
            (_, Extracted::Text(text)) => Extracted::Text(self.apply_text(text, page_url)),
        }
    }

    fn apply_text(&self, text: String, page_url: Option<&Url>) -> String {
        match self {
            Transform::RegexReplace { regex, replacement } => {
                regex.replace_all(&text, replacement.as_str()).into_owned()
            }
            Transform::WhitespaceNormalize => text.split_whitespace().collect::<Vec<_>>().join(" "),
            Transform::BulletList => text,
            Transform::AbsoluteUrl { base_url } => {
                let base = base_url.as_ref().or(page_url);
                match base {
                    Some(base) if Url::parse(&text).is_err() => base
                        .join(text.trim())
                        .map(|u| u.to_string())
                        .unwrap_or(text),
                    _ => text,
                }
            }
            Transform::Trim => text.trim().to_string(),
            Transform::Lowercase => text.to_lowercase(),
            Transform::Uppercase => text.to_uppercase(),
        }
    }
}

/// Named transforms from the `transformations` table plus the builtins.
#[derive(Debug, Clone, Default)]
pub struct TransformSet {
    named: HashMap<String, Transform>,
}

impl TransformSet {
    pub fn compile(specs: &IndexMap<String, TransformSpec>) -> Result<Self, AppError> {
        let mut named = HashMap::with_capacity(specs.len());
        for (name, spec) in specs {
            named.insert(name.clone(), Transform::from_spec(name, spec)?);
        }
        Ok(Self { named })
    }

    /// Builtins only; used for listing metadata.
    pub fn builtins() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Transform> {
        self.named.get(name).cloned().or_else(|| Transform::builtin(name))
    }

    /// Fail if any name is unknown. `context` names the referencing rule.
    pub fn check(&self, names: &[String], context: &str) -> Result<(), AppError> {
        for name in names {
            if self.get(name).is_none() {
                return Err(AppError::ConfigError(format!(
                    "Unknown transform '{name}' referenced by {context}"
                )));
            }
        }
        Ok(())
    }

    pub fn apply_chain(&self, names: &[String], value: Extracted, page_url: Option<&Url>) -> Extracted {
        names.iter().fold(value, |acc, name| match self.get(name) {
            Some(transform) => transform.apply(acc, page_url),
            None => acc,
        })
    }
}

/// Split text into list items: bulleted lines lose their glyph, other
/// lines count when long enough. With no items, the trimmed text is the
/// single item.
pub fn split_bullets(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with(BULLET_GLYPHS) {
            let cleaned = line
                .trim_start_matches(|c: char| BULLET_GLYPHS.contains(&c) || c.is_whitespace())
                .trim();
            if !cleaned.is_empty() {
                items.push(cleaned.to_string());
            }
        } else if line.chars().count() > IMPLICIT_ITEM_MIN_LEN {
            items.push(line.to_string());
        }
    }

    if items.is_empty() {
        let whole = text.trim();
        if !whole.is_empty() {
            items.push(whole.to_string());
        }
    }
    items
}
