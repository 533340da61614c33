//! Declarative pattern configuration.
//!
//! One YAML (or JSON) document describes how to crawl a career site, which
//! URLs count as job postings, and how to turn a job page into a
//! [`NormalizedJobRecord`](crate::record::NormalizedJobRecord). Every command
//! loads the whole document up front; all regexes, transform references and
//! field-rule shapes are checked before any network or disk I/O happens.

use std::path::Path;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::record::{ExperienceLevel, JobType, WorkArrangement};

pub const DEFAULT_RESULTS_COUNT_PATTERN: &str = r"(\d[\d,]*)\s*[-–]\s*(\d[\d,]*)\s+of\s+(\d[\d,]*)";

/// Phrases that mark a removed or broken posting.
pub const DEFAULT_ERROR_INDICATORS: &[&str] = &[
    "Page not found",
    "Sorry, this role does not exist",
    "is no longer available",
    "page-not-found-wrapper",
];

/// Root of the pattern document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarvestConfig {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub wait_for: Option<WaitCondition>,
    #[serde(default)]
    pub job_url_selectors: Option<Vec<StubSelectorRule>>,
    /// Regexes a link must match to look like a job posting.
    #[serde(default)]
    pub job_url_patterns: Option<Vec<String>>,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub url_validation: Option<UrlValidationConfig>,
    #[serde(default)]
    pub html_extraction: Option<ExtractionConfig>,
}

impl HarvestConfig {
    /// Read, parse and validate a pattern document.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!(
                "Failed to read pattern file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&raw).map_err(|e| match e {
            AppError::ConfigError(msg) => {
                AppError::ConfigError(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, AppError> {
        let config: HarvestConfig = serde_yaml::from_str(raw)
            .map_err(|e| AppError::ConfigError(format!("Invalid pattern document: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section that is present. Missing sections are only an
    /// error when a command asks for them.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(patterns) = &self.job_url_patterns {
            compile_patterns(patterns, "job_url_patterns")?;
        }
        self.pagination.validate()?;
        if let Some(validation) = &self.url_validation {
            crate::validate::UrlValidator::new(validation)?;
        }
        if let Some(extraction) = &self.html_extraction {
            extraction.compile()?;
        }
        Ok(())
    }

    pub fn require_stub_selectors(&self) -> Result<&[StubSelectorRule], AppError> {
        match &self.job_url_selectors {
            Some(rules) if !rules.is_empty() => Ok(rules),
            _ => Err(missing_section("job_url_selectors")),
        }
    }

    pub fn require_url_validation(&self) -> Result<&UrlValidationConfig, AppError> {
        self.url_validation
            .as_ref()
            .ok_or_else(|| missing_section("url_validation"))
    }

    pub fn require_extraction(&self) -> Result<&ExtractionConfig, AppError> {
        self.html_extraction
            .as_ref()
            .ok_or_else(|| missing_section("html_extraction"))
    }
}

fn missing_section(name: &str) -> AppError {
    AppError::ConfigError(format!(
        "Missing required section '{name}' in pattern configuration"
    ))
}

/// Compile a list of regexes, naming the offending section on failure.
pub fn compile_patterns(patterns: &[String], section: &str) -> Result<Vec<Regex>, AppError> {
    patterns
        .iter()
        .map(|p| compile_pattern(p, section))
        .collect()
}

pub fn compile_pattern(pattern: &str, section: &str) -> Result<Regex, AppError> {
    Regex::new(pattern)
        .map_err(|e| AppError::ConfigError(format!("Invalid regex in {section} '{pattern}': {e}")))
}

/// Case-insensitive variant used by keyword tables.
pub fn compile_keyword(pattern: &str, section: &str) -> Result<Regex, AppError> {
    compile_pattern(&format!("(?i){pattern}"), section)
}

// ---------------------------------------------------------------------------
// Listing pages
// ---------------------------------------------------------------------------

/// Condition the browser waits for after navigating to a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum WaitCondition {
    Selector(String),
    /// Fixed wait in milliseconds.
    Timeout(u64),
}

/// Which part of a matched element to read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Attribute {
    Text,
    Named(String),
}

impl From<String> for Attribute {
    fn from(value: String) -> Self {
        if value == "text" {
            Attribute::Text
        } else {
            Attribute::Named(value)
        }
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Attribute::from(value.to_string())
    }
}

fn href() -> Attribute {
    Attribute::Named("href".to_string())
}

/// One rule for discovering job links on a listing page.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StubSelectorRule {
    pub selector: String,
    #[serde(default = "href")]
    pub attribute: Attribute,
    /// Ancestor of the link that scopes metadata lookups (e.g. the table row).
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub metadata: IndexMap<String, FieldRule>,
}

/// Pagination behaviour for the frontier controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_page_param")]
    pub page_param: String,
    #[serde(default)]
    pub next_button_selector: Option<String>,
    #[serde(default = "default_disabled_attribute")]
    pub next_button_disabled_attribute: String,
    /// How long the navigator waits for the next button to render.
    #[serde(default = "default_next_button_timeout_ms")]
    pub next_button_timeout_ms: u64,
    #[serde(default)]
    pub results_count_pattern: Option<String>,
    /// Hard cap on pages crawled; also the last-resort next-page check.
    #[serde(default)]
    pub max_pages: Option<u32>,
    #[serde(default = "default_max_empty_pages")]
    pub max_empty_pages: u32,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_disabled_attribute() -> String {
    "disabled".to_string()
}

fn default_next_button_timeout_ms() -> u64 {
    5_000
}

fn default_max_empty_pages() -> u32 {
    5
}

fn default_page_delay_ms() -> u64 {
    2_000
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            page_param: default_page_param(),
            next_button_selector: None,
            next_button_disabled_attribute: default_disabled_attribute(),
            next_button_timeout_ms: default_next_button_timeout_ms(),
            results_count_pattern: None,
            max_pages: None,
            max_empty_pages: default_max_empty_pages(),
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

impl PaginationConfig {
    pub fn results_count_regex(&self) -> Result<Regex, AppError> {
        let pattern = self
            .results_count_pattern
            .as_deref()
            .unwrap_or(DEFAULT_RESULTS_COUNT_PATTERN);
        compile_pattern(pattern, "pagination.results_count_pattern")
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.page_param.is_empty() {
            return Err(AppError::ConfigError(
                "pagination.page_param must not be empty".into(),
            ));
        }
        if self.max_empty_pages == 0 {
            return Err(AppError::ConfigError(
                "pagination.max_empty_pages must be at least 1".into(),
            ));
        }
        self.results_count_regex()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// URL validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct UrlValidationConfig {
    /// Must match the whole URL; named groups become identity fields.
    pub valid_pattern: String,
    #[serde(default)]
    pub invalid_patterns: Vec<String>,
    /// Fields that always appear in the output, empty when not captured.
    #[serde(default)]
    pub extracted_fields: Vec<String>,
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

/// Value used when no selector produced anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Literal(String),
    /// Extraction time, RFC 3339.
    CurrentTimestamp,
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        if value == "current_timestamp" {
            DefaultValue::CurrentTimestamp
        } else {
            DefaultValue::Literal(value)
        }
    }
}

/// How to obtain one field from a page, resolved from the loosely typed
/// document shape when the configuration is loaded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawFieldRule")]
pub enum FieldRule {
    /// A single CSS selector.
    Selector {
        selector: String,
        attribute: Attribute,
        transforms: Vec<String>,
    },
    /// Selectors tried in order; the first non-empty value wins.
    SelectorWithFallbacks {
        selectors: Vec<String>,
        attribute: Attribute,
        transforms: Vec<String>,
        default: Option<DefaultValue>,
    },
    /// A query parameter of the page's source URL.
    UrlParam { param: String },
    Default(DefaultValue),
}

impl FieldRule {
    pub fn selector(selector: impl Into<String>) -> Self {
        FieldRule::Selector {
            selector: selector.into(),
            attribute: Attribute::Text,
            transforms: Vec::new(),
        }
    }

    /// All CSS selectors the rule may evaluate, primary first.
    pub fn selectors(&self) -> &[String] {
        match self {
            FieldRule::Selector { selector, .. } => std::slice::from_ref(selector),
            FieldRule::SelectorWithFallbacks { selectors, .. } => selectors,
            FieldRule::UrlParam { .. } | FieldRule::Default(_) => &[],
        }
    }

    pub fn transforms(&self) -> &[String] {
        match self {
            FieldRule::Selector { transforms, .. }
            | FieldRule::SelectorWithFallbacks { transforms, .. } => transforms,
            FieldRule::UrlParam { .. } | FieldRule::Default(_) => &[],
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldRule {
    Shorthand(String),
    Detailed(RawDetailedRule),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDetailedRule {
    #[serde(default)]
    selector: Option<String>,
    #[serde(default)]
    attribute: Option<String>,
    #[serde(default)]
    fallback_selectors: Vec<String>,
    #[serde(default)]
    transform: Option<OneOrMany>,
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    url_param: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl TryFrom<RawFieldRule> for FieldRule {
    type Error = String;

    fn try_from(raw: RawFieldRule) -> Result<Self, Self::Error> {
        let detailed = match raw {
            RawFieldRule::Shorthand(selector) if selector.trim().is_empty() => {
                return Err("field rule selector must not be empty".to_string());
            }
            RawFieldRule::Shorthand(selector) => return Ok(FieldRule::selector(selector)),
            RawFieldRule::Detailed(detailed) => detailed,
        };

        let selector = detailed.selector.filter(|s| !s.trim().is_empty());
        let default = detailed.default.map(DefaultValue::from);

        if let Some(param) = detailed.url_param {
            if selector.is_some() || !detailed.fallback_selectors.is_empty() {
                return Err(format!(
                    "field rule with url_param '{param}' cannot also set selectors"
                ));
            }
            return Ok(FieldRule::UrlParam { param });
        }

        let attribute = detailed
            .attribute
            .map(Attribute::from)
            .unwrap_or(Attribute::Text);
        let transforms = match detailed.transform {
            None => Vec::new(),
            Some(OneOrMany::One(name)) => vec![name],
            Some(OneOrMany::Many(names)) => names,
        };

        let mut selectors: Vec<String> = selector.into_iter().collect();
        selectors.extend(detailed.fallback_selectors);

        match (selectors.len(), default) {
            (0, Some(default)) => Ok(FieldRule::Default(default)),
            (0, None) => Err("field rule needs a selector, url_param or default".to_string()),
            (1, None) if !selectors[0].is_empty() => Ok(FieldRule::Selector {
                selector: selectors.remove(0),
                attribute,
                transforms,
            }),
            (_, default) => Ok(FieldRule::SelectorWithFallbacks {
                selectors,
                attribute,
                transforms,
                default,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Job page extraction
// ---------------------------------------------------------------------------

/// Named transforms referenced from field rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformSpec {
    RegexReplace {
        pattern: String,
        #[serde(default)]
        replacement: String,
    },
    WhitespaceNormalize,
    BulletPointsToList,
    AbsoluteUrl {
        #[serde(default)]
        base_url: Option<String>,
    },
    Strip,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicInfoRules {
    pub job_id: Option<FieldRule>,
    pub title: Option<FieldRule>,
    pub company: Option<FieldRule>,
    pub source_platform: Option<FieldRule>,
    pub source_url: Option<FieldRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeInfoRules {
    pub publish_date: Option<FieldRule>,
    pub scraped_date: Option<FieldRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationRules {
    pub location: Option<FieldRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentRules {
    pub summary: Option<FieldRule>,
    pub description: Option<FieldRule>,
    pub pay_benefit: Option<FieldRule>,
    pub required_qualifications: Option<FieldRule>,
    pub preferred_qualifications: Option<FieldRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamInfoRules {
    pub team: Option<FieldRule>,
    pub department: Option<FieldRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationRules {
    pub application_url: Option<FieldRule>,
    pub contact_email: Option<FieldRule>,
}

/// Where soft-skill matches are filed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillsTarget {
    #[default]
    Required,
    Preferred,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillsConfig {
    #[serde(default)]
    pub technical_skills_patterns: Vec<String>,
    #[serde(default)]
    pub soft_skills_patterns: Vec<String>,
    #[serde(default)]
    pub soft_skills_target: SkillsTarget,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SalaryPatterns {
    /// Two capture groups: minimum and maximum.
    #[serde(default)]
    pub salary_range_pattern: Option<String>,
    /// First group is the rate; an optional second group is the upper rate.
    #[serde(default)]
    pub hourly_rate_pattern: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for SalaryPatterns {
    fn default() -> Self {
        Self {
            salary_range_pattern: None,
            hourly_rate_pattern: None,
            currency: default_currency(),
        }
    }
}

/// The `html_extraction` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub basic_info: BasicInfoRules,
    #[serde(default)]
    pub time_info: TimeInfoRules,
    #[serde(default)]
    pub location: LocationRules,
    #[serde(default)]
    pub content: ContentRules,
    #[serde(default)]
    pub team_info: TeamInfoRules,
    #[serde(default)]
    pub application: ApplicationRules,
    #[serde(default)]
    pub transformations: IndexMap<String, TransformSpec>,
    #[serde(default)]
    pub skills_extraction: SkillsConfig,
    #[serde(default)]
    pub salary_patterns: SalaryPatterns,
    #[serde(default)]
    pub job_type_patterns: IndexMap<JobType, Vec<String>>,
    #[serde(default)]
    pub experience_patterns: IndexMap<ExperienceLevel, Vec<String>>,
    #[serde(default)]
    pub work_arrangement_patterns: IndexMap<WorkArrangement, Vec<String>>,
    /// Job type used when no keyword matches. `null` leaves it unset.
    #[serde(default = "default_job_type")]
    pub default_job_type: Option<JobType>,
    #[serde(default = "default_error_indicators")]
    pub error_indicators: Vec<String>,
    /// Elements whose presence marks an error page.
    #[serde(default)]
    pub error_selectors: Vec<String>,
}

fn default_job_type() -> Option<JobType> {
    Some(JobType::FullTime)
}

fn default_error_indicators() -> Vec<String> {
    DEFAULT_ERROR_INDICATORS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            basic_info: BasicInfoRules::default(),
            time_info: TimeInfoRules::default(),
            location: LocationRules::default(),
            content: ContentRules::default(),
            team_info: TeamInfoRules::default(),
            application: ApplicationRules::default(),
            transformations: IndexMap::new(),
            skills_extraction: SkillsConfig::default(),
            salary_patterns: SalaryPatterns::default(),
            job_type_patterns: IndexMap::new(),
            experience_patterns: IndexMap::new(),
            work_arrangement_patterns: IndexMap::new(),
            default_job_type: default_job_type(),
            error_indicators: default_error_indicators(),
            error_selectors: Vec::new(),
        }
    }
}

impl ExtractionConfig {
    /// Every field rule in the section, with its dotted name.
    pub fn field_rules(&self) -> Vec<(&'static str, &FieldRule)> {
        let candidates: [(&'static str, &Option<FieldRule>); 17] = [
            ("basic_info.job_id", &self.basic_info.job_id),
            ("basic_info.title", &self.basic_info.title),
            ("basic_info.company", &self.basic_info.company),
            ("basic_info.source_platform", &self.basic_info.source_platform),
            ("basic_info.source_url", &self.basic_info.source_url),
            ("time_info.publish_date", &self.time_info.publish_date),
            ("time_info.scraped_date", &self.time_info.scraped_date),
            ("location.location", &self.location.location),
            ("content.summary", &self.content.summary),
            ("content.description", &self.content.description),
            ("content.pay_benefit", &self.content.pay_benefit),
            (
                "content.required_qualifications",
                &self.content.required_qualifications,
            ),
            (
                "content.preferred_qualifications",
                &self.content.preferred_qualifications,
            ),
            ("team_info.team", &self.team_info.team),
            ("team_info.department", &self.team_info.department),
            ("application.application_url", &self.application.application_url),
            ("application.contact_email", &self.application.contact_email),
        ];
        candidates
            .into_iter()
            .filter_map(|(name, rule)| rule.as_ref().map(|r| (name, r)))
            .collect()
    }

    /// Compile regexes and resolve transform references.
    pub fn compile(&self) -> Result<crate::analysis::ExtractionRules, AppError> {
        crate::analysis::ExtractionRules::compile(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r##"
company_name: Acme Corp
wait_for:
  type: selector
  value: "table#results"
job_url_selectors:
  - selector: "a.job-link"
    container: "tr"
    metadata:
      title: "a.job-link"
      location:
        selector: ".location"
        transform: strip
pagination:
  enabled: true
  next_button_selector: "button.next"
  max_pages: 50
url_validation:
  valid_pattern: '.*/details/(?P<job_id>\d+)/(?P<job_title>[\w-]+)'
  invalid_patterns: ['\.pdf$']
  extracted_fields: [job_id, team, job_title]
html_extraction:
  basic_info:
    job_id:
      selector: "#jobId"
      fallback_selectors: ["[data-job-id]"]
    title: "h1"
    company:
      default: "Acme Corp"
  time_info:
    scraped_date:
      default: current_timestamp
  content:
    description:
      selector: "#description"
      transform: clean_ws
  transformations:
    clean_ws:
      type: whitespace_normalize
  job_type_patterns:
    internship: ['\bintern']
    contract: ['contract']
"##;

    #[test]
    fn parses_full_document() {
        let config = HarvestConfig::from_yaml_str(FULL_CONFIG).unwrap();
        assert_eq!(config.company_name, "Acme Corp");
        assert_eq!(
            config.wait_for,
            Some(WaitCondition::Selector("table#results".into()))
        );

        let rules = config.require_stub_selectors().unwrap();
        assert_eq!(rules[0].attribute, Attribute::Named("href".into()));
        assert_eq!(rules[0].container.as_deref(), Some("tr"));
        assert_eq!(rules[0].metadata.len(), 2);

        assert!(config.pagination.enabled);
        assert_eq!(config.pagination.page_param, "page");
        assert_eq!(config.pagination.max_empty_pages, 5);
        assert_eq!(config.pagination.max_pages, Some(50));

        let extraction = config.require_extraction().unwrap();
        assert!(matches!(
            extraction.basic_info.job_id,
            Some(FieldRule::SelectorWithFallbacks { ref selectors, .. }) if selectors.len() == 2
        ));
        assert_eq!(extraction.basic_info.title, Some(FieldRule::selector("h1")));
        assert_eq!(
            extraction.time_info.scraped_date,
            Some(FieldRule::Default(DefaultValue::CurrentTimestamp))
        );
        let keys: Vec<_> = extraction.job_type_patterns.keys().copied().collect();
        assert_eq!(keys, vec![JobType::Internship, JobType::Contract]);
        assert_eq!(extraction.default_job_type, Some(JobType::FullTime));
    }

    #[test]
    fn missing_section_is_a_config_error() {
        let config = HarvestConfig::from_yaml_str("company_name: Acme\n").unwrap();
        let err = config.require_url_validation().unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("url_validation"));
        assert!(config.require_stub_selectors().is_err());
        assert!(config.require_extraction().is_err());
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let err = HarvestConfig::from_yaml_str("job_url_selectors: [unclosed").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn unknown_rule_shape_is_rejected() {
        let doc = r#"
html_extraction:
  basic_info:
    title:
      selectr: "h1"
"#;
        assert!(HarvestConfig::from_yaml_str(doc).is_err());
    }

    #[test]
    fn url_param_rule_cannot_mix_with_selector() {
        let doc = r##"
html_extraction:
  basic_info:
    job_id:
      url_param: "id"
      selector: "#id"
"##;
        assert!(HarvestConfig::from_yaml_str(doc).is_err());
    }

    #[test]
    fn unknown_transform_reference_is_rejected() {
        let doc = r#"
html_extraction:
  basic_info:
    title:
      selector: "h1"
      transform: does_not_exist
"#;
        let err = HarvestConfig::from_yaml_str(doc).unwrap_err();
        assert!(err.to_string().contains("does_not_exist"));
    }

    #[test]
    fn unknown_classification_category_is_rejected() {
        let doc = r#"
html_extraction:
  job_type_patterns:
    gig_work: ['gig']
"#;
        assert!(HarvestConfig::from_yaml_str(doc).is_err());
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let doc = r#"
url_validation:
  valid_pattern: '(?P<job_id>\d+'
"#;
        let err = HarvestConfig::from_yaml_str(doc).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn json_documents_are_accepted() {
        let doc = r#"{"company_name": "Acme", "url_validation": {"valid_pattern": ".*/jobs/(?P<job_id>\\d+)"}}"#;
        let config = HarvestConfig::from_yaml_str(doc).unwrap();
        assert_eq!(config.company_name, "Acme");
        assert!(config.require_url_validation().is_ok());
    }

    #[test]
    fn field_rule_shapes() {
        let rule: FieldRule = serde_yaml::from_str(r#"{default: "Acme"}"#).unwrap();
        assert_eq!(rule, FieldRule::Default(DefaultValue::Literal("Acme".into())));

        let rule: FieldRule = serde_yaml::from_str(r#"{url_param: "jobId"}"#).unwrap();
        assert_eq!(
            rule,
            FieldRule::UrlParam {
                param: "jobId".into()
            }
        );

        let rule: FieldRule =
            serde_yaml::from_str(r#"{selector: "meta[name=x]", attribute: content, transform: [a, b]}"#)
                .unwrap();
        assert_eq!(
            rule,
            FieldRule::Selector {
                selector: "meta[name=x]".into(),
                attribute: Attribute::Named("content".into()),
                transforms: vec!["a".into(), "b".into()],
            }
        );

        let rule: FieldRule =
            serde_yaml::from_str(r#"{selector: "h1", default: "Untitled"}"#).unwrap();
        assert!(matches!(
            rule,
            FieldRule::SelectorWithFallbacks { default: Some(DefaultValue::Literal(_)), .. }
        ));

        assert!(serde_yaml::from_str::<FieldRule>("{}").is_err());
    }
}
