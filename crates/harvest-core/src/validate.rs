//! URL validation and job-identity deduplication.

use std::collections::HashSet;

use chrono::Utc;
use indexmap::IndexMap;
use regex::Regex;
use url::Url;

use crate::config::{UrlValidationConfig, compile_pattern};
use crate::error::{AppError, ValidationRejection};
use crate::models::{
    FrontierState, ProcessingStats, RawJobStub, ValidatedJob, ValidatedJobsArtifact,
};
use crate::util::title_case;

/// Compiled `url_validation` section.
#[derive(Debug, Clone)]
pub struct UrlValidator {
    valid: Regex,
    invalid: Vec<(String, Regex)>,
    fields: Vec<String>,
}

impl UrlValidator {
    pub fn new(config: &UrlValidationConfig) -> Result<Self, AppError> {
        let valid = compile_pattern(
            &format!("^(?:{})$", config.valid_pattern),
            "url_validation.valid_pattern",
        )?;
        let invalid = config
            .invalid_patterns
            .iter()
            .map(|p| compile_pattern(p, "url_validation.invalid_patterns").map(|re| (p.clone(), re)))
            .collect::<Result<Vec<_>, _>>()?;

        // Output fields: the configured ones, then any other named group.
        let mut fields = config.extracted_fields.clone();
        for name in valid.capture_names().flatten() {
            if !fields.iter().any(|f| f == name) {
                fields.push(name.to_string());
            }
        }

        Ok(Self {
            valid,
            invalid,
            fields,
        })
    }

    /// Identity fields of a job URL, or why it was rejected.
    ///
    /// Every output field is present; groups that did not participate in
    /// the match are empty strings.
    pub fn validate(&self, url: &str) -> Result<IndexMap<String, String>, ValidationRejection> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ValidationRejection::EmptyUrl);
        }
        if let Some((pattern, _)) = self.invalid.iter().find(|(_, re)| re.is_match(url)) {
            return Err(ValidationRejection::InvalidPattern {
                pattern: pattern.clone(),
            });
        }

        let stripped;
        let caps = match self.valid.captures(url) {
            Some(caps) => caps,
            None => {
                stripped = strip_query_and_fragment(url);
                self.valid
                    .captures(&stripped)
                    .ok_or(ValidationRejection::NoValidMatch)?
            }
        };
        Ok(self.collect(&caps))
    }

    fn collect(&self, caps: &regex::Captures<'_>) -> IndexMap<String, String> {
        self.finish(
            self.fields
                .iter()
                .map(|f| (f.clone(), caps.name(f).map(|m| m.as_str().to_string())))
                .collect(),
        )
    }

    fn finish(&self, pairs: Vec<(String, Option<String>)>) -> IndexMap<String, String> {
        pairs
            .into_iter()
            .map(|(name, value)| {
                let value = value.unwrap_or_default();
                let value = if name == "job_title" {
                    title_case(&value.replace('-', " "))
                } else {
                    value
                };
                (name, value)
            })
            .collect()
    }
}

fn strip_query_and_fragment(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or(raw)
            .to_string(),
    }
}

/// Validate every stub and drop duplicates by job id (by URL when the id
/// is empty). The first occurrence wins.
pub fn dedupe_jobs(
    stubs: Vec<RawJobStub>,
    validator: &UrlValidator,
) -> (Vec<ValidatedJob>, ProcessingStats) {
    let mut stats = ProcessingStats {
        original_count: stubs.len(),
        ..Default::default()
    };
    let mut seen = HashSet::new();
    let mut jobs = Vec::new();

    for stub in stubs {
        let fields = match validator.validate(&stub.url) {
            Ok(fields) => fields,
            Err(reason) => {
                tracing::debug!(url = %stub.url, %reason, "Rejected job URL");
                stats.invalid_count += 1;
                continue;
            }
        };
        stats.valid_count += 1;

        let job = ValidatedJob::from_stub(stub, fields);
        let key = if job.job_id.is_empty() {
            format!("url:{}", job.url)
        } else {
            format!("id:{}", job.job_id)
        };
        if !seen.insert(key) {
            tracing::debug!(job_id = %job.job_id, url = %job.url, "Duplicate job dropped");
            stats.duplicate_count += 1;
            continue;
        }
        jobs.push(job);
    }

    stats.final_count = jobs.len();
    (jobs, stats)
}

/// Validate a frontier and build the validated-jobs artifact.
pub fn build_artifact(frontier: FrontierState, validator: &UrlValidator) -> ValidatedJobsArtifact {
    let original_total_jobs = frontier.jobs.len();
    let (jobs, processing_stats) = dedupe_jobs(frontier.jobs, validator);
    tracing::info!(
        original = processing_stats.original_count,
        valid = processing_stats.valid_count,
        invalid = processing_stats.invalid_count,
        duplicates = processing_stats.duplicate_count,
        kept = processing_stats.final_count,
        "Validation finished"
    );
    ValidatedJobsArtifact {
        source_url: frontier.source_url,
        original_total_jobs,
        processed_total_jobs: jobs.len(),
        processing_stats,
        processing_timestamp: Utc::now().to_rfc3339(),
        company_name: frontier.company_name,
        total_pages_crawled: frontier.total_pages_crawled,
        jobs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> UrlValidator {
        UrlValidator::new(&UrlValidationConfig {
            valid_pattern: r"https://jobs\.example\.com/en-us/details/(?P<job_id>[\d-]+)(?:/(?P<job_title>[\w-]+))?(?:\?team=(?P<team>\w+))?".into(),
            invalid_patterns: vec![r"\.pdf$".into(), "/locationPicker".into()],
            extracted_fields: vec!["job_id".into(), "team".into(), "job_title".into()],
        })
        .unwrap()
    }

    fn stub(url: &str) -> RawJobStub {
        RawJobStub {
            url: url.into(),
            ..Default::default()
        }
    }

    #[test]
    fn extracts_identity_fields_and_title_cases_slug() {
        let fields = validator()
            .validate("https://jobs.example.com/en-us/details/200-0001/senior-software-engineer?team=SFTWR")
            .unwrap();
        assert_eq!(fields["job_id"], "200-0001");
        assert_eq!(fields["team"], "SFTWR");
        assert_eq!(fields["job_title"], "Senior Software Engineer");
    }

    #[test]
    fn missing_groups_default_to_empty() {
        let fields = validator()
            .validate("https://jobs.example.com/en-us/details/42")
            .unwrap();
        assert_eq!(fields["job_id"], "42");
        assert_eq!(fields["team"], "");
        assert_eq!(fields["job_title"], "");
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn rejections() {
        let v = validator();
        assert_eq!(v.validate("  "), Err(ValidationRejection::EmptyUrl));
        assert!(matches!(
            v.validate("https://jobs.example.com/en-us/details/1/brochure.pdf"),
            Err(ValidationRejection::InvalidPattern { .. })
        ));
        assert_eq!(
            v.validate("https://jobs.example.com/en-us/search"),
            Err(ValidationRejection::NoValidMatch)
        );
        // Partial matches do not count.
        assert_eq!(
            v.validate("https://evil.com/?u=https://jobs.example.com/en-us/details/1"),
            Err(ValidationRejection::NoValidMatch)
        );
    }

    #[test]
    fn tracking_parameters_fall_back_to_bare_url() {
        let fields = validator()
            .validate("https://jobs.example.com/en-us/details/999/role?utm_source=x#top")
            .unwrap();
        assert_eq!(fields["job_id"], "999");
        assert_eq!(fields["job_title"], "Role");
    }

    #[test]
    fn duplicate_job_ids_keep_first() {
        let (jobs, stats) = dedupe_jobs(
            vec![
                stub("https://jobs.example.com/en-us/details/999/role?utm_source=a"),
                stub("https://jobs.example.com/en-us/details/999/role?utm_source=b"),
                stub("https://jobs.example.com/en-us/details/1000/other"),
                stub("https://jobs.example.com/brochure.pdf"),
            ],
            &validator(),
        );
        assert_eq!(jobs.len(), 2);
        assert!(jobs[0].url.ends_with("utm_source=a"));
        assert_eq!(
            stats,
            ProcessingStats {
                original_count: 4,
                valid_count: 3,
                invalid_count: 1,
                duplicate_count: 1,
                final_count: 2,
            }
        );
        assert!(stats.is_consistent());
    }

    #[test]
    fn empty_job_id_dedupes_by_url() {
        let v = UrlValidator::new(&UrlValidationConfig {
            valid_pattern: r"https://example\.com/jobs/(?P<job_id>\d*)[a-z-]*".into(),
            invalid_patterns: vec![],
            extracted_fields: vec!["job_id".into()],
        })
        .unwrap();
        let (jobs, stats) = dedupe_jobs(
            vec![
                stub("https://example.com/jobs/alpha"),
                stub("https://example.com/jobs/beta"),
                stub("https://example.com/jobs/alpha"),
            ],
            &v,
        );
        assert_eq!(jobs.len(), 2);
        assert_eq!(stats.duplicate_count, 1);
    }

    #[test]
    fn artifact_carries_frontier_header() {
        let mut frontier = FrontierState::new("https://jobs.example.com/en-us/search", "Acme");
        frontier.merge_page(
            1,
            vec![
                stub("https://jobs.example.com/en-us/details/1/a"),
                stub("https://jobs.example.com/en-us/details/2/b"),
            ],
        );
        let artifact = build_artifact(frontier, &validator());
        assert_eq!(artifact.company_name, "Acme");
        assert_eq!(artifact.original_total_jobs, 2);
        assert_eq!(artifact.processed_total_jobs, 2);
        assert_eq!(artifact.total_pages_crawled, 1);
        assert!(!artifact.processing_timestamp.is_empty());
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let err = UrlValidator::new(&UrlValidationConfig {
            valid_pattern: "(".into(),
            invalid_patterns: vec![],
            extracted_fields: vec![],
        })
        .unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
