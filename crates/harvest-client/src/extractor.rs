//! Job page extraction engine.
//!
//! Evaluates the `html_extraction` field rules against one downloaded page
//! and assembles a [`NormalizedJobRecord`]. Pages carrying an error marker,
//! and pages where `job_id` or `title` cannot be resolved, yield no record.

use std::collections::HashMap;
use std::sync::Arc;

use harvest_core::analysis::{
    ExtractionRules, education_requirements, experience_requirements, parse_location,
};
use harvest_core::config::{Attribute, HarvestConfig};
use harvest_core::error::{AppError, ExtractionFailure};
use harvest_core::models::compute_hash;
use harvest_core::record::NormalizedJobRecord;
use harvest_core::traits::RecordExtractor;
use harvest_core::transform::Extracted;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::fields::CompiledField;
use crate::html::{element_lines, element_text, page_text, parse_selector, read_attribute};

/// List items shorter than this are noise (stray glyphs, "or").
const MIN_ITEM_LEN: usize = 3;

struct Engine {
    rules: ExtractionRules,
    fields: HashMap<&'static str, CompiledField>,
    error_selectors: Vec<(String, Selector)>,
    item_selector: Selector,
    company_name: String,
}

/// Scraper-based [`RecordExtractor`] driven by the pattern document.
#[derive(Clone)]
pub struct JobPageExtractor {
    engine: Arc<Engine>,
}

/// Per-page evaluation context.
struct PageScope<'a> {
    root: ElementRef<'a>,
    url: Option<Url>,
    now: String,
}

impl JobPageExtractor {
    pub fn from_config(config: &HarvestConfig) -> Result<Self, AppError> {
        let extraction = config.require_extraction()?;
        let rules = extraction.compile()?;

        let mut fields = HashMap::new();
        for (name, rule) in extraction.field_rules() {
            fields.insert(name, CompiledField::compile(rule, name)?);
        }
        let error_selectors = extraction
            .error_selectors
            .iter()
            .map(|s| Ok((s.clone(), parse_selector(s, "html_extraction.error_selectors")?)))
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(Self {
            engine: Arc::new(Engine {
                rules,
                fields,
                error_selectors,
                item_selector: parse_selector("li", "list items")?,
                company_name: config.company_name.clone(),
            }),
        })
    }
}

impl Engine {
    fn value(&self, page: &PageScope<'_>, name: &str) -> Option<Extracted> {
        self.fields
            .get(name)?
            .resolve(page.root, page.url.as_ref(), &self.rules.transforms, &page.now)
    }

    fn text(&self, page: &PageScope<'_>, name: &str) -> String {
        self.value(page, name)
            .map(|v| v.into_text().trim().to_string())
            .unwrap_or_default()
    }

    fn optional_text(&self, page: &PageScope<'_>, name: &str) -> Option<String> {
        Some(self.text(page, name)).filter(|s| !s.is_empty())
    }

    /// A list field: `<li>` items when the matched element has them,
    /// otherwise its lines split into bullet items.
    fn list(&self, page: &PageScope<'_>, name: &str) -> Vec<String> {
        let Some(field) = self.fields.get(name) else {
            return Vec::new();
        };
        field
            .resolve_with(
                page.root,
                page.url.as_ref(),
                &self.rules.transforms,
                &page.now,
                |element, attribute| match attribute {
                    Attribute::Text => {
                        let items: Vec<String> = element
                            .select(&self.item_selector)
                            .map(element_text)
                            .filter(|item| item.chars().count() >= MIN_ITEM_LEN)
                            .collect();
                        if items.is_empty() {
                            Some(Extracted::Text(element_lines(element))).filter(|v| !v.is_empty())
                        } else {
                            Some(Extracted::List(items))
                        }
                    }
                    Attribute::Named(_) => read_attribute(element, attribute).map(Extracted::Text),
                },
            )
            .map(Extracted::into_list)
            .unwrap_or_default()
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }

    fn check_error_page(&self, html: &str, document: &Html) -> Result<(), ExtractionFailure> {
        // Phrases are read from the decoded text; the raw markup still catches
        // markers that only appear as class names.
        if let Some(marker) = self
            .rules
            .find_error_marker(&page_text(document))
            .or_else(|| self.rules.find_error_marker(html))
        {
            return Err(ExtractionFailure::ErrorPage { marker });
        }
        for (raw, selector) in &self.error_selectors {
            if document.select(selector).next().is_some() {
                return Err(ExtractionFailure::ErrorPage {
                    marker: raw.clone(),
                });
            }
        }
        Ok(())
    }

    fn extract(
        &self,
        html: &str,
        source_url: &str,
        file_name: &str,
    ) -> Result<NormalizedJobRecord, ExtractionFailure> {
        let document = Html::parse_document(html);
        self.check_error_page(html, &document)?;

        let mut page = PageScope {
            root: document.root_element(),
            url: Url::parse(source_url).ok(),
            now: chrono::Utc::now().to_rfc3339(),
        };

        // The page may know its own canonical URL better than the manifest.
        let source_url = self
            .optional_text(&page, "basic_info.source_url")
            .unwrap_or_else(|| source_url.to_string());
        if page.url.is_none() {
            page.url = Url::parse(&source_url).ok();
        }

        let job_id = self.text(&page, "basic_info.job_id");
        if job_id.is_empty() {
            return Err(ExtractionFailure::MissingField { field: "job_id" });
        }
        let title = self.text(&page, "basic_info.title");
        if title.is_empty() {
            return Err(ExtractionFailure::MissingField { field: "title" });
        }

        let description = self.text(&page, "content.description");
        let minimum_qualifications = self.list(&page, "content.required_qualifications");
        let preferred_qualifications = self.list(&page, "content.preferred_qualifications");
        let pay_benefit = self.text(&page, "content.pay_benefit");
        let location = self.text(&page, "location.location");

        let qualifications_text = minimum_qualifications
            .iter()
            .chain(&preferred_qualifications)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        let classification_text = format!("{title}\n{description}\n{qualifications_text}");

        let skills = self.rules.extract_skills(&qualifications_text);
        let salary = self.rules.extract_salary(&pay_benefit);
        let parts = parse_location(&location);

        let company = self
            .optional_text(&page, "basic_info.company")
            .unwrap_or_else(|| self.company_name.clone());
        let source_platform = self
            .optional_text(&page, "basic_info.source_platform")
            .or_else(|| page.url.as_ref().and_then(|u| u.host_str()).map(str::to_string))
            .unwrap_or_default();

        let mut record = NormalizedJobRecord {
            job_type: self.rules.classify_job_type(&classification_text),
            experience_level: self.rules.classify_experience(&classification_text),
            work_arrangement: self.rules.classify_work_arrangement(&classification_text),
            job_id,
            title,
            company,
            summary: self.text(&page, "content.summary"),
            city: parts.city,
            state: parts.state,
            country: parts.country,
            location,
            publish_date: self.optional_text(&page, "time_info.publish_date"),
            scraped_date: Some(
                self.optional_text(&page, "time_info.scraped_date")
                    .unwrap_or_else(|| page.now.clone()),
            ),
            department: self.text(&page, "team_info.department"),
            team: self.text(&page, "team_info.team"),
            salary_min: salary.salary_min,
            salary_max: salary.salary_max,
            salary_currency: salary.salary_currency,
            hourly_rate_min: salary.hourly_rate_min,
            hourly_rate_max: salary.hourly_rate_max,
            pay_benefit,
            required_skills: skills.required,
            preferred_skills: skills.preferred,
            education_requirements: education_requirements(&minimum_qualifications),
            experience_requirements: experience_requirements(
                &minimum_qualifications,
                &preferred_qualifications,
            ),
            minimum_qualifications,
            preferred_qualifications,
            application_url: self.text(&page, "application.application_url"),
            contact_email: self.text(&page, "application.contact_email"),
            description,
            source_url,
            source_platform,
            ..Default::default()
        };
        record
            .metadata
            .insert("source_file".into(), file_name.into());
        record
            .metadata
            .insert("content_hash".into(), compute_hash(html).into());
        Ok(record)
    }
}

impl RecordExtractor for JobPageExtractor {
    fn extract(
        &self,
        html: &str,
        source_url: &str,
        file_name: &str,
    ) -> Result<NormalizedJobRecord, ExtractionFailure> {
        self.engine.extract(html, source_url, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::record::{ExperienceLevel, JobType, WorkArrangement};

    const CONFIG: &str = r##"
company_name: Acme Corp
html_extraction:
  basic_info:
    job_id:
      selector: "#jobNumber"
      fallback_selectors: ["[data-job-id]"]
      transform: digits
    title:
      selector: "h1.job-title"
      transform: whitespace_normalize
  time_info:
    publish_date: "#postDate"
  location:
    location: ".job-location"
  content:
    summary: "#summary"
    description:
      selector: "#description"
      transform: whitespace_normalize
    pay_benefit: "#pay"
    required_qualifications: "#minQual"
    preferred_qualifications:
      selector: "#prefQual"
      transform: bullet_points_to_list
  team_info:
    team: ".team"
  application:
    application_url:
      selector: "a.apply"
      attribute: href
      transform: absolute_url
  transformations:
    digits:
      type: regex_replace
      pattern: '\D'
      replacement: ''
  job_type_patterns:
    internship: ['\bintern']
  experience_patterns:
    senior_level: ['\bsenior\b']
  work_arrangement_patterns:
    remote: ['\bremote\b']
  skills_extraction:
    technical_skills_patterns: ['\b(Rust|Kubernetes|SQL)\b']
    soft_skills_patterns: ['\bcommunication\b']
  salary_patterns:
    salary_range_pattern: '\$([\d,]+)\s*(?:-|to)\s*\$([\d,]+)'
  error_selectors: [".page-gone"]
"##;

    const JOB_PAGE: &str = r#"<html><body>
      <h1 class="job-title">Senior   Platform Engineer</h1>
      <span id="jobNumber">Role #200512</span>
      <span id="postDate">Mar 4, 2026</span>
      <span class="job-location">Cupertino, California, United States</span>
      <span class="team">Infrastructure</span>
      <div id="summary">Build the platform.</div>
      <div id="description">Own our Rust services.
         Fully remote friendly.</div>
      <div id="minQual"><ul>
        <li>BS in Computer Science</li>
        <li>5+ years of experience with Rust and SQL</li>
        <li>or</li>
      </ul></div>
      <div id="prefQual">• Kubernetes operations
• Strong communication skills</div>
      <div id="pay">Base pay $150,000 - $210,000 per year</div>
      <a class="apply" href="/apply/200512">Apply</a>
    </body></html>"#;

    fn extractor(yaml: &str) -> JobPageExtractor {
        JobPageExtractor::from_config(&HarvestConfig::from_yaml_str(yaml).unwrap()).unwrap()
    }

    #[test]
    fn extracts_full_record() {
        let record = extractor(CONFIG)
            .extract(JOB_PAGE, "https://jobs.acme.example/en-us/details/200512/platform", "200512.html")
            .unwrap();

        assert_eq!(record.job_id, "200512");
        assert_eq!(record.title, "Senior Platform Engineer");
        assert_eq!(record.company, "Acme Corp");
        assert_eq!(record.city, "Cupertino");
        assert_eq!(record.state, "California");
        assert_eq!(record.country, "United States");
        assert_eq!(record.publish_date.as_deref(), Some("Mar 4, 2026"));
        assert!(record.scraped_date.is_some());
        assert_eq!(record.team, "Infrastructure");
        assert_eq!(record.description, "Own our Rust services. Fully remote friendly.");

        assert_eq!(
            record.minimum_qualifications,
            vec!["BS in Computer Science", "5+ years of experience with Rust and SQL"]
        );
        assert_eq!(
            record.preferred_qualifications,
            vec!["Kubernetes operations", "Strong communication skills"]
        );
        assert_eq!(record.education_requirements, vec!["BS in Computer Science"]);
        assert_eq!(
            record.experience_requirements,
            vec![
                "5+ years of experience with Rust and SQL",
                "Kubernetes operations",
                "Strong communication skills"
            ]
        );

        assert_eq!(record.job_type, Some(JobType::FullTime));
        assert_eq!(record.experience_level, Some(ExperienceLevel::SeniorLevel));
        assert_eq!(record.work_arrangement, Some(WorkArrangement::Remote));
        assert_eq!(
            record.required_skills,
            vec!["Rust", "SQL", "Kubernetes", "communication"]
        );

        assert_eq!(record.salary_min, Some(150_000.0));
        assert_eq!(record.salary_max, Some(210_000.0));
        assert_eq!(record.salary_currency, "USD");

        assert_eq!(record.application_url, "https://jobs.acme.example/apply/200512");
        assert_eq!(record.source_platform, "jobs.acme.example");
        assert_eq!(record.metadata["source_file"], "200512.html");
        assert_eq!(record.metadata["content_hash"], compute_hash(JOB_PAGE).as_str());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn fallback_selector_supplies_job_id() {
        let html = r#"<h1 class="job-title">Intern</h1><div data-job-id="77">Req 77</div>"#;
        let record = extractor(CONFIG).extract(html, "", "77.html").unwrap();
        assert_eq!(record.job_id, "77");
        assert_eq!(record.job_type, Some(JobType::Internship));
        assert_eq!(record.source_platform, "");
    }

    #[test]
    fn error_phrase_yields_no_record() {
        let html = JOB_PAGE.replace("Build the platform.", "This job is no longer available.");
        let err = extractor(CONFIG).extract(&html, "", "x.html").unwrap_err();
        assert_eq!(
            err,
            ExtractionFailure::ErrorPage {
                marker: "is no longer available".into()
            }
        );
    }

    #[test]
    fn error_phrase_split_by_inline_markup_yields_no_record() {
        let html = r#"<h1 class="job-title">Data Engineer</h1><span id="jobNumber">42</span>
            <p>This job is <strong>no longer
            available</strong>.</p>"#;
        assert_eq!(
            extractor(CONFIG).extract(html, "", "42.html").unwrap_err(),
            ExtractionFailure::ErrorPage {
                marker: "is no longer available".into()
            }
        );
    }

    #[test]
    fn entity_encoded_error_phrase_yields_no_record() {
        let yaml = r#"
html_extraction:
  basic_info:
    job_id: "span.id"
    title: "h1"
  error_indicators: ["Sorry, this role doesn't exist"]
"#;
        let html = r#"<h1>Data Engineer</h1><span class="id">42</span>
            <p>Sorry, this role doesn&#39;t exist</p>"#;
        assert_eq!(
            extractor(yaml).extract(html, "", "42.html").unwrap_err(),
            ExtractionFailure::ErrorPage {
                marker: "Sorry, this role doesn't exist".into()
            }
        );
    }

    #[test]
    fn class_name_marker_matches_raw_markup() {
        let yaml = r#"
html_extraction:
  basic_info:
    job_id: "span.id"
    title: "h1"
  error_indicators: ["page-not-found-wrapper"]
"#;
        let html = r#"<div class="page-not-found-wrapper"><h1>Oops</h1><span class="id">1</span></div>"#;
        assert!(matches!(
            extractor(yaml).extract(html, "", "1.html"),
            Err(ExtractionFailure::ErrorPage { .. })
        ));
    }

    #[test]
    fn error_selector_yields_no_record() {
        let html = JOB_PAGE.replace("<body>", r#"<body><div class="page-gone"></div>"#);
        assert!(matches!(
            extractor(CONFIG).extract(&html, "", "x.html"),
            Err(ExtractionFailure::ErrorPage { .. })
        ));
    }

    #[test]
    fn missing_mandatory_fields_yield_no_record() {
        let no_title = JOB_PAGE.replace("job-title", "headline");
        assert_eq!(
            extractor(CONFIG).extract(&no_title, "", "x.html").unwrap_err(),
            ExtractionFailure::MissingField { field: "title" }
        );

        let no_id = r#"<h1 class="job-title">Engineer</h1>"#;
        assert_eq!(
            extractor(CONFIG).extract(no_id, "", "x.html").unwrap_err(),
            ExtractionFailure::MissingField { field: "job_id" }
        );
    }

    #[test]
    fn url_param_and_defaults() {
        let yaml = r#"
html_extraction:
  basic_info:
    job_id: {url_param: jobId}
    title: "h1"
    company: {selector: ".company", default: "Fallback Inc"}
    source_platform: {default: "careers-portal"}
"#;
        let record = extractor(yaml)
            .extract("<h1>Analyst</h1>", "https://careers.example/job?jobId=991", "991.html")
            .unwrap();
        assert_eq!(record.job_id, "991");
        assert_eq!(record.company, "Fallback Inc");
        assert_eq!(record.source_platform, "careers-portal");
        assert_eq!(record.source_url, "https://careers.example/job?jobId=991");
    }

    #[test]
    fn missing_section_and_bad_selector_are_config_errors() {
        let config = HarvestConfig::from_yaml_str("company_name: Acme\n").unwrap();
        assert!(matches!(
            JobPageExtractor::from_config(&config),
            Err(AppError::ConfigError(_))
        ));

        let config =
            HarvestConfig::from_yaml_str("html_extraction:\n  basic_info:\n    title: 'h1['\n")
                .unwrap();
        assert!(matches!(
            JobPageExtractor::from_config(&config),
            Err(AppError::ConfigError(_))
        ));
    }
}
