//! Text analysis over extracted job content: classification, skills,
//! salary parsing, location decomposition and requirement routing.
//!
//! Everything here works on plain strings; the DOM side lives in the client
//! crate's extractor.

use regex::Regex;

use crate::config::{ExtractionConfig, SkillsTarget, compile_keyword, compile_pattern};
use crate::error::AppError;
use crate::record::{ExperienceLevel, JobType, WorkArrangement};
use crate::transform::TransformSet;

const EDUCATION_TERMS: &[&str] = &[
    "degree",
    "bachelor",
    "master",
    "phd",
    "ph.d",
    "mba",
    "education",
    "universit",
    "college",
    "graduate",
    "computer science",
    "engineering",
];

/// Education terms that keep a line out of the experience list.
const EDUCATION_EXCLUDE_TERMS: &[&str] = &[
    "degree",
    "bachelor",
    "master",
    "phd",
    "ph.d",
    "education",
    "universit",
    "college",
];

/// Matched as whole words only.
const DEGREE_ABBREVIATIONS: &[&str] = &["bs", "ba", "ms", "ma", "b.s", "b.a", "m.s", "m.a"];

const EXPERIENCE_TERMS: &[&str] = &[
    "experience",
    "years",
    "background",
    "familiar",
    "knowledge of",
    "understanding of",
    "skilled",
    "proficient",
    "expertise",
    "working with",
    "development",
    "programming",
];

fn mentions_any(lowered: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| lowered.contains(t))
}

fn mentions_degree_abbreviation(lowered: &str) -> bool {
    lowered
        .split(|c: char| !c.is_alphanumeric() && c != '.')
        .map(|w| w.trim_matches('.'))
        .any(|w| DEGREE_ABBREVIATIONS.contains(&w))
}

fn is_education(line: &str) -> bool {
    let lowered = line.to_lowercase();
    mentions_any(&lowered, EDUCATION_TERMS) || mentions_degree_abbreviation(&lowered)
}

fn is_experience(line: &str) -> bool {
    let lowered = line.to_lowercase();
    let education = mentions_any(&lowered, EDUCATION_EXCLUDE_TERMS)
        || mentions_degree_abbreviation(&lowered);
    !education && mentions_any(&lowered, EXPERIENCE_TERMS)
}

/// Parsed compensation figures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalaryInfo {
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: String,
    pub hourly_rate_min: Option<f64>,
    pub hourly_rate_max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationParts {
    pub city: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Skills {
    pub required: Vec<String>,
    pub preferred: Vec<String>,
}

/// The `html_extraction` section with every regex compiled.
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    pub config: ExtractionConfig,
    pub transforms: TransformSet,
    job_types: Vec<(JobType, Vec<Regex>)>,
    experience_levels: Vec<(ExperienceLevel, Vec<Regex>)>,
    arrangements: Vec<(WorkArrangement, Vec<Regex>)>,
    technical_skills: Vec<Regex>,
    soft_skills: Vec<(Regex, String)>,
    salary_range: Option<Regex>,
    hourly_rate: Option<Regex>,
    error_indicators: Vec<String>,
}

fn compile_table<K: Copy>(
    table: &indexmap::IndexMap<K, Vec<String>>,
    section: &str,
) -> Result<Vec<(K, Vec<Regex>)>, AppError> {
    table
        .iter()
        .map(|(category, keywords)| {
            let compiled = keywords
                .iter()
                .map(|k| compile_keyword(k, section))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((*category, compiled))
        })
        .collect()
}

/// Readable skill name from a keyword pattern: word-boundary markers removed.
fn soft_skill_name(pattern: &str) -> String {
    pattern.replace(r"\b", "").trim().to_string()
}

impl ExtractionRules {
    pub fn compile(config: &ExtractionConfig) -> Result<Self, AppError> {
        let transforms = TransformSet::compile(&config.transformations)?;
        for (name, rule) in config.field_rules() {
            transforms.check(rule.transforms(), name)?;
        }

        let skills = &config.skills_extraction;
        let technical_skills = skills
            .technical_skills_patterns
            .iter()
            .map(|p| compile_keyword(p, "skills_extraction.technical_skills_patterns"))
            .collect::<Result<Vec<_>, _>>()?;
        let soft_skills = skills
            .soft_skills_patterns
            .iter()
            .map(|p| {
                compile_keyword(p, "skills_extraction.soft_skills_patterns")
                    .map(|re| (re, soft_skill_name(p)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let salary = &config.salary_patterns;
        let salary_range = salary
            .salary_range_pattern
            .as_deref()
            .map(|p| compile_pattern(p, "salary_patterns.salary_range_pattern"))
            .transpose()?;
        let hourly_rate = salary
            .hourly_rate_pattern
            .as_deref()
            .map(|p| compile_pattern(p, "salary_patterns.hourly_rate_pattern"))
            .transpose()?;

        Ok(Self {
            job_types: compile_table(&config.job_type_patterns, "job_type_patterns")?,
            experience_levels: compile_table(&config.experience_patterns, "experience_patterns")?,
            arrangements: compile_table(
                &config.work_arrangement_patterns,
                "work_arrangement_patterns",
            )?,
            technical_skills,
            soft_skills,
            salary_range,
            hourly_rate,
            error_indicators: config
                .error_indicators
                .iter()
                .map(|i| collapse_whitespace(&i.to_lowercase()))
                .collect(),
            transforms,
            config: config.clone(),
        })
    }

    /// First configured error phrase found in `text`, if any. Case and runs
    /// of whitespace are ignored.
    pub fn find_error_marker(&self, text: &str) -> Option<String> {
        let haystack = collapse_whitespace(&text.to_lowercase());
        self.error_indicators
            .iter()
            .zip(&self.config.error_indicators)
            .find(|(lowered, _)| haystack.contains(lowered.as_str()))
            .map(|(_, original)| original.clone())
    }

    pub fn classify_job_type(&self, text: &str) -> Option<JobType> {
        first_match(&self.job_types, text).or(self.config.default_job_type)
    }

    pub fn classify_experience(&self, text: &str) -> Option<ExperienceLevel> {
        first_match(&self.experience_levels, text)
    }

    pub fn classify_work_arrangement(&self, text: &str) -> Option<WorkArrangement> {
        first_match(&self.arrangements, text)
    }

    /// Scan qualification text for skills. Technical patterns contribute
    /// their capture groups (or the whole match); soft patterns contribute
    /// their readable name.
    pub fn extract_skills(&self, text: &str) -> Skills {
        let mut technical = Vec::new();
        for re in &self.technical_skills {
            for caps in re.captures_iter(text) {
                if caps.len() > 1 {
                    for group in caps.iter().skip(1).flatten() {
                        push_unique(&mut technical, group.as_str().trim());
                    }
                } else if let Some(whole) = caps.get(0) {
                    push_unique(&mut technical, whole.as_str().trim());
                }
            }
        }

        let mut soft = Vec::new();
        for (re, name) in &self.soft_skills {
            if re.is_match(text) {
                push_unique(&mut soft, name);
            }
        }

        let mut skills = Skills {
            required: technical,
            preferred: Vec::new(),
        };
        match self.config.skills_extraction.soft_skills_target {
            SkillsTarget::Required => {
                for s in soft {
                    push_unique(&mut skills.required, &s);
                }
            }
            SkillsTarget::Preferred => skills.preferred = soft,
        }
        skills
    }

    /// Parse salary figures from pay/benefits text. Malformed numbers are
    /// dropped, as is a range whose minimum exceeds its maximum.
    pub fn extract_salary(&self, text: &str) -> SalaryInfo {
        let mut info = SalaryInfo::default();
        if text.trim().is_empty() {
            return info;
        }

        if let Some(caps) = self.salary_range.as_ref().and_then(|re| re.captures(text)) {
            let min = caps.get(1).and_then(|m| parse_amount(m.as_str()));
            let max = caps.get(2).and_then(|m| parse_amount(m.as_str()));
            if let (Some(min), Some(max)) = (min, max) {
                if min <= max {
                    info.salary_min = Some(min);
                    info.salary_max = Some(max);
                    info.salary_currency = self.config.salary_patterns.currency.clone();
                }
            }
        }

        if let Some(caps) = self.hourly_rate.as_ref().and_then(|re| re.captures(text)) {
            let min = caps.get(1).and_then(|m| parse_amount(m.as_str()));
            let max = caps.get(2).and_then(|m| parse_amount(m.as_str()));
            match (min, max) {
                (Some(min), Some(max)) if min <= max => {
                    info.hourly_rate_min = Some(min);
                    info.hourly_rate_max = Some(max);
                }
                (Some(min), None) => info.hourly_rate_min = Some(min),
                _ => {}
            }
            if info.hourly_rate_min.is_some() && info.salary_currency.is_empty() {
                info.salary_currency = self.config.salary_patterns.currency.clone();
            }
        }
        info
    }
}

fn first_match<K: Copy>(table: &[(K, Vec<Regex>)], text: &str) -> Option<K> {
    table
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(text)))
        .map(|(category, _)| *category)
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        list.push(value.to_string());
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").trim().parse::<f64>().ok()
}

/// Split a location by comma position: city, state, then country.
pub fn parse_location(location: &str) -> LocationParts {
    let parts: Vec<&str> = location
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let mut out = LocationParts::default();
    if parts.len() < 2 {
        return out;
    }
    out.city = parts[0].to_string();
    out.state = parts[1].to_string();
    if let Some(country) = parts.get(2) {
        out.country = country.to_string();
    }
    out
}

/// Qualification lines that talk about education.
pub fn education_requirements(qualifications: &[String]) -> Vec<String> {
    qualifications
        .iter()
        .filter(|q| is_education(q))
        .cloned()
        .collect()
}

/// Experience lines from the minimum list, followed by every preferred line.
pub fn experience_requirements(minimum: &[String], preferred: &[String]) -> Vec<String> {
    minimum
        .iter()
        .filter(|q| is_experience(q))
        .chain(preferred)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarvestConfig;

    fn rules(yaml: &str) -> ExtractionRules {
        HarvestConfig::from_yaml_str(yaml)
            .unwrap()
            .require_extraction()
            .unwrap()
            .compile()
            .unwrap()
    }

    const TABLES: &str = r#"
html_extraction:
  job_type_patterns:
    internship: ['\bintern\b', 'internship']
    contract: ['contract']
  experience_patterns:
    senior_level: ['\bsenior\b', '\bsr\.?\b']
    entry_level: ['entry.level', 'new grad']
  work_arrangement_patterns:
    remote: ['\bremote\b']
    hybrid: ['hybrid']
  skills_extraction:
    technical_skills_patterns: ['\b(Python|Rust|SQL)\b']
    soft_skills_patterns: ['\bcommunication\b', '\bleadership\b']
  salary_patterns:
    salary_range_pattern: '\$([\d,]+(?:\.\d+)?)\s*(?:-|to|and)\s*\$([\d,]+(?:\.\d+)?)'
    hourly_rate_pattern: '\$([\d.]+)(?:\s*-\s*\$([\d.]+))?\s*per hour'
"#;

    #[test]
    fn classification_uses_first_matching_category() {
        let r = rules(TABLES);
        assert_eq!(
            r.classify_job_type("Summer Intern, contract role"),
            Some(JobType::Internship)
        );
        assert_eq!(r.classify_job_type("Staff Engineer"), Some(JobType::FullTime));
        assert_eq!(
            r.classify_experience("Sr. Engineer for new grad mentoring"),
            Some(ExperienceLevel::SeniorLevel)
        );
        assert_eq!(r.classify_experience("Engineer"), None);
        assert_eq!(
            r.classify_work_arrangement("Hybrid or REMOTE"),
            Some(WorkArrangement::Remote)
        );
        assert_eq!(r.classify_work_arrangement("Cupertino office"), None);
    }

    #[test]
    fn default_job_type_can_be_unset() {
        let r = rules("html_extraction:\n  default_job_type: null\n");
        assert_eq!(r.classify_job_type("anything"), None);
    }

    #[test]
    fn skills_collect_unique_matches() {
        let r = rules(TABLES);
        let skills = r.extract_skills("Python and SQL. More python. Strong communication.");
        assert_eq!(skills.required, vec!["Python", "SQL", "communication"]);
        assert!(skills.preferred.is_empty());
    }

    #[test]
    fn soft_skills_can_route_to_preferred() {
        let r = rules(
            r#"
html_extraction:
  skills_extraction:
    technical_skills_patterns: ['\b(Rust)\b']
    soft_skills_patterns: ['\bleadership\b']
    soft_skills_target: preferred
"#,
        );
        let skills = r.extract_skills("Rust and leadership");
        assert_eq!(skills.required, vec!["Rust"]);
        assert_eq!(skills.preferred, vec!["leadership"]);
    }

    #[test]
    fn salary_range_strips_thousands_separators() {
        let r = rules(TABLES);
        let info = r.extract_salary("Base pay ranges from $120,000 to $180,000.50 per year");
        assert_eq!(info.salary_min, Some(120_000.0));
        assert_eq!(info.salary_max, Some(180_000.5));
        assert_eq!(info.salary_currency, "USD");
    }

    #[test]
    fn inverted_salary_range_is_dropped() {
        let r = rules(TABLES);
        let info = r.extract_salary("$200,000 - $100,000");
        assert_eq!(info.salary_min, None);
        assert_eq!(info.salary_max, None);
    }

    #[test]
    fn hourly_rate_single_and_range() {
        let r = rules(TABLES);
        let single = r.extract_salary("Pays $25.50 per hour");
        assert_eq!(single.hourly_rate_min, Some(25.5));
        assert_eq!(single.hourly_rate_max, None);

        let range = r.extract_salary("Pays $20 - $30 per hour");
        assert_eq!(range.hourly_rate_min, Some(20.0));
        assert_eq!(range.hourly_rate_max, Some(30.0));
    }

    #[test]
    fn empty_pay_text_yields_nothing() {
        let r = rules(TABLES);
        assert_eq!(r.extract_salary("   "), SalaryInfo::default());
    }

    #[test]
    fn error_markers_match_case_insensitively() {
        let r = rules("html_extraction: {}\n");
        assert_eq!(
            r.find_error_marker("<p>Sorry, this ROLE does not exist</p>").as_deref(),
            Some("Sorry, this role does not exist")
        );
        assert_eq!(r.find_error_marker("Senior Engineer"), None);
    }

    #[test]
    fn error_markers_ignore_line_breaks_in_text() {
        let r = rules("html_extraction: {}\n");
        assert_eq!(
            r.find_error_marker("This position is no longer\n    available.").as_deref(),
            Some("is no longer available")
        );
    }

    #[test]
    fn location_splits_by_position() {
        assert_eq!(
            parse_location("Cupertino, California, United States"),
            LocationParts {
                city: "Cupertino".into(),
                state: "California".into(),
                country: "United States".into(),
            }
        );
        let two = parse_location("Austin, TX");
        assert_eq!(two.city, "Austin");
        assert_eq!(two.state, "TX");
        assert_eq!(two.country, "");
        assert_eq!(parse_location("Remote"), LocationParts::default());
    }

    #[test]
    fn requirements_are_routed_by_keyword() {
        let minimum = vec![
            "BS in Computer Science or equivalent".to_string(),
            "5+ years of experience building services".to_string(),
            "Strong communicator".to_string(),
        ];
        let preferred = vec!["Familiarity with Kubernetes".to_string()];

        assert_eq!(
            education_requirements(&minimum),
            vec!["BS in Computer Science or equivalent"]
        );
        assert_eq!(
            experience_requirements(&minimum, &preferred),
            vec![
                "5+ years of experience building services",
                "Familiarity with Kubernetes"
            ]
        );
    }
}
