//! The normalized job record produced by the extraction engine.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Employment type of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
    Freelance,
    Volunteer,
}

/// Seniority of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    EntryLevel,
    Associate,
    MidLevel,
    SeniorLevel,
    Director,
    Executive,
    Internship,
    NotApplicable,
}

/// Where the work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkArrangement {
    OnSite,
    Remote,
    Hybrid,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "full_time",
            JobType::PartTime => "part_time",
            JobType::Contract => "contract",
            JobType::Temporary => "temporary",
            JobType::Internship => "internship",
            JobType::Freelance => "freelance",
            JobType::Volunteer => "volunteer",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full_time" => Ok(JobType::FullTime),
            "part_time" => Ok(JobType::PartTime),
            "contract" => Ok(JobType::Contract),
            "temporary" => Ok(JobType::Temporary),
            "internship" => Ok(JobType::Internship),
            "freelance" => Ok(JobType::Freelance),
            "volunteer" => Ok(JobType::Volunteer),
            _ => Err(format!("Unknown job type: {s}")),
        }
    }
}

/// A fully normalized job posting.
///
/// `job_id` and `title` are always non-empty; the salary pair and the
/// hourly pair each hold `min <= max` when both ends are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedJobRecord {
    // Identity
    pub job_id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub summary: String,

    // Location
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub work_arrangement: Option<WorkArrangement>,

    // Timing
    #[serde(default)]
    pub publish_date: Option<String>,
    #[serde(default)]
    pub scraped_date: Option<String>,

    // Employment
    #[serde(default)]
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub team: String,

    // Compensation
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub salary_max: Option<f64>,
    #[serde(default)]
    pub salary_currency: String,
    #[serde(default)]
    pub hourly_rate_min: Option<f64>,
    #[serde(default)]
    pub hourly_rate_max: Option<f64>,
    #[serde(default)]
    pub pay_benefit: String,

    // Skills and qualifications
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub minimum_qualifications: Vec<String>,
    #[serde(default)]
    pub preferred_qualifications: Vec<String>,
    #[serde(default)]
    pub education_requirements: Vec<String>,
    #[serde(default)]
    pub experience_requirements: Vec<String>,

    // Application
    #[serde(default)]
    pub application_url: String,
    #[serde(default)]
    pub contact_email: String,

    // Provenance
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub source_platform: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl NormalizedJobRecord {
    /// Check the record invariants before it is written out.
    pub fn validate(&self) -> Result<(), String> {
        if self.job_id.trim().is_empty() {
            return Err("job_id is empty".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("title is empty".to_string());
        }
        if let (Some(min), Some(max)) = (self.salary_min, self.salary_max) {
            if min > max {
                return Err(format!("salary_min {min} exceeds salary_max {max}"));
            }
        }
        if let (Some(min), Some(max)) = (self.hourly_rate_min, self.hourly_rate_max) {
            if min > max {
                return Err(format!("hourly_rate_min {min} exceeds hourly_rate_max {max}"));
            }
        }
        Ok(())
    }

    pub fn has_salary_info(&self) -> bool {
        self.salary_min.is_some()
            || self.salary_max.is_some()
            || self.hourly_rate_min.is_some()
            || self.hourly_rate_max.is_some()
            || !self.pay_benefit.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> NormalizedJobRecord {
        NormalizedJobRecord {
            job_id: "200".into(),
            title: "Software Engineer".into(),
            company: "Acme".into(),
            ..Default::default()
        }
    }

    #[test]
    fn enums_serialize_snake_case() {
        let mut r = record();
        r.job_type = Some(JobType::FullTime);
        r.experience_level = Some(ExperienceLevel::SeniorLevel);
        r.work_arrangement = Some(WorkArrangement::OnSite);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["job_type"], "full_time");
        assert_eq!(json["experience_level"], "senior_level");
        assert_eq!(json["work_arrangement"], "on_site");
        assert!(json["salary_min"].is_null());
    }

    #[test]
    fn unknown_enum_value_is_rejected_on_load() {
        let mut json = serde_json::to_value(record()).unwrap();
        json["job_type"] = serde_json::json!("gig");
        assert!(serde_json::from_value::<NormalizedJobRecord>(json).is_err());
    }

    #[test]
    fn job_type_parses_case_insensitively() {
        assert_eq!("FULL_TIME".parse::<JobType>().unwrap(), JobType::FullTime);
        assert!("weekly".parse::<JobType>().is_err());
    }

    #[test]
    fn validate_checks_mandatory_fields_and_salary_order() {
        assert!(record().validate().is_ok());

        let mut no_title = record();
        no_title.title = "  ".into();
        assert!(no_title.validate().is_err());

        let mut inverted = record();
        inverted.salary_min = Some(200_000.0);
        inverted.salary_max = Some(100_000.0);
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn salary_info_detection() {
        let mut r = record();
        assert!(!r.has_salary_info());
        r.hourly_rate_min = Some(25.0);
        assert!(r.has_salary_info());
    }
}
