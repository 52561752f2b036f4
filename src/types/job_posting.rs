// src/types/job_posting.rs
//! Job posting records and the inputs they are created from

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::coerce::{coerce_number, non_empty_str, string_list, truthy};

// ===== Enumerations =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum EmploymentType {
    #[default]
    FullTime,
    PartTime,
    Contract,
    Internship,
    Freelance,
}

impl EmploymentType {
    /// Unknown values fall back to full time.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PART_TIME" => Self::PartTime,
            "CONTRACT" => Self::Contract,
            "INTERNSHIP" => Self::Internship,
            "FREELANCE" => Self::Freelance,
            _ => Self::FullTime,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullTime => "FULL_TIME",
            Self::PartTime => "PART_TIME",
            Self::Contract => "CONTRACT",
            Self::Internship => "INTERNSHIP",
            Self::Freelance => "FREELANCE",
        }
    }
}

impl From<String> for EmploymentType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RoleLevel {
    Junior,
    #[default]
    Mid,
    Senior,
    Lead,
}

impl RoleLevel {
    /// Unknown values fall back to mid level.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "junior" => Self::Junior,
            "senior" => Self::Senior,
            "lead" => Self::Lead,
            _ => Self::Mid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Junior => "junior",
            Self::Mid => "mid",
            Self::Senior => "senior",
            Self::Lead => "lead",
        }
    }
}

impl From<String> for RoleLevel {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl fmt::Display for RoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Closed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [Self::Draft, Self::Active, Self::Paused, Self::Closed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
            Self::Closed => "CLOSED",
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown job status: {}", s))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionMethod {
    AiExtracted,
    Manual,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiExtracted => "AI_EXTRACTED",
            Self::Manual => "MANUAL",
        }
    }

    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("AI_EXTRACTED") {
            Self::AiExtracted
        } else {
            Self::Manual
        }
    }
}

impl FromStr for ExtractionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::AiExtracted, Self::Manual]
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown extraction method: {}", s))
    }
}

// ===== Inputs =====

/// Job posting content, either typed into the company form or extracted from a web page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobPostingInput {
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_type: EmploymentType,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub description: String,
    pub requirements: String,
    pub benefits: Option<String>,
    pub remote_allowed: bool,
    pub minimum_experience: u32,
    pub preferred_education: Option<String>,
    pub role_level: RoleLevel,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub company_name: Option<String>,
}

impl JobPostingInput {
    /// Normalize a loosely-typed model reply into a posting.
    pub fn from_extracted(parsed: &Value) -> Self {
        Self {
            title: non_empty_str(&parsed["title"])
                .unwrap_or_else(|| "Job Title Not Found".to_string()),
            department: non_empty_str(&parsed["department"]),
            location: Some(
                non_empty_str(&parsed["location"])
                    .unwrap_or_else(|| "Location Not Specified".to_string()),
            ),
            employment_type: parsed["employmentType"]
                .as_str()
                .map(EmploymentType::parse)
                .unwrap_or_default(),
            salary_min: coerce_number(&parsed["salaryMin"]).filter(|v| *v != 0.0),
            salary_max: coerce_number(&parsed["salaryMax"]).filter(|v| *v != 0.0),
            salary_currency: Some(
                non_empty_str(&parsed["salaryCurrency"]).unwrap_or_else(|| "USD".to_string()),
            ),
            description: non_empty_str(&parsed["description"])
                .unwrap_or_else(|| "Job description not available".to_string()),
            requirements: non_empty_str(&parsed["requirements"])
                .unwrap_or_else(|| "Requirements not specified".to_string()),
            benefits: non_empty_str(&parsed["benefits"]),
            remote_allowed: truthy(&parsed["remoteAllowed"]),
            minimum_experience: coerce_number(&parsed["minimumExperience"])
                .filter(|v| *v > 0.0)
                .map(|v| v.round() as u32)
                .unwrap_or(0),
            preferred_education: non_empty_str(&parsed["preferredEducation"]),
            role_level: parsed["roleLevel"]
                .as_str()
                .map(RoleLevel::parse)
                .unwrap_or_default(),
            required_skills: string_list(&parsed["requiredSkills"]),
            preferred_skills: string_list(&parsed["preferredSkills"]),
            company_name: non_empty_str(&parsed["companyName"]),
        }
    }

    /// Placeholder posting used when the model reply is not valid JSON.
    pub fn extraction_fallback() -> Self {
        Self {
            title: "Failed to Extract Job Title".to_string(),
            location: Some("Unknown".to_string()),
            salary_currency: Some("USD".to_string()),
            description:
                "Failed to extract job description. Please try again or contact support."
                    .to_string(),
            requirements: "Failed to extract job requirements.".to_string(),
            ..Self::default()
        }
    }
}

// ===== Stored record =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_type: EmploymentType,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: String,
    pub description: String,
    pub requirements: String,
    pub benefits: Option<String>,
    pub remote_allowed: bool,
    pub status: JobStatus,
    pub minimum_experience: u32,
    pub preferred_education: Option<String>,
    pub role_level: RoleLevel,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub company_name: Option<String>,
    pub source_url: Option<String>,
    pub extracted_at: Option<DateTime<Utc>>,
    pub extraction_method: ExtractionMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
}

impl JobPosting {
    pub fn company_or(&self, fallback: &str) -> String {
        self.company_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPostingStats {
    pub total: i64,
    pub ai_extracted: i64,
    pub manual: i64,
    pub by_status: std::collections::BTreeMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_extracted_applies_defaults() {
        let posting = JobPostingInput::from_extracted(&json!({
            "title": "  ",
            "employmentType": "SEASONAL",
            "roleLevel": "principal",
            "requiredSkills": "Rust, Go",
            "remoteAllowed": "yes"
        }));

        assert_eq!(posting.title, "Job Title Not Found");
        assert_eq!(posting.location.as_deref(), Some("Location Not Specified"));
        assert_eq!(posting.employment_type, EmploymentType::FullTime);
        assert_eq!(posting.role_level, RoleLevel::Mid);
        assert!(posting.required_skills.is_empty());
        assert!(posting.remote_allowed);
        assert_eq!(posting.salary_currency.as_deref(), Some("USD"));
        assert_eq!(posting.description, "Job description not available");
    }

    #[test]
    fn test_from_extracted_coerces_numbers() {
        let posting = JobPostingInput::from_extracted(&json!({
            "title": "Backend Engineer",
            "salaryMin": "60,000",
            "salaryMax": 0,
            "minimumExperience": 2.6,
            "employmentType": "contract",
            "roleLevel": "Senior",
            "requiredSkills": ["Rust", "", "SQL"]
        }));

        assert_eq!(posting.salary_min, Some(60000.0));
        assert_eq!(posting.salary_max, None);
        assert_eq!(posting.minimum_experience, 3);
        assert_eq!(posting.employment_type, EmploymentType::Contract);
        assert_eq!(posting.role_level, RoleLevel::Senior);
        assert_eq!(posting.required_skills, vec!["Rust", "SQL"]);
    }

    #[test]
    fn test_job_status_from_str() {
        assert_eq!("active".parse::<JobStatus>(), Ok(JobStatus::Active));
        assert!("archived".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_extraction_method_from_str_is_strict() {
        assert_eq!(
            "ai_extracted".parse::<ExtractionMethod>(),
            Ok(ExtractionMethod::AiExtracted)
        );
        assert_eq!(" MANUAL ".parse::<ExtractionMethod>(), Ok(ExtractionMethod::Manual));
        assert!("scraped".parse::<ExtractionMethod>().is_err());
    }

    #[test]
    fn test_form_input_deserializes_with_missing_fields() {
        let input: JobPostingInput = serde_json::from_str(
            r#"{"title": "Data Engineer", "description": "Pipelines", "employmentType": "PART_TIME"}"#,
        )
        .unwrap();
        assert_eq!(input.employment_type, EmploymentType::PartTime);
        assert_eq!(input.role_level, RoleLevel::Mid);
        assert!(input.required_skills.is_empty());
    }
}
