// src/types/pipeline.rs
//! Structured data produced by the three pipeline stages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use super::coerce;
use super::job_posting::{JobPosting, RoleLevel};

// ===== Extraction =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CandidateData {
    #[serde(deserialize_with = "coerce::number_or_zero")]
    pub years_of_experience: f64,
    #[serde(deserialize_with = "coerce::list")]
    pub technical_skills: Vec<String>,
    #[serde(deserialize_with = "coerce::text_or_unknown")]
    pub education_level: String,
    #[serde(deserialize_with = "coerce::list")]
    pub previous_roles: Vec<String>,
    #[serde(deserialize_with = "coerce::list")]
    pub red_flags: Vec<String>,
}

impl Default for CandidateData {
    fn default() -> Self {
        Self {
            years_of_experience: 0.0,
            technical_skills: Vec::new(),
            education_level: "Unknown".to_string(),
            previous_roles: Vec::new(),
            red_flags: Vec::new(),
        }
    }
}

impl CandidateData {
    /// Returned when the model reply cannot be parsed
    pub fn fallback() -> Self {
        Self {
            red_flags: vec!["Failed to parse candidate data".to_string()],
            ..Self::default()
        }
    }
}

// ===== Analysis =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRequirements {
    pub required_skills: Vec<String>,
    pub minimum_experience: u32,
    pub preferred_education: String,
    pub role_level: RoleLevel,
    pub job_requirements: String,
}

impl Default for JobRequirements {
    fn default() -> Self {
        Self {
            required_skills: Vec::new(),
            minimum_experience: 0,
            preferred_education: String::new(),
            role_level: RoleLevel::Mid,
            job_requirements: String::new(),
        }
    }
}

impl From<&JobPosting> for JobRequirements {
    fn from(posting: &JobPosting) -> Self {
        Self {
            required_skills: posting.required_skills.clone(),
            minimum_experience: posting.minimum_experience,
            preferred_education: posting.preferred_education.clone().unwrap_or_default(),
            role_level: posting.role_level,
            job_requirements: posting.requirements.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    #[serde(deserialize_with = "coerce::score")]
    pub technical_skills_score: f64,
    #[serde(deserialize_with = "coerce::score")]
    pub experience_score: f64,
    #[serde(deserialize_with = "coerce::score")]
    pub education_score: f64,
    #[serde(deserialize_with = "coerce::score")]
    pub overall_fit: f64,
    #[serde(deserialize_with = "coerce::list")]
    pub concerns: Vec<String>,
    #[serde(deserialize_with = "coerce::list")]
    pub strengths: Vec<String>,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            technical_skills_score: 5.0,
            experience_score: 5.0,
            education_score: 5.0,
            overall_fit: 5.0,
            concerns: Vec::new(),
            strengths: Vec::new(),
        }
    }
}

impl AnalysisResult {
    pub fn fallback() -> Self {
        Self {
            concerns: vec!["Failed to analyze candidate properly".to_string()],
            ..Self::default()
        }
    }
}

// ===== Decision =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum Recommendation {
    Hire,
    Reject,
    Maybe,
}

impl Recommendation {
    /// Lenient parse: anything that is not a hire or a reject needs a human.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "HIRE" => Self::Hire,
            "REJECT" | "NO_HIRE" => Self::Reject,
            _ => Self::Maybe,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hire => "HIRE",
            Self::Reject => "REJECT",
            Self::Maybe => "MAYBE",
        }
    }
}

impl From<String> for Recommendation {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// `null` or a non-string recommendation is treated as undecided
fn any_recommendation<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Recommendation, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Recommendation::parse(&s),
        _ => Recommendation::Maybe,
    })
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecisionResult {
    #[serde(deserialize_with = "any_recommendation")]
    pub recommendation: Recommendation,
    #[serde(deserialize_with = "coerce::score")]
    pub confidence: f64,
    #[serde(deserialize_with = "coerce::list")]
    pub reasoning: Vec<String>,
    #[serde(deserialize_with = "coerce::list")]
    pub next_steps: Vec<String>,
}

impl Default for DecisionResult {
    fn default() -> Self {
        Self {
            recommendation: Recommendation::Maybe,
            confidence: 5.0,
            reasoning: Vec::new(),
            next_steps: Vec::new(),
        }
    }
}

impl DecisionResult {
    pub fn fallback() -> Self {
        Self {
            reasoning: vec!["Failed to make proper decision - requires manual review".to_string()],
            next_steps: vec![
                "Manual review required".to_string(),
                "Check agent logs for errors".to_string(),
            ],
            ..Self::default()
        }
    }
}

// ===== Scheduling & aggregate result =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledMeeting {
    pub event_id: String,
    pub scheduled_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub calendar_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub candidate_data: CandidateData,
    pub analysis_result: AnalysisResult,
    pub decision_result: DecisionResult,
    pub job_requirements: JobRequirements,
    pub processed_at: DateTime<Utc>,
    pub scheduled_meeting: Option<ScheduledMeeting>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_parse_is_lenient() {
        assert_eq!(Recommendation::parse("hire"), Recommendation::Hire);
        assert_eq!(Recommendation::parse(" REJECT "), Recommendation::Reject);
        assert_eq!(Recommendation::parse("NO_HIRE"), Recommendation::Reject);
        assert_eq!(Recommendation::parse("strong yes"), Recommendation::Maybe);
    }

    #[test]
    fn test_decision_tolerates_missing_fields() {
        let decision: DecisionResult =
            serde_json::from_str(r#"{"recommendation": "Hire", "confidence": 8}"#).unwrap();
        assert_eq!(decision.recommendation, Recommendation::Hire);
        assert_eq!(decision.confidence, 8.0);
        assert!(decision.reasoning.is_empty());
    }

    #[test]
    fn test_candidate_data_uses_camel_case() {
        let data: CandidateData = serde_json::from_str(
            r#"{"yearsOfExperience": 4.5, "technicalSkills": ["Rust"], "educationLevel": "MSc"}"#,
        )
        .unwrap();
        assert_eq!(data.years_of_experience, 4.5);
        assert_eq!(data.technical_skills, vec!["Rust"]);
        assert!(data.red_flags.is_empty());
    }

    #[test]
    fn test_candidate_data_survives_null_and_text_numbers() {
        let data: CandidateData = serde_json::from_str(
            r#"{"yearsOfExperience": "5", "technicalSkills": ["Rust", 3, null, " Go "],
                "educationLevel": null, "previousRoles": null, "redFlags": "none"}"#,
        )
        .unwrap();
        assert_eq!(data.years_of_experience, 5.0);
        assert_eq!(data.technical_skills, vec!["Rust", "Go"]);
        assert_eq!(data.education_level, "Unknown");
        assert!(data.previous_roles.is_empty());
        assert!(data.red_flags.is_empty());

        let data: CandidateData =
            serde_json::from_str(r#"{"yearsOfExperience": null, "technicalSkills": ["SQL"]}"#)
                .unwrap();
        assert_eq!(data.years_of_experience, 0.0);
        assert_eq!(data.technical_skills, vec!["SQL"]);
    }

    #[test]
    fn test_analysis_keeps_readable_scores() {
        let analysis: AnalysisResult = serde_json::from_str(
            r#"{"technicalSkillsScore": "8", "experienceScore": 7, "educationScore": "n/a",
                "overallFit": null, "strengths": ["Rust"]}"#,
        )
        .unwrap();
        assert_eq!(analysis.technical_skills_score, 8.0);
        assert_eq!(analysis.experience_score, 7.0);
        assert_eq!(analysis.education_score, 5.0);
        assert_eq!(analysis.overall_fit, 5.0);
        assert_eq!(analysis.strengths, vec!["Rust"]);
        assert!(analysis.concerns.is_empty());
    }

    #[test]
    fn test_decision_reads_text_confidence_and_null_recommendation() {
        let decision: DecisionResult = serde_json::from_str(
            r#"{"recommendation": "HIRE", "confidence": "8", "reasoning": ["Strong Rust"]}"#,
        )
        .unwrap();
        assert_eq!(decision.recommendation, Recommendation::Hire);
        assert_eq!(decision.confidence, 8.0);
        assert_eq!(decision.reasoning, vec!["Strong Rust"]);

        let decision: DecisionResult =
            serde_json::from_str(r#"{"recommendation": null, "confidence": null}"#).unwrap();
        assert_eq!(decision.recommendation, Recommendation::Maybe);
        assert_eq!(decision.confidence, 5.0);
    }
}
