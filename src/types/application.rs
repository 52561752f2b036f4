// src/types/application.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::job_posting::JobPosting;
use super::pipeline::ProcessingResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Submitted,
    Processing,
    SentToHr,
    AutoRejected,
    InterviewScheduled,
    Failed,
    Reviewed,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 9] = [
        Self::Submitted,
        Self::Processing,
        Self::SentToHr,
        Self::AutoRejected,
        Self::InterviewScheduled,
        Self::Failed,
        Self::Reviewed,
        Self::Rejected,
        Self::Hired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Processing => "PROCESSING",
            Self::SentToHr => "SENT_TO_HR",
            Self::AutoRejected => "AUTO_REJECTED",
            Self::InterviewScheduled => "INTERVIEW_SCHEDULED",
            Self::Failed => "FAILED",
            Self::Reviewed => "REVIEWED",
            Self::Rejected => "REJECTED",
            Self::Hired => "HIRED",
        }
    }

    /// True once the pipeline has reached a routing outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::SentToHr | Self::AutoRejected | Self::InterviewScheduled
        )
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper == "PENDING" {
            return Ok(Self::Submitted);
        }
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == upper)
            .ok_or_else(|| format!("Unknown application status: {}", s))
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A freshly submitted application, before it is persisted.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub submission_id: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub candidate_description: String,
    pub file_names: Vec<String>,
    pub job_posting_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub submission_id: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub candidate_description: String,
    pub file_names: Vec<String>,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub job_posting_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ProcessingResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationWithJobPosting {
    #[serde(flatten)]
    pub application: Application,
    pub job_posting: Option<JobPosting>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in ApplicationStatus::ALL {
            assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_pending_alias_maps_to_submitted() {
        assert_eq!(
            "pending".parse::<ApplicationStatus>(),
            Ok(ApplicationStatus::Submitted)
        );
        assert!("ARCHIVED".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&ApplicationStatus::InterviewScheduled).unwrap();
        assert_eq!(json, "\"INTERVIEW_SCHEDULED\"");
    }
}
