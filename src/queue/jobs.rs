// src/queue/jobs.rs
//! Job kinds and their payloads

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    HrApplication,
    RejectionEmail,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HrApplication => "hr-application",
            Self::RejectionEmail => "rejection-email",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hr-application" => Ok(Self::HrApplication),
            "rejection-email" => Ok(Self::RejectionEmail),
            other => Err(format!("Unknown job kind: {}", other)),
        }
    }
}

/// Everything the pipeline needs to process one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationJob {
    pub submission_id: String,
    pub candidate_name: String,
    pub candidate_email: String,
    #[serde(default)]
    pub candidate_description: String,
    #[serde(default)]
    pub job_posting_id: String,
    #[serde(default)]
    pub file_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionEmailJob {
    pub submission_id: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub job_title: String,
    pub company_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_kind_names() {
        for kind in [JobKind::HrApplication, JobKind::RejectionEmail] {
            assert_eq!(kind.as_str().parse::<JobKind>().unwrap(), kind);
        }
        assert!("resize-image".parse::<JobKind>().is_err());
    }

    #[test]
    fn test_application_job_tolerates_missing_optionals() {
        let job: ApplicationJob = serde_json::from_str(
            r#"{"submissionId": "s1", "candidateName": "Jane", "candidateEmail": "jane@example.com"}"#,
        )
        .unwrap();
        assert!(job.file_names.is_empty());
        assert_eq!(job.job_posting_id, "");
    }
}
