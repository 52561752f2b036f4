// src/agents/analysis.rs
use std::sync::Arc;
use tracing::info;

use super::{list_or, AgentCore, AgentError};
use crate::llm::LlmProvider;
use crate::types::{AnalysisResult, CandidateData, JobRequirements};

const TEMPERATURE: f32 = 0.2;

const SYSTEM_PROMPT: &str = r#"You are a technical hiring analyst. Score candidates against job requirements.

ALWAYS return valid JSON with this structure:
{
  "technicalSkillsScore": number (1-10),
  "experienceScore": number (1-10),
  "educationScore": number (1-10),
  "overallFit": number (1-10),
  "concerns": string[],
  "strengths": string[]
}

Scoring guidelines:
- Technical Skills: How well do their skills match the required ones?
- Experience: Is their experience level appropriate for the role?
- Education: Does their education meet preferences?
- Overall Fit: Weighted average considering role importance"#;

pub struct AnalysisAgent {
    core: AgentCore,
}

impl AnalysisAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32) -> Self {
        Self {
            core: AgentCore::new(llm, max_tokens),
        }
    }

    pub async fn execute(
        &self,
        candidate: &CandidateData,
        requirements: &JobRequirements,
    ) -> Result<AnalysisResult, AgentError> {
        info!(
            "Analysis agent: analyzing fit against {} level requirements",
            requirements.role_level
        );

        let parsed = self
            .core
            .ask_json::<AnalysisResult>(
                "Analysis agent",
                SYSTEM_PROMPT,
                analysis_prompt(candidate, requirements),
                TEMPERATURE,
            )
            .await?;

        Ok(match parsed {
            Some(result) => {
                info!("Analysis agent: successfully analyzed candidate");
                result
            }
            None => AnalysisResult::fallback(),
        })
    }
}

fn analysis_prompt(candidate: &CandidateData, requirements: &JobRequirements) -> String {
    format!(
        "Analyze this candidate against job requirements:\n\n\
         CANDIDATE DATA:\n\
         - Experience: {} years\n\
         - Skills: {}\n\
         - Education: {}\n\
         - Previous roles: {}\n\
         - Red flags: {}\n\n\
         JOB REQUIREMENTS:\n\
         - Required skills: {}\n\
         - Minimum experience: {} years\n\
         - Preferred education: {}\n\
         - Role level: {}\n\
         - Job requirements: {}",
        candidate.years_of_experience,
        list_or(&candidate.technical_skills, "None specified"),
        candidate.education_level,
        list_or(&candidate.previous_roles, "None specified"),
        list_or(&candidate.red_flags, "None"),
        requirements.required_skills.join(", "),
        requirements.minimum_experience,
        requirements.preferred_education,
        requirements.role_level,
        requirements.job_requirements,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::types::RoleLevel;

    fn requirements() -> JobRequirements {
        JobRequirements {
            required_skills: vec!["Rust".to_string(), "PostgreSQL".to_string()],
            minimum_experience: 3,
            preferred_education: "Bachelor".to_string(),
            role_level: RoleLevel::Senior,
            job_requirements: "Own the backend".to_string(),
        }
    }

    #[test]
    fn test_prompt_lists_candidate_and_requirements() {
        let prompt = analysis_prompt(&CandidateData::default(), &requirements());
        assert!(prompt.contains("- Skills: None specified"));
        assert!(prompt.contains("- Red flags: None"));
        assert!(prompt.contains("- Required skills: Rust, PostgreSQL"));
        assert!(prompt.contains("- Minimum experience: 3 years"));
        assert!(prompt.contains("- Role level: senior"));
    }

    #[tokio::test]
    async fn test_analysis_parses_scores() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            r#"{"technicalSkillsScore": 8, "experienceScore": 7, "educationScore": 6, "overallFit": 7.5, "concerns": [], "strengths": ["Rust"]}"#,
        ]));
        let agent = AnalysisAgent::new(llm.clone(), 500);

        let result = agent
            .execute(&CandidateData::default(), &requirements())
            .await
            .unwrap();

        assert_eq!(result.overall_fit, 7.5);
        assert_eq!(result.strengths, vec!["Rust"]);
        assert_eq!(llm.temperatures(), vec![0.2]);
    }

    #[tokio::test]
    async fn test_analysis_fallback() {
        let llm = Arc::new(ScriptedLlm::new(vec!["{not json"]));
        let result = AnalysisAgent::new(llm, 500)
            .execute(&CandidateData::default(), &requirements())
            .await
            .unwrap();

        assert_eq!(result.technical_skills_score, 5.0);
        assert_eq!(result.overall_fit, 5.0);
        assert_eq!(result.concerns, vec!["Failed to analyze candidate properly"]);
    }
}
