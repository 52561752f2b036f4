// src/agents/decision.rs
use std::sync::Arc;
use tracing::info;

use super::{AgentCore, AgentError};
use crate::llm::LlmProvider;
use crate::types::{AnalysisResult, DecisionResult};

const TEMPERATURE: f32 = 0.3;

const SYSTEM_PROMPT: &str = r#"You are a hiring decision maker. Make final recommendations based on candidate analysis.

Decision criteria:
- HIRE: Overall fit >= 7, no major red flags, strong technical skills
- REJECT: Overall fit < 5 or major concerns that can't be overlooked
- MAYBE: Overall fit 5-7, needs more information or has mixed signals

ALWAYS return valid JSON with this structure:
{
  "recommendation": "HIRE" | "REJECT" | "MAYBE",
  "confidence": number (1-10),
  "reasoning": string[],
  "nextSteps": string[]
}

Next steps should be specific actionable items like:
- "Schedule technical interview"
- "Request portfolio review"
- "Send rejection email"
- "Ask for references""#;

pub struct DecisionAgent {
    core: AgentCore,
}

impl DecisionAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32) -> Self {
        Self {
            core: AgentCore::new(llm, max_tokens),
        }
    }

    pub async fn execute(
        &self,
        analysis: &AnalysisResult,
        candidate_name: &str,
    ) -> Result<DecisionResult, AgentError> {
        info!("Decision agent: making final recommendation for {}", candidate_name);

        let parsed = self
            .core
            .ask_json::<DecisionResult>(
                "Decision agent",
                SYSTEM_PROMPT,
                decision_prompt(analysis, candidate_name),
                TEMPERATURE,
            )
            .await?;

        Ok(match parsed {
            Some(decision) => {
                info!(
                    "Decision agent: {} (confidence {})",
                    decision.recommendation, decision.confidence
                );
                decision
            }
            None => DecisionResult::fallback(),
        })
    }
}

fn dash_list(items: &[String]) -> String {
    if items.is_empty() {
        "- None identified".to_string()
    } else {
        items
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn decision_prompt(analysis: &AnalysisResult, candidate_name: &str) -> String {
    format!(
        "Make hiring decision for {}:\n\n\
         ANALYSIS RESULTS:\n\
         - Technical skills: {}/10\n\
         - Experience: {}/10\n\
         - Education: {}/10\n\
         - Overall fit: {}/10\n\n\
         STRENGTHS:\n{}\n\n\
         CONCERNS:\n{}\n\n\
         Provide a clear recommendation with confidence level, reasoning, and specific next steps.",
        candidate_name,
        analysis.technical_skills_score,
        analysis.experience_score,
        analysis.education_score,
        analysis.overall_fit,
        dash_list(&analysis.strengths),
        dash_list(&analysis.concerns),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::types::Recommendation;

    #[test]
    fn test_prompt_marks_empty_sections() {
        let prompt = decision_prompt(&AnalysisResult::default(), "Jane");
        assert!(prompt.starts_with("Make hiring decision for Jane:"));
        assert!(prompt.contains("STRENGTHS:\n- None identified"));
        assert!(prompt.contains("- Overall fit: 5/10"));
    }

    #[tokio::test]
    async fn test_decision_parses_reply() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            r#"Decision: {"recommendation": "REJECT", "confidence": 9, "reasoning": ["No Rust"], "nextSteps": ["Send rejection email"]}"#,
        ]));
        let decision = DecisionAgent::new(llm.clone(), 500)
            .execute(&AnalysisResult::default(), "Jane")
            .await
            .unwrap();

        assert_eq!(decision.recommendation, Recommendation::Reject);
        assert_eq!(decision.confidence, 9.0);
        assert_eq!(llm.temperatures(), vec![0.3]);
    }

    #[tokio::test]
    async fn test_decision_fallback_requires_manual_review() {
        let llm = Arc::new(ScriptedLlm::new(vec!["HIRE!"]));
        let decision = DecisionAgent::new(llm, 500)
            .execute(&AnalysisResult::default(), "Jane")
            .await
            .unwrap();

        assert_eq!(decision.recommendation, Recommendation::Maybe);
        assert_eq!(decision.confidence, 5.0);
        assert_eq!(
            decision.next_steps,
            vec!["Manual review required", "Check agent logs for errors"]
        );
    }
}
