// src/agents/extraction.rs
use std::sync::Arc;
use tracing::info;

use super::{AgentCore, AgentError};
use crate::llm::LlmProvider;
use crate::tools::FileProcessor;
use crate::types::CandidateData;

const TEMPERATURE: f32 = 0.1;

const SYSTEM_PROMPT: &str = r#"You are a resume extraction specialist. Extract structured data from candidate applications.

ALWAYS return a valid JSON object with this exact structure:
{
  "yearsOfExperience": number,
  "technicalSkills": string[],
  "educationLevel": string,
  "previousRoles": string[],
  "redFlags": string[]
}"#;

pub struct ExtractionAgent {
    core: AgentCore,
    files: FileProcessor,
}

impl ExtractionAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32, files: FileProcessor) -> Self {
        Self {
            core: AgentCore::new(llm, max_tokens),
            files,
        }
    }

    pub async fn execute(
        &self,
        name: &str,
        description: &str,
        files: &[(String, Vec<u8>)],
    ) -> Result<CandidateData, AgentError> {
        info!("Extraction agent: processing candidate data for {}", name);

        let documents = self.files.process(description, files).await;
        let prompt = format!(
            "Extract information from this candidate:\n\n\
             Name: {}\n\
             Description: {}\n\
             Documents: {}\n\n\
             Focus on:\n\
             - Years of professional experience (estimate if not explicit)\n\
             - All technical skills, frameworks, languages mentioned\n\
             - Highest education level\n\
             - Job titles and companies\n\
             - Any concerns (employment gaps, job hopping, etc.)",
            name, description, documents
        );

        let parsed = self
            .core
            .ask_json::<CandidateData>("Extraction agent", SYSTEM_PROMPT, prompt, TEMPERATURE)
            .await?;

        Ok(match parsed {
            Some(data) => {
                info!("Extraction agent: successfully extracted data");
                data
            }
            None => CandidateData::fallback(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::llm::Role;
    use crate::tools::file_processor::testing::PlainTextConverter;

    fn agent(llm: Arc<ScriptedLlm>) -> ExtractionAgent {
        ExtractionAgent::new(llm, 500, FileProcessor::new(Arc::new(PlainTextConverter)))
    }

    #[tokio::test]
    async fn test_extraction_includes_documents_in_prompt() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            r#"```json
{"yearsOfExperience": 5, "technicalSkills": ["Rust", "Go"], "educationLevel": "BSc", "previousRoles": ["Engineer"], "redFlags": []}
```"#,
        ]));
        let files = vec![("cv.txt".to_string(), b"Worked at Acme".to_vec())];

        let data = agent(llm.clone())
            .execute("Jane", "Backend dev", &files)
            .await
            .unwrap();

        assert_eq!(data.years_of_experience, 5.0);
        assert_eq!(data.technical_skills, vec!["Rust", "Go"]);
        assert_eq!(llm.temperatures(), vec![0.1]);

        let calls = llm.calls.lock().unwrap();
        let (messages, _) = &calls[0];
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[1].content.contains("Name: Jane"));
        assert!(messages[1].content.contains("--- Content of cv.txt ---"));
    }

    #[tokio::test]
    async fn test_extraction_keeps_skills_when_experience_is_null() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            r#"{"yearsOfExperience": null, "technicalSkills": ["Rust", "Kafka"], "educationLevel": "MSc"}"#,
        ]));
        let data = agent(llm).execute("Jane", "", &[]).await.unwrap();

        assert_eq!(data.years_of_experience, 0.0);
        assert_eq!(data.technical_skills, vec!["Rust", "Kafka"]);
        assert_eq!(data.education_level, "MSc");
        assert!(data.red_flags.is_empty());
    }

    #[tokio::test]
    async fn test_extraction_falls_back_on_garbage() {
        let llm = Arc::new(ScriptedLlm::new(vec!["I cannot help with that."]));
        let data = agent(llm).execute("Jane", "", &[]).await.unwrap();
        assert_eq!(data, CandidateData::fallback());
    }

    #[tokio::test]
    async fn test_extraction_propagates_transport_errors() {
        let llm = Arc::new(ScriptedLlm::failing(500));
        assert!(agent(llm).execute("Jane", "", &[]).await.is_err());
    }
}
