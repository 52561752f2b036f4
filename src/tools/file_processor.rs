// src/tools/file_processor.rs
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Conversion service is not configured")]
    NotConfigured,
    #[error("Conversion service returned {status}: {body}")]
    Service { status: u16, body: String },
    #[error("Conversion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected conversion response: {0}")]
    InvalidResponse(String),
}

/// Turns an uploaded document into plain text
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn to_text(&self, file_name: &str, content: &[u8]) -> Result<String, ConversionError>;
}

/// Builds the document text the extraction agent reads
#[derive(Clone)]
pub struct FileProcessor {
    converter: Arc<dyn DocumentConverter>,
}

impl FileProcessor {
    pub fn new(converter: Arc<dyn DocumentConverter>) -> Self {
        Self { converter }
    }

    /// Candidate description followed by one block per file.
    /// A file that fails to convert contributes an error block; the rest still run.
    pub async fn process(&self, description: &str, files: &[(String, Vec<u8>)]) -> String {
        let mut combined = format!("{}\n\n", description);

        if !files.is_empty() {
            info!(
                "Processing {} file{}",
                files.len(),
                if files.len() > 1 { "s" } else { "" }
            );
        }

        for (name, content) in files {
            match self.converter.to_text(name, content).await {
                Ok(text) => {
                    combined.push_str(&format!("\n--- Content of {} ---\n{}\n\n", name, text));
                    info!("Successfully processed {}", name);
                }
                Err(e) => {
                    error!("Error processing file {}: {}", name, e);
                    combined.push_str(&format!("\n--- Error reading {}: {} ---\n\n", name, e));
                }
            }
        }

        combined
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Returns the UTF-8 content as-is; files named `*.bad` fail
    pub struct PlainTextConverter;

    #[async_trait]
    impl DocumentConverter for PlainTextConverter {
        async fn to_text(&self, file_name: &str, content: &[u8]) -> Result<String, ConversionError> {
            if file_name.ends_with(".bad") {
                return Err(ConversionError::UnsupportedFormat("bad".to_string()));
            }
            Ok(String::from_utf8_lossy(content).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::PlainTextConverter;
    use super::*;

    #[tokio::test]
    async fn test_process_concatenates_files_and_keeps_going_on_error() {
        let processor = FileProcessor::new(Arc::new(PlainTextConverter));
        let files = vec![
            ("cv.txt".to_string(), b"Rust developer".to_vec()),
            ("scan.bad".to_string(), Vec::new()),
            ("letter.txt".to_string(), b"Motivated".to_vec()),
        ];

        let text = processor.process("About me", &files).await;

        assert!(text.starts_with("About me\n\n"));
        assert!(text.contains("\n--- Content of cv.txt ---\nRust developer\n\n"));
        assert!(text.contains("\n--- Error reading scan.bad: Unsupported file format: bad ---\n\n"));
        assert!(text.contains("--- Content of letter.txt ---\nMotivated"));
        assert!(text.find("cv.txt").unwrap() < text.find("letter.txt").unwrap());
    }

    #[tokio::test]
    async fn test_process_without_files_returns_description() {
        let processor = FileProcessor::new(Arc::new(PlainTextConverter));
        assert_eq!(processor.process("Just text", &[]).await, "Just text\n\n");
    }
}
