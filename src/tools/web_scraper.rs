// src/tools/web_scraper.rs
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::utils::truncate_chars;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const MIN_CONTENT_CHARS: usize = 200;
const MAX_CONTENT_CHARS: usize = 15_000;

const NOISE_SELECTORS: [&str; 9] = [
    "script",
    "style",
    "nav",
    "header",
    "footer",
    "aside",
    ".sidebar",
    "#sidebar",
    ".navigation",
];

const JOB_SELECTORS: [&str; 14] = [
    ".job-description",
    ".job-details",
    ".job-content",
    ".posting-content",
    ".job-posting",
    ".job-info",
    ".description",
    ".requirements",
    ".qualifications",
    ".responsibilities",
    "[data-testid=\"job-details\"]",
    "[data-testid=\"jobsearch-JobComponent\"]",
    ".jobs-description",
    ".jobs-details",
];

const MAIN_SELECTORS: [&str; 7] = [
    "main",
    ".main-content",
    ".content",
    ".container",
    "article",
    ".post-content",
    ".entry-content",
];

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Failed to scrape content from URL: request timed out")]
    Timeout,
    #[error("Failed to scrape content from URL: HTTP {status}: {reason}")]
    Status { status: u16, reason: String },
    #[error("Failed to scrape content from URL: {0}")]
    Request(String),
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScrapeError::Timeout
        } else {
            ScrapeError::Request(e.to_string())
        }
    }
}

/// Retrieves raw HTML for a URL
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self
            .client
            .get(url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.5")
            .header("Connection", "keep-alive")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Fetches a job page and reduces it to readable text
#[derive(Clone)]
pub struct WebScraper {
    fetcher: Arc<dyn PageFetcher>,
}

impl WebScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn scrape(&self, url: &str) -> Result<String, ScrapeError> {
        info!("Web scraper: fetching content from {}", url);

        let html = self.fetcher.fetch(url).await.map_err(|e| {
            error!("Web scraper error for {}: {}", url, e);
            e
        })?;

        let content = extract_page_text(&html);
        info!(
            "Web scraper: extracted {} characters from {}",
            content.chars().count(),
            url
        );
        Ok(content)
    }
}

/// Reduce an HTML page to the text most likely to describe the job
pub fn extract_page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let noise = parse_selectors(&NOISE_SELECTORS);

    let mut content = String::new();
    for selector in parse_selectors(&JOB_SELECTORS) {
        let text = selection_text(&document, &selector, &noise);
        if !text.is_empty() {
            content.push_str(&text);
            content.push_str("\n\n");
        }
    }

    if content.chars().count() < MIN_CONTENT_CHARS {
        for selector in parse_selectors(&MAIN_SELECTORS) {
            let text = selection_text(&document, &selector, &noise);
            if !text.is_empty() {
                content.push_str(&text);
                content.push_str("\n\n");
                break;
            }
        }
    }

    if content.chars().count() < MIN_CONTENT_CHARS {
        if let Ok(body) = Selector::parse("body") {
            content = selection_text(&document, &body, &noise);
        }
    }

    truncate_chars(&clean_text(&content), MAX_CONTENT_CHARS)
}

fn parse_selectors(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
}

/// Text of every element matching `selector`, skipping anything inside a noise element
fn selection_text(document: &Html, selector: &Selector, noise: &[Selector]) -> String {
    document
        .select(selector)
        .map(|element| element_text(element, noise))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn is_noise(element: ElementRef<'_>, noise: &[Selector]) -> bool {
    noise.iter().any(|selector| selector.matches(&element))
}

fn element_text(element: ElementRef<'_>, noise: &[Selector]) -> String {
    let inside_noise = is_noise(element, noise)
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| is_noise(ancestor, noise));
    if inside_noise {
        return String::new();
    }

    let mut parts = Vec::new();
    for node in element.descendants() {
        if let Some(text) = node.value().as_text() {
            let skipped = node
                .ancestors()
                .take_while(|a| a.id() != element.id())
                .filter_map(ElementRef::wrap)
                .any(|ancestor| is_noise(ancestor, noise));
            if !skipped {
                parts.push(&**text);
            }
        }
    }

    parts.join(" ").trim().to_string()
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Serves a fixed page, or a fixed error
    pub struct StaticPage(pub Result<String, u16>);

    #[async_trait]
    impl PageFetcher for StaticPage {
        async fn fetch(&self, _url: &str) -> Result<String, ScrapeError> {
            match &self.0 {
                Ok(html) => Ok(html.clone()),
                Err(0) => Err(ScrapeError::Timeout),
                Err(status) => Err(ScrapeError::Status {
                    status: *status,
                    reason: "Error".to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StaticPage;
    use super::*;

    fn long_text(word: &str) -> String {
        vec![word; 60].join(" ")
    }

    #[test]
    fn test_prefers_job_selectors_and_strips_noise() {
        let html = format!(
            r#"<html><body>
                <nav>Home Jobs About</nav>
                <div class="job-description">{}<script>var x = 1;</script></div>
                <div class="requirements">Rust   and
                    SQL</div>
                <footer>Copyright</footer>
            </body></html>"#,
            long_text("Build")
        );

        let text = extract_page_text(&html);
        assert!(text.starts_with("Build Build"));
        assert!(text.ends_with("Rust and SQL"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("Home Jobs"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_falls_back_to_main_then_body() {
        let main_html = format!(
            "<html><body><header>Logo</header><main>{}</main><article>Other</article></body></html>",
            long_text("Role")
        );
        let text = extract_page_text(&main_html);
        assert!(text.starts_with("Role"));
        assert!(!text.contains("Other"));
        assert!(!text.contains("Logo"));

        let body_html = "<html><body><p>Short posting</p><aside>Ads</aside></body></html>";
        assert_eq!(extract_page_text(body_html), "Short posting");
    }

    #[test]
    fn test_truncates_long_pages() {
        let html = format!(
            "<html><body><div class=\"job-details\">{}</div></body></html>",
            "x".repeat(20_000)
        );
        let text = extract_page_text(&html);
        assert_eq!(text.chars().count(), MAX_CONTENT_CHARS + 3);
        assert!(text.ends_with("..."));
    }

    #[tokio::test]
    async fn test_scrape_propagates_fetch_errors() {
        let scraper = WebScraper::new(Arc::new(StaticPage(Err(404))));
        let err = scraper.scrape("https://example.com/job").await.unwrap_err();
        assert!(matches!(err, ScrapeError::Status { status: 404, .. }));
        assert!(err
            .to_string()
            .starts_with("Failed to scrape content from URL"));

        let timeout = WebScraper::new(Arc::new(StaticPage(Err(0))));
        assert!(matches!(
            timeout.scrape("https://example.com").await,
            Err(ScrapeError::Timeout)
        ));
    }
}
