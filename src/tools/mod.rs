// src/tools/mod.rs
//! Side tools the agents rely on: page scraping and document conversion

pub mod file_processor;
pub mod web_scraper;

pub use file_processor::{ConversionError, DocumentConverter, FileProcessor};
pub use web_scraper::{HttpPageFetcher, PageFetcher, ScrapeError, WebScraper};
