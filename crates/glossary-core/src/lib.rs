//! Glossary Core Library
//!
//! Core functionality for scraping the SLB oilfield glossary including:
//! - Chrome/Edge browser lifecycle management
//! - Page driving and DOM snapshot helpers
//! - Topic discovery and search URL construction
//! - The paginated result crawl and detail page parsing
//! - Saving results to xlsx, csv, json and txt files

pub mod chrome;
pub mod config;
pub mod crawl;
pub mod detail;
pub mod dom;
pub mod driver;
pub mod glossary;
pub mod query;
pub mod saver;
pub mod topics;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export key types
pub use config::{BrowserConfig, BrowserKind, GlossaryConfig};
pub use driver::{ChromeDriver, PageDriver};
pub use glossary::Glossary;
pub use saver::{FormatWriter, Saver};

#[derive(Error, Debug)]
pub enum GlossaryError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Browser error: {0}")]
    BrowserError(String),

    #[error("Browser not installed: {0}")]
    BrowserNotInstalled(String),

    #[error("Browser not supported: {0}")]
    BrowserNotSupported(String),

    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cannot save to {0} files: no writer registered for this extension")]
    UnsupportedFormat(String),

    #[error("Invalid file name: {0}")]
    InvalidFilename(String),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    XlsxError(#[from] rust_xlsxwriter::XlsxError),
}

impl GlossaryError {
    /// Whether the failure came from the browser or the network and is worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GlossaryError::NetworkError(_) | GlossaryError::BrowserError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GlossaryError>;

/// Languages the glossary is published in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en", alias = "english")]
    English,
    #[serde(rename = "es", alias = "spanish")]
    Spanish,
}

impl Language {
    /// Two-letter code used in glossary URLs
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "es" | "spanish" | "español" | "espanol" => Ok(Language::Spanish),
            _ => Err(format!("Unknown language: {}. Use 'en' or 'es'", s)),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single definition of a term found in the glossary
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SearchResult {
    /// The term as shown on its detail page
    pub term: String,
    /// The definition text
    pub definition: Option<String>,
    /// Part of speech, expanded from the abbreviation on the page
    pub grammatical_label: Option<String>,
    /// The topic the definition was filed under
    pub topic: Option<String>,
    /// URL of the term's detail page
    pub url: Option<String>,
}

impl SearchResult {
    /// Borrow the fields as a tuple
    pub fn as_tuple(
        &self,
    ) -> (
        &str,
        Option<&str>,
        Option<&str>,
        Option<&str>,
        Option<&str>,
    ) {
        (
            &self.term,
            self.definition.as_deref(),
            self.grammatical_label.as_deref(),
            self.topic.as_deref(),
            self.url.as_deref(),
        )
    }

    /// Row used by tabular writers, missing fields as empty strings
    pub fn to_record(&self) -> [&str; 5] {
        let (term, definition, label, topic, url) = self.as_tuple();
        [
            term,
            definition.unwrap_or(""),
            label.unwrap_or(""),
            topic.unwrap_or(""),
            url.unwrap_or(""),
        ]
    }
}

/// A topic (discipline facet value) and the number of terms filed under it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub count: u64,
}
