//! Scraper configuration

use crate::{GlossaryError, Language};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Browsers that can be driven over the DevTools protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chrome,
    /// Chromium based Microsoft Edge
    Edge,
}

impl std::str::FromStr for BrowserKind {
    type Err = GlossaryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            "edge" | "chromium edge" | "chromium-edge" | "msedge" => Ok(BrowserKind::Edge),
            "firefox" | "safari" => Err(GlossaryError::BrowserNotSupported(format!(
                "{} cannot be driven over the DevTools protocol. Use 'chrome' or 'edge'",
                s
            ))),
            _ => Err(GlossaryError::BrowserNotSupported(format!(
                "Unknown browser: {}. Use 'chrome' or 'edge'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrowserKind::Chrome => write!(f, "chrome"),
            BrowserKind::Edge => write!(f, "edge"),
        }
    }
}

/// Configuration for launching the browser
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Which browser to launch
    pub kind: BrowserKind,
    /// Explicit executable path, discovered when unset
    pub executable: Option<PathBuf>,
    /// Show the browser window instead of running headless
    pub open_browser: bool,
    /// Maximum time to wait for a page load
    pub page_load_timeout: Option<Duration>,
    /// Window size; large enough for every facet control to be laid out
    pub window_size: (u32, u32),
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: BrowserKind::default(),
            executable: None,
            open_browser: false,
            page_load_timeout: None,
            window_size: (1920, 1080),
        }
    }
}

/// Configuration for a glossary session
#[derive(Debug, Clone)]
pub struct GlossaryConfig {
    /// Glossary language
    pub language: Language,
    /// Browser launch settings
    pub browser: BrowserConfig,
    /// Sleep between two polls of the rendered page
    pub poll_interval: Duration,
    /// Snapshots taken while waiting for an element before giving up
    pub element_retries: u32,
    /// Number of results the site shows per tab
    pub terms_per_tab: u32,
    /// Reloads allowed when the result total cannot be read
    pub count_retries: u32,
    /// Reloads allowed when a page renders with empty facet or result headers
    pub reload_retries: u32,
    /// Polls allowed while waiting for the next tab's results to replace the previous ones
    pub change_polls: u32,
}

impl Default for GlossaryConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            browser: BrowserConfig::default(),
            poll_interval: Duration::from_millis(800),
            element_retries: 3,
            terms_per_tab: 12,
            count_retries: 5,
            reload_retries: 5,
            change_polls: 25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_kind_parse() {
        assert_eq!("Chrome".parse::<BrowserKind>().unwrap(), BrowserKind::Chrome);
        assert_eq!("chromium edge".parse::<BrowserKind>().unwrap(), BrowserKind::Edge);
        assert!(matches!(
            "firefox".parse::<BrowserKind>(),
            Err(GlossaryError::BrowserNotSupported(_))
        ));
    }

    #[test]
    fn test_glossary_config_default() {
        let config = GlossaryConfig::default();
        assert_eq!(config.language, Language::English);
        assert_eq!(config.terms_per_tab, 12);
        assert_eq!(config.element_retries, 3);
        assert!(!config.browser.open_browser);
        assert!(config.browser.executable.is_none());
    }
}
