//! Configuration management

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use glossary_core::{BrowserConfig, BrowserKind, GlossaryConfig, Language};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Browser settings
    #[serde(default)]
    pub browser: BrowserSection,

    /// Polling and retry settings
    #[serde(default)]
    pub scraping: ScrapingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Glossary language: "en" or "es"
    #[serde(default)]
    pub language: Language,

    /// Number of terms `search` returns unless told otherwise
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserSection {
    /// "chrome" or "edge"
    #[serde(default)]
    pub kind: BrowserKind,

    /// Browser executable, discovered when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Show the browser window
    #[serde(default)]
    pub open_browser: bool,

    /// Page load timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_load_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingSection {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_element_retries")]
    pub element_retries: u32,

    #[serde(default = "default_terms_per_tab")]
    pub terms_per_tab: u32,

    #[serde(default = "default_count_retries")]
    pub count_retries: u32,

    #[serde(default = "default_reload_retries")]
    pub reload_retries: u32,

    #[serde(default = "default_change_polls")]
    pub change_polls: u32,
}

impl Default for ScrapingSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            element_retries: default_element_retries(),
            terms_per_tab: default_terms_per_tab(),
            count_retries: default_count_retries(),
            reload_retries: default_reload_retries(),
            change_polls: default_change_polls(),
        }
    }
}

// Default value functions
fn default_max_results() -> usize {
    3
}
fn default_poll_interval() -> u64 {
    800
}
fn default_element_retries() -> u32 {
    3
}
fn default_terms_per_tab() -> u32 {
    12
}
fn default_count_retries() -> u32 {
    5
}
fn default_reload_retries() -> u32 {
    5
}
fn default_change_polls() -> u32 {
    25
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from the given file, defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "glossary", "glossary")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "language" | "lang" => {
                self.general.language = value.parse().map_err(anyhow::Error::msg)?;
            }
            "max_results" | "max" => {
                self.general.max_results = value.parse().context("max_results must be a number")?;
            }
            "browser" | "browser.kind" => {
                self.browser.kind = value.parse()?;
            }
            "browser_path" | "browser.path" => {
                self.browser.path = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "open_browser" | "browser.open_browser" => {
                self.browser.open_browser = value.parse().context("open_browser must be true or false")?;
            }
            "timeout" | "browser.page_load_timeout_secs" => {
                self.browser.page_load_timeout_secs = if value.is_empty() {
                    None
                } else {
                    Some(value.parse().context("timeout must be a number of seconds")?)
                };
            }
            "poll_interval_ms" => {
                self.scraping.poll_interval_ms = value.parse().context("poll_interval_ms must be a number")?;
            }
            "element_retries" => {
                self.scraping.element_retries = value.parse().context("element_retries must be a number")?;
            }
            "terms_per_tab" => {
                self.scraping.terms_per_tab = value.parse().context("terms_per_tab must be a number")?;
            }
            "count_retries" => {
                self.scraping.count_retries = value.parse().context("count_retries must be a number")?;
            }
            "reload_retries" => {
                self.scraping.reload_retries = value.parse().context("reload_retries must be a number")?;
            }
            "change_polls" => {
                self.scraping.change_polls = value.parse().context("change_polls must be a number")?;
            }
            _ => bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Settings for a glossary session
    pub fn to_glossary_config(&self) -> GlossaryConfig {
        GlossaryConfig {
            language: self.general.language,
            browser: BrowserConfig {
                kind: self.browser.kind,
                executable: self.browser.path.clone(),
                open_browser: self.browser.open_browser,
                page_load_timeout: self.browser.page_load_timeout_secs.map(Duration::from_secs),
                ..Default::default()
            },
            poll_interval: Duration::from_millis(self.scraping.poll_interval_ms),
            element_retries: self.scraping.element_retries,
            terms_per_tab: self.scraping.terms_per_tab,
            count_retries: self.scraping.count_retries,
            reload_retries: self.scraping.reload_retries,
            change_polls: self.scraping.change_polls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[general]\nlanguage = \"spanish\"\n").unwrap();
        assert_eq!(config.general.language, Language::Spanish);
        assert_eq!(config.general.max_results, 3);
        assert_eq!(config.scraping.poll_interval_ms, 800);
        assert_eq!(config.browser.kind, BrowserKind::Chrome);
    }

    #[test]
    fn test_set_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("browser", "edge").unwrap();
        config.set("timeout", "45").unwrap();
        config.set("terms_per_tab", "24").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.browser.kind, BrowserKind::Edge);
        assert_eq!(loaded.browser.page_load_timeout_secs, Some(45));

        let glossary = loaded.to_glossary_config();
        assert_eq!(glossary.terms_per_tab, 24);
        assert_eq!(glossary.browser.page_load_timeout, Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("browser", "safari").is_err());
        assert!(config.set("max_results", "lots").is_err());
        assert!(config.set("colour", "red").is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.scraping.element_retries, 3);
    }
}
