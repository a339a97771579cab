//! Page driving
//!
//! `PageDriver` is the seam between the scraping logic and the browser: the
//! scraper only ever loads a URL, snapshots the rendered DOM, and runs small
//! scripts. `ChromeDriver` implements it over a single CDP tab.

use crate::chrome::{self, BrowserHandle};
use crate::config::BrowserConfig;
use crate::{GlossaryError, Result};
use async_trait::async_trait;
use chromiumoxide::Page;
use tracing::debug;
use url::Url;

/// A browser tab the scraper can drive
#[async_trait]
pub trait PageDriver: Send {
    /// Navigate to the given URL
    async fn load(&mut self, url: &str) -> Result<()>;

    /// Navigate with a fresh document load, even when only the fragment
    /// differs from the current URL. Nothing rendered before stays visible.
    async fn open(&mut self, url: &str) -> Result<()> {
        self.load(url).await
    }

    /// Snapshot of the rendered DOM
    async fn html(&mut self) -> Result<String>;

    /// Evaluate a script in the page
    async fn execute(&mut self, script: &str) -> Result<()>;

    /// Whether the driver has been closed
    fn is_closed(&self) -> bool;

    /// Release the tab and the browser behind it
    async fn close(&mut self) -> Result<()>;
}

/// Driver over one tab of a launched Chrome/Edge
pub struct ChromeDriver {
    browser: Option<BrowserHandle>,
    page: Option<Page>,
    current: Option<Url>,
}

impl ChromeDriver {
    /// Launch a browser and open a blank tab
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let handle = chrome::launch(config).await?;
        let page = handle
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| GlossaryError::BrowserError(e.to_string()))?;

        Ok(Self {
            browser: Some(handle),
            page: Some(page),
            current: None,
        })
    }

    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| GlossaryError::BrowserError("Browser has been closed".to_string()))
    }
}

/// Whether both URLs point at the same document, fragments aside
fn same_document(from: &Url, to: &Url) -> bool {
    let mut from = from.clone();
    let mut to = to.clone();
    from.set_fragment(None);
    to.set_fragment(None);
    from == to
}

/// Whether `to` only differs from `from` by its fragment
fn is_fragment_change(from: Option<&Url>, to: &Url) -> bool {
    match from {
        Some(from) => from.fragment() != to.fragment() && same_document(from, to),
        None => false,
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn load(&mut self, url: &str) -> Result<()> {
        let target = Url::parse(url)?;
        debug!("Loading: {}", target);

        // The search page is a single-page app; hash changes re-run the query without a reload
        if is_fragment_change(self.current.as_ref(), &target) {
            let script = format!(
                "window.location.assign({})",
                serde_json::to_string(target.as_str())?
            );
            self.page()?
                .evaluate(script)
                .await
                .map_err(|e| GlossaryError::NetworkError(e.to_string()))?;
        } else {
            self.page()?
                .goto(target.as_str())
                .await
                .map_err(|e| GlossaryError::NetworkError(e.to_string()))?;
        }

        self.current = Some(target);
        Ok(())
    }

    async fn open(&mut self, url: &str) -> Result<()> {
        let target = Url::parse(url)?;

        // Navigating within the same document keeps the old DOM around until the app re-renders
        if self.current.as_ref().is_some_and(|current| same_document(current, &target)) {
            debug!("Leaving the current document before opening {}", target);
            self.page()?
                .goto("about:blank")
                .await
                .map_err(|e| GlossaryError::NetworkError(e.to_string()))?;
        }

        debug!("Opening: {}", target);
        self.page()?
            .goto(target.as_str())
            .await
            .map_err(|e| GlossaryError::NetworkError(e.to_string()))?;

        self.current = Some(target);
        Ok(())
    }

    async fn html(&mut self) -> Result<String> {
        self.page()?
            .content()
            .await
            .map_err(|e| GlossaryError::BrowserError(e.to_string()))
    }

    async fn execute(&mut self, script: &str) -> Result<()> {
        self.page()?
            .evaluate(script)
            .await
            .map_err(|e| GlossaryError::BrowserError(e.to_string()))?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.browser.is_none()
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        self.current = None;
        match self.browser.take() {
            Some(handle) => handle.shutdown().await,
            None => Ok(()),
        }
    }
}
