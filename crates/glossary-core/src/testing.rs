//! In-memory page driver and canned glossary pages for tests

use crate::config::GlossaryConfig;
use crate::driver::PageDriver;
use crate::{GlossaryError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Serves canned snapshots per URL. Each load of a URL serves its next
/// snapshot; the last one repeats.
///
/// With [`FakeDriver::lag`], a `load` that only changes the fragment keeps
/// serving the previous DOM for a few snapshots, like the search app does
/// while it re-renders. `open` always swaps the DOM at once.
#[derive(Default)]
pub(crate) struct FakeDriver {
    pages: HashMap<String, Vec<String>>,
    served: HashMap<String, usize>,
    failures: HashMap<String, VecDeque<GlossaryError>>,
    current_url: Option<String>,
    current: Option<String>,
    previous: Option<String>,
    lag: usize,
    stale: usize,
    pub loads: Vec<String>,
    pub scripts: Vec<String>,
    closed: bool,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.entry(url.into()).or_default().push(html.into());
        self
    }

    /// Fail the next load of `url` with `error`; queued failures are served in order
    pub fn fail(mut self, url: impl Into<String>, error: GlossaryError) -> Self {
        self.failures.entry(url.into()).or_default().push_back(error);
        self
    }

    /// Snapshots that still show the old DOM after a fragment-only load
    pub fn lag(mut self, snapshots: usize) -> Self {
        self.lag = snapshots;
        self
    }

    pub fn loads_of(&self, url: &str) -> usize {
        self.loads.iter().filter(|u| u.as_str() == url).count()
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        if self.closed {
            return Err(GlossaryError::BrowserError("closed".to_string()));
        }
        self.loads.push(url.to_string());
        if let Some(error) = self.failures.get_mut(url).and_then(VecDeque::pop_front) {
            return Err(error);
        }

        let snapshots = self
            .pages
            .get(url)
            .ok_or_else(|| GlossaryError::NetworkError(format!("no route for {}", url)))?;
        let served = self.served.entry(url.to_string()).or_default();
        let index = (*served).min(snapshots.len() - 1);
        *served += 1;

        self.previous = self.current.replace(snapshots[index].clone());
        self.current_url = Some(url.to_string());
        self.stale = 0;
        Ok(())
    }
}

fn document(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn load(&mut self, url: &str) -> Result<()> {
        let fragment_change = self
            .current_url
            .as_deref()
            .is_some_and(|current| current != url && document(current) == document(url));
        self.navigate(url)?;
        if fragment_change && self.previous.is_some() {
            self.stale = self.lag;
        }
        Ok(())
    }

    async fn open(&mut self, url: &str) -> Result<()> {
        self.navigate(url)
    }

    async fn html(&mut self) -> Result<String> {
        if self.stale > 0 {
            self.stale -= 1;
            if let Some(ref previous) = self.previous {
                return Ok(previous.clone());
            }
        }
        Ok(self
            .current
            .clone()
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn execute(&mut self, script: &str) -> Result<()> {
        self.scripts.push(script.to_string());
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Config with no sleeping and small retry budgets
pub(crate) fn fast_config() -> GlossaryConfig {
    GlossaryConfig {
        poll_interval: Duration::ZERO,
        element_retries: 2,
        terms_per_tab: 2,
        count_retries: 2,
        reload_retries: 2,
        change_polls: 3,
        ..Default::default()
    }
}

/// Search page with a discipline facet and a total
pub(crate) fn facet_page(total: &str, topics: &[(&str, &str)]) -> String {
    let values: String = topics
        .iter()
        .map(|(name, count)| {
            format!(
                r#"<li class="coveo-facet-value"><label class="coveo-facet-value-label">
                   <span class="coveo-facet-value-caption">{}</span>
                   <span class="coveo-facet-value-count">{}</span></label></li>"#,
                name, count
            )
        })
        .collect();
    format!(
        r#"<html><body>
        <div class="CoveoQuerySummary"><span class="coveo-highlight-total-count">{}</span></div>
        <div id="discipline-facet" class="CoveoFacet">
            <div class="coveo-facet-header">Discipline</div>
            <ul>{}</ul>
            <div class="coveo-facet-footer"><span class="coveo-facet-more">More</span></div>
        </div></body></html>"#,
        total, values
    )
}

/// One tab of search results; `links` are (title, href)
pub(crate) fn results_page(total: &str, links: &[(&str, &str)]) -> String {
    let results: String = links
        .iter()
        .map(|(title, href)| {
            format!(
                r#"<div class="CoveoResult"><a class="CoveoResultLink" href="{}">{}</a></div>"#,
                href, title
            )
        })
        .collect();
    format!(
        r#"<html><body>
        <div class="coveo-results-header">Results</div>
        <div class="CoveoQuerySummary"><span class="coveo-highlight-total-count">{}</span></div>
        <div class="coveo-result-list">{}</div></body></html>"#,
        total, results
    )
}

/// Results page whose header has not been filled in yet
pub(crate) fn unrendered_results_page() -> String {
    r#"<html><body><div class="coveo-results-header"></div></body></html>"#.to_string()
}

/// Term detail page; each definition is (heading line, definition)
pub(crate) fn detail_page(term: &str, definitions: &[(&str, &str)]) -> String {
    let blocks: String = definitions
        .iter()
        .map(|(heading, definition)| {
            format!(
                r#"<div class="content-two-col__text"><p>{}</p><p>{}</p><p>See also</p></div>"#,
                heading, definition
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="row"><div class="small-12"><h1><strong>{}</strong></h1></div></div>
        {}</body></html>"#,
        term, blocks
    )
}
