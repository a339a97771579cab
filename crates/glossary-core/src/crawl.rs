//! Paginated crawl of search results
//!
//! The results list is rendered client-side, so every tab is loaded by
//! changing the URL fragment and then polling the DOM until the new results
//! replace the old ones.

use crate::config::GlossaryConfig;
use crate::dom;
use crate::driver::PageDriver;
use crate::query::{self, SearchQuery};
use crate::topics::{parse_total, TOTAL_COUNT};
use crate::{GlossaryError, Result};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

pub(crate) const RESULTS_HEADER: &str = ".coveo-results-header";
pub(crate) const RESULT_LINK: &str = ".CoveoResult .CoveoResultLink";

/// A rendered tab of results
struct ResultsTab {
    html: String,
    total: u64,
}

/// Collect detail page URLs of the terms matching `search`.
///
/// `count` caps the number of URLs; `None` collects every result. The
/// topic in `search` must already be resolved against the glossary topics.
pub async fn collect_term_urls<D>(
    driver: &mut D,
    config: &GlossaryConfig,
    search: &SearchQuery,
    count: Option<usize>,
) -> Result<Vec<String>>
where
    D: PageDriver + ?Sized,
{
    if count == Some(0) {
        return Err(GlossaryError::InvalidArgument(
            "Count must be greater than 0".to_string(),
        ));
    }
    if search.is_empty() {
        return Ok(Vec::new());
    }

    let base = query::base_url(config.language);
    let mut urls: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut remaining = count;
    let mut tab: u32 = 1;

    loop {
        let url = query::search_url(&base, search, &query::pager_query(tab, config.terms_per_tab));

        // Text of the first result before moving on, to know when the next tab has rendered
        let previous_first = if tab > 1 {
            let html = driver.html().await?;
            match dom::first_text(&html, RESULT_LINK)? {
                Some(text) => Some(text),
                None => break,
            }
        } else {
            None
        };

        // The first tab gets a fresh document so nothing left over from
        // earlier pages (e.g. the unfiltered search) can be read as results
        if tab == 1 {
            driver.open(&url).await?;
        } else {
            driver.load(&url).await?;
        }

        if let Some(previous) = previous_first {
            if !wait_until_changed(driver, config, &previous).await? {
                warn!("Results did not change after moving to tab {}, stopping", tab);
                break;
            }
        }

        let Some(page) = read_results_tab(driver, config, &url, urls.is_empty()).await? else {
            break;
        };

        let page_url = Url::parse(&url)?;
        let found = dom::all_attrs(&page.html, RESULT_LINK, "href")?;
        if found.is_empty() {
            break;
        }

        let remaining = remaining.get_or_insert(page.total as usize);
        let mut added = 0;
        for href in found {
            if *remaining == 0 {
                break;
            }
            let absolute = page_url.join(&href)?.to_string();
            if seen.insert(absolute.clone()) {
                urls.push(absolute);
                *remaining -= 1;
                added += 1;
            }
        }
        debug!("Tab {}: {} new term URLs", tab, added);

        let max_tabs = page.total.div_ceil(config.terms_per_tab.max(1) as u64);
        if *remaining == 0 || (tab as u64) + 1 > max_tabs {
            break;
        }
        tab += 1;
    }

    info!("Collected {} term URLs", urls.len());
    Ok(urls)
}

/// Poll until the first result differs from `previous`
async fn wait_until_changed<D>(driver: &mut D, config: &GlossaryConfig, previous: &str) -> Result<bool>
where
    D: PageDriver + ?Sized,
{
    let polls = config.change_polls.max(1);
    for poll in 1..=polls {
        let html = driver.html().await?;
        if let Some(current) = dom::first_text(&html, RESULT_LINK)? {
            if current != previous {
                return Ok(true);
            }
        }
        if poll < polls {
            tokio::time::sleep(config.poll_interval).await;
        }
    }
    Ok(false)
}

/// Wait for a results tab to render and read its total.
///
/// Reloads while the header is still empty (only before anything has been
/// collected) and while the total cannot be parsed. Returns `None` when the
/// page has no results or the retry budgets run out.
async fn read_results_tab<D>(
    driver: &mut D,
    config: &GlossaryConfig,
    url: &str,
    first_tab: bool,
) -> Result<Option<ResultsTab>>
where
    D: PageDriver + ?Sized,
{
    let mut reloads = 0;
    let mut count_failures = 0;

    loop {
        let html = match dom::wait_for(driver, config, RESULTS_HEADER).await {
            Ok(html) => html,
            Err(GlossaryError::ExtractionError(_)) => {
                warn!("No results header on {}", url);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let header = dom::first_text(&html, RESULTS_HEADER)?.unwrap_or_default();
        if first_tab && header.is_empty() {
            if reloads >= config.reload_retries {
                warn!("Results never rendered on {}", url);
                return Ok(None);
            }
            reloads += 1;
            info!("Content not loaded yet. Reloading page...");
            driver.open(url).await?;
            continue;
        }

        match parse_total(&html) {
            Ok(total) => return Ok(Some(ResultsTab { html, total })),
            Err(_) if !dom::has_match(&html, TOTAL_COUNT)? => {
                debug!("No result total on {}", url);
                return Ok(None);
            }
            Err(e) => {
                if count_failures >= config.count_retries {
                    warn!("There seems to be no result on this page! ({})", e);
                    return Ok(None);
                }
                count_failures += 1;
                debug!("Unreadable result total, reloading ({}/{})", count_failures, config.count_retries);
                driver.open(url).await?;
            }
        }
    }
}
