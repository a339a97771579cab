//! Topic (discipline facet) discovery and matching

use crate::config::GlossaryConfig;
use crate::dom::{self, selector, text_of, text_to_int};
use crate::driver::PageDriver;
use crate::{query, GlossaryError, Result, Topic};
use scraper::Html;
use strsim::normalized_levenshtein;
use tracing::{debug, info, warn};

pub(crate) const FACET_HEADER: &str = ".CoveoFacet .coveo-facet-header";
pub(crate) const FACET_VALUE: &str = "#discipline-facet .coveo-facet-value";
pub(crate) const FACET_CAPTION: &str = ".coveo-facet-value-label .coveo-facet-value-caption";
pub(crate) const FACET_COUNT: &str = ".coveo-facet-value-label .coveo-facet-value-count";
pub(crate) const TOTAL_COUNT: &str = ".CoveoQuerySummary .coveo-highlight-total-count";

/// Expands the discipline facet so every topic is rendered
const EXPAND_FACET_SCRIPT: &str = r#"(() => {
    const more = document.querySelector('.CoveoFacet .coveo-facet-footer .coveo-facet-more');
    if (more) {
        more.scrollIntoView({ block: 'center' });
        more.click();
    }
})()"#;

/// Minimum similarity for a topic to count as a close match
const MATCH_CUTOFF: f64 = 0.5;

/// Topics listed in the discipline facet of a search page snapshot
pub fn parse_topics(html: &str) -> Result<Vec<Topic>> {
    let value_sel = selector(FACET_VALUE)?;
    let caption_sel = selector(FACET_CAPTION)?;
    let count_sel = selector(FACET_COUNT)?;

    let document = Html::parse_document(html);
    let mut topics = Vec::new();
    for value in document.select(&value_sel) {
        let (Some(caption), Some(count)) = (
            value.select(&caption_sel).next(),
            value.select(&count_sel).next(),
        ) else {
            continue;
        };

        let name = text_of(caption);
        match text_to_int(&text_of(count)) {
            Ok(count) if !name.is_empty() => topics.push(Topic { name, count }),
            _ => debug!("Skipping unreadable facet value '{}'", name),
        }
    }
    Ok(topics)
}

/// Total number of results reported by the query summary
pub fn parse_total(html: &str) -> Result<u64> {
    let text = dom::first_text(html, TOTAL_COUNT)?.ok_or_else(|| {
        GlossaryError::ExtractionError("No result total on page".to_string())
    })?;
    text_to_int(&text)
}

/// Load the search page and read every topic with its term count, plus the glossary size
pub async fn discover_topics<D>(driver: &mut D, config: &GlossaryConfig) -> Result<(Vec<Topic>, u64)>
where
    D: PageDriver + ?Sized,
{
    let base = query::base_url(config.language);
    driver.open(&base).await?;

    let mut reloads = 0;
    loop {
        match dom::wait_for(driver, config, FACET_HEADER).await {
            Ok(_) => {
                // Facet items are filled in after the header shows up
                tokio::time::sleep(config.poll_interval).await;
                let html = driver.html().await?;
                let header = dom::first_text(&html, FACET_HEADER)?.unwrap_or_default();
                if !header.is_empty() {
                    break;
                }
            }
            Err(GlossaryError::ExtractionError(_)) => {}
            Err(e) => return Err(e),
        }

        if reloads >= config.reload_retries {
            return Err(GlossaryError::ExtractionError(
                "Topic facet never finished rendering".to_string(),
            ));
        }
        reloads += 1;
        debug!("Facets not loaded yet, reloading ({}/{})", reloads, config.reload_retries);
        driver.open(&base).await?;
    }

    driver.execute(EXPAND_FACET_SCRIPT).await?;
    tokio::time::sleep(config.poll_interval).await;

    let html = driver.html().await?;
    let topics = parse_topics(&html)?;
    let size = match parse_total(&html) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not read glossary size: {}", e);
            0
        }
    };

    info!("Found {} topics, {} terms in the glossary", topics.len(), size);
    Ok((topics, size))
}

/// Resolve user-supplied topic(s) against the available topics.
///
/// `input` may hold several comma separated topics. Each one is matched
/// case-insensitively, falling back to the closest available topic. Returns
/// the canonical names joined with `,`, an empty string for empty input, or
/// `None` when any part has no match.
pub fn match_topics(input: &str, available: &[Topic]) -> Option<String> {
    if input.trim().is_empty() {
        return Some(String::new());
    }

    let mut matched = Vec::new();
    for part in input.split(',').map(|p| p.trim().to_lowercase()).filter(|p| !p.is_empty()) {
        let exact = available.iter().find(|t| t.name.to_lowercase() == part);
        let topic = exact.or_else(|| {
            available
                .iter()
                .map(|t| (t, normalized_levenshtein(&part, &t.name.to_lowercase())))
                .filter(|(_, score)| *score >= MATCH_CUTOFF)
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(t, _)| t)
        });

        match topic {
            Some(topic) => matched.push(topic.name.as_str()),
            None => {
                warn!("No match found for topic: {}", part);
                return None;
            }
        }
    }

    Some(matched.join(","))
}
