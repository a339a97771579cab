//! Term detail page parsing
//!
//! A detail page holds the term in its heading and one block per definition.
//! Each block opens with a line such as `1. n. [Drilling]`: sense number,
//! abbreviated part of speech, and the topic in brackets.

use crate::config::GlossaryConfig;
use crate::dom::{self, selector, text_of};
use crate::driver::PageDriver;
use crate::{GlossaryError, Language, Result, SearchResult};
use scraper::Html;
use tracing::{debug, warn};

pub(crate) const TERM_NAME: &str = ".row .small-12 h1 strong";
pub(crate) const DEFINITION_BLOCK: &str = ".content-two-col__text";

/// Expand an abbreviated part of speech; unknown abbreviations are returned as-is
pub fn full_grammatical_label(language: Language, abbr: &str) -> String {
    let label = match (language, abbr.to_lowercase().as_str()) {
        (Language::English, "n.") => "Noun",
        (Language::English, "pron.") => "Pronoun",
        (Language::English, "vb.") => "Verb",
        (Language::English, "adj.") => "Adjective",
        (Language::English, "adv.") => "Adverb",
        (Language::English, "prep.") => "Preposition",
        (Language::English, "conj.") => "Conjunction",
        (Language::English, "interj.") => "Interjection",
        (Language::English, "art.") => "Article",
        (Language::English, "det.") => "Determiner",
        (Language::English, "num.") => "Numeral",
        (Language::English, "aux.") => "Auxiliary Verb",
        (Language::English, "modal") => "Modal Verb",
        (Language::English, "participle") => "Participle",
        (Language::English, "gerund") => "Gerund",
        (Language::Spanish, "s.") => "Sustantivo",
        (Language::Spanish, "pron.") => "Pronombre",
        (Language::Spanish, "v.") => "Verbo",
        (Language::Spanish, "adj.") => "Adjetivo",
        (Language::Spanish, "adv.") => "Adverbio",
        (Language::Spanish, "prep.") => "Preposición",
        (Language::Spanish, "conj.") => "Conjunción",
        (Language::Spanish, "interj.") => "Interjección",
        (Language::Spanish, "art.") => "Artículo",
        (Language::Spanish, "det.") => "Determinante",
        (Language::Spanish, "num.") => "Número",
        (Language::Spanish, "aux.") => "Verbo Auxiliar",
        (Language::Spanish, "modal") => "Verbo Modal",
        (Language::Spanish, "participio") => "Participio",
        (Language::Spanish, "gerundio") => "Gerundio",
        _ => return abbr.to_string(),
    };
    label.to_string()
}

/// Topic named at the end of a definition heading, e.g. `Drilling` in `1. n. [Drilling]`
fn heading_topic(heading: &str) -> Option<String> {
    let last = heading.rsplit('.').next()?.trim();
    let last = last.strip_suffix(']').unwrap_or(last);
    let last = last.strip_prefix('[').unwrap_or(last).trim();
    (!last.is_empty()).then(|| last.to_string())
}

/// Parse the definitions on a detail page snapshot.
///
/// With `topic_filter` (comma separated topics), only the first definition
/// filed under one of those topics is returned; if none is, every
/// definition is. Returns `None` when the page has no term or definitions.
pub fn parse_detail(
    html: &str,
    url: &str,
    language: Language,
    topic_filter: Option<&str>,
) -> Result<Option<Vec<SearchResult>>> {
    let term_sel = selector(TERM_NAME)?;
    let block_sel = selector(DEFINITION_BLOCK)?;
    let p_sel = selector("p")?;

    let document = Html::parse_document(html);
    let Some(term) = document.select(&term_sel).next().map(text_of) else {
        return Ok(None);
    };

    let filters: Vec<String> = topic_filter
        .unwrap_or("")
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let mut results = Vec::new();
    for block in document.select(&block_sel) {
        let paragraphs: Vec<String> = block.select(&p_sel).map(text_of).collect();
        if paragraphs.len() < 2 {
            debug!("Skipping malformed definition block for '{}'", term);
            continue;
        }

        let heading = &paragraphs[0];
        let definition = if paragraphs[1].is_empty() {
            paragraphs.get(2).filter(|p| !p.is_empty()).cloned()
        } else {
            Some(paragraphs[1].clone())
        };
        let grammatical_label = heading
            .split_whitespace()
            .nth(1)
            .map(|abbr| full_grammatical_label(language, abbr));

        let heading_lower = heading.to_lowercase();
        if let Some(topic) = filters
            .iter()
            .find(|t| heading_lower.contains(&t.to_lowercase()))
        {
            return Ok(Some(vec![SearchResult {
                term,
                definition,
                grammatical_label,
                topic: Some(topic.clone()),
                url: Some(url.to_string()),
            }]));
        }

        results.push(SearchResult {
            term: term.clone(),
            definition,
            grammatical_label,
            topic: heading_topic(heading),
            url: Some(url.to_string()),
        });
    }

    if results.is_empty() {
        return Ok(None);
    }
    Ok(Some(results))
}

/// Load a detail page and parse its definitions
pub async fn fetch_results<D>(
    driver: &mut D,
    config: &GlossaryConfig,
    url: &str,
    topic_filter: Option<&str>,
) -> Result<Option<Vec<SearchResult>>>
where
    D: PageDriver + ?Sized,
{
    driver.load(url).await?;
    let html = match dom::wait_for(driver, config, TERM_NAME).await {
        Ok(html) => html,
        Err(GlossaryError::ExtractionError(_)) => {
            warn!("No term found on {}", url);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    parse_detail(&html, url, config.language, topic_filter)
}
