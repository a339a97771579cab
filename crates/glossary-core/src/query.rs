//! Search URL construction
//!
//! The search page keeps its whole state in the URL fragment, e.g.
//! `#q=kick&first=12&sort=relevancy&f:DisciplineFacet=[Drilling]`.

use crate::Language;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left as-is when encoding fragment values
const FRAGMENT_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// Search page of the glossary in the given language
pub fn base_url(language: Language) -> String {
    format!("https://glossary.slb.com/{}/search", language.code())
}

/// Pager parameter selecting the given (1-based) tab of results
pub fn pager_query(tab: u32, terms_per_tab: u32) -> String {
    if tab < 2 {
        return String::new();
    }
    format!("first={}&", terms_per_tab * (tab - 1))
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, FRAGMENT_VALUE).to_string()
}

/// Filters for a glossary search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text query
    pub query: Option<String>,
    /// Resolved topic(s), comma separated
    pub topic: Option<String>,
    /// Only terms starting with this letter
    pub start_letter: Option<char>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into()).filter(|q: &String| !q.is_empty());
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into()).filter(|t: &String| !t.is_empty());
        self
    }

    pub fn start_letter(mut self, letter: char) -> Self {
        self.start_letter = Some(letter);
        self
    }

    /// Whether any filter is set
    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.topic.is_none() && self.start_letter.is_none()
    }
}

/// URL of the search page for the given filters and pager.
///
/// Returns `base` unchanged when no filter is set.
pub fn search_url(base: &str, search: &SearchQuery, pager: &str) -> String {
    if search.is_empty() {
        return base.to_string();
    }

    let mut url = format!("{}#", base);
    if let Some(ref query) = search.query {
        url.push_str(&format!("q={}&", encode(query)));
    }
    url.push_str(pager);
    url.push_str("sort=relevancy");
    if let Some(ref topic) = search.topic {
        url.push_str(&format!("&f:DisciplineFacet=[{}]", encode(topic)));
    }
    if let Some(letter) = search.start_letter {
        let letter: String = letter.to_uppercase().collect();
        url.push_str(&format!("&f:TermStartLetterFacet=[{}]", encode(&letter)));
    }
    url
}
