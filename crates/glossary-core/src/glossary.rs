//! The glossary session
//!
//! `Glossary` owns a page driver for its whole lifetime. Opening one loads the
//! search page once to learn the available topics and the glossary size;
//! every later call drives the same tab sequentially.

use crate::config::GlossaryConfig;
use crate::crawl::collect_term_urls;
use crate::detail::fetch_results;
use crate::driver::{ChromeDriver, PageDriver};
use crate::query::{self, SearchQuery};
use crate::saver::Saver;
use crate::topics::{discover_topics, match_topics};
use crate::{GlossaryError, Language, Result, SearchResult, Topic};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Search the glossary through a browser
pub struct Glossary<D: PageDriver = ChromeDriver> {
    driver: D,
    config: GlossaryConfig,
    topics: Vec<Topic>,
    size: u64,
    saver: Saver,
}

impl Glossary<ChromeDriver> {
    /// Launch the configured browser and open the glossary
    pub async fn open(config: GlossaryConfig) -> Result<Self> {
        let driver = ChromeDriver::launch(&config.browser).await?;
        Self::with_driver(driver, config).await
    }
}

impl<D: PageDriver> Glossary<D> {
    /// Open the glossary over an existing driver
    pub async fn with_driver(mut driver: D, config: GlossaryConfig) -> Result<Self> {
        info!("Getting available topics and glossary size...");
        let (topics, size) = match discover_topics(&mut driver, &config).await {
            Ok(found) => found,
            Err(e) => {
                let _ = driver.close().await;
                return Err(e);
            }
        };
        info!("Available topics and glossary size gotten");

        Ok(Self {
            driver,
            config,
            topics,
            size,
            saver: Saver::default(),
        })
    }

    /// Topics with the number of terms filed under each
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// Topic names only
    pub fn topics_list(&self) -> Vec<&str> {
        self.topics.iter().map(|t| t.name.as_str()).collect()
    }

    /// Total number of terms in the glossary
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn language(&self) -> Language {
        self.config.language
    }

    pub fn config(&self) -> &GlossaryConfig {
        &self.config
    }

    /// Search page URL for the configured language
    pub fn base_url(&self) -> String {
        query::base_url(self.config.language)
    }

    pub fn saver(&self) -> &Saver {
        &self.saver
    }

    /// Replace the saver, e.g. one with extra writers registered
    pub fn with_saver(mut self, saver: Saver) -> Self {
        self.saver = saver;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.driver.is_closed()
    }

    /// Close the browser. Safe to call more than once.
    pub async fn close(&mut self) -> Result<()> {
        if self.driver.is_closed() {
            return Ok(());
        }
        debug!("Closing glossary");
        self.driver.close().await
    }

    fn ensure_open(&self) -> Result<()> {
        if self.driver.is_closed() {
            return Err(GlossaryError::BrowserError(
                "Glossary has been closed".to_string(),
            ));
        }
        Ok(())
    }

    /// Re-read topics and glossary size from the site
    pub async fn refresh_topics(&mut self) -> Result<()> {
        self.ensure_open()?;
        let (topics, size) = discover_topics(&mut self.driver, &self.config).await?;
        self.topics = topics;
        self.size = size;
        Ok(())
    }

    /// Closest available topic(s) for `topic`; see [`match_topics`]
    pub fn topic_match(&self, topic: &str) -> Option<String> {
        match_topics(topic, &self.topics)
    }

    /// Build the filters for a search, resolving the topic.
    ///
    /// `None` when a topic was given but nothing matches it.
    fn resolve(
        &self,
        query: Option<&str>,
        topic: Option<&str>,
        start_letter: Option<char>,
    ) -> Option<SearchQuery> {
        let mut search = SearchQuery::new();
        if let Some(query) = query {
            search = search.query(query);
        }
        if let Some(topic) = topic {
            search = search.topic(self.topic_match(topic)?);
        }
        if let Some(letter) = start_letter {
            search = search.start_letter(letter);
        }
        Some(search)
    }

    /// URL of the given results tab; `None` when the topic has no match
    pub fn search_url(
        &self,
        query: Option<&str>,
        topic: Option<&str>,
        start_letter: Option<char>,
        tab: u32,
    ) -> Option<String> {
        let search = self.resolve(query, topic, start_letter)?;
        let pager = query::pager_query(tab, self.config.terms_per_tab);
        Some(query::search_url(&self.base_url(), &search, &pager))
    }

    /// Detail page URLs of matching terms, at most `count` of them
    pub async fn term_urls(
        &mut self,
        query: Option<&str>,
        topic: Option<&str>,
        start_letter: Option<char>,
        count: Option<usize>,
    ) -> Result<Vec<String>> {
        self.ensure_open()?;
        if count == Some(0) {
            return Err(GlossaryError::InvalidArgument(
                "Count must be greater than 0".to_string(),
            ));
        }

        let Some(search) = self.resolve(query, topic, start_letter) else {
            return Ok(Vec::new());
        };
        collect_term_urls(&mut self.driver, &self.config, &search, count).await
    }

    /// Definitions on a term's detail page, filtered to `topic` when given
    pub async fn results_from_url(
        &mut self,
        url: &str,
        topic: Option<&str>,
    ) -> Result<Option<Vec<SearchResult>>> {
        self.ensure_open()?;
        let filter = match topic.filter(|t| !t.trim().is_empty()) {
            Some(topic) => match self.topic_match(topic) {
                Some(matched) => Some(matched),
                None => return Ok(None),
            },
            None => None,
        };

        let attempts = self.config.element_retries.max(1);
        let mut attempt = 1;
        loop {
            match fetch_results(&mut self.driver, &self.config, url, filter.as_deref()).await {
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!("Loading {} failed ({}), retrying", url, e);
                    attempt += 1;
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                other => return other,
            }
        }
    }

    /// Definitions of terms filed under `topic`, one per term.
    ///
    /// Use [`Glossary::search`] to get every definition of each term.
    pub async fn terms_on(
        &mut self,
        topic: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let urls = self.term_urls(None, Some(topic), None, max_results).await?;

        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            if let Some(found) = self.results_from_url(&url, Some(topic)).await? {
                results.extend(found.into_iter().next());
            }
        }
        info!("Found {} terms on '{}'", results.len(), topic);
        Ok(results)
    }

    /// Search for `query`, returning every definition of the first `max_results` terms.
    ///
    /// With `topic`, only definitions filed under that topic are kept.
    pub async fn search(
        &mut self,
        query: &str,
        topic: Option<&str>,
        start_letter: Option<char>,
        max_results: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let urls = self
            .term_urls(Some(query), topic, start_letter, max_results)
            .await?;

        let mut results = Vec::new();
        for url in urls {
            if let Some(found) = self.results_from_url(&url, topic).await? {
                results.extend(found);
            }
        }
        info!("Found {} definitions for '{}'", results.len(), query);
        Ok(results)
    }

    /// Save results with the session's saver; see [`Saver::save`]
    pub fn save(
        &self,
        topic: &str,
        results: &[SearchResult],
        filename: Option<&Path>,
    ) -> Result<PathBuf> {
        self.saver.save(topic, results, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{detail_page, facet_page, fast_config, results_page, FakeDriver};

    const BIT: &str = "https://glossary.slb.com/en/terms/b/bit";
    const KICK: &str = "https://glossary.slb.com/en/terms/k/kick";

    fn base() -> String {
        query::base_url(Language::English)
    }

    fn url_for(search: SearchQuery) -> String {
        query::search_url(&base(), &search, "")
    }

    fn driver() -> FakeDriver {
        FakeDriver::new()
            .route(base(), facet_page("5,021", &[("Drilling", "1,204"), ("Geology", "873")]))
            .route(
                url_for(SearchQuery::new().topic("Drilling")),
                results_page("2", &[("bit", "/en/terms/b/bit"), ("kick", "/en/terms/k/kick")]),
            )
            .route(
                url_for(SearchQuery::new().query("kick")),
                results_page("1", &[("kick", "/en/terms/k/kick")]),
            )
            .route(
                BIT,
                detail_page(
                    "bit",
                    &[
                        ("1. n. [Geology]", "A fragment of rock."),
                        ("2. n. [Drilling]", "The tool used to crush or cut rock."),
                    ],
                ),
            )
            .route(
                KICK,
                detail_page(
                    "kick",
                    &[
                        ("1. n. [Drilling]", "A flow of formation fluids into the wellbore."),
                        ("2. vb. [Production]", "To start a pump."),
                    ],
                ),
            )
    }

    #[tokio::test]
    async fn test_open_discovers_topics() {
        let glossary = Glossary::with_driver(driver(), fast_config()).await.unwrap();
        assert_eq!(glossary.size(), 5021);
        assert_eq!(glossary.topics_list(), vec!["Drilling", "Geology"]);
        assert_eq!(glossary.topics()[0].count, 1204);
        // The facet's "more" control is clicked once
        assert_eq!(glossary.driver.scripts.len(), 1);
    }

    #[tokio::test]
    async fn test_terms_on_topic() {
        let mut glossary = Glossary::with_driver(driver(), fast_config()).await.unwrap();
        let results = glossary.terms_on("drilling", None).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].term, "bit");
        assert_eq!(
            results[0].definition.as_deref(),
            Some("The tool used to crush or cut rock.")
        );
        assert_eq!(results[0].topic.as_deref(), Some("Drilling"));
        assert_eq!(results[1].term, "kick");
    }

    #[tokio::test]
    async fn test_search_returns_every_definition() {
        let mut glossary = Glossary::with_driver(driver(), fast_config()).await.unwrap();
        let results = glossary.search("kick", None, None, Some(3)).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].grammatical_label.as_deref(), Some("Verb"));
        assert_eq!(results[1].topic.as_deref(), Some("Production"));
    }

    #[tokio::test]
    async fn test_unmatched_topic_finds_nothing() {
        let mut glossary = Glossary::with_driver(driver(), fast_config()).await.unwrap();
        assert!(glossary.search_url(None, Some("astronomy"), None, 1).is_none());

        let loads_before = glossary.driver.loads.len();
        let results = glossary.terms_on("astronomy", None).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(glossary.driver.loads.len(), loads_before);
    }

    #[tokio::test]
    async fn test_search_url_resolves_topic() {
        let glossary = Glossary::with_driver(driver(), fast_config()).await.unwrap();
        assert_eq!(
            glossary.search_url(Some("bit"), Some("geologi"), None, 2).unwrap(),
            "https://glossary.slb.com/en/search#q=bit&first=2&sort=relevancy&f:DisciplineFacet=[Geology]"
        );
    }

    #[tokio::test]
    async fn test_closed_glossary_rejects_calls() {
        let mut glossary = Glossary::with_driver(driver(), fast_config()).await.unwrap();
        glossary.close().await.unwrap();
        assert!(glossary.is_closed());
        glossary.close().await.unwrap();

        let err = glossary.search("kick", None, None, None).await.unwrap_err();
        assert!(matches!(err, GlossaryError::BrowserError(_)));
    }

    #[tokio::test]
    async fn test_open_fails_when_facets_never_render() {
        let driver = FakeDriver::new().route(base(), "<html><body></body></html>");
        let err = Glossary::with_driver(driver, fast_config()).await.err().unwrap();
        assert!(matches!(err, GlossaryError::ExtractionError(_)));
    }

    #[tokio::test]
    async fn test_network_errors_are_retried() {
        let driver = driver().fail(KICK, GlossaryError::NetworkError("connection reset".into()));
        let mut glossary = Glossary::with_driver(driver, fast_config()).await.unwrap();

        let results = glossary.results_from_url(KICK, None).await.unwrap().unwrap();
        assert_eq!(results[0].term, "kick");
        assert_eq!(glossary.driver.loads_of(KICK), 2);
    }

    #[tokio::test]
    async fn test_retries_are_capped() {
        let driver = driver()
            .fail(BIT, GlossaryError::NetworkError("connection reset".into()))
            .fail(BIT, GlossaryError::BrowserError("tab crashed".into()));
        let mut glossary = Glossary::with_driver(driver, fast_config()).await.unwrap();

        let err = glossary.results_from_url(BIT, None).await.unwrap_err();
        assert!(matches!(err, GlossaryError::BrowserError(_)));
        // `element_retries` attempts in total
        assert_eq!(glossary.driver.loads_of(BIT), 2);
    }

    #[tokio::test]
    async fn test_extraction_errors_are_not_retried() {
        let driver = driver().fail(KICK, GlossaryError::ExtractionError("garbled page".into()));
        let mut glossary = Glossary::with_driver(driver, fast_config()).await.unwrap();

        let err = glossary.results_from_url(KICK, None).await.unwrap_err();
        assert!(matches!(err, GlossaryError::ExtractionError(_)));
        assert_eq!(glossary.driver.loads_of(KICK), 1);
    }

    #[tokio::test]
    async fn test_first_search_after_open_reads_its_own_results() {
        let driver = driver().lag(2);
        let mut glossary = Glossary::with_driver(driver, fast_config()).await.unwrap();

        let results = glossary.search("kick", None, None, Some(1)).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.term == "kick"));
    }
}
