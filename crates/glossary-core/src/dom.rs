//! Helpers over rendered DOM snapshots
//!
//! Parsed documents are never held across an `.await`; every helper takes the
//! snapshot as a string and hands back owned values.

use crate::config::GlossaryConfig;
use crate::driver::PageDriver;
use crate::{GlossaryError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::debug;

/// Parse a CSS selector
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| GlossaryError::ExtractionError(format!("Invalid selector '{}': {:?}", css, e)))
}

/// Visible-ish text of an element with whitespace collapsed
pub fn text_of(element: ElementRef) -> String {
    static WS: OnceLock<Regex> = OnceLock::new();
    let ws = WS.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"));
    let text: String = element.text().collect();
    ws.replace_all(text.trim(), " ").into_owned()
}

/// Whether anything in the snapshot matches `css`
pub fn has_match(html: &str, css: &str) -> Result<bool> {
    let sel = selector(css)?;
    Ok(Html::parse_document(html).select(&sel).next().is_some())
}

/// Text of the first element matching `css`
pub fn first_text(html: &str, css: &str) -> Result<Option<String>> {
    let sel = selector(css)?;
    Ok(Html::parse_document(html).select(&sel).next().map(text_of))
}

/// Attribute values of every element matching `css` that carries `attr`
pub fn all_attrs(html: &str, css: &str, attr: &str) -> Result<Vec<String>> {
    let sel = selector(css)?;
    Ok(Html::parse_document(html)
        .select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}

/// Parse a displayed count such as "1,234" or "1 234"
pub fn text_to_int(text: &str) -> Result<u64> {
    let digits: String = text.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    digits
        .parse()
        .map_err(|_| GlossaryError::ExtractionError(format!("Not a number: '{}'", text)))
}

/// Snapshot the page until `css` matches, sleeping between attempts.
///
/// Gives up after `element_retries` snapshots.
pub async fn wait_for<D>(driver: &mut D, config: &GlossaryConfig, css: &str) -> Result<String>
where
    D: PageDriver + ?Sized,
{
    let attempts = config.element_retries.max(1);
    for attempt in 1..=attempts {
        let html = driver.html().await?;
        if has_match(&html, css)? {
            return Ok(html);
        }
        debug!("'{}' not rendered yet (attempt {}/{})", css, attempt, attempts);
        if attempt < attempts {
            tokio::time::sleep(config.poll_interval).await;
        }
    }
    Err(GlossaryError::ExtractionError(format!(
        "No element matching '{}'",
        css
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_to_int() {
        assert_eq!(text_to_int("1,234").unwrap(), 1234);
        assert_eq!(text_to_int(" 5 021 ").unwrap(), 5021);
        assert!(text_to_int("").is_err());
        assert!(text_to_int("n/a").is_err());
    }

    #[test]
    fn test_first_text_collapses_whitespace() {
        let html = "<div class='a'>\n  Hello\n   <b>world</b>  </div><div class='a'>Other</div>";
        assert_eq!(first_text(html, ".a").unwrap(), Some("Hello world".to_string()));
        assert_eq!(first_text(html, ".missing").unwrap(), None);
    }

    #[test]
    fn test_all_attrs_skips_missing() {
        let html = r#"<a class="r" href="/x">X</a><a class="r">Y</a><a class="r" href=" /z ">Z</a>"#;
        assert_eq!(all_attrs(html, "a.r", "href").unwrap(), vec!["/x", "/z"]);
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            has_match("<p></p>", "p[["),
            Err(GlossaryError::ExtractionError(_))
        ));
    }
}
