pub mod calendar;
pub mod cleaner;
pub mod http_client;
pub mod locator;
pub mod parsers;
pub mod sampling;

use crate::error::ScrapeError;
use crate::models::{PageContext, PriceRow};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

use self::cleaner::normalize_table;
use self::locator::locate_table;

// ── Page source abstraction ───────────────────────────────────────────────────

/// When a load counts as finished.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitPolicy {
    /// Use the document as soon as it is parsed.
    Eager,
    /// Re-poll until `selector` matches, failing after `timeout`.
    Element { selector: String, timeout: Duration },
}

/// Swappable page provider. Implementations keep session state between
/// calls, hence `&mut self`.
#[async_trait]
pub trait PageFetcher: Send {
    async fn load(&mut self, url: &str, wait: &WaitPolicy) -> Result<PageHandle, ScrapeError>;
}

/// A loaded document. Selectors are evaluated lazily against the markup.
#[derive(Debug, Clone)]
pub struct PageHandle {
    url: String,
    html: String,
}

impl PageHandle {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> String {
        let doc = Html::parse_document(&self.html);
        let Ok(sel) = Selector::parse("title") else {
            return String::new();
        };
        doc.select(&sel)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    }

    /// Outer HTML of every element matching `selector`, in document order.
    pub fn select_outer_html(&self, selector: &str) -> Result<Vec<String>, ScrapeError> {
        let sel = parse_selector(selector)?;
        let doc = Html::parse_document(&self.html);
        Ok(doc.select(&sel).map(|el| el.html()).collect())
    }

    /// Value of `attr` on every matching element that carries it.
    pub fn select_attr(&self, selector: &str, attr: &str) -> Result<Vec<String>, ScrapeError> {
        let sel = parse_selector(selector)?;
        let doc = Html::parse_document(&self.html);
        Ok(doc
            .select(&sel)
            .filter_map(|el| el.value().attr(attr))
            .map(|v| v.to_string())
            .collect())
    }

    pub fn has_element(&self, selector: &str) -> Result<bool, ScrapeError> {
        let sel = parse_selector(selector)?;
        let doc = Html::parse_document(&self.html);
        Ok(doc.select(&sel).next().is_some())
    }

    /// The site answers unknown calendars with a 200 "not found" page.
    pub fn looks_missing(&self) -> bool {
        self.title().contains("404") || self.html.to_lowercase().contains("не найден")
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|_| ScrapeError::Selector(selector.to_string()))
}

// ── Site URLs ─────────────────────────────────────────────────────────────────

/// `/cerealspricescalendar/{year}/{crop}[/{grade}]`
pub fn calendar_url(base: &Url, year: i32, crop_code: &str, grade: Option<u8>) -> String {
    let root = base.as_str().trim_end_matches('/');
    match grade {
        Some(g) => format!("{}/cerealspricescalendar/{}/{}/{}", root, year, crop_code, g),
        None => format!("{}/cerealspricescalendar/{}/{}", root, year, crop_code),
    }
}

// ── Detail page → rows ────────────────────────────────────────────────────────

/// Rows of the first priced table on the page that normalizes.
pub fn extract_price_rows(page: &PageHandle, ctx: &PageContext) -> Result<Vec<PriceRow>, ScrapeError> {
    locate_table(page, ctx.grade, |table| normalize_table(table, ctx))
}
