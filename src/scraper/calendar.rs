//! Calendar pages: one link per report date.

use crate::error::ScrapeError;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use super::PageHandle;

/// Path segment that marks a per-date detail page.
pub const DATE_PATH_MARKER: &str = "cerealspricesdate";

const DATE_LINK_SELECTOR: &str = "td a[href*='cerealspricesdate']";

/// Absolute detail-page URLs linked from the calendar grid, first-seen order,
/// no duplicates. An empty result is a valid "no data this period".
pub fn discover_date_links(page: &PageHandle, base_url: &Url) -> Result<Vec<String>, ScrapeError> {
    let hrefs = page.select_attr(DATE_LINK_SELECTOR, "href")?;

    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for href in hrefs {
        let Ok(abs) = base_url.join(href.trim()) else {
            debug!("Unresolvable calendar href {:?}", href);
            continue;
        };
        if !abs.path().contains(DATE_PATH_MARKER) {
            continue;
        }
        let abs = abs.to_string();
        if seen.insert(abs.clone()) {
            urls.push(abs);
        }
    }

    Ok(urls)
}

/// First few raw anchors of a page, logged when discovery comes back empty.
pub fn sample_page_links(page: &PageHandle, limit: usize) -> Vec<String> {
    page.select_attr("a", "href")
        .unwrap_or_default()
        .into_iter()
        .take(limit)
        .collect()
}

/// Report date encoded in a detail URL:
/// `.../cerealspricesdate/YYYY-MM-DD/crop[/grade]`.
/// Falls back to any date-shaped path segment.
pub fn date_from_url(url: &str) -> Option<NaiveDate> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.collect();

    let after_marker = segments
        .iter()
        .position(|s| *s == DATE_PATH_MARKER)
        .and_then(|i| segments.get(i + 1))
        .and_then(|s| parse_iso_date(s));

    after_marker.or_else(|| segments.iter().find_map(|s| parse_iso_date(s)))
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}
