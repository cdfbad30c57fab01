//! Finding the priced table on a detail page.
//!
//! The site markup carries no semantic hooks, so tables are recognised by
//! literal markers: the rouble-per-tonne currency string, and the
//! "Класс N" header of the requested grade. Preference order:
//!
//! 1. tables with both markers,
//! 2. tables with the currency marker only.
//!
//! Within each tier, tables that wrap other tables (layout wrappers) come
//! after leaf tables; otherwise document order is kept.

use crate::error::ScrapeError;
use tracing::debug;

use super::PageHandle;
use super::cleaner::CURRENCY_MARKER;

/// Lower-case header label of a grade block, e.g. "класс 3".
pub fn grade_label(grade: u8) -> String {
    format!("класс {}", grade)
}

/// All tables holding rouble prices, best match first.
pub fn candidate_tables(page: &PageHandle, grade: Option<u8>) -> Result<Vec<String>, ScrapeError> {
    let label = grade.map(grade_label);

    let mut ranked: Vec<(bool, bool, String)> = page
        .select_outer_html("table")?
        .into_iter()
        .filter(|html| html.contains(CURRENCY_MARKER))
        .map(|html| {
            let misses_grade = label
                .as_ref()
                .is_some_and(|l| !html.to_lowercase().contains(l.as_str()));
            let wraps_tables = html.matches("<table").count() > 1;
            (misses_grade, wraps_tables, html)
        })
        .collect();

    ranked.sort_by_key(|(misses_grade, wraps_tables, _)| (*misses_grade, *wraps_tables));
    Ok(ranked.into_iter().map(|(_, _, html)| html).collect())
}

/// Walk the priced tables in preference order and return what `accept`
/// makes of the first table it takes. Rejections are logged; when nothing
/// is accepted the page has no usable table.
pub fn locate_table<T>(
    page: &PageHandle,
    grade: Option<u8>,
    mut accept: impl FnMut(&str) -> Result<T, ScrapeError>,
) -> Result<T, ScrapeError> {
    for (i, table) in candidate_tables(page, grade)?.iter().enumerate() {
        match accept(table) {
            Ok(found) => return Ok(found),
            Err(e) => debug!("{}: candidate table {} unusable: {}", page.url(), i, e),
        }
    }
    Err(ScrapeError::TableNotFound {
        url: page.url().to_string(),
    })
}
