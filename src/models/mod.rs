use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Crop ──────────────────────────────────────────────────────────────────────

/// A crop as it appears in site URLs (`code`) and in the output (`name`).
/// Empty `grades` means the calendar is crawled without a grade segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CropSpec {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub grades: Vec<u8>,
}

impl CropSpec {
    pub fn new(code: &str, name: &str, grades: Vec<u8>) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            grades,
        }
    }

    /// Grade contexts to crawl: each configured grade, or a single ungraded pass.
    pub fn grade_contexts(&self) -> Vec<Option<u8>> {
        if self.grades.is_empty() {
            vec![None]
        } else {
            self.grades.iter().copied().map(Some).collect()
        }
    }
}

// ── Price observation ─────────────────────────────────────────────────────────

/// One city's price on one report date. `price` is `None` when the source
/// cell did not parse as a number; the row is still kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRow {
    pub city: String,
    #[serde(rename = "price_rub_t")]
    pub price: Option<f64>,
    pub date: NaiveDate,
    pub year: i32,
    #[serde(rename = "crop")]
    pub crop_name: String,
    pub crop_code: String,
    pub grade: Option<u8>,
    pub currency_marked: bool,
    #[serde(rename = "url")]
    pub source_url: String,
}

/// Date/crop context attached to every row parsed from one detail page.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub date: NaiveDate,
    pub year: i32,
    pub crop_code: String,
    pub crop_name: String,
    pub grade: Option<u8>,
    pub source_url: String,
}

// ── Dataset ───────────────────────────────────────────────────────────────────

/// Accumulates rows while the crawl runs.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    rows: Vec<PriceRow>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = PriceRow>) {
        self.rows.extend(rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn finish(self) -> Dataset {
        Dataset { rows: self.rows }
    }
}

/// Finalized, read-only set of observations in crawl order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<PriceRow>,
}

impl Dataset {
    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn counts_by_crop(&self) -> BTreeMap<String, usize> {
        let mut out = BTreeMap::new();
        for r in &self.rows {
            *out.entry(r.crop_name.clone()).or_insert(0) += 1;
        }
        out
    }

    pub fn counts_by_year(&self) -> BTreeMap<i32, usize> {
        let mut out = BTreeMap::new();
        for r in &self.rows {
            *out.entry(r.year).or_insert(0) += 1;
        }
        out
    }
}

impl From<Vec<PriceRow>> for Dataset {
    fn from(rows: Vec<PriceRow>) -> Self {
        Self { rows }
    }
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Mean price of one group in the summary output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CityMean {
    pub crop_code: Option<String>,
    pub city: String,
    pub grade: Option<u8>,
    pub mean_price: f64,
    pub observations: usize,
}
