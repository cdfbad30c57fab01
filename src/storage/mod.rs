use crate::models::{CityMean, Dataset, PriceRow};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Spreadsheet tools need it to detect UTF-8 (Cyrillic city names).
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ── File naming ───────────────────────────────────────────────────────────────

/// Identity of one crawl run, encoded into output file names.
#[derive(Debug, Clone)]
pub struct RunLabel {
    pub slug: String,
    pub start_year: i32,
    pub end_year: i32,
    pub started_at: NaiveDateTime,
}

impl RunLabel {
    pub fn new(crop_codes: &[&str], start_year: i32, end_year: i32, started_at: NaiveDateTime) -> Self {
        let slug = if crop_codes.is_empty() {
            "all_crops".to_string()
        } else {
            crop_codes.join("_")
        };
        Self { slug, start_year, end_year, started_at }
    }

    fn stamp(&self) -> String {
        self.started_at.format("%Y%m%d_%H%M%S").to_string()
    }

    pub fn raw_file_name(&self) -> String {
        format!("{}_prices_{}_{}_{}.csv", self.slug, self.start_year, self.end_year, self.stamp())
    }

    pub fn means_file_name(&self) -> String {
        format!("{}_avg_prices_{}_{}_{}.csv", self.slug, self.start_year, self.end_year, self.stamp())
    }
}

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub raw: PathBuf,
    pub means: PathBuf,
}

// ── Record layouts ────────────────────────────────────────────────────────────

/// A row type with a fixed CSV layout. `COLUMNS` must match the serde field
/// names so a file with no rows still gets its header.
pub trait CsvRecord: Serialize {
    const COLUMNS: &'static [&'static str];
}

impl CsvRecord for PriceRow {
    const COLUMNS: &'static [&'static str] = &[
        "city",
        "price_rub_t",
        "date",
        "year",
        "crop",
        "crop_code",
        "grade",
        "currency_marked",
        "url",
    ];
}

impl CsvRecord for CityMean {
    const COLUMNS: &'static [&'static str] = &["crop_code", "city", "grade", "mean_price", "observations"];
}

// ── Sink ──────────────────────────────────────────────────────────────────────

/// Writes comma-separated, header-first, BOM-prefixed UTF-8 files into one directory.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Could not create dir {:?}", dir))?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    pub fn write_records<T: CsvRecord>(&self, file_name: &str, records: &[T]) -> Result<PathBuf> {
        let path = self.dir.join(file_name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {:?}", path))?;
        let mut out = BufWriter::new(file);
        out.write_all(UTF8_BOM)?;

        let mut writer = csv::Writer::from_writer(out);
        if records.is_empty() {
            writer
                .write_record(T::COLUMNS)
                .with_context(|| format!("Failed to write header to {:?}", path))?;
        }
        for rec in records {
            writer
                .serialize(rec)
                .with_context(|| format!("Failed to write record to {:?}", path))?;
        }
        writer.flush()?;

        info!("Wrote {} rows to {:?}", records.len(), path);
        Ok(path)
    }

    /// Persist the raw observations and the grouped means of one run.
    pub fn write_run(&self, label: &RunLabel, dataset: &Dataset, means: &[CityMean]) -> Result<OutputPaths> {
        let raw = self.write_records(&label.raw_file_name(), dataset.rows())?;
        let means = self.write_records(&label.means_file_name(), means)?;
        Ok(OutputPaths { raw, means })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::scratch_dir;
    use chrono::NaiveDate;

    fn label() -> RunLabel {
        let at = NaiveDate::from_ymd_opt(2025, 12, 4).unwrap().and_hms_opt(21, 22, 39).unwrap();
        RunLabel::new(&["wheat", "barley"], 2020, 2025, at)
    }

    #[test]
    fn file_names_encode_run() {
        let l = label();
        assert_eq!(l.raw_file_name(), "wheat_barley_prices_2020_2025_20251204_212239.csv");
        assert_eq!(l.means_file_name(), "wheat_barley_avg_prices_2020_2025_20251204_212239.csv");
        assert_eq!(RunLabel::new(&[], 2020, 2020, l.started_at).slug, "all_crops");
    }

    #[test]
    fn writes_bom_header_and_unicode() {
        let dir = scratch_dir("sink");
        let sink = CsvSink::open(&dir).unwrap();
        let rows = vec![PriceRow {
            city: "Ростов-на-Дону".into(),
            price: None,
            date: NaiveDate::from_ymd_opt(2020, 1, 9).unwrap(),
            year: 2020,
            crop_name: "Пшеница".into(),
            crop_code: "wheat".into(),
            grade: Some(3),
            currency_marked: true,
            source_url: "https://www.zerno.ru/cerealspricesdate/2020-01-09/wheat/3".into(),
        }];
        let means = vec![CityMean {
            crop_code: Some("wheat".into()),
            city: "Курск".into(),
            grade: Some(3),
            mean_price: 150.0,
            observations: 2,
        }];
        let paths = sink.write_run(&label(), &Dataset::from(rows), &means).unwrap();

        let bytes = std::fs::read(&paths.raw).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "city,price_rub_t,date,year,crop,crop_code,grade,currency_marked,url"
        );
        assert!(means_header_matches(&paths.means));
        assert_eq!(
            lines.next().unwrap(),
            "Ростов-на-Дону,,2020-01-09,2020,Пшеница,wheat,3,true,https://www.zerno.ru/cerealspricesdate/2020-01-09/wheat/3"
        );

        let means_text = std::fs::read_to_string(&paths.means).unwrap();
        assert!(means_text.contains("crop_code,city,grade,mean_price,observations"));
        assert!(means_text.contains("wheat,Курск,3,150.0,2"));

        std::fs::remove_dir_all(&dir).ok();
    }

    fn means_header_matches(path: &Path) -> bool {
        let text = std::fs::read_to_string(path).unwrap();
        text.trim_start_matches('\u{feff}').lines().next() == Some(&CityMean::COLUMNS.join(",")[..])
    }

    #[test]
    fn empty_files_still_carry_a_header() {
        let dir = scratch_dir("sink_empty");
        let sink = CsvSink::open(&dir).unwrap();

        let means = sink.write_records::<CityMean>("means.csv", &[]).unwrap();
        let text = std::fs::read_to_string(&means).unwrap();
        assert_eq!(text, "\u{feff}crop_code,city,grade,mean_price,observations\n");

        let raw = sink.write_records::<PriceRow>("raw.csv", &[]).unwrap();
        let text = std::fs::read_to_string(&raw).unwrap();
        assert_eq!(
            text.trim_start_matches('\u{feff}').trim_end(),
            PriceRow::COLUMNS.join(",")
        );

        std::fs::remove_dir_all(&dir).ok();
    }
}
