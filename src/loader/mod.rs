//! Reads raw observation CSVs written by a previous crawl.

use crate::models::{Dataset, PriceRow};
use crate::storage::UTF8_BOM;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Parse one raw prices file. Malformed rows are logged and skipped.
pub fn load_prices_csv(path: &Path) -> Result<Vec<PriceRow>> {
    debug!("Loading {:?}", path);

    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body);

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize::<PriceRow>().enumerate() {
        match result {
            Ok(r) => rows.push(r),
            Err(e) => warn!("Row {} in {:?}: {}", i + 1, path, e),
        }
    }

    info!("{:?}: {} rows loaded", path.file_name().unwrap_or_default(), rows.len());
    Ok(rows)
}

/// Raw prices files in `dir` (grouped-means files are left out), sorted by name.
pub fn discover_price_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let is_csv = path.extension().map(|e| e == "csv").unwrap_or(false);
        if path.is_file() && is_csv && name.contains("_prices_") && !name.contains("_avg_prices_") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load a single file, or every raw prices file of a directory, as one dataset.
pub fn load_dataset(input: &Path) -> Result<Dataset> {
    let files = if input.is_dir() {
        discover_price_files(input)?
    } else {
        vec![input.to_path_buf()]
    };

    let mut rows = Vec::new();
    for path in &files {
        rows.extend(load_prices_csv(path)?);
    }
    Ok(Dataset::from(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CsvSink;
    use crate::utils::scratch_dir;
    use chrono::NaiveDate;

    fn row(city: &str, price: Option<f64>) -> PriceRow {
        PriceRow {
            city: city.into(),
            price,
            date: NaiveDate::from_ymd_opt(2021, 6, 30).unwrap(),
            year: 2021,
            crop_name: "Ячмень".into(),
            crop_code: "barley".into(),
            grade: None,
            currency_marked: true,
            source_url: "https://www.zerno.ru/cerealspricesdate/2021-06-30/barley".into(),
        }
    }

    #[test]
    fn reads_back_what_the_sink_wrote() {
        let dir = scratch_dir("loader");
        let sink = CsvSink::open(&dir).unwrap();
        let rows = vec![row("Воронеж", Some(10250.5)), row("Тамань", None)];
        sink.write_records("barley_prices_2021_2021_20250101_000000.csv", &rows)
            .unwrap();
        sink.write_records::<PriceRow>("barley_avg_prices_2021_2021_20250101_000000.csv", &[])
            .unwrap();

        let files = discover_price_files(&dir).unwrap();
        assert_eq!(files.len(), 1);

        let ds = load_dataset(&dir).unwrap();
        assert_eq!(ds.rows(), rows.as_slice());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_dir_has_no_files() {
        assert!(discover_price_files(Path::new("/definitely/not/here")).unwrap().is_empty());
    }

    #[test]
    fn bad_rows_are_skipped() {
        let dir = scratch_dir("loader_bad");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("x_prices_1_1_1.csv");
        std::fs::write(
            &path,
            "city,price_rub_t,date,year,crop,crop_code,grade,currency_marked,url\n\
             Курск,11000,2020-01-09,2020,Пшеница,wheat,3,true,u\n\
             Курск,11000,not-a-date,2020,Пшеница,wheat,3,true,u\n",
        )
        .unwrap();
        let rows = load_prices_csv(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price, Some(11000.0));
        std::fs::remove_dir_all(&dir).ok();
    }
}
