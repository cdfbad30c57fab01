//! Crawl orchestrator: calendars → detail pages → dataset → CSV.
//!
//! ## Run shape
//!
//! For every `(year, crop, grade)` the calendar page is loaded and its date
//! links collected; the links are optionally thinned to two per month, then
//! each detail page is loaded and its priced table normalized into rows.
//! Everything is sequential over one page session. A failing calendar, page
//! or table is logged and skipped; only session setup and sink I/O abort the
//! run.

use crate::aggregate::{group_means, log_top};
use crate::config::AppConfig;
use crate::models::{CityMean, Dataset, DatasetBuilder, PageContext};
use crate::scraper::calendar::{date_from_url, discover_date_links, sample_page_links};
use crate::scraper::http_client::BrowserSession;
use crate::scraper::sampling::sample_urls;
use crate::scraper::{PageFetcher, WaitPolicy, calendar_url, extract_price_rows};
use crate::storage::{CsvSink, OutputPaths, RunLabel};
use crate::utils::fmt_count;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const PROGRESS_EVERY: usize = 10;
const TOP_CITIES: usize = 10;

pub struct Pipeline {
    config: AppConfig,
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub stats: PipelineStats,
    pub means: Vec<CityMean>,
    /// `None` when nothing was scraped and no files were written.
    pub outputs: Option<OutputPaths>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PipelineStats {
    pub calendars_visited: usize,
    pub calendars_skipped: usize,
    /// Detail pages that yielded a priced table.
    pub pages_with_rows: usize,
    /// Detail pages that failed to load or had no usable table.
    pub pages_skipped: usize,
    pub rows: usize,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let started_at = chrono::Local::now().naive_local();

        let session = BrowserSession::open(&self.config.scraper).context("Failed to open page session")?;
        let (dataset, stats) = self.crawl_with(session).await?;

        let means = group_means(dataset.rows(), self.config.output.group_by);
        self.log_summary(&dataset, &means, &stats);

        if dataset.is_empty() {
            warn!("No rows scraped; nothing written");
            return Ok(RunOutcome { stats, means, outputs: None });
        }

        let crawl = &self.config.crawl;
        let codes: Vec<&str> = crawl.crops.iter().map(|c| c.code.as_str()).collect();
        let label = RunLabel::new(&codes, crawl.start_year, crawl.end_year_or_current(), started_at);
        let sink = CsvSink::open(&self.config.output.dir)?;
        let outputs = sink.write_run(&label, &dataset, &means).context("Failed to write run output")?;

        Ok(RunOutcome { stats, means, outputs: Some(outputs) })
    }

    /// Crawl with an owned fetcher, which is dropped before this returns on
    /// success and on error alike.
    pub async fn crawl_with<F: PageFetcher>(&self, mut fetcher: F) -> Result<(Dataset, PipelineStats)> {
        self.crawl(&mut fetcher).await
    }

    /// Walk every configured calendar through `fetcher`.
    pub async fn crawl<F: PageFetcher>(&self, fetcher: &mut F) -> Result<(Dataset, PipelineStats)> {
        let base = Url::parse(&self.config.scraper.base_url)
            .with_context(|| format!("Invalid base_url {:?}", self.config.scraper.base_url))?;
        let crawl = &self.config.crawl;
        let end_year = crawl.end_year_or_current();
        let detail_wait = self.detail_wait_policy();

        let mut builder = DatasetBuilder::new();
        let mut stats = PipelineStats::default();

        for year in crawl.start_year..=end_year {
            for crop in &crawl.crops {
                for grade in crop.grade_contexts() {
                    let cal_url = calendar_url(&base, year, &crop.code, grade);
                    let grade_tag = grade.map(|g| format!(" класс {}", g)).unwrap_or_default();
                    info!("=== {} {}{} ===", year, crop.name, grade_tag);

                    let calendar = match fetcher.load(&cal_url, &WaitPolicy::Eager).await {
                        Ok(page) => page,
                        Err(e) => {
                            warn!("Calendar skipped: {}", e);
                            stats.calendars_skipped += 1;
                            continue;
                        }
                    };
                    if calendar.looks_missing() {
                        warn!("Calendar {} not found, skipping", cal_url);
                        stats.calendars_skipped += 1;
                        continue;
                    }
                    stats.calendars_visited += 1;

                    let mut links = match discover_date_links(&calendar, &base) {
                        Ok(links) => links,
                        Err(e) => {
                            warn!("{}: link discovery failed: {}", cal_url, e);
                            continue;
                        }
                    };
                    if links.is_empty() {
                        info!("{}: no date links", cal_url);
                        debug!("First anchors on page: {:?}", sample_page_links(&calendar, 10));
                        continue;
                    }
                    if let Some(max) = crawl.max_pages_per_calendar {
                        links.truncate(max);
                    }
                    if crawl.sample_twice_monthly {
                        let before = links.len();
                        links = sample_urls(&links);
                        debug!("Sampled {} of {} dates", links.len(), before);
                    }
                    info!("{} detail pages to visit", links.len());

                    for (i, url) in links.iter().enumerate() {
                        let Some(date) = date_from_url(url) else {
                            warn!("No date in {}, skipping", url);
                            stats.pages_skipped += 1;
                            continue;
                        };
                        let ctx = PageContext {
                            date,
                            year,
                            crop_code: crop.code.clone(),
                            crop_name: crop.name.clone(),
                            grade,
                            source_url: url.clone(),
                        };

                        let extracted = match fetcher.load(url, &detail_wait).await {
                            Ok(page) => extract_price_rows(&page, &ctx),
                            Err(e) => Err(e),
                        };
                        match extracted {
                            Ok(rows) => {
                                debug!("{}: {} rows", date, rows.len());
                                stats.pages_with_rows += 1;
                                builder.extend(rows);
                            }
                            Err(e) => {
                                warn!("{}", e);
                                stats.pages_skipped += 1;
                            }
                        }

                        if (i + 1) % PROGRESS_EVERY == 0 {
                            info!("  {}/{} pages, {} rows so far", i + 1, links.len(), builder.len());
                        }
                    }
                }
            }
        }

        stats.rows = builder.len();
        Ok((builder.finish(), stats))
    }

    fn detail_wait_policy(&self) -> WaitPolicy {
        match &self.config.scraper.wait_selector {
            Some(selector) => WaitPolicy::Element {
                selector: selector.clone(),
                timeout: Duration::from_secs(self.config.scraper.wait_timeout_secs),
            },
            None => WaitPolicy::Eager,
        }
    }

    fn log_summary(&self, dataset: &Dataset, means: &[CityMean], stats: &PipelineStats) {
        info!(
            "=== Done: {} calendars ({} skipped) | {} pages with rows, {} skipped | {} rows ===",
            stats.calendars_visited,
            stats.calendars_skipped,
            stats.pages_with_rows,
            stats.pages_skipped,
            fmt_count(dataset.len())
        );
        for (crop, n) in dataset.counts_by_crop() {
            info!("  {}: {} rows", crop, fmt_count(n));
        }
        for (year, n) in dataset.counts_by_year() {
            info!("  {}: {} rows", year, fmt_count(n));
        }
        if !means.is_empty() {
            log_top(means, TOP_CITIES);
        }
    }
}
