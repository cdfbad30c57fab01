use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::CropSpec;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

/// Page session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Ask only for the HTML document, never images or stylesheets.
    #[serde(default = "default_true")]
    pub block_subresources: bool,

    /// When set, detail pages are re-polled until this selector matches.
    /// Unset means the eager policy: the parsed document is used as-is.
    #[serde(default)]
    pub wait_selector: Option<String>,

    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
}

/// Which calendars to walk
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlConfig {
    #[serde(default = "default_start_year")]
    pub start_year: i32,

    /// Defaults to the current year.
    #[serde(default)]
    pub end_year: Option<i32>,

    #[serde(default = "default_crops")]
    pub crops: Vec<CropSpec>,

    /// Truncate every calendar to its first N dates (test runs).
    #[serde(default)]
    pub max_pages_per_calendar: Option<usize>,

    #[serde(default = "default_true")]
    pub sample_twice_monthly: bool,
}

/// Where and how results are written
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default)]
    pub group_by: GroupBy,
}

/// Prediction service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

/// Grouping key for the mean-price summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    City,
    CityGrade,
    #[default]
    CropCityGrade,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://www.zerno.ru".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    500
}
fn default_jitter_ms() -> u64 {
    250
}
fn default_user_agent() -> String {
    "grain-prices/0.1 (research project; price history collection)".to_string()
}
fn default_wait_timeout_secs() -> u64 {
    5
}
fn default_start_year() -> i32 {
    2020
}
fn default_crops() -> Vec<CropSpec> {
    vec![
        CropSpec::new("wheat", "Пшеница", vec![3, 4, 5]),
        CropSpec::new("barley", "Ячмень", vec![]),
        CropSpec::new("corn", "Кукуруза", vec![]),
    ]
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_artifact_dir() -> PathBuf {
    PathBuf::from("models")
}
fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            jitter_ms: default_jitter_ms(),
            user_agent: default_user_agent(),
            block_subresources: true,
            wait_selector: None,
            wait_timeout_secs: default_wait_timeout_secs(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            end_year: None,
            crops: default_crops(),
            max_pages_per_calendar: None,
            sample_twice_monthly: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            group_by: GroupBy::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            crawl: CrawlConfig::default(),
            output: OutputConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("GRAIN").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize()?;
        Ok(app_cfg)
    }
}

impl CrawlConfig {
    pub fn end_year_or_current(&self) -> i32 {
        use chrono::Datelike;
        self.end_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }
}
