mod aggregate;
mod config;
mod error;
mod loader;
mod models;
mod pipeline;
mod predict;
mod scraper;
mod server;
mod storage;
mod utils;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::aggregate::group_means;
use crate::config::{AppConfig, GroupBy};
use crate::loader::load_dataset;
use crate::pipeline::Pipeline;
use crate::predict::train_price_model;

#[derive(Parser)]
#[command(name = "grain-prices", about = "Grain price history scraper and price model", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl the price calendars and write raw + mean-price CSVs
    Scrape {
        #[arg(long)]
        from_year: Option<i32>,

        #[arg(long)]
        to_year: Option<i32>,

        /// Only crawl these crop codes (repeatable); default: every configured crop
        #[arg(long = "crop")]
        crops: Vec<String>,

        /// Visit at most N dates per calendar
        #[arg(long)]
        max_pages: Option<usize>,

        /// Visit every calendar date instead of two per month
        #[arg(long)]
        all_dates: bool,

        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Mean prices from previously scraped CSV file(s)
    Summary {
        /// A raw prices CSV or a directory of them
        input: PathBuf,

        #[arg(long, value_enum)]
        group_by: Option<GroupBy>,
    },

    /// Fit the price model from scraped CSV file(s)
    Train {
        /// A raw prices CSV or a directory of them
        input: PathBuf,

        /// Artifact directory (default: model.artifact_dir)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Run the prediction HTTP service
    Serve {
        #[arg(long, env = "GRAIN_BIND")]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "grain_prices=info,warn",
        1 => "grain_prices=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Scrape {
            from_year,
            to_year,
            crops,
            max_pages,
            all_dates,
            out_dir,
        } => {
            let crawl = &mut config.crawl;
            if let Some(y) = from_year {
                crawl.start_year = y;
            }
            if to_year.is_some() {
                crawl.end_year = to_year;
            }
            if !crops.is_empty() {
                crawl.crops.retain(|c| crops.contains(&c.code));
                if crawl.crops.is_empty() {
                    bail!("None of {:?} is a configured crop code", crops);
                }
            }
            if max_pages.is_some() {
                crawl.max_pages_per_calendar = max_pages;
            }
            if all_dates {
                crawl.sample_twice_monthly = false;
            }
            if let Some(dir) = out_dir {
                config.output.dir = dir;
            }
            if config.crawl.start_year > config.crawl.end_year_or_current() {
                bail!(
                    "start year {} is after end year {}",
                    config.crawl.start_year,
                    config.crawl.end_year_or_current()
                );
            }

            let _t = utils::Timer::start("Price crawl");
            let outcome = Pipeline::new(config).run().await?;
            info!(
                "Done: {} rows from {} pages, {} groups",
                outcome.stats.rows,
                outcome.stats.pages_with_rows,
                outcome.means.len()
            );
            match outcome.outputs {
                Some(paths) => println!("{}\n{}", paths.raw.display(), paths.means.display()),
                None => println!("No rows scraped; no files written."),
            }
        }

        Command::Summary { input, group_by } => {
            let dataset = load_dataset(&input).with_context(|| format!("Failed to load {:?}", input))?;
            let means = group_means(dataset.rows(), group_by.unwrap_or(config.output.group_by));

            println!("─────────────────────────────────────────────");
            println!("  Mean prices, руб/т ({} observations)", utils::fmt_count(dataset.len()));
            println!("─────────────────────────────────────────────");
            if means.is_empty() {
                println!("  No priced rows in {:?}", input);
            }
            for m in &means {
                let crop = m.crop_code.as_deref().unwrap_or("");
                let grade = m.grade.map(|g| g.to_string()).unwrap_or_else(|| "—".into());
                println!(
                    "  {:<8} {:<20} {:>2} {:>12.2} ({})",
                    crop, m.city, grade, m.mean_price, m.observations
                );
            }
            println!("─────────────────────────────────────────────");
        }

        Command::Train { input, out_dir } => {
            let _t = utils::Timer::start("Price model training");
            let dataset = load_dataset(&input).with_context(|| format!("Failed to load {:?}", input))?;
            if dataset.is_empty() {
                bail!("No rows found in {:?}", input);
            }
            let (artifacts, report) = train_price_model(&dataset).context("Training failed")?;
            let dir = out_dir.unwrap_or(config.model.artifact_dir);
            artifacts.save(&dir)?;
            info!(
                "Model saved to {:?}: {} rows used, {} dropped, RMSE {:.2}",
                dir, report.rows_used, report.rows_dropped, report.rmse
            );
        }

        Command::Serve { bind } => {
            if let Some(addr) = bind {
                config.model.bind_addr = addr;
            }
            server::serve(&config.model).await?;
        }
    }

    Ok(())
}
