use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use condo_scrap::{info_time, CrawlConfig, CrawlController, Result};
use log::LevelFilter;

/// Scrape condo listings page by page into a CSV file.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// First page to scrape.
    #[arg(long, env = "SCRAP_START_PAGE")]
    start_page: Option<u32>,

    /// Last page to scrape (inclusive).
    #[arg(long, env = "SCRAP_END_PAGE")]
    end_page: Option<u32>,

    /// CSV file to append to; created with a header if missing.
    #[arg(short, long, env = "SCRAP_OUTPUT")]
    output: Option<PathBuf>,

    /// Catalog address with a `{page}` placeholder.
    #[arg(long, env = "SCRAP_URL_TEMPLATE")]
    url_template: Option<String>,

    /// Attempts per page before skipping it.
    #[arg(long, env = "SCRAP_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Pages between scheduled session restarts.
    #[arg(long, env = "SCRAP_RECYCLE_INTERVAL")]
    recycle_interval: Option<u32>,

    /// Per-fetch timeout in seconds.
    #[arg(long, env = "SCRAP_FETCH_TIMEOUT")]
    fetch_timeout: Option<u64>,
}

impl Cli {
    fn into_config(self) -> CrawlConfig {
        let mut config = CrawlConfig::default();
        if let Some(page) = self.start_page {
            config.start_page = page;
        }
        if let Some(page) = self.end_page {
            config.end_page = page;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(template) = self.url_template {
            config.url_template = template;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(interval) = self.recycle_interval {
            config.recycle_interval = interval;
        }
        if let Some(secs) = self.fetch_timeout {
            config.fetch_timeout = Duration::from_secs(secs);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let start_time = Local::now();
    let config = Cli::parse().into_config();
    let report = CrawlController::http(config).run().await?;
    log::info!("{report:?}");
    info_time!(start_time, "Full program time:");

    Ok(())
}
