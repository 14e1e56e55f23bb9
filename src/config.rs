use std::path::PathBuf;
use std::time::Duration;

use crate::policy::Pacing;
use crate::record::QualityGate;
use crate::{
    Error, Result, END_PAGE, FETCH_TIMEOUT_SECS, FILE_PATH, MAX_RETRIES, RECYCLE_INTERVAL,
    START_PAGE, URL_TEMPLATE, USER_AGENT,
};

/// Placeholder in the URL template that is replaced by the page number.
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Everything a crawl run needs to know.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Catalog address, must contain `{page}`.
    pub url_template: String,
    pub start_page: u32,
    /// Inclusive.
    pub end_page: u32,
    pub output: PathBuf,
    /// Attempts per page before it's skipped.
    pub max_retries: u32,
    /// Pages between scheduled session rebuilds.
    pub recycle_interval: u32,
    pub fetch_timeout: Duration,
    pub user_agent: String,
    pub pacing: Pacing,
    pub gate: QualityGate,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            url_template: URL_TEMPLATE.to_string(),
            start_page: START_PAGE,
            end_page: END_PAGE,
            output: PathBuf::from(FILE_PATH),
            max_retries: MAX_RETRIES,
            recycle_interval: RECYCLE_INTERVAL,
            fetch_timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
            pacing: Pacing::default(),
            gate: QualityGate::default(),
        }
    }
}

impl CrawlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.start_page > self.end_page {
            return Err(Error::Config(format!(
                "start page {} is after end page {}",
                self.start_page, self.end_page
            )));
        }
        if !self.url_template.contains(PAGE_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "url template {:?} has no {PAGE_PLACEHOLDER} placeholder",
                self.url_template
            )));
        }
        if self.max_retries == 0 {
            return Err(Error::Config("max retries must be at least 1".into()));
        }
        if self.recycle_interval == 0 {
            return Err(Error::Config("recycle interval must be at least 1".into()));
        }
        if self.fetch_timeout.is_zero() {
            return Err(Error::Config("fetch timeout must be above zero".into()));
        }
        if self.pacing.settle_min > self.pacing.settle_max {
            return Err(Error::Config(
                "minimum settle delay is above the maximum".into(),
            ));
        }
        Ok(())
    }

    /// Address of the given page.
    pub fn page_url(&self, page: u32) -> String {
        self.url_template
            .replace(PAGE_PLACEHOLDER, &page.to_string())
    }

    /// Number of pages in the configured range.
    pub fn page_count(&self) -> u32 {
        self.end_page.saturating_sub(self.start_page) + 1
    }
}
