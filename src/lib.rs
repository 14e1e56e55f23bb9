//! Resilient condo listing scraper.
//!
//! Walks a paginated search catalog one page at a time, extracts listing cards,
//! filters them through a quality gate and appends them to a CSV file.
//! Pages are retried with backoff and the fetch session is rebuilt periodically
//! or whenever it dies.

mod macros;

pub mod config;
mod error;
pub mod extract;
pub mod parse;
pub mod policy;
pub mod process;
pub mod record;
pub mod request;
pub mod sink;

pub use config::CrawlConfig;
pub use error::{Error, PageFault, Result, SessionFault};
pub use process::{CrawlController, CrawlReport};
pub use record::{ListingRecord, QualityGate, COLUMNS};
pub use sink::RecordSink;

const URL_TEMPLATE: &str =
    "https://www.livinginsider.com/searchword/Condo/Buysell/{page}/รวมประกาศ-ขาย-คอนโด.html";
const START_PAGE: u32 = 1;
const END_PAGE: u32 = 200;
const FILE_PATH: &str = "livinginsider_condos.csv";
const MAX_RETRIES: u32 = 3;
/// The session is rebuilt after this many pages to keep the backend's memory in check.
const RECYCLE_INTERVAL: u32 = 50;
const FETCH_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
