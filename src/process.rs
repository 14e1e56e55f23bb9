use chrono::Local;
use log::{error, info, warn};
use tokio::time::timeout;

use crate::config::CrawlConfig;
use crate::parse::{parse_fragments, parse_listings, PageOutcome};
use crate::policy::{BlockDetector, Sleeper, TitleBlockDetector, TokioSleeper};
use crate::request::{HttpSessionFactory, Session, SessionFactory};
use crate::sink::RecordSink;
use crate::{info_time, PageFault, Result, SessionFault};

/// Where a single page is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Attempt number, starting at 1.
    Attempting(u32),
    /// Fetched and parsed; holds the number of rows written.
    Success(usize),
    SkippedAfterRetries,
}

/// Totals for one crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub pages_succeeded: u32,
    pub pages_skipped: u32,
    /// Pages that loaded fine but had nothing past the quality gate.
    pub pages_empty: u32,
    pub records_saved: usize,
    pub records_dropped: usize,
    pub fetch_attempts: u32,
    /// Scheduled session rebuilds.
    pub recycles: u32,
    /// Rebuilds forced by a dead session.
    pub rebuilds: u32,
    pub skipped: Vec<u32>,
}

impl CrawlReport {
    pub fn pages_done(&self) -> u32 {
        self.pages_succeeded + self.pages_skipped
    }
}

/// Owns the live session and guarantees it is closed however the crawl ends.
pub struct SessionGuard<'f, F: SessionFactory> {
    factory: &'f F,
    session: Option<F::Session>,
    generation: u32,
}

impl<'f, F: SessionFactory> SessionGuard<'f, F> {
    /// Builds the first session. Failing here fails the run.
    pub fn start(factory: &'f F) -> Result<Self> {
        let session = factory.create(1)?;
        Ok(Self {
            factory,
            session: Some(session),
            generation: 1,
        })
    }

    /// Number of sessions built so far.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Current session, building a new one if the last rebuild didn't succeed.
    pub fn session(&mut self) -> std::result::Result<&mut F::Session, SessionFault> {
        if self.session.is_none() {
            self.open_next()?;
        }
        self.session
            .as_mut()
            .ok_or_else(|| SessionFault::new("no session available"))
    }

    /// Closes and forgets the current session.
    pub fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }

    /// Replaces the (torn down) session with a new generation.
    /// On failure the guard stays empty and the next [`SessionGuard::session`] call tries again.
    pub fn open_next(&mut self) -> std::result::Result<(), SessionFault> {
        self.teardown();
        self.generation += 1;
        match self.factory.create(self.generation) {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                error!("Couldn't start session #{}: {e}", self.generation);
                Err(SessionFault::new(format!("couldn't start session: {e}")))
            }
        }
    }
}

impl<F: SessionFactory> Drop for SessionGuard<'_, F> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Drives a crawl over the configured page range, one page at a time.
pub struct CrawlController<F: SessionFactory> {
    config: CrawlConfig,
    factory: F,
    sink: RecordSink,
    sleeper: Box<dyn Sleeper>,
    detector: Box<dyn BlockDetector>,
}

impl CrawlController<HttpSessionFactory> {
    /// Controller fetching over HTTP with the configured identity and timeout.
    pub fn http(config: CrawlConfig) -> Self {
        let factory = HttpSessionFactory::new(config.user_agent.clone(), config.fetch_timeout);
        Self::new(config, factory)
    }
}

impl<F: SessionFactory> CrawlController<F> {
    pub fn new(config: CrawlConfig, factory: F) -> Self {
        let sink = RecordSink::new(config.output.clone());
        Self {
            config,
            factory,
            sink,
            sleeper: Box::new(TokioSleeper),
            detector: Box::new(TitleBlockDetector::default()),
        }
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn with_block_detector(mut self, detector: impl BlockDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawls every page in the range. Pages that keep failing are skipped;
    /// only a bad configuration, a session that can't be started, or a write failure ends the run early.
    pub async fn run(&self) -> Result<CrawlReport> {
        self.config.validate()?;
        if self.sink.ensure_initialized()? {
            info!("Created {}", self.sink.path().display());
        }

        let start_time = Local::now();
        let (start_page, end_page) = (self.config.start_page, self.config.end_page);
        info_time!("Starting scrape from page {} to {}", start_page, end_page);

        let mut guard = SessionGuard::start(&self.factory)?;
        let mut report = CrawlReport::default();

        for page in start_page..=end_page {
            let done = report.pages_done();
            if done > 0 && done % self.config.recycle_interval == 0 {
                self.recycle(&mut guard, &mut report).await;
            }

            if let PageState::Success(_) = self.crawl_page(page, &mut guard, &mut report).await? {
                report.pages_succeeded += 1;
            } else {
                report.pages_skipped += 1;
                report.skipped.push(page);
            }
        }

        drop(guard);
        info_time!(
            start_time,
            "Scraping completed: {} pages saved {} rows, {} pages skipped.",
            report.pages_succeeded,
            report.records_saved,
            report.pages_skipped
        );
        Ok(report)
    }

    /// Runs one page through its attempts until it either succeeds or is given up on.
    async fn crawl_page(
        &self,
        page: u32,
        guard: &mut SessionGuard<'_, F>,
        report: &mut CrawlReport,
    ) -> Result<PageState> {
        let url = self.config.page_url(page);
        let max_retries = self.config.max_retries;
        let mut state = PageState::Attempting(1);

        loop {
            state = match state {
                PageState::Attempting(attempt) if attempt > max_retries => {
                    error!("Skipping page {page} after {max_retries} attempts.");
                    PageState::SkippedAfterRetries
                }
                PageState::Attempting(attempt) => {
                    info!(
                        "--> Processing page {page}/{} (attempt {attempt}): {url}",
                        self.config.end_page
                    );
                    report.fetch_attempts += 1;

                    match self.attempt_page(&url, guard).await {
                        Ok(outcome) => {
                            // A failed write isn't retried, it ends the run.
                            let saved = self.sink.append(&outcome.records)?;
                            report.records_saved += saved;
                            report.records_dropped += outcome.dropped;
                            if saved > 0 {
                                info!("    Saved {saved} rows from page {page}.");
                            } else {
                                report.pages_empty += 1;
                                warn!("    No data found on page {page}.");
                            }
                            PageState::Success(saved)
                        }
                        Err(fault) => {
                            warn!("Error on page {page}: {fault}");
                            if fault.needs_rebuild() {
                                self.rebuild(guard, report).await;
                            }
                            if attempt < max_retries {
                                self.sleeper.sleep(self.config.pacing.backoff(attempt)).await;
                            }
                            PageState::Attempting(attempt + 1)
                        }
                    }
                }
                done => return Ok(done),
            };
        }
    }

    /// One fetch and parse of a page.
    async fn attempt_page(
        &self,
        url: &str,
        guard: &mut SessionGuard<'_, F>,
    ) -> std::result::Result<PageOutcome, PageFault> {
        let fetch_timeout = self.config.fetch_timeout;
        let session = guard.session()?;
        let page = timeout(fetch_timeout, session.fetch(url))
            .await
            .map_err(|_| PageFault::Timeout(fetch_timeout.as_secs()))??;

        self.sleeper.sleep(self.config.pacing.settle()).await;

        if self.detector.is_blocked(&page) {
            warn!("    Blocked or error page. Waiting longer...");
            self.sleeper.sleep(self.config.pacing.block_cooldown).await;
            return Err(PageFault::Blocked {
                title: page.title,
                status: page.status,
            });
        }

        let fragments = parse_fragments(page.html)
            .await
            .map_err(|e| PageFault::Parse(e.to_string()))?;
        Ok(parse_listings(&fragments, &self.config.gate))
    }

    /// Scheduled rebuild, done no matter how the previous pages went.
    async fn recycle(&self, guard: &mut SessionGuard<'_, F>, report: &mut CrawlReport) {
        info!("Restarting session to clear memory...");
        guard.teardown();
        self.sleeper.sleep(self.config.pacing.recycle_pause).await;
        // A failed start is retried lazily by the next page attempt.
        if guard.open_next().is_ok() {
            info!("Session #{} started.", guard.generation());
        }
        report.recycles += 1;
    }

    /// Forced rebuild after the session died.
    async fn rebuild(&self, guard: &mut SessionGuard<'_, F>, report: &mut CrawlReport) {
        warn!("    Session is gone, starting a new one.");
        guard.teardown();
        self.sleeper.sleep(self.config.pacing.rebuild_pause).await;
        let _ = guard.open_next();
        report.rebuilds += 1;
    }
}
