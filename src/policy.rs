//! Waiting and block detection, kept apart from the crawl loop so both can be swapped out.

use std::time::Duration;

use async_trait::async_trait;

use crate::request::RenderedPage;

/// How long the crawler waits in each situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Courtesy pause after every fetch, picked uniformly from `settle_min..=settle_max`.
    pub settle_min: Duration,
    pub settle_max: Duration,
    /// Between two attempts of the same page.
    pub retry_backoff: Duration,
    /// After a page that looks like a block or error page.
    pub block_cooldown: Duration,
    /// Between dropping and recreating the session on schedule.
    pub recycle_pause: Duration,
    /// Between dropping and recreating a dead session.
    pub rebuild_pause: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            settle_min: Duration::from_secs(3),
            settle_max: Duration::from_secs(5),
            retry_backoff: Duration::from_secs(5),
            block_cooldown: Duration::from_secs(10),
            recycle_pause: Duration::from_secs(2),
            rebuild_pause: Duration::from_secs(3),
        }
    }
}

impl Pacing {
    /// No waiting at all.
    pub fn none() -> Self {
        Self {
            settle_min: Duration::ZERO,
            settle_max: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            block_cooldown: Duration::ZERO,
            recycle_pause: Duration::ZERO,
            rebuild_pause: Duration::ZERO,
        }
    }

    /// Random courtesy delay within the settle window.
    pub fn settle(&self) -> Duration {
        let min = self.settle_min.as_millis() as u64;
        let max = self.settle_max.as_millis() as u64;
        if max <= min {
            return self.settle_min;
        }
        Duration::from_millis(fastrand::u64(min..=max))
    }

    /// Backoff before the given attempt. Flat, the attempt is only there so a policy could grow it.
    pub fn backoff(&self, _attempt: u32) -> Duration {
        self.retry_backoff
    }
}

/// Something that can put the crawl worker to sleep.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Decides whether a fetched page is a block or error page instead of a listing page.
pub trait BlockDetector: Send + Sync {
    fn is_blocked(&self, page: &RenderedPage) -> bool;
}

impl<F> BlockDetector for F
where
    F: Fn(&RenderedPage) -> bool + Send + Sync,
{
    fn is_blocked(&self, page: &RenderedPage) -> bool {
        self(page)
    }
}

/// Flags pages whose title contains one of the markers.
#[derive(Debug, Clone)]
pub struct TitleBlockDetector {
    markers: Vec<String>,
}

impl TitleBlockDetector {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for TitleBlockDetector {
    fn default() -> Self {
        Self::new(["403 Forbidden", "Error"])
    }
}

impl BlockDetector for TitleBlockDetector {
    fn is_blocked(&self, page: &RenderedPage) -> bool {
        self.markers.iter().any(|m| page.title.contains(m.as_str()))
    }
}
