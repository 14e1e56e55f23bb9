use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The selector you are trying to scrape for is invalid. Selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid crawl configuration: {0}")]
    Config(String),

    #[error("Couldn't build the HTTP session: {0}")]
    SessionBuild(String),

    #[error("Couldn't write records to {path}: {source}")]
    Sink {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),
}

/// A fault raised by a rendering session while fetching a page.
///
/// The message text is what decides whether the session is considered dead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SessionFault {
    pub message: String,
}

/// Substrings that mark a session as closed, refused or otherwise dead.
const DEAD_SESSION_MARKERS: &[&str] = &[
    "no such window",
    "target window already closed",
    "refused",
    "closed",
    "dead",
    "timed out",
];

impl SessionFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// True when the fault names a session that can't be used again and has to be rebuilt.
    pub fn is_fatal(&self) -> bool {
        let msg = self.message.to_lowercase();
        DEAD_SESSION_MARKERS.iter().any(|marker| msg.contains(marker))
    }
}

impl From<reqwest::Error> for SessionFault {
    fn from(err: reqwest::Error) -> Self {
        // Connection failures mean the backend is gone, make sure that shows up in the text.
        let mut message = err.to_string();
        if err.is_connect() {
            message.push_str(" (connection refused)");
        } else if err.is_timeout() {
            message.push_str(" (timed out)");
        }
        if let Some(source) = std::error::Error::source(&err) {
            message.push_str(&format!(": {source}"));
        }
        SessionFault { message }
    }
}

/// Why a single page attempt failed. Every variant is retryable.
#[derive(Debug, Error)]
pub enum PageFault {
    #[error("Blocked or error page (title: {title:?}, status: {status})")]
    Blocked { title: String, status: u16 },

    #[error("Session fault: {0}")]
    Session(#[from] SessionFault),

    #[error("Fetch timed out after {0} sec")]
    Timeout(u64),

    #[error("Couldn't parse page: {0}")]
    Parse(String),
}

impl PageFault {
    /// Whether the failure requires the session to be torn down and rebuilt before retrying.
    pub fn needs_rebuild(&self) -> bool {
        match self {
            PageFault::Session(fault) => fault.is_fatal(),
            PageFault::Timeout(_) => true,
            PageFault::Blocked { .. } | PageFault::Parse(_) => false,
        }
    }
}
