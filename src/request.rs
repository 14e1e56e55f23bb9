use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};

use crate::parse::page_title;
use crate::{Error, Result, SessionFault};

/// A fetched page, as the backend rendered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub url: String,
    pub status: u16,
    pub title: String,
    pub html: String,
}

/// One live handle to the rendering backend.
#[async_trait]
pub trait Session: Send {
    /// Loads the page at `url` and returns it once it's rendered.
    async fn fetch(&mut self, url: &str) -> std::result::Result<RenderedPage, SessionFault>;

    /// Releases the backend. Must be safe to call more than once.
    fn close(&mut self);
}

/// Builds fresh sessions whenever the crawler needs one.
pub trait SessionFactory: Send + Sync {
    type Session: Session;

    /// `generation` counts the sessions built during this run, starting at 1.
    fn create(&self, generation: u32) -> Result<Self::Session>;
}

/// Session backed by a plain HTTP client.
/// Dropping the client closes its pooled connections, which is what a rebuild is for.
pub struct HttpSession {
    client: Option<Client>,
    generation: u32,
}

impl HttpSession {
    pub fn new(user_agent: &str, timeout: Duration, generation: u32) -> Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| Error::SessionBuild(e.to_string()))?;
        Ok(Self {
            client: Some(client),
            generation,
        })
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn fetch(&mut self, url: &str) -> std::result::Result<RenderedPage, SessionFault> {
        let Some(client) = &self.client else {
            return Err(SessionFault::new("session already closed"));
        };

        let res = client.get(url).send().await?;
        let status = res.status().as_u16();
        let html = res.text().await?;
        let title = page_title(&html);

        Ok(RenderedPage {
            url: url.to_string(),
            status,
            title,
            html,
        })
    }

    fn close(&mut self) {
        self.client.take();
    }
}

/// Builds [`HttpSession`]s that all share the same identity and timeout.
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    user_agent: String,
    timeout: Duration,
}

impl HttpSessionFactory {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            timeout,
        }
    }
}

impl SessionFactory for HttpSessionFactory {
    type Session = HttpSession;

    fn create(&self, generation: u32) -> Result<HttpSession> {
        HttpSession::new(&self.user_agent, self.timeout, generation)
    }
}
