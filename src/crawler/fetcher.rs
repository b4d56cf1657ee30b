//! HTTP fetcher with per-node rate limiting
//!
//! Features:
//! - Fixed request timeout, redirects followed
//! - Rate limiting with governor (optional)
//! - Body always read as text, whatever the status

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{redirect::Policy, Client};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::config::WorkerConfig;
use crate::metrics;
use crate::utils::error::FetchError;

/// Maximum redirects followed per request
const MAX_REDIRECTS: usize = 10;

/// A page as received over the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL after redirects; relative links resolve against this
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

/// Fetch transport used by the worker
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`; an HTTP error status is a page, not an error
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency, if enabled
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl HttpFetcher {
    /// Create a fetcher from worker settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(config: &WorkerConfig) -> Result<Self, FetchError> {
        Self::with_config(
            Duration::from_secs(config.request_timeout_secs),
            config.requests_per_second,
            &config.user_agent,
        )
    }

    /// Create a fetcher with explicit settings; `requests_per_second == 0`
    /// disables rate limiting
    pub fn with_config(
        timeout: Duration,
        requests_per_second: u32,
        user_agent: &str,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .build()?;

        let rate_limiter = NonZeroU32::new(requests_per_second)
            .map(|rate| RateLimiter::direct(Quota::per_second(rate)));

        Ok(Self {
            client,
            rate_limiter,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let _timer = metrics::start_fetch_timer();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Body(e.to_string())
            }
        })?;

        tracing::debug!(url, final_url = %final_url, status, bytes = body.len(), "Fetched page");

        Ok(FetchedPage {
            final_url,
            status,
            body,
        })
    }
}
