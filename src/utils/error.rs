//! Error types for fetching and parsing pages
//!
//! These stay local to one task: a fetch or parse error turns into a failed
//! result for that task and never escapes the worker loop.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error (connect, TLS, redirect loop, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Response body could not be read as text
    #[error("Failed to read body: {0}")]
    Body(String),
}

impl FetchError {
    /// Map a reqwest failure, pulling timeouts out into their own variant
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Http(err)
        }
    }

    /// Transport errors may succeed on another attempt; bad URLs never will
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout | Self::Body(_))
    }
}

/// Errors that can occur while normalizing or resolving URLs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Anything other than http(s)
    #[error("Unsupported scheme '{scheme}' in {url}")]
    UnsupportedScheme { scheme: String, url: String },

    /// Absolute URL without a host
    #[error("URL has no host: {0}")]
    MissingHost(String),
}

impl ParseError {
    pub fn is_recoverable(&self) -> bool {
        false
    }
}
