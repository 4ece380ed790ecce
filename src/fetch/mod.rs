//! Content fetching
//!
//! This module defines the fetch collaborator used by every job:
//! - `Converted` mode sends a URL through the content-extraction API and gets
//!   back Markdown and HTML renders
//! - `Raw` mode downloads the bytes directly (used for JavaScript)
//!
//! The [`ContentFetcher`] trait is the seam the scheduler and jobs depend on;
//! [`ApiFetcher`] is the production implementation.

mod api;
mod client;

pub use api::{ApiFetcher, BROWSER_USER_AGENT};
pub use client::build_http_client;

use crate::input::Credential;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// How a URL should be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMode {
    /// Through the conversion API (Markdown + HTML renders)
    Converted,
    /// Direct byte download
    Raw,
}

/// A document rendered by the conversion API
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertedDocument {
    pub markdown: Option<String>,
    pub html: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl ConvertedDocument {
    /// All rendered text, markdown first, for reference discovery
    pub fn combined_text(&self) -> String {
        let mut text = String::new();
        if let Some(markdown) = &self.markdown {
            text.push_str(markdown);
        }
        if let Some(html) = &self.html {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(html);
        }
        text
    }

    /// The best single render of the document body
    pub fn primary_text(&self) -> Option<&str> {
        self.markdown
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.html.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.markdown.as_deref().map_or(true, str::is_empty)
            && self.html.as_deref().map_or(true, str::is_empty)
    }
}

/// Result of a successful fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedContent {
    Converted(ConvertedDocument),
    Raw(Vec<u8>),
}

/// Errors that can occur while fetching
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Rate limited while fetching {url}")]
    RateLimited {
        url: String,
        retry_after_secs: Option<u64>,
    },

    #[error("HTTP {status_code} for {url}")]
    Status { url: String, status_code: u16 },

    #[error("Request for {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("Conversion of {url} failed: {message}")]
    Rejected { url: String, message: String },

    #[error("Expected {expected:?} content for {url}")]
    UnexpectedContent { url: String, expected: FetchMode },
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Fetches course content on behalf of a job
///
/// Implementations must be safe to share between concurrently running jobs;
/// each call carries the credential assigned to the calling job.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &Url,
        credential: &Credential,
        mode: FetchMode,
    ) -> Result<FetchedContent, FetchError>;
}
