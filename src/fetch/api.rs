//! HTTP implementation of the fetch collaborator
//!
//! Converted fetches go to the extraction API's scrape endpoint with the job's
//! credential as a bearer token. Raw fetches are plain GET requests against the
//! content host.
//!
//! # Status Handling
//!
//! | Condition | Result |
//! |-----------|--------|
//! | HTTP 429 | `RateLimited` (with `Retry-After` when present) |
//! | Other non-2xx | `Status` |
//! | API body with `success: false` | `Rejected` |
//! | Timeout / connection failure | `Network` |

use crate::config::ApiConfig;
use crate::fetch::client::build_http_client;
use crate::fetch::{ContentFetcher, ConvertedDocument, FetchError, FetchMode, FetchedContent};
use crate::input::Credential;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use url::Url;

/// Path of the scrape endpoint, relative to the API base URL
const SCRAPE_PATH: &str = "v1/scrape";

/// Renders requested from the conversion API
const FORMATS: [&str; 2] = ["markdown", "html"];

/// User agent sent with raw downloads; content hosts reject non-browser clients
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

/// Fetcher backed by the content-extraction API and direct HTTP downloads
#[derive(Debug, Clone)]
pub struct ApiFetcher {
    client: Client,
    scrape_endpoint: Url,
}

impl ApiFetcher {
    /// Creates a fetcher from the API configuration
    pub fn new(config: &ApiConfig) -> Result<Self, HarvestError> {
        let client = build_http_client(config)?;
        let base = Url::parse(&config.base_url)?;
        Ok(Self::with_client(client, base)?)
    }

    /// Creates a fetcher using an existing client
    pub fn with_client(client: Client, mut base: Url) -> Result<Self, url::ParseError> {
        // Url::join replaces the last segment unless the base ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let scrape_endpoint = base.join(SCRAPE_PATH)?;
        Ok(Self {
            client,
            scrape_endpoint,
        })
    }

    /// The resolved scrape endpoint
    pub fn scrape_endpoint(&self) -> &Url {
        &self.scrape_endpoint
    }

    async fn fetch_converted(
        &self,
        url: &Url,
        credential: &Credential,
    ) -> Result<ConvertedDocument, FetchError> {
        let body = serde_json::json!({
            "url": url.as_str(),
            "formats": FORMATS,
        });

        let response = self
            .client
            .post(self.scrape_endpoint.clone())
            .bearer_auth(credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_network_error(url, &e))?;

        let response = check_status(url, response)?;

        let parsed: ScrapeResponse = response.json().await.map_err(|e| FetchError::Rejected {
            url: url.to_string(),
            message: format!("unreadable API response: {}", e),
        })?;

        if !parsed.success {
            return Err(FetchError::Rejected {
                url: url.to_string(),
                message: parsed
                    .error
                    .unwrap_or_else(|| "API reported failure".to_string()),
            });
        }

        let data = parsed.data.ok_or_else(|| FetchError::Rejected {
            url: url.to_string(),
            message: "API response has no data".to_string(),
        })?;

        Ok(ConvertedDocument {
            markdown: data.markdown,
            html: data.html,
            metadata: data.metadata,
        })
    }

    async fn fetch_raw(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, "*/*")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| classify_network_error(url, &e))?;

        let response = check_status(url, response)?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_network_error(url, &e))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ContentFetcher for ApiFetcher {
    async fn fetch(
        &self,
        url: &Url,
        credential: &Credential,
        mode: FetchMode,
    ) -> Result<FetchedContent, FetchError> {
        tracing::trace!("Fetching {} ({:?}) with {}", url, mode, credential);

        match mode {
            FetchMode::Converted => self
                .fetch_converted(url, credential)
                .await
                .map(FetchedContent::Converted),
            FetchMode::Raw => self.fetch_raw(url).await.map(FetchedContent::Raw),
        }
    }
}

/// Maps non-success responses to fetch errors
fn check_status(url: &Url, response: Response) -> Result<Response, FetchError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        return Err(FetchError::RateLimited {
            url: url.to_string(),
            retry_after_secs,
        });
    }

    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status_code: status.as_u16(),
        });
    }

    Ok(response)
}

fn classify_network_error(url: &Url, error: &reqwest::Error) -> FetchError {
    let message = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    };

    FetchError::Network {
        url: url.to_string(),
        message,
    }
}
