//! smtp.dev REST client
//!
//! A thin async wrapper over `https://api.smtp.dev`. Every call maps to one
//! HTTP endpoint; resource groups are exposed as borrowed service views:
//!
//! ```rust,no_run
//! use tempmail_htmx::api::{ClientConfig, SmtpDevClient};
//!
//! # async fn example() -> Result<(), tempmail_htmx::api::ApiError> {
//! let client = SmtpDevClient::new("smtplabs_xxx", ClientConfig::default())?;
//!
//! let domains = client.domains().list(Some(true), None).await?;
//! let inbox = client.mailboxes("account-id").list(None).await?;
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod domains;
pub mod error;
pub mod mailboxes;
pub mod messages;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

pub use accounts::{AccountQuery, Accounts};
pub use domains::Domains;
pub use error::{is_success_status, ApiError};
pub use mailboxes::Mailboxes;
pub use messages::{CacheBust, Download, Messages};
pub use types::*;

/// Default REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.smtp.dev";

/// Default Mercure hub for push updates
pub const DEFAULT_MERCURE_URL: &str = "https://mercure.smtp.dev";

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

const MERGE_PATCH_JSON: &str = "application/merge-patch+json";

/// Longest error body kept in [`ApiError::Status`]
const MAX_ERROR_BODY: usize = 2048;

/// Connection settings for [`SmtpDevClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base URL, without trailing slash
    pub base_url: String,
    /// Mercure hub base URL
    pub mercure_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            mercure_url: DEFAULT_MERCURE_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl ClientConfig {
    /// Point the client at another REST base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Result of [`SmtpDevClient::test_connection`]
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    /// Status of the check request
    pub status: u16,
    /// Account page returned by the check
    pub accounts: serde_json::Value,
}

/// Mercure subscription parameters for live account updates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSourceConfig {
    /// Subscription URL including the topic
    pub url: String,
    /// `Authorization` header value
    pub authorization: String,
}

/// smtp.dev API client
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct SmtpDevClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    mercure_url: Arc<str>,
    api_key: Arc<str>,
}

impl std::fmt::Debug for SmtpDevClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpDevClient")
            .field("base_url", &self.base_url)
            .field("api_key", &mask_key(&self.api_key))
            .finish_non_exhaustive()
    }
}

/// First five characters of a key followed by an ellipsis
#[must_use]
pub fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return "empty".to_string();
    }
    let prefix: String = key.chars().take(5).collect();
    format!("{prefix}...")
}

impl SmtpDevClient {
    /// Build a client for `api_key`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidApiKey`] if the key is blank or cannot be
    /// sent as a header, and [`ApiError::Network`] if the HTTP client cannot
    /// be constructed.
    pub fn new(api_key: &str, config: ClientConfig) -> Result<Self, ApiError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            error!("Invalid API key provided to client");
            return Err(ApiError::InvalidApiKey);
        }

        let mut key_value = HeaderValue::from_str(api_key).map_err(|_| ApiError::InvalidApiKey)?;
        key_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key_value);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        debug!(
            base_url = %config.base_url,
            api_key = %mask_key(api_key),
            "Creating API client"
        );

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').into(),
            mercure_url: config.mercure_url.trim_end_matches('/').into(),
            api_key: api_key.into(),
        })
    }

    /// REST base URL in use
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Account endpoints
    #[must_use]
    pub const fn accounts(&self) -> Accounts<'_> {
        Accounts::new(self)
    }

    /// Domain endpoints
    #[must_use]
    pub const fn domains(&self) -> Domains<'_> {
        Domains::new(self)
    }

    /// Mailbox endpoints of one account
    #[must_use]
    pub const fn mailboxes<'a>(&'a self, account_id: &'a str) -> Mailboxes<'a> {
        Mailboxes::new(self, account_id)
    }

    /// Message endpoints of one mailbox
    #[must_use]
    pub const fn messages<'a>(&'a self, account_id: &'a str, mailbox_id: &'a str) -> Messages<'a> {
        Messages::new(self, account_id, mailbox_id)
    }

    /// Check the API with `GET /accounts`
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] when the check fails.
    pub async fn test_connection(&self) -> Result<ConnectionReport, ApiError> {
        debug!("Testing API connection");
        let response = self.send(self.request(Method::GET, "/accounts")).await?;
        let status = response.status().as_u16();
        let accounts = decode(response, "/accounts").await?;
        debug!(status, "API connection test succeeded");
        Ok(ConnectionReport { status, accounts })
    }

    /// Mercure subscription for live updates of `account_id`
    #[must_use]
    pub fn event_source_config(&self, account_id: &str) -> EventSourceConfig {
        EventSourceConfig {
            url: format!(
                "{}/.well-known/mercure?topic=/accounts/{account_id}",
                self.mercure_url
            ),
            authorization: format!("Bearer {}", self.api_key),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(method = %method, path, "API request");
        self.http.request(method, self.url(path))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .send(self.request(Method::GET, path).query(query))
            .await?;
        decode(response, path).await
    }

    pub(crate) async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let content_type = if method == Method::PATCH {
            MERGE_PATCH_JSON
        } else {
            "application/json"
        };
        let payload = serde_json::to_vec(body).map_err(|e| ApiError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let response = self
            .send(
                self.request(method, path)
                    .header(CONTENT_TYPE, content_type)
                    .body(payload),
            )
            .await?;
        decode(response, path).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    pub(crate) async fn get_bytes(&self, path: &str) -> Result<(Bytes, Option<String>), ApiError> {
        let response = self
            .send(self.request(Method::GET, path).header(ACCEPT, "*/*"))
            .await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        Ok((response.bytes().await?, content_type))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Network error: could not reach the API");
            ApiError::Network(e)
        })?;

        let status = response.status().as_u16();
        let path = response.url().path().to_string();
        if is_success_status(status) {
            debug!(status, path = %path, "API response");
            return Ok(response);
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }

        Err(match status {
            401 => {
                warn!(path = %path, "Unauthorized: API key is invalid or missing");
                ApiError::Unauthorized
            }
            404 => {
                warn!(path = %path, "Not found: resource does not exist");
                ApiError::NotFound(path)
            }
            422 => {
                warn!(path = %path, body = %body, "Validation error");
                ApiError::Validation(body)
            }
            429 => {
                warn!(path = %path, "Rate limit exceeded");
                ApiError::RateLimited
            }
            _ => {
                error!(status, path = %path, body = %body, "API error");
                ApiError::Status { status, body }
            }
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    let bytes = if bytes.iter().all(u8::is_ascii_whitespace) {
        Bytes::from_static(b"null")
    } else {
        bytes
    };
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Current Unix time in milliseconds, for cache-busting query parameters
#[must_use]
pub fn unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
