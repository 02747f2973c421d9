//! Same-origin forwarding to smtp.dev
//!
//! Browsers cannot call the API directly because of CORS, so everything under
//! the configured prefixes is forwarded verbatim:
//!
//! - `ANY {api_prefix}/{*path}` to the REST base URL
//! - `ANY {mercure_prefix}/{*path}` to the Mercure hub
//!
//! Hop-by-hop headers are stripped in both directions and upstream bodies are
//! streamed back unchanged, which keeps Mercure event streams open.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tracing::{debug, error};

/// Request headers never forwarded upstream
static DROPPED_REQUEST_HEADERS: [HeaderName; 10] = [
    header::HOST,
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
    header::ACCEPT_ENCODING,
];

/// Response headers never passed back to the browser
static DROPPED_RESPONSE_HEADERS: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_ENCODING,
];

fn is_keep_alive(name: &HeaderName) -> bool {
    name.as_str().eq_ignore_ascii_case("keep-alive")
}

/// Upstream a proxy mount forwards to
#[derive(Debug, Clone)]
pub struct ProxyTarget {
    base_url: Arc<str>,
    http: reqwest::Client,
}

impl ProxyTarget {
    /// Target rooted at `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').into(),
            http,
        })
    }

    /// Base URL requests are forwarded to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str, query: Option<&str>) -> String {
        let path = path.trim_start_matches('/');
        match query {
            Some(q) if !q.is_empty() => format!("{}/{path}?{q}", self.base_url),
            _ => format!("{}/{path}", self.base_url),
        }
    }
}

/// Router forwarding every method under `/{*path}` to `target`
///
/// Nest it under a prefix:
///
/// ```rust,no_run
/// use std::time::Duration;
/// use axum::Router;
/// use tempmail_htmx::proxy::{self, ProxyTarget};
///
/// # fn example() -> Result<(), reqwest::Error> {
/// let target = ProxyTarget::new("https://api.smtp.dev", Duration::from_secs(10))?;
/// let app: Router = Router::new().nest("/api", proxy::router(target));
/// # Ok(())
/// # }
/// ```
pub fn router<S>(target: ProxyTarget) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/{*path}", any(forward))
        .with_state(target)
}

fn filtered(headers: &HeaderMap, dropped: &[HeaderName]) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !dropped.contains(name) && !is_keep_alive(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Forward one request
///
/// Inside a nested router `uri` is already stripped of the mount prefix and
/// still percent-encoded, so the path reaches upstream exactly as sent.
async fn forward(
    State(target): State<ProxyTarget>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let url = target.url_for(uri.path(), uri.query());
    debug!(method = %method, url = %url, "Proxying request");

    let mut request = target
        .http
        .request(method.clone(), &url)
        .headers(filtered(&headers, &DROPPED_REQUEST_HEADERS));
    if method != Method::GET && method != Method::HEAD {
        request = request.body(body);
    }

    let upstream = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            error!(url = %url, error = %e, "Proxy error");
            return (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response();
        }
    };

    let status = upstream.status();
    let response_headers = filtered(upstream.headers(), &DROPPED_RESPONSE_HEADERS);
    debug!(status = status.as_u16(), url = %url, "Proxy response");

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response.headers_mut().remove(header::CONTENT_LENGTH);
    response
}
