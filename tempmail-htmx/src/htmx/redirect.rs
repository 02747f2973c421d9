//! Redirects for HTMX requests
//!
//! HTMX follows a `303` transparently and swaps the target page into the
//! element that made the request. Handlers keep returning plain redirects;
//! this middleware turns them into `HX-Redirect` for HTMX requests so the
//! browser performs a full navigation instead.

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const HX_REQUEST: &str = "HX-Request";
const HX_REDIRECT: &str = "HX-Redirect";

fn is_htmx(request: &Request) -> bool {
    request
        .headers()
        .get(HX_REQUEST)
        .is_some_and(|value| value.as_bytes() == b"true")
}

/// Middleware translating `3xx` + `Location` into `HX-Redirect`
pub async fn hx_redirects(request: Request, next: Next) -> Response {
    let htmx = is_htmx(&request);
    let response = next.run(request).await;
    if !htmx || !response.status().is_redirection() {
        return response;
    }

    let Some(location) = response.headers().get(header::LOCATION).cloned() else {
        return response;
    };
    tracing::debug!(location = ?location, "Translating redirect for htmx");
    (StatusCode::OK, [(HX_REDIRECT, location)]).into_response()
}
