//! HTTP handlers and the application router
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /`, `GET/POST /login`, `POST /logout` | [`auth`] |
//! | `/accounts/...` | [`accounts`], [`messages`] |
//! | `/domains/...` | [`domains`] |
//! | `/quick/...` | [`quick`] |
//! | `GET /health` | [`crate::health`] |
//!
//! With the proxy enabled, the configured prefixes forward to smtp.dev and
//! the Mercure hub.

use std::time::Duration;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api::SmtpDevClient;
use crate::error::AppError;
use crate::health::health_check;
use crate::htmx::hx_redirects;
use crate::proxy::{self, ProxyTarget};
use crate::state::AppState;

pub mod accounts;
pub mod auth;
pub mod domains;
pub mod messages;
pub mod quick;
pub mod views;

/// Client for the stored API key
///
/// Fails with [`AppError::NotAuthenticated`], which redirects to `/login`.
pub(crate) fn client(state: &AppState) -> Result<SmtpDevClient, AppError> {
    Ok(state.store().initialize_client()?)
}

/// Build the application router
///
/// # Errors
///
/// Returns an error if a proxy HTTP client cannot be constructed.
pub fn router(state: AppState) -> anyhow::Result<Router> {
    let config = state.config().clone();

    let mut app = Router::new()
        .route("/", get(auth::home))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/health", get(health_check))
        .route("/accounts", get(accounts::list).post(accounts::create))
        .route(
            "/accounts/{account_id}",
            get(accounts::detail).delete(accounts::remove),
        )
        .route(
            "/accounts/{account_id}/mailboxes",
            post(accounts::create_mailbox),
        )
        .route(
            "/accounts/{account_id}/mailboxes/{mailbox_id}",
            delete(accounts::remove_mailbox),
        )
        .route(
            "/accounts/{account_id}/mailboxes/{mailbox_id}/messages",
            get(messages::list),
        )
        .route(
            "/accounts/{account_id}/mailboxes/{mailbox_id}/messages/{message_id}",
            get(messages::show).delete(messages::remove),
        )
        .route(
            "/accounts/{account_id}/mailboxes/{mailbox_id}/messages/{message_id}/source",
            get(messages::source),
        )
        .route(
            "/accounts/{account_id}/mailboxes/{mailbox_id}/messages/{message_id}/download",
            get(messages::download),
        )
        .route(
            "/accounts/{account_id}/mailboxes/{mailbox_id}/messages/{message_id}/attachments/{attachment_id}",
            get(messages::attachment),
        )
        .route("/domains", get(domains::list).post(domains::create))
        .route("/domains/{domain_id}", delete(domains::remove))
        .route("/domains/{domain_id}/toggle", post(domains::toggle))
        .route("/quick", get(quick::page))
        .route("/quick/credentials", get(quick::credentials))
        .route("/quick/accounts", post(quick::create))
        .route("/quick/accounts/{account_id}/select", post(quick::select))
        .route(
            "/quick/accounts/{account_id}/mailbox",
            post(quick::select_mailbox),
        )
        .route(
            "/quick/accounts/{account_id}/messages/{message_id}",
            get(quick::show_message),
        )
        .route("/quick/refresh", post(quick::refresh));

    if config.proxy.enabled {
        let timeout = Duration::from_millis(config.api.request_timeout_ms);
        let api = ProxyTarget::new(&config.api.base_url, timeout)?;
        let mercure = ProxyTarget::new(&config.api.mercure_url, timeout)?;
        tracing::info!(
            api_prefix = %config.proxy.api_prefix,
            mercure_prefix = %config.proxy.mercure_prefix,
            "Proxy enabled"
        );
        app = app
            .nest(&config.proxy.api_prefix, proxy::router(api))
            .nest(&config.proxy.mercure_prefix, proxy::router(mercure));
    }

    Ok(app
        .layer(middleware::from_fn(hx_redirects))
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
        .layer(request_timeout(config.server.request_timeout_ms))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Answer `408 Request Timeout` when a handler runs longer than `millis`
fn request_timeout(millis: u64) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_slow_handler_times_out() {
        let app: Router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .route("/fast", get(|| async { "ok" }))
            .layer(request_timeout(50));

        let slow = app
            .clone()
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(slow.status(), StatusCode::REQUEST_TIMEOUT);

        let fast = app
            .oneshot(Request::get("/fast").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(fast.status(), StatusCode::OK);
    }
}
