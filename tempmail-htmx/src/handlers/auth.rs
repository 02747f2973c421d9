//! Home page and API key login
//!
//! Logging in tests the key against `GET /accounts` before storing it, so
//! a typo never replaces a working key.

use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::api::{mask_key, SmtpDevClient};
use crate::error::AppError;
use crate::htmx::HxPartial;
use crate::state::AppState;
use crate::template::HxTemplate;

/// Login form
#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    /// smtp.dev API key
    #[validate(length(min = 1, message = "API key is required"))]
    pub api_key: String,
}

/// Login page
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    /// Layout flag
    pub authenticated: bool,
    /// Masked key currently stored, if any
    pub current_key: String,
}

/// Account summary line on the home page
#[derive(Debug, Clone)]
pub struct AccountLine {
    /// Account ID
    pub id: String,
    /// Address
    pub address: String,
    /// Quota usage
    pub usage_percent: u8,
}

/// Home page
#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    /// Layout flag
    pub authenticated: bool,
    /// Masked stored key
    pub masked_key: String,
    /// Number of accounts
    pub account_count: usize,
    /// Number of domains
    pub domain_count: usize,
    /// Number of active domains
    pub active_domain_count: usize,
    /// First accounts
    pub recent_accounts: Vec<AccountLine>,
    /// Last store error, empty when none
    pub last_error: String,
}

const RECENT_ACCOUNTS: usize = 5;

/// `GET /`
pub async fn home(
    State(state): State<AppState>,
    HxPartial(partial): HxPartial,
) -> Result<Response, AppError> {
    let store = state.store();
    let Some(key) = store.api_key() else {
        return Ok(Redirect::to("/login").into_response());
    };

    // Failures clear the lists and set last_error, which the page shows.
    let accounts = store.fetch_accounts().await.unwrap_or_default();
    let domains = store.fetch_domains().await.unwrap_or_default();

    let template = HomeTemplate {
        authenticated: true,
        masked_key: mask_key(&key),
        account_count: accounts.len(),
        domain_count: domains.len(),
        active_domain_count: domains.iter().filter(|d| d.is_active).count(),
        recent_accounts: accounts
            .iter()
            .take(RECENT_ACCOUNTS)
            .map(|a| AccountLine {
                id: a.id.clone(),
                address: a.address.clone(),
                usage_percent: a.usage_percent(),
            })
            .collect(),
        last_error: store.last_error().unwrap_or_default(),
    };
    Ok(template.render_htmx(partial))
}

/// `GET /login`
pub async fn login_page(
    State(state): State<AppState>,
    HxPartial(partial): HxPartial,
) -> Response {
    let current_key = state.store().api_key();
    LoginTemplate {
        authenticated: current_key.is_some(),
        current_key: current_key.as_deref().map(mask_key).unwrap_or_default(),
    }
    .render_htmx(partial)
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    form.validate()?;
    let key = form.api_key.trim();

    let candidate = SmtpDevClient::new(key, state.config().api.client_config())?;
    let report = candidate.test_connection().await?;
    info!(key = %mask_key(key), status = report.status, "API key verified");

    let key = key.to_string();
    let store_state = state.clone();
    tokio::task::spawn_blocking(move || store_state.store().set_api_key(&key))
        .await
        .map_err(|e| AppError::ServerError(e.to_string()))??;
    state.refresh().clear();
    Ok(Redirect::to("/").into_response())
}

/// `POST /logout`
pub async fn logout(State(state): State<AppState>) -> Result<Redirect, AppError> {
    let store_state = state.clone();
    tokio::task::spawn_blocking(move || store_state.store().clear_api_key())
        .await
        .map_err(|e| AppError::ServerError(e.to_string()))?;
    state.refresh().clear();
    info!("Logged out");
    Ok(Redirect::to("/login"))
}
