//! Domain management
//!
//! Mutations answer with the refreshed table body, so the page never
//! reloads.

use askama::Template;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Form;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::client;
use super::views::format_timestamp;
use crate::api::{Domain, DomainCreate, DomainUpdate};
use crate::error::AppError;
use crate::htmx::{HxPartial, HxSwapOob, TOASTS_TARGET};
use crate::refresh::NoticeLevel;
use crate::state::AppState;
use crate::template::{render_toast, HxTemplate};

/// Row of the domain table
#[derive(Debug, Clone)]
pub struct DomainRow {
    /// Domain ID
    pub id: String,
    /// Domain name
    pub domain: String,
    /// Active flag
    pub is_active: bool,
    /// Creation time
    pub created: String,
}

impl From<&Domain> for DomainRow {
    fn from(domain: &Domain) -> Self {
        Self {
            id: domain.id.clone(),
            domain: domain.domain.clone(),
            is_active: domain.is_active,
            created: format_timestamp(&domain.created_at),
        }
    }
}

/// `GET /domains`
#[derive(Template)]
#[template(path = "domains.html")]
pub struct DomainsTemplate {
    /// Layout flag
    pub authenticated: bool,
    /// Table rows
    pub domains: Vec<DomainRow>,
}

/// Table body fragment
#[derive(Template)]
#[template(path = "partials/domain_rows.html")]
pub struct DomainRowsTemplate {
    /// Table rows
    pub domains: Vec<DomainRow>,
}

/// Domain registration form
#[derive(Debug, Deserialize, Validate)]
pub struct DomainForm {
    /// Domain name
    #[validate(length(min = 3, max = 253, message = "Enter a domain name"))]
    pub domain: String,
    /// Checkbox; present when checked
    #[serde(default)]
    pub is_active: Option<String>,
}

fn rows(domains: &[Domain]) -> Vec<DomainRow> {
    domains.iter().map(DomainRow::from).collect()
}

async fn refreshed_rows(state: &AppState, toast: &str) -> Result<HxSwapOob, AppError> {
    let domains = state.store().fetch_domains().await?;
    let mut response = HxSwapOob::with_primary(
        DomainRowsTemplate {
            domains: rows(&domains),
        }
        .render()?,
    );
    response.append(TOASTS_TARGET, render_toast(NoticeLevel::Success, toast));
    Ok(response)
}

/// `GET /domains`
pub async fn list(
    State(state): State<AppState>,
    HxPartial(partial): HxPartial,
) -> Result<Response, AppError> {
    let domains = state.store().fetch_domains().await?;
    Ok(DomainsTemplate {
        authenticated: true,
        domains: rows(&domains),
    }
    .render_htmx(partial))
}

/// `POST /domains`
pub async fn create(
    State(state): State<AppState>,
    Form(form): Form<DomainForm>,
) -> Result<HxSwapOob, AppError> {
    form.validate()?;
    let created = client(&state)?
        .domains()
        .create(&DomainCreate {
            domain: form.domain.trim().to_lowercase(),
            is_active: Some(form.is_active.is_some()),
        })
        .await?;
    info!(domain_id = %created.id, domain = %created.domain, "Domain created");
    refreshed_rows(&state, &format!("Domain {} added", created.domain)).await
}

/// `POST /domains/{id}/toggle`
pub async fn toggle(
    State(state): State<AppState>,
    Path(domain_id): Path<String>,
) -> Result<HxSwapOob, AppError> {
    let client = client(&state)?;
    let current = match state.store().domains().into_iter().find(|d| d.id == domain_id) {
        Some(domain) => domain,
        None => client.domains().get(&domain_id).await?,
    };
    let updated = client
        .domains()
        .update(
            &domain_id,
            DomainUpdate {
                is_active: !current.is_active,
            },
        )
        .await?;
    info!(domain_id, is_active = updated.is_active, "Domain toggled");
    let verb = if updated.is_active {
        "activated"
    } else {
        "deactivated"
    };
    refreshed_rows(&state, &format!("Domain {} {verb}", updated.domain)).await
}

/// `DELETE /domains/{id}`
pub async fn remove(
    State(state): State<AppState>,
    Path(domain_id): Path<String>,
) -> Result<HxSwapOob, AppError> {
    client(&state)?.domains().delete(&domain_id).await?;
    info!(domain_id, "Domain deleted");
    refreshed_rows(&state, "Domain deleted").await
}
