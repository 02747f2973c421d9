//! Liveness endpoint
//!
//! `GET /health` answers without touching smtp.dev, always with 200. A
//! missing API key degrades the report.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Overall or per-component health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Working normally
    Healthy,
    /// Serving, but something needs attention
    Degraded,
}

/// Health of one component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component status
    pub status: HealthStatus,
    /// Optional detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    /// Healthy with a detail message
    #[must_use]
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: Some(message.into()),
        }
    }

    /// Degraded with a reason
    #[must_use]
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            message: Some(message.into()),
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Worst component status
    pub status: HealthStatus,
    /// Crate version
    pub version: String,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// Per-component detail
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthCheckResponse {
    /// Healthy report with no components
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            version: version.into(),
            timestamp: chrono::Utc::now().timestamp(),
            components: BTreeMap::new(),
        }
    }

    /// Record a component and recompute the overall status
    pub fn add_component(&mut self, name: impl Into<String>, health: ComponentHealth) {
        self.components.insert(name.into(), health);
        self.status = if self
            .components
            .values()
            .any(|c| c.status == HealthStatus::Degraded)
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
    }
}

impl IntoResponse for HealthCheckResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// `GET /health`
#[allow(clippy::unused_async)]
pub async fn health_check(State(state): State<AppState>) -> HealthCheckResponse {
    let mut response = HealthCheckResponse::new(env!("CARGO_PKG_VERSION"));

    let store = state.store();
    response.add_component(
        "store",
        if store.is_authenticated() {
            ComponentHealth::healthy("API key configured")
        } else {
            ComponentHealth::degraded("No API key")
        },
    );
    response.add_component(
        "refresh",
        ComponentHealth::healthy(format!("{} tracked mailbox(es)", state.refresh().len())),
    );
    response
}
