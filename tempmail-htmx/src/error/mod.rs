//! Error types and error handling
//!
//! [`AppError`] is what handlers return. Every variant except
//! [`AppError::NotAuthenticated`] renders as an error toast that HTMX appends
//! to `#toasts`, so a failing button press never replaces page content.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use thiserror::Error;

use crate::api::ApiError;
use crate::refresh::NoticeLevel;
use crate::store::StoreError;
use crate::template::render_toast;

/// Web layer error type
#[derive(Debug, Error)]
pub enum AppError {
    /// No API key stored; the user must log in
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Bad request error
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not Found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream API error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Template rendering failed
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Server error
    #[error("Server error: {0}")]
    ServerError(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotAuthenticated => Self::NotAuthenticated,
            StoreError::Api(api) => Self::Api(api),
            other => Self::ServerError(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map_or_else(|| format!("Invalid {field}"), ToString::to_string)
                })
            })
            .collect();
        messages.sort();
        Self::BadRequest(messages.join("; "))
    }
}

impl AppError {
    /// HTTP status for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::SEE_OTHER,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Api(e) => match e.status_code() {
                401 => StatusCode::UNAUTHORIZED,
                404 => StatusCode::NOT_FOUND,
                422 => StatusCode::UNPROCESSABLE_ENTITY,
                429 => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Template(_) | Self::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "Please log in with your API key".to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Api(ApiError::Unauthorized) => "Invalid API key".to_string(),
            Self::Api(ApiError::Validation(body)) => format!("Rejected by the API: {body}"),
            Self::Api(ApiError::RateLimited) => "Too many requests, slow down".to_string(),
            Self::Api(ApiError::NotFound(_)) => "Resource not found".to_string(),
            Self::Api(ApiError::Network(_)) => "Could not reach the API".to_string(),
            Self::Api(_) => "The API returned an error".to_string(),
            Self::Template(_) | Self::ServerError(_) => "Something went wrong".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::NotAuthenticated) {
            return Redirect::to("/login").into_response();
        }

        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        (
            status,
            [("HX-Retarget", "#toasts"), ("HX-Reswap", "beforeend")],
            Html(render_toast(NoticeLevel::Error, &self.user_message())),
        )
            .into_response()
    }
}
