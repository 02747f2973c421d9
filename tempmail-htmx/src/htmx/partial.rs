//! Fragment detection

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_htmx::{HxHistoryRestoreRequest, HxRequest};

/// Whether the request wants only the page content
///
/// True for HTMX requests, except history restores, which need the whole
/// document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HxPartial(pub bool);

impl<S> FromRequestParts<S> for HxPartial
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let htmx = matches!(
            HxRequest::from_request_parts(parts, state).await,
            Ok(HxRequest(true))
        );
        let restore = matches!(
            HxHistoryRestoreRequest::from_request_parts(parts, state).await,
            Ok(HxHistoryRestoreRequest(true))
        );
        Ok(Self(htmx && !restore))
    }
}
