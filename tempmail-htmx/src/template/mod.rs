//! Askama rendering with HTMX awareness
//!
//! Page templates extend `layout.html`, which wraps the content block in
//! partial markers. [`HxTemplate::render_htmx`] sends the whole page to a
//! browser navigation and only the marked content to an HTMX request.

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::refresh::{Notice, NoticeLevel};

pub mod extractor;

pub use extractor::extract_partial;

/// Extension trait for Askama templates with HTMX support
pub trait HxTemplate: Template {
    /// Full page for regular requests, marked content for HTMX requests
    fn render_htmx(self, is_htmx: bool) -> Response
    where
        Self: Sized,
    {
        match self.render() {
            Ok(html) if is_htmx => Html(extract_partial(&html).into_owned()).into_response(),
            Ok(html) => Html(html).into_response(),
            Err(err) => render_failed(&err),
        }
    }

    /// Render the template as is
    fn render_html(self) -> Response
    where
        Self: Sized,
    {
        match self.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => render_failed(&err),
        }
    }
}

impl<T> HxTemplate for T where T: Template {}

fn render_failed(err: &askama::Error) -> Response {
    tracing::error!(error = %err, "Template rendering error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Template rendering failed",
    )
        .into_response()
}

/// A single toast
#[derive(Template)]
#[template(path = "partials/toast.html")]
pub struct ToastTemplate<'a> {
    /// CSS class for the severity
    pub level_class: &'static str,
    /// Message text, escaped on render
    pub text: &'a str,
}

/// Toast markup for `text`, or an empty string if rendering fails
#[must_use]
pub fn render_toast(level: NoticeLevel, text: &str) -> String {
    ToastTemplate {
        level_class: level.css_class(),
        text,
    }
    .render()
    .unwrap_or_else(|err| {
        tracing::error!(error = %err, "Toast rendering error");
        String::new()
    })
}

/// Toast markup for a refresh notice
#[must_use]
pub fn render_notice(notice: &Notice) -> String {
    render_toast(notice.level, &notice.text)
}
