//! Out-of-band swaps
//!
//! [`HxSwapOob`] bundles a primary fragment with extra fragments that HTMX
//! swaps into other elements by id. The quick-mail refresh uses it to
//! replace the message list, the status line and append a toast in one
//! response.

use std::fmt::Write;

use axum::response::{Html, IntoResponse, Response};

/// How an out-of-band fragment is swapped into its target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SwapStrategy {
    /// Replace the children of the target
    #[default]
    InnerHTML,
    /// Replace the target itself
    OuterHTML,
    /// Append to the children of the target
    BeforeEnd,
}

impl SwapStrategy {
    /// Value of the `hx-swap-oob` attribute
    #[must_use]
    pub const fn oob_value(self) -> &'static str {
        match self {
            Self::InnerHTML => "true",
            Self::OuterHTML => "outerHTML",
            Self::BeforeEnd => "beforeend",
        }
    }
}

#[derive(Debug, Clone)]
struct OobTarget {
    id: String,
    content: String,
    strategy: SwapStrategy,
}

/// Response made of a primary fragment plus out-of-band fragments
#[derive(Debug, Default, Clone)]
pub struct HxSwapOob {
    primary: Option<String>,
    targets: Vec<OobTarget>,
}

impl HxSwapOob {
    /// Empty response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Response whose main swap target receives `content`
    #[must_use]
    pub fn with_primary(content: impl Into<String>) -> Self {
        Self {
            primary: Some(content.into()),
            targets: Vec::new(),
        }
    }

    /// Add a fragment for the element with `id`
    pub fn add(
        &mut self,
        id: impl Into<String>,
        content: impl Into<String>,
        strategy: SwapStrategy,
    ) -> &mut Self {
        self.targets.push(OobTarget {
            id: id.into(),
            content: content.into(),
            strategy,
        });
        self
    }

    /// Builder form of [`add`](Self::add)
    #[must_use]
    pub fn with(
        mut self,
        id: impl Into<String>,
        content: impl Into<String>,
        strategy: SwapStrategy,
    ) -> Self {
        self.add(id, content, strategy);
        self
    }

    /// Append `content` to the element with `id`
    pub fn append(&mut self, id: impl Into<String>, content: impl Into<String>) -> &mut Self {
        self.add(id, content, SwapStrategy::BeforeEnd)
    }

    /// Number of out-of-band fragments
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether there is nothing to send
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.targets.is_empty()
    }

    /// Render the primary fragment followed by every out-of-band wrapper
    #[must_use]
    pub fn render(&self) -> String {
        let mut html = self.primary.clone().unwrap_or_default();
        for target in &self.targets {
            // Writing into a String cannot fail.
            let _ = write!(
                html,
                r#"<div id="{}" hx-swap-oob="{}">{}</div>"#,
                target.id,
                target.strategy.oob_value(),
                target.content
            );
        }
        html
    }
}

impl IntoResponse for HxSwapOob {
    fn into_response(self) -> Response {
        Html(self.render()).into_response()
    }
}
