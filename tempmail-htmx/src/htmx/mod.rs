//! HTMX request extractors and response helpers
//!
//! Builds on `axum-htmx` with:
//! - Fragment detection that respects history restores ([`HxPartial`])
//! - Out-of-band swaps ([`HxSwapOob`])
//! - Redirect translation for HTMX requests ([`hx_redirects`])

mod partial;
mod redirect;
mod swap_oob;

pub use axum_htmx::HxRequest;
pub use partial::HxPartial;
pub use redirect::hx_redirects;
pub use swap_oob::{HxSwapOob, SwapStrategy};

/// Element every toast is appended to
pub const TOASTS_TARGET: &str = "toasts";
