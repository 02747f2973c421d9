//! tempmail-htmx: HTMX web client for the smtp.dev temporary email API
//!
//! The server renders every page with askama and talks to smtp.dev through
//! a typed client:
//! - **api**: REST client for domains, accounts, mailboxes and messages
//! - **store**: session state shared by all handlers, optionally persisted
//! - **refresh**: in-flight guard, manual cooldown and new-message diffing
//! - **proxy**: same-origin forwarding to the REST API and the Mercure hub
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tempmail_htmx::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TempmailConfig::load()?;
//!     let addr = config.server.bind_addr();
//!     let state = AppState::with_config(config)?;
//!
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, router(state)?).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! Settings merge defaults, `/etc/tempmail-htmx/config.toml`, the user
//! config directory, a local `config.toml` and `TEMPMAIL_*` environment
//! variables, in that order. See [`config::TempmailConfig`].

#![allow(clippy::missing_errors_doc)]

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod health;
pub mod htmx;
pub mod observability;
pub mod proxy;
pub mod refresh;
pub mod state;
pub mod store;
pub mod template;

#[cfg(test)]
pub mod testing;

pub use handlers::router;

pub mod prelude {
    //! Convenience re-exports for embedding the web client
    //!
    //! ```rust
    //! use tempmail_htmx::prelude::*;
    //! ```

    pub use crate::api::{ApiError, ClientConfig, SmtpDevClient};
    pub use crate::config::TempmailConfig;
    pub use crate::error::AppError;
    pub use crate::handlers::router;
    pub use crate::htmx::{HxPartial, HxRequest, HxSwapOob, SwapStrategy};
    pub use crate::refresh::{RefreshRegistry, RefreshTrigger};
    pub use crate::state::AppState;
    pub use crate::store::{QuickAccount, Store, StoreError};
    pub use crate::template::HxTemplate;
}
