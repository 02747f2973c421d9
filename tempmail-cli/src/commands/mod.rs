//! CLI command implementations

pub mod accounts;
pub mod auth;
pub mod domains;
pub mod mailboxes;
pub mod messages;
pub mod quick;
pub mod watch;

pub use accounts::AccountsCommand;
pub use domains::DomainsCommand;
pub use mailboxes::MailboxesCommand;
pub use messages::MessagesCommand;

use anyhow::{bail, Result};
use tempmail_htmx::state::AppState;

/// Fail early with a hint when no API key is stored
pub fn require_login(state: &AppState) -> Result<()> {
    if !state.store().is_authenticated() {
        bail!("Not logged in. Run `tempmail login` first.");
    }
    Ok(())
}
