//! `tempmail mailboxes`

use anyhow::Result;
use clap::Subcommand;
use console::style;
use tempmail_htmx::state::AppState;

use super::require_login;
use crate::output::{rule, with_spinner, INFO};

/// Mailbox commands
#[derive(Debug, Subcommand)]
pub enum MailboxesCommand {
    /// List the mailboxes of an account
    List {
        /// Account ID
        account_id: String,
    },
}

impl MailboxesCommand {
    /// Execute the mailboxes command
    pub async fn execute(&self, state: &AppState) -> Result<()> {
        require_login(state)?;
        match self {
            Self::List { account_id } => list(state, account_id).await,
        }
    }
}

async fn list(state: &AppState, account_id: &str) -> Result<()> {
    let mailboxes =
        with_spinner("Loading mailboxes...", state.store().fetch_mailboxes(account_id)).await??;

    println!("\n{}{} mailbox(es)\n", INFO, mailboxes.len());
    println!("{:<26} {:<20} {:>7} {:>7}", "ID", "Path", "Unread", "Total");
    println!("{}", rule(64));
    for mailbox in &mailboxes {
        let unread = if mailbox.total_unread_messages > 0 {
            style(mailbox.total_unread_messages.to_string()).bold()
        } else {
            style(mailbox.total_unread_messages.to_string()).dim()
        };
        println!(
            "{:<26} {:<20} {:>7} {:>7}",
            mailbox.id, mailbox.path, unread, mailbox.total_messages
        );
    }
    Ok(())
}
