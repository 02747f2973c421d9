//! `tempmail messages`

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use tempmail_htmx::api::{pick_inbox, Mailbox};
use tempmail_htmx::state::AppState;

use super::require_login;
use crate::output::{rule, short_time, truncate, with_spinner, INFO};

/// Message commands
#[derive(Debug, Subcommand)]
pub enum MessagesCommand {
    /// List the messages of a mailbox
    List {
        /// Account ID
        account_id: String,

        /// Mailbox ID or path; the inbox when omitted
        #[arg(short, long)]
        mailbox: Option<String>,
    },

    /// Print one message and mark it read
    Show {
        /// Account ID
        account_id: String,

        /// Message ID
        message_id: String,

        /// Mailbox ID or path; the inbox when omitted
        #[arg(short, long)]
        mailbox: Option<String>,

        /// Print the HTML body instead of the text body
        #[arg(long)]
        html: bool,
    },
}

impl MessagesCommand {
    /// Execute the messages command
    pub async fn execute(&self, state: &AppState) -> Result<()> {
        require_login(state)?;
        match self {
            Self::List {
                account_id,
                mailbox,
            } => list(state, account_id, mailbox.as_deref()).await,
            Self::Show {
                account_id,
                message_id,
                mailbox,
                html,
            } => show(state, account_id, message_id, mailbox.as_deref(), *html).await,
        }
    }
}

/// Mailbox matching `selector` by ID or case-insensitive path, else the inbox
pub fn find_mailbox<'a>(mailboxes: &'a [Mailbox], selector: Option<&str>) -> Option<&'a Mailbox> {
    match selector {
        Some(wanted) => mailboxes
            .iter()
            .find(|m| m.id == wanted || m.path.eq_ignore_ascii_case(wanted)),
        None => pick_inbox(mailboxes),
    }
}

async fn open_mailbox(state: &AppState, account_id: &str, selector: Option<&str>) -> Result<Mailbox> {
    let mailboxes =
        with_spinner("Loading mailboxes...", state.store().fetch_mailboxes(account_id)).await??;
    find_mailbox(&mailboxes, selector)
        .cloned()
        .with_context(|| match selector {
            Some(wanted) => format!("No mailbox {wanted} on account {account_id}"),
            None => format!("Account {account_id} has no mailboxes"),
        })
}

async fn list(state: &AppState, account_id: &str, selector: Option<&str>) -> Result<()> {
    let mailbox = open_mailbox(state, account_id, selector).await?;
    let messages = with_spinner(
        "Loading messages...",
        state.store().fetch_messages(account_id, &mailbox.id),
    )
    .await??;

    println!("\n{}{}: {} message(s)\n", INFO, mailbox.path, messages.len());
    println!("{:<26} {:<28} {:<40} {}", "ID", "From", "Subject", "Received");
    println!("{}", rule(112));
    for message in &messages {
        let subject = truncate(&message.subject, 40);
        let subject = if message.is_read {
            style(subject)
        } else {
            style(subject).bold()
        };
        println!(
            "{:<26} {:<28} {:<40} {}",
            message.id,
            truncate(&message.from.display(), 28),
            subject,
            short_time(&message.created_at)
        );
    }
    Ok(())
}

async fn show(
    state: &AppState,
    account_id: &str,
    message_id: &str,
    selector: Option<&str>,
    html: bool,
) -> Result<()> {
    let mailbox = open_mailbox(state, account_id, selector).await?;
    let store = state.store();
    let message = with_spinner(
        "Loading message...",
        store.fetch_message(account_id, &mailbox.id, message_id),
    )
    .await??;
    if !message.summary.is_read {
        store
            .mark_message_as_read(account_id, &mailbox.id, message_id)
            .await;
    }

    let summary = &message.summary;
    println!();
    println!("{}", style(&summary.subject).bold());
    println!("From     {}", summary.from.display());
    println!(
        "To       {}",
        summary
            .to
            .iter()
            .map(tempmail_htmx::api::EmailAddress::display)
            .collect::<Vec<_>>()
            .join(", ")
    );
    if !message.cc.is_empty() {
        println!("Cc       {}", message.cc.join(", "));
    }
    println!("Date     {}", short_time(&summary.created_at));
    for attachment in &message.attachments {
        println!(
            "Attached {} {}",
            attachment.filename,
            style(format!("({} bytes)", attachment.size)).dim()
        );
    }
    println!("{}", rule(72));
    if html {
        println!("{}", message.html_body());
    } else {
        println!("{}", message.text);
    }
    Ok(())
}
