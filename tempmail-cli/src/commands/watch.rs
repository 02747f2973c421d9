//! `tempmail watch`: poll an inbox and print arrivals
//!
//! Runs the same refresh cycle as the web client: the first load only
//! records what is already there, later polls print messages whose IDs
//! were not seen before.

use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use tempmail_htmx::api::MessageSummary;
use tempmail_htmx::refresh::{run_refresh, seed_account, RefreshOutcome, RefreshTrigger};
use tempmail_htmx::state::AppState;
use tempmail_htmx::store::QuickAccount;

use super::require_login;
use crate::output::{short_time, truncate, with_spinner, INFO, MAIL, WARN};

/// One line announcing `message`
pub fn arrival_line(message: &MessageSummary) -> String {
    let subject = if message.subject.trim().is_empty() {
        "(no subject)"
    } else {
        message.subject.as_str()
    };
    format!(
        "{} {}  {}",
        short_time(&message.created_at),
        truncate(&message.from.display(), 32),
        subject
    )
}

/// Watch the inbox of `account_id` until Ctrl+C
pub async fn run(state: &AppState, account_id: &str, interval: Duration) -> Result<()> {
    require_login(state)?;
    let store = state.store();
    let account = with_spinner("Loading account...", store.fetch_account(account_id)).await??;
    store.add_quick_account(QuickAccount::new(&account.id, &account.address, ""));

    let mailbox = with_spinner(
        "Loading inbox...",
        seed_account(store, state.refresh(), &account.id),
    )
    .await??
    .with_context(|| format!("{} has no mailboxes", account.address))?;
    let known = state.refresh().tracker(&account.id, &mailbox.id).known_count();

    println!(
        "{}Watching {} {} every {}s, {} message(s) already there. Ctrl+C to stop.",
        INFO,
        style(&account.address).cyan().bold(),
        style(format!("[{}]", mailbox.path)).dim(),
        interval.as_secs(),
        known
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {}
        }

        let report = run_refresh(store, state.refresh(), &account.id, RefreshTrigger::Auto).await;
        match report.outcome {
            RefreshOutcome::Updated { new, .. } => {
                for message in &new {
                    println!("{}{}", MAIL, arrival_line(message));
                }
            }
            RefreshOutcome::Failed { error } => {
                eprintln!("{}{}", WARN, style(format!("Refresh failed: {error}")).yellow());
            }
            _ => {}
        }
    }

    println!("\n{}Stopped watching {}", INFO, account.address);
    Ok(())
}
