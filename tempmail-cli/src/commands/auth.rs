//! `tempmail login` and `tempmail logout`

use anyhow::{bail, Context, Result};
use console::style;
use dialoguer::Password;
use tempmail_htmx::api::{mask_key, SmtpDevClient};
use tempmail_htmx::state::AppState;

use crate::output::{with_spinner, INFO, SUCCESS};

/// Test `key` (prompted for when `None`) and store it
pub async fn login(state: &AppState, key: Option<String>) -> Result<()> {
    let key = match key {
        Some(key) => key,
        None => Password::new()
            .with_prompt("smtp.dev API key")
            .interact()
            .context("Failed to read API key")?,
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("API key is required");
    }

    let client = SmtpDevClient::new(key, state.config().api.client_config())?;
    let report = with_spinner("Testing connection...", client.test_connection())
        .await?
        .context("API key rejected")?;

    state.store().set_api_key(key)?;
    state.refresh().clear();
    println!(
        "{}Logged in with {} (HTTP {})",
        SUCCESS,
        style(mask_key(key)).cyan(),
        report.status
    );
    if let Some(path) = state.store().persist_path() {
        println!("{}Key saved to {}", INFO, style(path.display()).dim());
    }
    Ok(())
}

/// Clear the stored key and cached state
pub fn logout(state: &AppState) {
    state.store().clear_api_key();
    state.refresh().clear();
    println!("{}Logged out", SUCCESS);
}
