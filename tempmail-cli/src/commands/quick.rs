//! `tempmail quick`: a throwaway account in one step

use anyhow::{Context, Result};
use console::style;
use tempmail_htmx::api::{Account, Domain};
use tempmail_htmx::credentials::{random_password, random_username};
use tempmail_htmx::state::AppState;

use super::require_login;
use crate::output::{with_spinner, SUCCESS};

/// `wanted` by name, or the first active domain
pub fn pick_domain<'a>(domains: &'a [Domain], wanted: Option<&str>) -> Option<&'a Domain> {
    match wanted {
        Some(name) => domains
            .iter()
            .find(|d| d.domain.eq_ignore_ascii_case(name.trim_start_matches('@'))),
        None => domains.iter().find(|d| d.is_active),
    }
}

/// Create an account with generated credentials and print them
pub async fn create(state: &AppState, domain: Option<&str>) -> Result<Account> {
    require_login(state)?;
    let store = state.store();
    let domains = with_spinner("Loading domains...", store.fetch_domains()).await??;
    let domain = pick_domain(&domains, domain).with_context(|| match domain {
        Some(name) => format!("Domain {name} not found"),
        None => "No active domain available".to_string(),
    })?;

    let settings = &state.config().quick_mail;
    let address = format!(
        "{}@{}",
        random_username(settings.username_length),
        domain.domain
    );
    let password = random_password(settings.password_length);

    let account = with_spinner(
        "Creating account...",
        store.create_account(&address, &password, Some(true)),
    )
    .await??;

    println!("{}Created {}", SUCCESS, style(&account.address).cyan().bold());
    println!("  ID        {}", account.id);
    println!("  Password  {password}");
    Ok(account)
}
