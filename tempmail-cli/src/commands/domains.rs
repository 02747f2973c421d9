//! `tempmail domains`

use anyhow::Result;
use clap::Subcommand;
use console::style;
use tempmail_htmx::state::AppState;

use super::require_login;
use crate::output::{rule, short_time, with_spinner, INFO};

/// Domain commands
#[derive(Debug, Subcommand)]
pub enum DomainsCommand {
    /// List all domains
    List,
}

impl DomainsCommand {
    /// Execute the domains command
    pub async fn execute(&self, state: &AppState) -> Result<()> {
        match self {
            Self::List => list(state).await,
        }
    }
}

async fn list(state: &AppState) -> Result<()> {
    require_login(state)?;
    let domains = with_spinner("Loading domains...", state.store().fetch_domains()).await??;

    println!("\n{}{} domain(s)\n", INFO, domains.len());
    println!("{:<32} {:<10} {}", "Domain", "Status", "Created");
    println!("{}", rule(64));
    for domain in &domains {
        let status = if domain.is_active {
            style("active").green()
        } else {
            style("inactive").dim()
        };
        println!(
            "{:<32} {:<10} {}",
            domain.domain,
            status,
            short_time(&domain.created_at)
        );
    }
    Ok(())
}
