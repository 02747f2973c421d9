//! `tempmail accounts`

use anyhow::Result;
use clap::Subcommand;
use console::style;
use tempmail_htmx::api::AccountQuery;
use tempmail_htmx::credentials::random_password;
use tempmail_htmx::state::AppState;

use super::require_login;
use crate::output::{confirm, rule, short_time, truncate, with_spinner, INFO, SUCCESS};

/// Account commands
#[derive(Debug, Subcommand)]
pub enum AccountsCommand {
    /// List accounts, one page at a time
    List {
        /// Exact address filter
        #[arg(short, long)]
        address: Option<String>,

        /// Only active (`true`) or inactive (`false`) accounts
        #[arg(long)]
        active: Option<bool>,

        /// Page number
        #[arg(short, long, default_value = "1")]
        page: u32,
    },

    /// Create an account
    Create {
        /// Full address, e.g. `name@domain`
        address: String,

        /// Password; a random one is generated and printed when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Delete an account
    Delete {
        /// Account ID
        account_id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

impl AccountsCommand {
    /// Execute the accounts command
    pub async fn execute(&self, state: &AppState) -> Result<()> {
        require_login(state)?;
        match self {
            Self::List {
                address,
                active,
                page,
            } => list(state, address.clone(), *active, *page).await,
            Self::Create { address, password } => {
                create(state, address, password.as_deref()).await
            }
            Self::Delete { account_id, force } => delete(state, account_id, *force).await,
        }
    }
}

async fn list(
    state: &AppState,
    address: Option<String>,
    is_active: Option<bool>,
    page: u32,
) -> Result<()> {
    let query = AccountQuery {
        address,
        is_active,
        page: page.max(1),
        ..AccountQuery::default()
    };
    let collection =
        with_spinner("Loading accounts...", state.store().fetch_accounts_page(&query)).await??;

    println!(
        "\n{}{} account(s), page {}\n",
        INFO, collection.total_items, query.page
    );
    println!(
        "{:<26} {:<36} {:<9} {:>6}  {}",
        "ID", "Address", "Status", "Usage", "Created"
    );
    println!("{}", rule(96));
    for account in &collection.member {
        let status = if account.is_active {
            style("active").green()
        } else {
            style("inactive").dim()
        };
        println!(
            "{:<26} {:<36} {:<9} {:>5}%  {}",
            truncate(&account.id, 26),
            truncate(&account.address, 36),
            status,
            account.usage_percent(),
            short_time(&account.created_at)
        );
    }
    if collection.has_next() {
        println!(
            "\n{}",
            style(format!("More: tempmail accounts list --page {}", query.page + 1)).dim()
        );
    }
    Ok(())
}

async fn create(state: &AppState, address: &str, password: Option<&str>) -> Result<()> {
    let generated;
    let password = match password {
        Some(password) => password,
        None => {
            generated = random_password(state.config().quick_mail.password_length);
            generated.as_str()
        }
    };

    let account = with_spinner(
        "Creating account...",
        state.store().create_account(address.trim(), password, None),
    )
    .await??;

    println!("{}Created {}", SUCCESS, style(&account.address).cyan().bold());
    println!("  ID        {}", account.id);
    println!("  Password  {password}");
    Ok(())
}

async fn delete(state: &AppState, account_id: &str, force: bool) -> Result<()> {
    if !confirm(&format!("Delete account {account_id}?"), force)? {
        println!("{}Cancelled", INFO);
        return Ok(());
    }
    with_spinner("Deleting account...", state.store().delete_account(account_id)).await??;
    state.refresh().forget_account(account_id);
    println!("{}Deleted {account_id}", SUCCESS);
    Ok(())
}
