//! tempmail: terminal client for smtp.dev
//!
//! Shares configuration and the persisted store with the web client, so a
//! key saved by `tempmail login` is picked up by `tempmail-htmx` and the
//! other way round.

#![forbid(unsafe_code)]

mod commands;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{AccountsCommand, DomainsCommand, MailboxesCommand, MessagesCommand};
use tempmail_htmx::config::TempmailConfig;
use tempmail_htmx::observability;
use tempmail_htmx::state::AppState;

#[derive(Parser)]
#[command(name = "tempmail")]
#[command(version)]
#[command(about = "Terminal client for the smtp.dev temporary email API", long_about = None)]
struct Cli {
    /// Configuration file instead of the standard locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print library logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test an API key and store it
    Login {
        /// Key to store; prompted for when omitted
        #[arg(long)]
        key: Option<String>,
    },
    /// Forget the stored API key
    Logout,
    /// Domain management
    Domains {
        #[command(subcommand)]
        command: DomainsCommand,
    },
    /// Account management
    Accounts {
        #[command(subcommand)]
        command: AccountsCommand,
    },
    /// Mailboxes of an account
    Mailboxes {
        #[command(subcommand)]
        command: MailboxesCommand,
    },
    /// Read messages
    Messages {
        #[command(subcommand)]
        command: MessagesCommand,
    },
    /// Create a random account on the first active domain
    Quick {
        /// Domain to use instead of the first active one
        #[arg(short, long)]
        domain: Option<String>,

        /// Watch the new inbox right away
        #[arg(short, long)]
        watch: bool,
    },
    /// Poll an account's inbox and print new arrivals
    Watch {
        /// Account ID
        account_id: String,

        /// Seconds between polls; defaults to the configured interval
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

fn load_state(config: Option<&PathBuf>) -> Result<AppState> {
    let config = match config {
        Some(path) => TempmailConfig::load_from(&path.to_string_lossy())?,
        None => TempmailConfig::load()?,
    };
    AppState::with_config(config)
}

fn poll_interval(state: &AppState, seconds: Option<u64>) -> Duration {
    seconds.map_or_else(
        || state.config().refresh.interval(),
        |s| Duration::from_secs(s.max(1)),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    observability::init_with(if cli.verbose { "info" } else { "off" })?;
    let state = load_state(cli.config.as_ref())?;

    match cli.command {
        Commands::Login { key } => commands::auth::login(&state, key).await?,
        Commands::Logout => commands::auth::logout(&state),
        Commands::Domains { command } => command.execute(&state).await?,
        Commands::Accounts { command } => command.execute(&state).await?,
        Commands::Mailboxes { command } => command.execute(&state).await?,
        Commands::Messages { command } => command.execute(&state).await?,
        Commands::Quick { domain, watch } => {
            let account = commands::quick::create(&state, domain.as_deref()).await?;
            if watch {
                commands::watch::run(&state, &account.id, poll_interval(&state, None)).await?;
            }
        }
        Commands::Watch {
            account_id,
            interval,
        } => commands::watch::run(&state, &account_id, poll_interval(&state, interval)).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_nested_commands() {
        let cli = Cli::try_parse_from(["tempmail", "accounts", "delete", "acc1", "--force"]).unwrap();
        match cli.command {
            Commands::Accounts {
                command: AccountsCommand::Delete { account_id, force },
            } => {
                assert_eq!(account_id, "acc1");
                assert!(force);
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn test_watch_interval_and_global_flags() {
        let cli =
            Cli::try_parse_from(["tempmail", "watch", "acc1", "-i", "5", "--verbose"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Watch {
                account_id,
                interval,
            } => {
                assert_eq!(account_id, "acc1");
                assert_eq!(interval, Some(5));
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn test_quick_flags() {
        let cli = Cli::try_parse_from(["tempmail", "quick", "--domain", "x.test", "-w"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Quick { domain: Some(ref d), watch: true } if d == "x.test"
        ));
    }

    #[test]
    fn test_poll_interval_has_floor() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TempmailConfig::default();
        config.store.path = dir.path().join("store.json");
        let state = AppState::with_config(config).unwrap();

        assert_eq!(poll_interval(&state, Some(0)), Duration::from_secs(1));
        assert_eq!(poll_interval(&state, Some(7)), Duration::from_secs(7));
        assert_eq!(
            poll_interval(&state, None),
            state.config().refresh.interval()
        );
    }
}
