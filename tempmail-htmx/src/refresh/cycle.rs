//! One pass of the refresh cycle

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{RefreshRegistry, RefreshTrigger, Refusal};
use crate::api::{Mailbox, MessageSummary};
use crate::store::{Store, StoreError};

/// Toast severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Neutral information
    Info,
    /// Something arrived
    Success,
    /// Request was refused
    Warning,
    /// Request failed
    Error,
}

impl NoticeLevel {
    /// CSS modifier used by the toast partial
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Info => "alert-info",
            Self::Success => "alert-success",
            Self::Warning => "alert-warning",
            Self::Error => "alert-error",
        }
    }
}

/// User-facing message produced by a refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Text shown in the toast
    pub text: String,
}

impl Notice {
    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    /// "Received N new message(s)"
    #[must_use]
    pub fn received(count: usize) -> Self {
        Self::new(NoticeLevel::Success, format!("Received {count} new message(s)"))
    }

    /// Manual refresh found nothing new
    #[must_use]
    pub fn up_to_date() -> Self {
        Self::new(NoticeLevel::Info, "Mailbox updated. No new messages.")
    }

    /// Refresh failed
    #[must_use]
    pub fn failed() -> Self {
        Self::new(
            NoticeLevel::Error,
            "Could not refresh mailbox. Please try again later.",
        )
    }

    /// Manual refresh while another is running
    #[must_use]
    pub fn busy() -> Self {
        Self::new(NoticeLevel::Warning, "Refreshing, please wait...")
    }

    /// Manual refresh inside the cooldown
    #[must_use]
    pub fn cooling_down() -> Self {
        Self::new(NoticeLevel::Warning, "Please wait a moment before trying again")
    }

    /// Account has no mailbox to refresh
    #[must_use]
    pub fn no_mailbox() -> Self {
        Self::new(NoticeLevel::Warning, "No mailbox available")
    }
}

/// What a refresh did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// First load; the tracker now knows these messages
    Seeded {
        /// Messages in the mailbox
        total: usize,
    },
    /// Later load diffed against the previous one
    Updated {
        /// Messages not seen before, newest first
        new: Vec<MessageSummary>,
        /// Messages in the mailbox
        total: usize,
    },
    /// Another refresh was in flight
    Busy,
    /// Manual refresh inside the cooldown
    CoolingDown {
        /// Time until the next manual refresh is admitted
        remaining: Duration,
    },
    /// Account unknown or without mailboxes
    NoMailbox,
    /// Upstream failure
    Failed {
        /// Error description
        error: String,
    },
}

/// Result of [`run_refresh`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// What happened
    pub outcome: RefreshOutcome,
    /// Toast to show, if any
    pub notice: Option<Notice>,
}

impl RefreshReport {
    const fn silent(outcome: RefreshOutcome) -> Self {
        Self {
            outcome,
            notice: None,
        }
    }

    fn with_notice(outcome: RefreshOutcome, notice: Notice) -> Self {
        Self {
            outcome,
            notice: Some(notice),
        }
    }
}

/// Run one refresh of a quick-mail account's open mailbox
///
/// Mailboxes are loaded first when the account has none yet, opening the
/// inbox. Only then is the tracker of the opened mailbox looked up, so an
/// unknown account or an unresolved mailbox never gets one. The listing
/// bypasses caches and replaces the store's message list. An uninitialized
/// tracker is seeded rather than diffed, so the first load never reports
/// every message as new.
pub async fn run_refresh(
    store: &Store,
    registry: &RefreshRegistry,
    account_id: &str,
    trigger: RefreshTrigger,
) -> RefreshReport {
    let mailbox = match resolve_mailbox(store, account_id).await {
        Ok(Some(mailbox)) => mailbox,
        Ok(None) => {
            warn!(account_id, "No mailbox available for refresh");
            return if trigger.is_manual() {
                RefreshReport::with_notice(RefreshOutcome::NoMailbox, Notice::no_mailbox())
            } else {
                RefreshReport::silent(RefreshOutcome::NoMailbox)
            };
        }
        Err(e) => return failed(account_id, &e),
    };

    let tracker = registry.tracker(account_id, &mailbox.id);
    let _guard = match tracker.begin(trigger) {
        Ok(guard) => guard,
        Err(Refusal::Busy) if trigger.is_manual() => {
            return RefreshReport::with_notice(RefreshOutcome::Busy, Notice::busy());
        }
        Err(Refusal::Busy) => return RefreshReport::silent(RefreshOutcome::Busy),
        Err(Refusal::CoolingDown { remaining }) => {
            return RefreshReport::with_notice(
                RefreshOutcome::CoolingDown { remaining },
                Notice::cooling_down(),
            );
        }
    };

    let fresh = match store.fetch_messages(account_id, &mailbox.id).await {
        Ok(fresh) => fresh,
        Err(e) => return failed(account_id, &e),
    };
    let total = fresh.len();

    if !tracker.is_initialized() {
        tracker.seed(&fresh);
        debug!(account_id, total, "Initial load recorded");
        return RefreshReport::silent(RefreshOutcome::Seeded { total });
    }

    let new = tracker.complete(&fresh);
    let notice = if !new.is_empty() {
        info!(account_id, mailbox_id = %mailbox.id, new = new.len(), %trigger, "New messages received");
        Some(Notice::received(new.len()))
    } else if trigger.is_manual() {
        Some(Notice::up_to_date())
    } else {
        None
    };

    RefreshReport {
        outcome: RefreshOutcome::Updated { new, total },
        notice,
    }
}

fn failed(account_id: &str, e: &StoreError) -> RefreshReport {
    warn!(account_id, error = %e, "Refresh failed");
    RefreshReport::with_notice(
        RefreshOutcome::Failed {
            error: e.to_string(),
        },
        Notice::failed(),
    )
}

async fn resolve_mailbox(store: &Store, account_id: &str) -> Result<Option<Mailbox>, StoreError> {
    let Some(account) = store.quick_account(account_id) else {
        return Ok(None);
    };
    if account.mailboxes.is_some() {
        return Ok(account.current_mailbox);
    }

    let mailboxes = store.fetch_mailboxes(account_id).await?;
    if mailboxes.is_empty() {
        return Ok(None);
    }
    Ok(store
        .update_quick_account(account_id, |account| account.set_mailboxes(mailboxes))
        .and_then(|account| account.current_mailbox))
}

/// Load a quick-mail account's mailboxes and messages, then seed its tracker
///
/// Used when an account is created or selected. Returns the opened mailbox,
/// or `None` when the account has none.
///
/// # Errors
///
/// Returns [`StoreError`] when a fetch fails.
pub async fn seed_account(
    store: &Store,
    registry: &RefreshRegistry,
    account_id: &str,
) -> Result<Option<Mailbox>, StoreError> {
    let Some(mailbox) = resolve_mailbox(store, account_id).await? else {
        return Ok(None);
    };
    let messages = store.fetch_messages(account_id, &mailbox.id).await?;
    registry.tracker(account_id, &mailbox.id).seed(&messages);
    Ok(Some(mailbox))
}
