//! Quick-mail accounts
//!
//! Accounts created from the quick-mail page, kept in memory only. Their
//! passwords exist nowhere else, so they are never persisted.

use serde::Serialize;
use tracing::debug;

use super::Store;
use crate::api::{pick_inbox, Mailbox};

/// An account created through quick mail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickAccount {
    /// Account ID
    pub id: String,
    /// Email address
    pub address: String,
    /// Password chosen at creation
    pub password: String,
    /// Whether this is the selected account
    pub selected: bool,
    /// Mailboxes, once loaded
    pub mailboxes: Option<Vec<Mailbox>>,
    /// Mailbox shown in the panel
    pub current_mailbox: Option<Mailbox>,
}

impl QuickAccount {
    /// Fresh, unselected account without loaded mailboxes
    #[must_use]
    pub fn new(id: impl Into<String>, address: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            password: password.into(),
            selected: false,
            mailboxes: None,
            current_mailbox: None,
        }
    }

    /// Record loaded mailboxes and open the inbox
    ///
    /// An empty list leaves the current mailbox untouched.
    pub fn set_mailboxes(&mut self, mailboxes: Vec<Mailbox>) {
        if let Some(inbox) = pick_inbox(&mailboxes) {
            self.current_mailbox = Some(inbox.clone());
        }
        self.mailboxes = Some(mailboxes);
    }
}

impl Store {
    /// Quick-mail accounts in creation order
    #[must_use]
    pub fn quick_accounts(&self) -> Vec<QuickAccount> {
        self.state.read().quick_accounts.clone()
    }

    /// One quick-mail account
    #[must_use]
    pub fn quick_account(&self, id: &str) -> Option<QuickAccount> {
        self.state
            .read()
            .quick_accounts
            .iter()
            .find(|q| q.id == id)
            .cloned()
    }

    /// The selected quick-mail account
    #[must_use]
    pub fn selected_quick_account(&self) -> Option<QuickAccount> {
        self.state
            .read()
            .quick_accounts
            .iter()
            .find(|q| q.selected)
            .cloned()
    }

    /// Append an account and select it
    pub fn add_quick_account(&self, mut account: QuickAccount) {
        debug!(account_id = %account.id, address = %account.address, "Adding quick account");
        let mut state = self.state.write();
        for existing in &mut state.quick_accounts {
            existing.selected = false;
        }
        account.selected = true;
        state.quick_accounts.push(account);
    }

    /// Select one account and deselect the rest
    ///
    /// Returns the selected account, or `None` if the ID is unknown, in
    /// which case the selection is unchanged.
    pub fn select_quick_account(&self, id: &str) -> Option<QuickAccount> {
        let mut state = self.state.write();
        if !state.quick_accounts.iter().any(|q| q.id == id) {
            return None;
        }
        for account in &mut state.quick_accounts {
            account.selected = account.id == id;
        }
        state.quick_accounts.iter().find(|q| q.id == id).cloned()
    }

    /// Apply `update` to one account, returning the updated copy
    pub fn update_quick_account(
        &self,
        id: &str,
        update: impl FnOnce(&mut QuickAccount),
    ) -> Option<QuickAccount> {
        let mut state = self.state.write();
        let account = state.quick_accounts.iter_mut().find(|q| q.id == id)?;
        update(account);
        Some(account.clone())
    }
}
