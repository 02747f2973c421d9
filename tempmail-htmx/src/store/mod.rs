//! Client-side state cache
//!
//! [`Store`] mirrors the most recent fetch of each entity and owns the
//! [`SmtpDevClient`] built from the stored API key. Only the API key,
//! accounts and domains survive a restart; they are written as JSON to the
//! configured file and read back by [`Store::rehydrate`]. Each write goes
//! to its own temporary file that is then renamed over the target, and a
//! snapshot older than one already on disk is dropped.
//!
//! Locks are never held across an `.await`: network operations clone the
//! client out, await the call, then write the result back.

mod quick;

pub use quick::QuickAccount;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::{
    mask_key, sort_newest_first, Account, AccountCreate, AccountQuery, ApiError, CacheBust,
    ClientConfig, Collection, Domain, Mailbox, Message, MessageSummary, MessageUpdate,
    SmtpDevClient,
};
use crate::config::StoreSettings;

/// Store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// No API key has been stored
    #[error("No API key configured")]
    NotAuthenticated,

    /// Upstream call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Persisted file could not be read or written
    #[error("Store file {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Persisted file is not valid JSON
    #[error("Store file {path} is corrupt: {source}")]
    Corrupt {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
}

/// Fields written to disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Stored API key, empty when logged out
    #[serde(default)]
    pub api_key: String,
    /// Last fetched accounts
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// Last fetched domains
    #[serde(default)]
    pub domains: Vec<Domain>,
}

impl PersistedState {
    fn of(state: &StoreState) -> Self {
        Self {
            api_key: state.api_key.clone().unwrap_or_default(),
            accounts: state.accounts.clone(),
            domains: state.domains.clone(),
        }
    }
}

/// Orders writes of the persisted snapshot
#[derive(Debug)]
struct Persister {
    path: PathBuf,
    staged: AtomicU64,
    written: Mutex<u64>,
}

impl Persister {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            staged: AtomicU64::new(0),
            written: Mutex::new(0),
        }
    }

    fn write(&self, generation: u64, snapshot: &PersistedState) {
        let mut written = self.written.lock();
        if generation <= *written {
            debug!(generation, written = *written, "Skipping superseded store snapshot");
            return;
        }
        match write_json(&self.path, snapshot) {
            Ok(()) => *written = generation,
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to persist store"),
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    api_key: Option<String>,
    client: Option<SmtpDevClient>,
    accounts: Vec<Account>,
    domains: Vec<Domain>,
    current_account: Option<Account>,
    current_mailbox: Option<Mailbox>,
    messages: Vec<MessageSummary>,
    current_message: Option<Message>,
    quick_accounts: Vec<QuickAccount>,
    last_error: Option<String>,
}

/// Shared application state mirror
///
/// One store serves the whole process; wrap it in an `Arc` to share it.
#[derive(Debug)]
pub struct Store {
    state: RwLock<StoreState>,
    loading: AtomicUsize,
    client_config: ClientConfig,
    persister: Option<Arc<Persister>>,
}

/// Marks the store as loading until dropped
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Store {
    /// Empty store; `persist_path` of `None` keeps everything in memory
    #[must_use]
    pub fn new(client_config: ClientConfig, persist_path: Option<PathBuf>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            loading: AtomicUsize::new(0),
            client_config,
            persister: persist_path.map(|path| Arc::new(Persister::new(path))),
        }
    }

    /// Store honoring the persistence settings
    #[must_use]
    pub fn from_settings(client_config: ClientConfig, settings: &StoreSettings) -> Self {
        let path = settings.persist.then(|| settings.path.clone());
        Self::new(client_config, path)
    }

    /// Where state is persisted, if anywhere
    #[must_use]
    pub fn persist_path(&self) -> Option<&Path> {
        self.persister.as_deref().map(|p| p.path.as_path())
    }

    // ---- persistence ----

    /// Load persisted state and re-initialize the client from a stored key
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Corrupt`] when the file
    /// exists but cannot be used.
    pub fn rehydrate(&self) -> Result<(), StoreError> {
        let Some(path) = self.persist_path() else {
            return Ok(());
        };
        if !path.exists() {
            debug!(path = %path.display(), "No persisted store found");
            return Ok(());
        }

        let raw = std::fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let persisted: PersistedState =
            serde_json::from_slice(&raw).map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        let has_key = !persisted.api_key.trim().is_empty();
        {
            let mut state = self.state.write();
            state.api_key = has_key.then_some(persisted.api_key);
            state.accounts = persisted.accounts;
            state.domains = persisted.domains;
        }
        info!(path = %path.display(), has_key, "Store rehydrated");

        if has_key {
            if let Err(e) = self.initialize_client() {
                error!(error = %e, "Failed to initialize client from stored API key");
            }
        }
        Ok(())
    }

    /// Snapshot of the persisted fields
    #[must_use]
    pub fn persisted(&self) -> PersistedState {
        PersistedState::of(&self.state.read())
    }

    /// Snapshot numbered under the read lock, so numbering follows state order
    fn stage(&self) -> Option<(Arc<Persister>, u64, PersistedState)> {
        let persister = self.persister.as_ref()?;
        let state = self.state.read();
        let generation = persister.staged.fetch_add(1, Ordering::SeqCst) + 1;
        Some((Arc::clone(persister), generation, PersistedState::of(&state)))
    }

    /// Write the snapshot on the calling thread
    fn persist_now(&self) {
        if let Some((persister, generation, snapshot)) = self.stage() {
            persister.write(generation, &snapshot);
        }
    }

    /// Write the snapshot on the blocking pool
    async fn persist(&self) {
        let Some((persister, generation, snapshot)) = self.stage() else {
            return;
        };
        if let Err(e) =
            tokio::task::spawn_blocking(move || persister.write(generation, &snapshot)).await
        {
            warn!(error = %e, "Store persistence task failed");
        }
    }

    // ---- API key and client ----

    /// Build a client for `key` and store both
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] when the key is unusable; `last_error` is
    /// set and the previous key is kept.
    pub fn set_api_key(&self, key: &str) -> Result<SmtpDevClient, StoreError> {
        debug!(api_key = %mask_key(key), "Setting API key");
        match SmtpDevClient::new(key, self.client_config.clone()) {
            Ok(client) => {
                {
                    let mut state = self.state.write();
                    state.api_key = Some(key.trim().to_string());
                    state.client = Some(client.clone());
                    state.last_error = None;
                }
                info!("API client initialized");
                self.persist_now();
                Ok(client)
            }
            Err(e) => {
                error!(error = %e, "Failed to initialize API client");
                self.state.write().last_error = Some("Failed to initialize API client".to_string());
                Err(e.into())
            }
        }
    }

    /// Forget the key and every cached entity
    pub fn clear_api_key(&self) {
        info!("Clearing API key");
        *self.state.write() = StoreState::default();
        self.persist_now();
    }

    /// Stored key, if any
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.state.read().api_key.clone()
    }

    /// Whether a key is stored
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.read().api_key.is_some()
    }

    /// Client for the stored key, building it on first use
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAuthenticated`] without a stored key, or
    /// [`StoreError::Api`] if the stored key cannot build a client.
    pub fn initialize_client(&self) -> Result<SmtpDevClient, StoreError> {
        if let Some(client) = self.state.read().client.clone() {
            return Ok(client);
        }

        let Some(key) = self.api_key() else {
            debug!("No API key found, client not initialized");
            return Err(StoreError::NotAuthenticated);
        };
        let client = SmtpDevClient::new(&key, self.client_config.clone())?;
        self.state.write().client = Some(client.clone());
        debug!("Client initialized from stored API key");
        Ok(client)
    }

    // ---- status ----

    /// Whether any network operation is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    /// Message of the most recent failure
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    fn start(&self) -> Result<(SmtpDevClient, LoadingGuard<'_>), StoreError> {
        let client = self.initialize_client()?;
        let guard = LoadingGuard::new(&self.loading);
        self.state.write().last_error = None;
        Ok((client, guard))
    }

    fn fail(&self, message: &str, e: ApiError) -> StoreError {
        error!(error = %e, "{message}");
        self.state.write().last_error = Some(message.to_string());
        e.into()
    }

    // ---- fetches ----

    /// Fetch and store all domains
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on failure; the stored list is emptied.
    pub async fn fetch_domains(&self) -> Result<Vec<Domain>, StoreError> {
        let (client, _loading) = self.start()?;
        match client.domains().list(None, None).await {
            Ok(page) => {
                debug!(count = page.member.len(), "Domains fetched");
                self.state.write().domains.clone_from(&page.member);
                self.persist().await;
                Ok(page.member)
            }
            Err(e) => {
                self.state.write().domains.clear();
                Err(self.fail("Failed to fetch domains", e))
            }
        }
    }

    /// Fetch and store the first page of accounts
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on failure; the stored list is emptied.
    pub async fn fetch_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.fetch_accounts_page(&AccountQuery::default())
            .await
            .map(|page| page.member)
    }

    /// Fetch one filtered page of accounts and store its members
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on failure; the stored list is emptied.
    pub async fn fetch_accounts_page(
        &self,
        query: &AccountQuery,
    ) -> Result<Collection<Account>, StoreError> {
        let (client, _loading) = self.start()?;
        match client.accounts().list(query).await {
            Ok(page) => {
                debug!(count = page.member.len(), total = page.total_items, "Accounts fetched");
                self.state.write().accounts.clone_from(&page.member);
                self.persist().await;
                Ok(page)
            }
            Err(e) => {
                self.state.write().accounts.clear();
                Err(self.fail("Failed to fetch accounts", e))
            }
        }
    }

    /// Fetch one account; nothing is stored
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on failure.
    pub async fn fetch_account(&self, account_id: &str) -> Result<Account, StoreError> {
        let (client, _loading) = self.start()?;
        client
            .accounts()
            .get(account_id)
            .await
            .map_err(|e| self.fail("Failed to fetch account", e))
    }

    /// Fetch the mailboxes of an account; nothing is stored
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on failure.
    pub async fn fetch_mailboxes(&self, account_id: &str) -> Result<Vec<Mailbox>, StoreError> {
        let (client, _loading) = self.start()?;
        match client.mailboxes(account_id).list(None).await {
            Ok(page) => {
                debug!(account_id, count = page.member.len(), "Mailboxes fetched");
                Ok(page.member)
            }
            Err(e) => Err(self.fail("Failed to fetch mailboxes", e)),
        }
    }

    /// Fetch, sort newest first, and store the messages of a mailbox
    ///
    /// The listing always bypasses caches.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on failure.
    pub async fn fetch_messages(
        &self,
        account_id: &str,
        mailbox_id: &str,
    ) -> Result<Vec<MessageSummary>, StoreError> {
        let (client, _loading) = self.start()?;
        match client
            .messages(account_id, mailbox_id)
            .list(Some(1), CacheBust::Now)
            .await
        {
            Ok(page) => {
                let mut messages = page.member;
                sort_newest_first(&mut messages);
                debug!(account_id, mailbox_id, count = messages.len(), "Messages fetched");
                self.state.write().messages.clone_from(&messages);
                Ok(messages)
            }
            Err(e) => Err(self.fail("Failed to fetch messages", e)),
        }
    }

    /// Fetch one message and store it as the current message
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on failure.
    pub async fn fetch_message(
        &self,
        account_id: &str,
        mailbox_id: &str,
        message_id: &str,
    ) -> Result<Message, StoreError> {
        let (client, _loading) = self.start()?;
        match client.messages(account_id, mailbox_id).get(message_id).await {
            Ok(message) => {
                self.state.write().current_message = Some(message.clone());
                Ok(message)
            }
            Err(e) => Err(self.fail("Failed to fetch message details", e)),
        }
    }

    // ---- mutations ----

    /// Create an account, then refresh the account list
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when creation fails. A failing refresh
    /// afterwards is only recorded in `last_error`.
    pub async fn create_account(
        &self,
        address: &str,
        password: &str,
        is_active: Option<bool>,
    ) -> Result<Account, StoreError> {
        let created = {
            let (client, _loading) = self.start()?;
            client
                .accounts()
                .create(&AccountCreate {
                    address: address.to_string(),
                    password: password.to_string(),
                    is_active,
                })
                .await
                .map_err(|e| self.fail("Failed to create account", e))?
        };
        info!(account_id = %created.id, address = %created.address, "Account created");

        if let Err(e) = self.fetch_accounts().await {
            warn!(error = %e, "Account list refresh failed after create");
        }
        Ok(created)
    }

    /// Delete an account, then refresh the account list
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails.
    pub async fn delete_account(&self, account_id: &str) -> Result<(), StoreError> {
        {
            let (client, _loading) = self.start()?;
            client
                .accounts()
                .delete(account_id)
                .await
                .map_err(|e| self.fail("Failed to delete account", e))?;
        }
        info!(account_id, "Account deleted");

        {
            let mut state = self.state.write();
            if state
                .current_account
                .as_ref()
                .is_some_and(|a| a.id == account_id)
            {
                state.current_account = None;
                state.current_mailbox = None;
                state.messages.clear();
                state.current_message = None;
            }
            state.quick_accounts.retain(|q| q.id != account_id);
        }

        if let Err(e) = self.fetch_accounts().await {
            warn!(error = %e, "Account list refresh failed after delete");
        }
        Ok(())
    }

    /// Mark a message read upstream, then flag the local copies
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn mark_message_as_read(&self, account_id: &str, mailbox_id: &str, message_id: &str) {
        let client = match self.initialize_client() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Cannot mark message as read");
                return;
            }
        };

        match client
            .messages(account_id, mailbox_id)
            .update(message_id, &MessageUpdate::read())
            .await
        {
            Ok(_) => {
                let mut state = self.state.write();
                for message in state.messages.iter_mut().filter(|m| m.id == message_id) {
                    message.is_read = true;
                }
                if let Some(current) = state
                    .current_message
                    .as_mut()
                    .filter(|m| m.summary.id == message_id)
                {
                    current.summary.is_read = true;
                }
                debug!(message_id, "Message marked as read");
            }
            Err(e) => warn!(message_id, error = %e, "Failed to mark message as read"),
        }
    }

    /// Delete a message upstream and drop it from the local list
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on failure.
    pub async fn delete_message(
        &self,
        account_id: &str,
        mailbox_id: &str,
        message_id: &str,
    ) -> Result<(), StoreError> {
        let (client, _loading) = self.start()?;
        client
            .messages(account_id, mailbox_id)
            .delete(message_id)
            .await
            .map_err(|e| self.fail("Failed to delete message", e))?;

        let mut state = self.state.write();
        state.messages.retain(|m| m.id != message_id);
        if state
            .current_message
            .as_ref()
            .is_some_and(|m| m.summary.id == message_id)
        {
            state.current_message = None;
        }
        info!(message_id, "Message deleted");
        Ok(())
    }

    // ---- selection ----

    /// Select an account; clears the message list and current message
    pub fn set_current_account(&self, account: Option<Account>) {
        let mut state = self.state.write();
        state.current_account = account;
        state.messages.clear();
        state.current_message = None;
    }

    /// Select a mailbox; clears the message list and current message
    pub fn set_current_mailbox(&self, mailbox: Option<Mailbox>) {
        let mut state = self.state.write();
        state.current_mailbox = mailbox;
        state.messages.clear();
        state.current_message = None;
    }

    /// Replace the current message
    pub fn set_current_message(&self, message: Option<Message>) {
        self.state.write().current_message = message;
    }

    /// Replace the message list
    pub fn set_messages(&self, messages: Vec<MessageSummary>) {
        self.state.write().messages = messages;
    }

    // ---- accessors ----

    /// Cached accounts
    #[must_use]
    pub fn accounts(&self) -> Vec<Account> {
        self.state.read().accounts.clone()
    }

    /// Cached domains
    #[must_use]
    pub fn domains(&self) -> Vec<Domain> {
        self.state.read().domains.clone()
    }

    /// Selected account
    #[must_use]
    pub fn current_account(&self) -> Option<Account> {
        self.state.read().current_account.clone()
    }

    /// Selected mailbox
    #[must_use]
    pub fn current_mailbox(&self) -> Option<Mailbox> {
        self.state.read().current_mailbox.clone()
    }

    /// Cached message list, newest first
    #[must_use]
    pub fn messages(&self) -> Vec<MessageSummary> {
        self.state.read().messages.clone()
    }

    /// Message opened last
    #[must_use]
    pub fn current_message(&self) -> Option<Message> {
        self.state.read().current_message.clone()
    }
}

fn write_json(path: &Path, persisted: &PersistedState) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_vec_pretty(persisted).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&json).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
