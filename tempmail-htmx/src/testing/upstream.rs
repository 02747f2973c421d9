//! In-process smtp.dev stand-in
//!
//! Serves the REST surface the client uses from memory. Accounts are
//! listed as a bare array, everything else as a Hydra collection, which
//! mirrors what the live API does.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::api::{
    Account, Attachment, ClientConfig, Collection, Domain, EmailAddress, Mailbox, Message,
    MessageSummary, SmtpDevClient, API_KEY_HEADER,
};

/// Key accepted by [`MockUpstream`]
pub const TEST_API_KEY: &str = "smtplabs_test";

/// Domain every mock starts with
pub const SEED_DOMAIN: &str = "mock.test";

struct StoredMessage {
    account_id: String,
    mailbox_id: String,
    message: Message,
    raw: String,
}

#[derive(Default)]
struct MockState {
    seq: u64,
    domains: Vec<Domain>,
    accounts: Vec<Account>,
    mailboxes: Vec<(String, Mailbox)>,
    messages: Vec<StoredMessage>,
    last_query: HashMap<String, String>,
    fail_remaining: u32,
    requests: u64,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.seq += 1;
        format!("{prefix}-{}", self.seq)
    }

    fn timestamp(&self) -> String {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default();
        let seconds = i64::try_from(self.seq).unwrap_or(0);
        (base + Duration::seconds(seconds)).to_rfc3339()
    }

    fn insert_domain(&mut self, name: &str, active: bool) -> String {
        let id = self.next_id("dom");
        let now = self.timestamp();
        self.domains.push(Domain {
            id: id.clone(),
            domain: name.to_string(),
            is_active: active,
            created_at: now.clone(),
            updated_at: now,
        });
        id
    }

    fn insert_account(&mut self, address: &str, active: bool) -> (String, String) {
        let id = self.next_id("acc");
        let now = self.timestamp();
        self.accounts.push(Account {
            id: id.clone(),
            address: address.to_string(),
            quota: 40_000_000,
            used: 0,
            is_active: active,
            is_deleted: false,
            mailboxes: None,
            created_at: now.clone(),
            updated_at: now,
        });
        let inbox = self.insert_mailbox(&id, "INBOX", true);
        (id, inbox)
    }

    fn insert_mailbox(&mut self, account_id: &str, path: &str, system: bool) -> String {
        let id = self.next_id("mb");
        let now = self.timestamp();
        self.mailboxes.push((
            account_id.to_string(),
            Mailbox {
                id: id.clone(),
                path: path.to_string(),
                is_system: Some(system),
                auto_delete_enabled: None,
                auto_delete_seconds: None,
                total_messages: 0,
                total_unread_messages: 0,
                account: Some(format!("/accounts/{account_id}")),
                created_at: Some(now.clone()),
                updated_at: Some(now),
            },
        ));
        id
    }

    fn mailbox_view(&self, mailbox: &Mailbox) -> Mailbox {
        let mut view = mailbox.clone();
        let held = self.messages.iter().filter(|m| m.mailbox_id == mailbox.id);
        view.total_messages = held.clone().count() as u64;
        view.total_unread_messages = held.filter(|m| !m.message.summary.is_read).count() as u64;
        view
    }

    fn account_mailboxes(&self, account_id: &str) -> Vec<Mailbox> {
        self.mailboxes
            .iter()
            .filter(|(owner, _)| owner == account_id)
            .map(|(_, mailbox)| self.mailbox_view(mailbox))
            .collect()
    }

    fn has_mailbox(&self, account_id: &str, mailbox_id: &str) -> bool {
        self.mailboxes
            .iter()
            .any(|(owner, m)| owner == account_id && m.id == mailbox_id)
    }

    fn find_message(&mut self, account_id: &str, mailbox_id: &str, id: &str) -> Option<&mut StoredMessage> {
        self.messages.iter_mut().find(|m| {
            m.account_id == account_id && m.mailbox_id == mailbox_id && m.message.summary.id == id
        })
    }

    fn insert_message(&mut self, account_id: &str, mailbox_id: &str, subject: &str, raw_only: Option<&str>) -> String {
        let id = self.next_id("msg");
        let now = self.timestamp();
        let to = self
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .map(|a| a.address.clone())
            .unwrap_or_default();
        let base = format!("/accounts/{account_id}/mailboxes/{mailbox_id}/messages/{id}");

        let (text, html, attachments, source_url, raw) = match raw_only {
            Some(raw) => (
                String::new(),
                Vec::new(),
                Vec::new(),
                Some(format!("{base}/source")),
                raw.to_string(),
            ),
            None => (
                format!("Body of {subject}"),
                vec![format!("<p>{subject}</p>")],
                vec![Attachment {
                    id: "att1".to_string(),
                    filename: "notes.txt".to_string(),
                    content_type: "text/plain".to_string(),
                    disposition: "attachment".to_string(),
                    transfer_encoding: "base64".to_string(),
                    related: false,
                    size: 16,
                    download_url: format!("{base}/attachment/att1"),
                }],
                None,
                format!("Subject: {subject}\r\n\r\nBody of {subject}"),
            ),
        };

        let summary = MessageSummary {
            id: id.clone(),
            msgid: format!("<{id}@mock.test>"),
            from: EmailAddress {
                name: Some("Sender".to_string()),
                address: "sender@example.org".to_string(),
            },
            to: vec![EmailAddress {
                name: None,
                address: to,
            }],
            subject: subject.to_string(),
            intro: Some(format!("Body of {subject}")),
            is_read: false,
            is_flagged: false,
            has_attachments: !attachments.is_empty(),
            size: raw.len() as u64,
            download_url: format!("{base}/download"),
            created_at: now.clone(),
            updated_at: now,
        };

        self.messages.push(StoredMessage {
            account_id: account_id.to_string(),
            mailbox_id: mailbox_id.to_string(),
            message: Message {
                summary,
                cc: Vec::new(),
                bcc: Vec::new(),
                verifications: Vec::new(),
                auto_delete_enabled: None,
                expires_at: None,
                text,
                html,
                attachments,
                source_url,
            },
            raw,
        });
        id
    }
}

type Shared = Arc<Mutex<MockState>>;

/// Running mock API
///
/// Dropping the handle leaves the server task running until the test
/// runtime shuts down.
#[derive(Clone)]
pub struct MockUpstream {
    addr: SocketAddr,
    state: Shared,
}

impl MockUpstream {
    /// Bind an ephemeral port and start serving, seeded with [`SEED_DOMAIN`]
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let mut seeded = MockState::default();
        seeded.insert_domain(SEED_DOMAIN, true);
        let state: Shared = Arc::new(Mutex::new(seeded));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock upstream");
        let addr = listener.local_addr().expect("mock upstream address");
        let app = router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// `http://127.0.0.1:{port}`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client settings pointing at this mock
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default().with_base_url(self.base_url())
    }

    /// Client authenticated with [`TEST_API_KEY`]
    ///
    /// # Panics
    ///
    /// Never in practice; the test key is a valid header value.
    pub fn client(&self) -> SmtpDevClient {
        SmtpDevClient::new(TEST_API_KEY, self.client_config()).expect("mock client")
    }

    /// Register a domain, returning its ID
    pub fn add_domain(&self, name: &str, active: bool) -> String {
        self.state.lock().insert_domain(name, active)
    }

    /// Create an active account with an INBOX, returning its ID
    pub fn add_account(&self, address: &str) -> String {
        self.state.lock().insert_account(address, true).0
    }

    /// Create an active account, returning `(account_id, inbox_id)`
    pub fn add_account_with_inbox(&self, address: &str) -> (String, String) {
        self.state.lock().insert_account(address, true)
    }

    /// Drop a message into a mailbox, returning its ID
    ///
    /// The message has a text body, an HTML body and one attachment `att1`.
    pub fn deliver(&self, account_id: &str, mailbox_id: &str, subject: &str) -> String {
        self.state
            .lock()
            .insert_message(account_id, mailbox_id, subject, None)
    }

    /// Drop a message whose body is only reachable through its source
    pub fn deliver_raw_only(&self, account_id: &str, mailbox_id: &str, raw: &str) -> String {
        self.state
            .lock()
            .insert_message(account_id, mailbox_id, "", Some(raw))
    }

    /// Value of `name` on the most recent message listing
    pub fn last_query(&self, name: &str) -> Option<String> {
        self.state.lock().last_query.get(name).cloned()
    }

    /// Answer the next `count` requests with `500`
    pub fn fail_next(&self, count: u32) {
        self.state.lock().fail_remaining = count;
    }

    /// Requests served so far, including rejected ones
    pub fn request_count(&self) -> u64 {
        self.state.lock().requests
    }

    /// Read flag of a stored message
    pub fn is_read(&self, message_id: &str) -> Option<bool> {
        self.state
            .lock()
            .messages
            .iter()
            .find(|m| m.message.summary.id == message_id)
            .map(|m| m.message.summary.is_read)
    }

    /// Whether an account with this ID exists
    pub fn has_account(&self, account_id: &str) -> bool {
        self.state.lock().accounts.iter().any(|a| a.id == account_id)
    }

    /// Addresses of all accounts, in creation order
    pub fn account_addresses(&self) -> Vec<String> {
        self.state
            .lock()
            .accounts
            .iter()
            .map(|a| a.address.clone())
            .collect()
    }
}

fn router(state: Shared) -> Router {
    let message = "/accounts/{account}/mailboxes/{mailbox}/messages/{message}";
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/{account}",
            get(get_account).patch(update_account).delete(delete_account),
        )
        .route(
            "/accounts/{account}/mailboxes",
            get(list_mailboxes).post(create_mailbox),
        )
        .route(
            "/accounts/{account}/mailboxes/{mailbox}",
            get(get_mailbox).patch(update_mailbox).delete(delete_mailbox),
        )
        .route(
            "/accounts/{account}/mailboxes/{mailbox}/messages",
            get(list_messages),
        )
        .route(
            message,
            get(get_message).patch(update_message).delete(delete_message),
        )
        .route(&format!("{message}/source"), get(message_source))
        .route(&format!("{message}/download"), get(download_message))
        .route(
            &format!("{message}/attachment/{{attachment}}"),
            get(download_attachment),
        )
        .route(&format!("{message}/move"), put(move_message))
        .route("/domains", get(list_domains).post(create_domain))
        .route(
            "/domains/{domain}",
            get(get_domain).patch(update_domain).delete(delete_domain),
        )
        .layer(middleware::from_fn_with_state(state.clone(), gate))
        .with_state(state)
}

async fn gate(State(state): State<Shared>, request: Request, next: Next) -> Response {
    {
        let mut guard = state.lock();
        guard.requests += 1;
        if guard.fail_remaining > 0 {
            guard.fail_remaining -= 1;
            return (StatusCode::INTERNAL_SERVER_ERROR, "injected failure").into_response();
        }
    }

    let authorized = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        == Some(TEST_API_KEY);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid API key" })),
        )
            .into_response();
    }

    next.run(request).await
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" }))).into_response()
}

fn unprocessable(detail: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "detail": detail })),
    )
        .into_response()
}

fn parse(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

fn hydra<T: serde::Serialize>(items: Vec<T>) -> Response {
    Json(Collection::from_vec(items)).into_response()
}

async fn list_accounts(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let guard = state.lock();
    let accounts: Vec<Account> = guard
        .accounts
        .iter()
        .filter(|a| query.get("address").is_none_or(|addr| &a.address == addr))
        .filter(|a| {
            query
                .get("isActive")
                .is_none_or(|active| a.is_active.to_string() == *active)
        })
        .cloned()
        .collect();
    Json(accounts).into_response()
}

async fn create_account(State(state): State<Shared>, body: Bytes) -> Response {
    let body = parse(&body);
    let address = body["address"].as_str().unwrap_or_default().to_string();
    let active = body["isActive"].as_bool().unwrap_or(true);

    let mut guard = state.lock();
    let Some((_, domain)) = address.split_once('@') else {
        return unprocessable("address: This value is not a valid email address.");
    };
    if !guard.domains.iter().any(|d| d.domain == domain && d.is_active) {
        return unprocessable("address: The domain is not available.");
    }
    if guard.accounts.iter().any(|a| a.address == address) {
        return unprocessable("address: This value is already used.");
    }
    let (id, _) = guard.insert_account(&address, active);
    let account = guard.accounts.iter().find(|a| a.id == id).cloned();
    (StatusCode::CREATED, Json(account)).into_response()
}

async fn get_account(State(state): State<Shared>, Path(account): Path<String>) -> Response {
    let guard = state.lock();
    match guard.accounts.iter().find(|a| a.id == account) {
        Some(found) => {
            let mut view = found.clone();
            view.mailboxes = Some(guard.account_mailboxes(&account));
            Json(view).into_response()
        }
        None => not_found(),
    }
}

async fn update_account(
    State(state): State<Shared>,
    Path(account): Path<String>,
    body: Bytes,
) -> Response {
    let body = parse(&body);
    let mut guard = state.lock();
    match guard.accounts.iter_mut().find(|a| a.id == account) {
        Some(found) => {
            if let Some(active) = body["isActive"].as_bool() {
                found.is_active = active;
            }
            Json(found.clone()).into_response()
        }
        None => not_found(),
    }
}

async fn delete_account(State(state): State<Shared>, Path(account): Path<String>) -> Response {
    let mut guard = state.lock();
    let before = guard.accounts.len();
    guard.accounts.retain(|a| a.id != account);
    if guard.accounts.len() == before {
        return not_found();
    }
    guard.mailboxes.retain(|(owner, _)| *owner != account);
    guard.messages.retain(|m| m.account_id != account);
    StatusCode::NO_CONTENT.into_response()
}

async fn list_mailboxes(State(state): State<Shared>, Path(account): Path<String>) -> Response {
    let guard = state.lock();
    if !guard.accounts.iter().any(|a| a.id == account) {
        return not_found();
    }
    hydra(guard.account_mailboxes(&account))
}

async fn create_mailbox(
    State(state): State<Shared>,
    Path(account): Path<String>,
    body: Bytes,
) -> Response {
    let body = parse(&body);
    let path = body["path"].as_str().unwrap_or_default().trim().to_string();
    let mut guard = state.lock();
    if !guard.accounts.iter().any(|a| a.id == account) {
        return not_found();
    }
    if path.is_empty() {
        return unprocessable("path: This value should not be blank.");
    }
    let id = guard.insert_mailbox(&account, &path, false);
    let created = guard
        .mailboxes
        .iter()
        .find(|(_, m)| m.id == id)
        .map(|(_, m)| m.clone());
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn get_mailbox(
    State(state): State<Shared>,
    Path((account, mailbox)): Path<(String, String)>,
) -> Response {
    let guard = state.lock();
    guard
        .mailboxes
        .iter()
        .find(|(owner, m)| *owner == account && m.id == mailbox)
        .map_or_else(not_found, |(_, m)| Json(guard.mailbox_view(m)).into_response())
}

async fn update_mailbox(
    State(state): State<Shared>,
    Path((account, mailbox)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let body = parse(&body);
    let mut guard = state.lock();
    match guard
        .mailboxes
        .iter_mut()
        .find(|(owner, m)| *owner == account && m.id == mailbox)
    {
        Some((_, found)) => {
            if let Some(path) = body["path"].as_str() {
                found.path = path.to_string();
            }
            Json(found.clone()).into_response()
        }
        None => not_found(),
    }
}

async fn delete_mailbox(
    State(state): State<Shared>,
    Path((account, mailbox)): Path<(String, String)>,
) -> Response {
    let mut guard = state.lock();
    if !guard.has_mailbox(&account, &mailbox) {
        return not_found();
    }
    guard
        .mailboxes
        .retain(|(owner, m)| !(*owner == account && m.id == mailbox));
    guard.messages.retain(|m| m.mailbox_id != mailbox);
    StatusCode::NO_CONTENT.into_response()
}

async fn list_messages(
    State(state): State<Shared>,
    Path((account, mailbox)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut guard = state.lock();
    guard.last_query = query;
    if !guard.has_mailbox(&account, &mailbox) {
        return not_found();
    }
    let mut summaries: Vec<MessageSummary> = guard
        .messages
        .iter()
        .filter(|m| m.account_id == account && m.mailbox_id == mailbox)
        .map(|m| m.message.summary.clone())
        .collect();
    summaries.reverse();
    hydra(summaries)
}

async fn get_message(
    State(state): State<Shared>,
    Path((account, mailbox, message)): Path<(String, String, String)>,
) -> Response {
    let mut guard = state.lock();
    guard
        .find_message(&account, &mailbox, &message)
        .map_or_else(not_found, |m| Json(m.message.clone()).into_response())
}

async fn update_message(
    State(state): State<Shared>,
    Path((account, mailbox, message)): Path<(String, String, String)>,
    body: Bytes,
) -> Response {
    let body = parse(&body);
    let mut guard = state.lock();
    match guard.find_message(&account, &mailbox, &message) {
        Some(found) => {
            if let Some(read) = body["isRead"].as_bool() {
                found.message.summary.is_read = read;
            }
            if let Some(flagged) = body["isFlagged"].as_bool() {
                found.message.summary.is_flagged = flagged;
            }
            Json(found.message.clone()).into_response()
        }
        None => not_found(),
    }
}

async fn delete_message(
    State(state): State<Shared>,
    Path((account, mailbox, message)): Path<(String, String, String)>,
) -> Response {
    let mut guard = state.lock();
    let before = guard.messages.len();
    guard.messages.retain(|m| {
        !(m.account_id == account && m.mailbox_id == mailbox && m.message.summary.id == message)
    });
    if guard.messages.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn message_source(
    State(state): State<Shared>,
    Path((account, mailbox, message)): Path<(String, String, String)>,
) -> Response {
    let mut guard = state.lock();
    guard
        .find_message(&account, &mailbox, &message)
        .map_or_else(not_found, |m| {
            Json(json!({ "id": message, "raw": m.raw })).into_response()
        })
}

async fn download_message(
    State(state): State<Shared>,
    Path((account, mailbox, message)): Path<(String, String, String)>,
) -> Response {
    let mut guard = state.lock();
    guard
        .find_message(&account, &mailbox, &message)
        .map_or_else(not_found, |m| {
            ([(header::CONTENT_TYPE, "message/rfc822")], m.raw.clone()).into_response()
        })
}

async fn download_attachment(
    State(state): State<Shared>,
    Path((account, mailbox, message, attachment)): Path<(String, String, String, String)>,
) -> Response {
    let mut guard = state.lock();
    match guard.find_message(&account, &mailbox, &message) {
        Some(m) if m.message.attachments.iter().any(|a| a.id == attachment) => (
            [(header::CONTENT_TYPE, "text/plain")],
            &b"attachment-bytes"[..],
        )
            .into_response(),
        _ => not_found(),
    }
}

async fn move_message(
    State(state): State<Shared>,
    Path((account, mailbox, message)): Path<(String, String, String)>,
    body: Bytes,
) -> Response {
    let body = parse(&body);
    let target = body["mailbox"].as_str().unwrap_or_default().to_string();
    let mut guard = state.lock();
    if !guard.has_mailbox(&account, &target) {
        return unprocessable("mailbox: Target mailbox does not exist.");
    }
    match guard.find_message(&account, &mailbox, &message) {
        Some(found) => {
            found.mailbox_id.clone_from(&target);
            Json(json!({ "id": message, "mailbox": target })).into_response()
        }
        None => not_found(),
    }
}

async fn list_domains(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let guard = state.lock();
    let domains: Vec<Domain> = guard
        .domains
        .iter()
        .filter(|d| {
            query
                .get("isActive")
                .is_none_or(|active| d.is_active.to_string() == *active)
        })
        .cloned()
        .collect();
    hydra(domains)
}

async fn create_domain(State(state): State<Shared>, body: Bytes) -> Response {
    let body = parse(&body);
    let name = body["domain"].as_str().unwrap_or_default().trim().to_string();
    let active = body["isActive"].as_bool().unwrap_or(false);
    let mut guard = state.lock();
    if name.is_empty() || !name.contains('.') {
        return unprocessable("domain: This value is not a valid hostname.");
    }
    if guard.domains.iter().any(|d| d.domain == name) {
        return unprocessable("domain: This value is already used.");
    }
    let id = guard.insert_domain(&name, active);
    let created = guard.domains.iter().find(|d| d.id == id).cloned();
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn get_domain(State(state): State<Shared>, Path(domain): Path<String>) -> Response {
    let guard = state.lock();
    guard
        .domains
        .iter()
        .find(|d| d.id == domain)
        .map_or_else(not_found, |d| Json(d.clone()).into_response())
}

async fn update_domain(
    State(state): State<Shared>,
    Path(domain): Path<String>,
    body: Bytes,
) -> Response {
    let body = parse(&body);
    let mut guard = state.lock();
    match guard.domains.iter_mut().find(|d| d.id == domain) {
        Some(found) => {
            if let Some(active) = body["isActive"].as_bool() {
                found.is_active = active;
            }
            Json(found.clone()).into_response()
        }
        None => not_found(),
    }
}

async fn delete_domain(State(state): State<Shared>, Path(domain): Path<String>) -> Response {
    let mut guard = state.lock();
    let before = guard.domains.len();
    guard.domains.retain(|d| d.id != domain);
    if guard.domains.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}
