//! Quick mail: disposable accounts with a live inbox
//!
//! The browser owns the timer. The mailbox panel carries three hidden
//! pollers posting to `/quick/refresh`: one every `interval` seconds while
//! the page is visible, one on `visibilitychange` and one on window focus.
//! The refresh button posts with `trigger=manual`. The server owns the
//! in-flight guard, the manual cooldown and the known-message diff.

use std::sync::Arc;

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use super::client;
use super::views::{MessageDetailTemplate, MessageListTemplate, MessageRow};
use crate::credentials::{random_password, random_username};
use crate::error::AppError;
use crate::htmx::{HxPartial, HxSwapOob, SwapStrategy, TOASTS_TARGET};
use crate::refresh::{
    run_refresh, seed_account, NoticeLevel, RefreshOutcome, RefreshTracker, RefreshTrigger,
};
use crate::state::AppState;
use crate::store::QuickAccount;
use crate::template::{render_notice, render_toast, HxTemplate};

const MESSAGE_VIEW: &str = "#quick-message-view";
const STATUS_TARGET: &str = "quick-status";
const FORM_TARGET: &str = "quick-form";

/// Option of the domain selector
#[derive(Debug, Clone)]
pub struct DomainOption {
    /// Domain name
    pub name: String,
    /// Preselected
    pub selected: bool,
}

/// Credential form fragment
#[derive(Template)]
#[template(path = "partials/quick_form.html")]
pub struct QuickFormTemplate {
    /// Selectable domains; the first is preselected
    pub domains: Vec<DomainOption>,
    /// Username field
    pub username: String,
    /// Password field
    pub password: String,
    /// Fields are typed by hand instead of generated
    pub manual: bool,
}

impl QuickFormTemplate {
    fn new(state: &AppState, manual: bool) -> Self {
        let settings = &state.config().quick_mail;
        let (username, password) = if manual {
            (String::new(), String::new())
        } else {
            (
                random_username(settings.username_length),
                random_password(settings.password_length),
            )
        };
        Self {
            domains: state
                .store()
                .domains()
                .into_iter()
                .enumerate()
                .map(|(i, d)| DomainOption {
                    name: d.domain,
                    selected: i == 0,
                })
                .collect(),
            username,
            password,
            manual,
        }
    }
}

/// Account entry in the quick-mail sidebar
#[derive(Debug, Clone)]
pub struct QuickRow {
    /// Account ID
    pub id: String,
    /// Address
    pub address: String,
    /// Shown in the panel
    pub selected: bool,
}

/// Mailbox option in the panel
#[derive(Debug, Clone)]
pub struct MailboxOption {
    /// Mailbox ID
    pub id: String,
    /// Path
    pub path: String,
    /// Unread count at load time
    pub unread: u64,
    /// Currently open
    pub selected: bool,
}

/// Mailbox panel of the selected account
#[derive(Debug, Clone)]
pub struct QuickPanel {
    /// Account ID
    pub account_id: String,
    /// Address
    pub address: String,
    /// Password chosen at creation
    pub password: String,
    /// Mailboxes
    pub mailboxes: Vec<MailboxOption>,
    /// Rendered message list
    pub message_list: String,
    /// Count, new messages and last refresh
    pub status: String,
    /// Mount the automatic pollers
    pub auto_refresh: bool,
    /// Poll interval in seconds
    pub interval_secs: u64,
}

/// Account list plus mailbox panel
#[derive(Template)]
#[template(path = "partials/quick_workspace.html")]
pub struct QuickWorkspaceTemplate {
    /// Sidebar
    pub accounts: Vec<QuickRow>,
    /// Panel of the selected account
    pub panel: Option<QuickPanel>,
}

/// `GET /quick`
#[derive(Template)]
#[template(path = "quick.html")]
pub struct QuickTemplate {
    /// Layout flag
    pub authenticated: bool,
    /// Credential form
    pub form: QuickFormTemplate,
    /// Accounts and panel
    pub workspace: QuickWorkspaceTemplate,
}

/// Credential form mode
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsQuery {
    /// Empty fields for manual entry
    #[serde(default)]
    pub manual: bool,
}

/// Quick account creation form
#[derive(Debug, Deserialize, Validate)]
pub struct QuickCreateForm {
    /// Local part of the address
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    /// Domain part of the address
    #[validate(length(min = 1, message = "Please select a domain"))]
    pub domain: String,
    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    /// Form mode, `true` for manual entry
    #[serde(default)]
    pub manual: Option<String>,
}

/// Mailbox switch form
#[derive(Debug, Deserialize)]
pub struct MailboxSelectForm {
    /// Mailbox to open
    pub mailbox_id: String,
}

/// Refresh request posted by the pollers and the button
#[derive(Debug, Deserialize)]
pub struct RefreshForm {
    /// Quick account to refresh
    pub account_id: String,
    /// What fired the request
    #[serde(default)]
    pub trigger: RefreshTrigger,
}

fn is_valid_local_part(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

fn status_line(total: usize, tracker: Option<&RefreshTracker>) -> String {
    let updated = tracker.and_then(RefreshTracker::last_refresh).map_or_else(
        || "never".to_string(),
        |t| t.format("%H:%M:%S UTC").to_string(),
    );
    match tracker.map_or(0, RefreshTracker::new_message_count) {
        0 => format!("{total} message(s), updated {updated}"),
        new => format!("{total} message(s), {new} new, updated {updated}"),
    }
}

fn message_rows(state: &AppState, account_id: &str) -> Vec<MessageRow> {
    state
        .store()
        .messages()
        .iter()
        .map(|m| MessageRow::new(m, format!("/quick/accounts/{account_id}/messages/{}", m.id)))
        .collect()
}

fn render_message_list(state: &AppState, account_id: &str) -> Result<String, AppError> {
    Ok(MessageListTemplate {
        messages: message_rows(state, account_id),
        view_target: MESSAGE_VIEW,
    }
    .render()?)
}

fn tracker_for(state: &AppState, account: &QuickAccount) -> Option<Arc<RefreshTracker>> {
    account
        .current_mailbox
        .as_ref()
        .map(|mailbox| state.refresh().tracker(&account.id, &mailbox.id))
}

fn workspace(state: &AppState) -> Result<QuickWorkspaceTemplate, AppError> {
    let accounts = state.store().quick_accounts();
    let panel = match accounts.iter().find(|a| a.selected) {
        Some(account) => {
            let open = account.current_mailbox.as_ref().map(|m| m.id.as_str());
            Some(QuickPanel {
                account_id: account.id.clone(),
                address: account.address.clone(),
                password: account.password.clone(),
                mailboxes: account
                    .mailboxes
                    .iter()
                    .flatten()
                    .map(|m| MailboxOption {
                        id: m.id.clone(),
                        path: m.path.clone(),
                        unread: m.total_unread_messages,
                        selected: open == Some(m.id.as_str()),
                    })
                    .collect(),
                message_list: render_message_list(state, &account.id)?,
                status: status_line(
                    state.store().messages().len(),
                    tracker_for(state, account).as_deref(),
                ),
                auto_refresh: state.config().refresh.auto_refresh,
                interval_secs: state.config().refresh.interval().as_secs(),
            })
        }
        None => None,
    };
    Ok(QuickWorkspaceTemplate {
        accounts: accounts
            .iter()
            .map(|a| QuickRow {
                id: a.id.clone(),
                address: a.address.clone(),
                selected: a.selected,
            })
            .collect(),
        panel,
    })
}

/// Load the open mailbox of `account` into the store
///
/// Mailboxes are resolved first when unknown. The tracker adopts whatever
/// is now displayed, so the next poll only announces later arrivals.
async fn load_mailbox(state: &AppState, account: &QuickAccount) -> Result<(), AppError> {
    let store = state.store();
    if account.mailboxes.is_none() {
        if seed_account(store, state.refresh(), &account.id).await?.is_none() {
            store.set_messages(Vec::new());
        }
        return Ok(());
    }

    match &account.current_mailbox {
        Some(mailbox) => {
            let messages = store.fetch_messages(&account.id, &mailbox.id).await?;
            state
                .refresh()
                .tracker(&account.id, &mailbox.id)
                .sync(&messages);
        }
        None => store.set_messages(Vec::new()),
    }
    Ok(())
}

fn workspace_response(state: &AppState) -> Result<Response, AppError> {
    Ok(workspace(state)?.render_html())
}

/// `GET /quick`
pub async fn page(
    State(state): State<AppState>,
    HxPartial(partial): HxPartial,
) -> Result<Response, AppError> {
    client(&state)?;
    let store = state.store();
    if let Err(e) = store.fetch_domains().await {
        warn!(error = %e, "Domains unavailable for quick mail");
    }
    if let Some(selected) = store.selected_quick_account() {
        if let Err(e) = load_mailbox(&state, &selected).await {
            warn!(account_id = %selected.id, error = %e, "Could not load quick mailbox");
        }
    }

    Ok(QuickTemplate {
        authenticated: true,
        form: QuickFormTemplate::new(&state, false),
        workspace: workspace(&state)?,
    }
    .render_htmx(partial))
}

/// `GET /quick/credentials`: fresh credential form
pub async fn credentials(
    State(state): State<AppState>,
    Query(query): Query<CredentialsQuery>,
) -> Result<Response, AppError> {
    client(&state)?;
    if state.store().domains().is_empty() {
        state.store().fetch_domains().await?;
    }
    Ok(QuickFormTemplate::new(&state, query.manual).render_html())
}

/// `POST /quick/accounts`: create, select and open the inbox
pub async fn create(
    State(state): State<AppState>,
    Form(form): Form<QuickCreateForm>,
) -> Result<Response, AppError> {
    client(&state)?;
    form.validate()?;
    let username = form.username.trim().to_lowercase();
    if !is_valid_local_part(&username) {
        return Err(AppError::BadRequest(
            "Username may only contain letters, digits, dots, dashes and underscores".to_string(),
        ));
    }
    let address = format!("{username}@{}", form.domain.trim());

    let store = state.store();
    let account = store
        .create_account(&address, &form.password, Some(true))
        .await?;
    info!(account_id = %account.id, address = %account.address, "Quick account created");
    store.add_quick_account(QuickAccount::new(
        &account.id,
        &account.address,
        &form.password,
    ));
    if let Err(e) = seed_account(store, state.refresh(), &account.id).await {
        warn!(account_id = %account.id, error = %e, "Initial mailbox load failed");
    }

    let manual = form.manual.as_deref() == Some("true");
    let mut response = HxSwapOob::with_primary(workspace(&state)?.render()?);
    response.add(
        FORM_TARGET,
        QuickFormTemplate::new(&state, manual).render()?,
        SwapStrategy::InnerHTML,
    );
    response.append(
        TOASTS_TARGET,
        render_toast(
            NoticeLevel::Success,
            &format!("Account {} created", account.address),
        ),
    );
    Ok(response.into_response())
}

/// `POST /quick/accounts/{id}/select`
pub async fn select(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Response, AppError> {
    client(&state)?;
    let account = state
        .store()
        .select_quick_account(&account_id)
        .ok_or_else(|| AppError::NotFound("Account".to_string()))?;
    load_mailbox(&state, &account).await?;
    workspace_response(&state)
}

/// `POST /quick/accounts/{id}/mailbox`: open another mailbox
pub async fn select_mailbox(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Form(form): Form<MailboxSelectForm>,
) -> Result<Response, AppError> {
    client(&state)?;
    let account = state
        .store()
        .update_quick_account(&account_id, |account| {
            if let Some(mailbox) = account
                .mailboxes
                .iter()
                .flatten()
                .find(|m| m.id == form.mailbox_id)
            {
                account.current_mailbox = Some(mailbox.clone());
            }
        })
        .ok_or_else(|| AppError::NotFound("Account".to_string()))?;
    if account.current_mailbox.as_ref().map(|m| m.id.as_str()) != Some(form.mailbox_id.as_str()) {
        return Err(AppError::NotFound("Mailbox".to_string()));
    }
    load_mailbox(&state, &account).await?;
    workspace_response(&state)
}

/// `GET /quick/accounts/{id}/messages/{message}`
///
/// Marks the message read and clears the new-message count.
pub async fn show_message(
    State(state): State<AppState>,
    Path((account_id, message_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    client(&state)?;
    let store = state.store();
    let account = store
        .quick_account(&account_id)
        .ok_or_else(|| AppError::NotFound("Account".to_string()))?;
    let mailbox = account
        .current_mailbox
        .clone()
        .ok_or_else(|| AppError::NotFound("Mailbox".to_string()))?;

    let message = store
        .fetch_message(&account_id, &mailbox.id, &message_id)
        .await?;
    if !message.summary.is_read {
        store
            .mark_message_as_read(&account_id, &mailbox.id, &message_id)
            .await;
    }
    let tracker = state.refresh().tracker(&account_id, &mailbox.id);
    tracker.acknowledge();

    let detail = MessageDetailTemplate::new(&message, &account_id, &mailbox.id).without_delete();
    let response = HxSwapOob::with_primary(detail.render()?).with(
        STATUS_TARGET,
        status_line(store.messages().len(), Some(&tracker)),
        SwapStrategy::InnerHTML,
    );
    Ok(response.into_response())
}

/// `POST /quick/refresh`: one pass of the refresh cycle
///
/// A completed pass swaps the message list into the poller's target and
/// updates the status line. Refused or failed passes swap nothing. Either
/// way a notice, if any, is appended as a toast.
pub async fn refresh(
    State(state): State<AppState>,
    Form(form): Form<RefreshForm>,
) -> Result<Response, AppError> {
    client(&state)?;
    let store = state.store();
    let report = run_refresh(store, state.refresh(), &form.account_id, form.trigger).await;

    let (mut response, swap) = match report.outcome {
        RefreshOutcome::Seeded { total } | RefreshOutcome::Updated { total, .. } => {
            let tracker = store
                .quick_account(&form.account_id)
                .and_then(|account| tracker_for(&state, &account));
            let oob = HxSwapOob::with_primary(render_message_list(&state, &form.account_id)?)
                .with(
                    STATUS_TARGET,
                    status_line(total, tracker.as_deref()),
                    SwapStrategy::InnerHTML,
                );
            (oob, true)
        }
        _ => (HxSwapOob::new(), false),
    };
    if let Some(notice) = &report.notice {
        response.append(TOASTS_TARGET, render_notice(notice));
    }

    if swap {
        Ok(response.into_response())
    } else {
        Ok(([("HX-Reswap", "none")], response).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;

    use crate::handlers::router;
    use crate::testing::{logged_in_state, MockUpstream};

    async fn server() -> (MockUpstream, TestServer, AppState) {
        let upstream = MockUpstream::start().await;
        let state = logged_in_state(&upstream);
        let server = TestServer::new(router(state.clone()).unwrap()).unwrap();
        (upstream, server, state)
    }

    async fn create_quick(server: &TestServer, username: &str) -> axum_test::TestResponse {
        server
            .post("/quick/accounts")
            .form(&[
                ("username", username),
                ("domain", "mock.test"),
                ("password", "Password1!"),
                ("manual", "false"),
            ])
            .await
    }

    #[test]
    fn test_local_part_validation() {
        assert!(is_valid_local_part("abc123"));
        assert!(is_valid_local_part("first.last-1_x"));
        assert!(!is_valid_local_part("with space"));
        assert!(!is_valid_local_part("a@b"));
    }

    #[test]
    fn test_status_line() {
        let tracker = RefreshTracker::default();
        assert_eq!(status_line(0, Some(&tracker)), "0 message(s), updated never");
        assert_eq!(status_line(3, None), "3 message(s), updated never");
    }

    #[tokio::test]
    async fn test_page_generates_credentials() {
        let (_upstream, server, _) = server().await;
        let response = server.get("/quick").await;
        response.assert_status_ok();
        response.assert_text_contains("mock.test");
        response.assert_text_contains(r#"name="username""#);
        response.assert_text_contains("Create an account to start receiving mail");
    }

    #[tokio::test]
    async fn test_manual_credentials_are_empty() {
        let (_upstream, server, _) = server().await;
        let response = server
            .get("/quick/credentials")
            .add_query_param("manual", true)
            .await;
        response.assert_status_ok();
        response.assert_text_contains(r#"name="username" value="""#);
    }

    #[tokio::test]
    async fn test_create_selects_and_seeds() {
        let (upstream, server, state) = server().await;
        let response = create_quick(&server, "quick1").await;
        response.assert_status_ok();
        response.assert_text_contains("quick1@mock.test");
        response.assert_text_contains("Account quick1@mock.test created");
        response.assert_text_contains(r#"id="quick-form" hx-swap-oob="true""#);

        let account = state.store().selected_quick_account().unwrap();
        assert_eq!(account.address, "quick1@mock.test");
        let inbox = account.current_mailbox.unwrap();
        assert!(state.refresh().tracker(&account.id, &inbox.id).is_initialized());
        assert!(upstream.has_account(&account.id));
    }

    #[tokio::test]
    async fn test_create_validates() {
        let (_upstream, server, _) = server().await;
        let response = server
            .post("/quick/accounts")
            .form(&[("username", "abc"), ("domain", ""), ("password", "short")])
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_text_contains("Please select a domain");
    }

    #[tokio::test]
    async fn test_refresh_announces_new_mail() {
        let (upstream, server, state) = server().await;
        create_quick(&server, "watcher").await.assert_status_ok();
        let account = state.store().selected_quick_account().unwrap();
        let inbox = account.current_mailbox.unwrap().id;

        upstream.deliver(&account.id, &inbox, "Fresh news");
        let response = server
            .post("/quick/refresh")
            .form(&[("account_id", account.id.as_str()), ("trigger", "auto")])
            .await;
        response.assert_status_ok();
        response.assert_text_contains("Fresh news");
        response.assert_text_contains("Received 1 new message(s)");
        response.assert_text_contains(r#"id="quick-status" hx-swap-oob="true""#);

        let quiet = server
            .post("/quick/refresh")
            .form(&[("account_id", account.id.as_str()), ("trigger", "focus")])
            .await;
        quiet.assert_status_ok();
        assert!(!quiet.text().contains("toasts"));
    }

    #[tokio::test]
    async fn test_manual_refresh_cooldown() {
        let (_upstream, server, state) = server().await;
        create_quick(&server, "clicker").await.assert_status_ok();
        let account_id = state.store().selected_quick_account().unwrap().id;

        let first = server
            .post("/quick/refresh")
            .form(&[("account_id", account_id.as_str()), ("trigger", "manual")])
            .await;
        first.assert_text_contains("Mailbox updated. No new messages.");

        let second = server
            .post("/quick/refresh")
            .form(&[("account_id", account_id.as_str()), ("trigger", "manual")])
            .await;
        second.assert_status_ok();
        assert_eq!(second.header("HX-Reswap"), "none");
        second.assert_text_contains("Please wait a moment before trying again");
    }

    #[tokio::test]
    async fn test_refresh_failure_shows_notice() {
        let (upstream, server, state) = server().await;
        create_quick(&server, "flaky").await.assert_status_ok();
        let account_id = state.store().selected_quick_account().unwrap().id;

        upstream.fail_next(1);
        let response = server
            .post("/quick/refresh")
            .form(&[("account_id", account_id.as_str())])
            .await;
        assert_eq!(response.header("HX-Reswap"), "none");
        response.assert_text_contains("Could not refresh mailbox. Please try again later.");
    }

    #[tokio::test]
    async fn test_select_and_view_message() {
        let (upstream, server, state) = server().await;
        create_quick(&server, "first").await.assert_status_ok();
        let first = state.store().selected_quick_account().unwrap();
        create_quick(&server, "second").await.assert_status_ok();

        let inbox = first.current_mailbox.clone().unwrap().id;
        let message = upstream.deliver(&first.id, &inbox, "Hello first");

        let selected = server
            .post(&format!("/quick/accounts/{}/select", first.id))
            .await;
        selected.assert_status_ok();
        selected.assert_text_contains("Hello first");
        assert_eq!(state.store().selected_quick_account().unwrap().id, first.id);

        let view = server
            .get(&format!("/quick/accounts/{}/messages/{message}", first.id))
            .await;
        view.assert_status_ok();
        view.assert_text_contains("Body of Hello first");
        assert_eq!(upstream.is_read(&message), Some(true));
    }

    #[tokio::test]
    async fn test_poll_after_select_does_not_repeat_shown_mail() {
        let (upstream, server, state) = server().await;
        create_quick(&server, "first").await.assert_status_ok();
        let first = state.store().selected_quick_account().unwrap();
        create_quick(&server, "second").await.assert_status_ok();

        let inbox = first.current_mailbox.clone().unwrap().id;
        upstream.deliver(&first.id, &inbox, "Already shown");
        server
            .post(&format!("/quick/accounts/{}/select", first.id))
            .await
            .assert_text_contains("Already shown");

        let poll = server
            .post("/quick/refresh")
            .form(&[("account_id", first.id.as_str()), ("trigger", "auto")])
            .await;
        poll.assert_status_ok();
        poll.assert_text_contains("Already shown");
        assert!(!poll.text().contains("Received"));

        upstream.deliver(&first.id, &inbox, "Really new");
        let next = server
            .post("/quick/refresh")
            .form(&[("account_id", first.id.as_str()), ("trigger", "auto")])
            .await;
        next.assert_text_contains("Received 1 new message(s)");
    }

    #[tokio::test]
    async fn test_refresh_unknown_account_leaves_registry_alone() {
        let (upstream, server, state) = server().await;
        for i in 0..50 {
            let response = server
                .post("/quick/refresh")
                .form(&[("account_id", format!("bogus-{i}").as_str()), ("trigger", "auto")])
                .await;
            response.assert_status_ok();
            assert_eq!(response.header("HX-Reswap"), "none");
        }
        assert!(state.refresh().is_empty());
        assert_eq!(upstream.request_count(), 0);

        let manual = server
            .post("/quick/refresh")
            .form(&[("account_id", "bogus"), ("trigger", "manual")])
            .await;
        manual.assert_text_contains("No mailbox available");
        assert!(state.refresh().is_empty());
    }

    #[tokio::test]
    async fn test_select_unknown_account() {
        let (_upstream, server, _) = server().await;
        server
            .post("/quick/accounts/nobody/select")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
