//! Account list, account detail and mailbox management

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::client;
use super::views::{format_timestamp, messages_path, MessageRow};
use crate::api::{pick_inbox, AccountQuery, MailboxCreate};
use crate::error::AppError;
use crate::htmx::{HxPartial, HxSwapOob, TOASTS_TARGET};
use crate::refresh::NoticeLevel;
use crate::state::AppState;
use crate::template::{render_toast, HxTemplate};

/// Filters from the account list query string
///
/// Empty strings from the filter form mean "no filter".
#[derive(Debug, Default, Deserialize)]
pub struct AccountFilter {
    /// Exact address
    #[serde(default)]
    pub address: Option<String>,
    /// `true`, `false` or empty
    #[serde(default)]
    pub is_active: Option<String>,
    /// 1-based page
    #[serde(default)]
    pub page: Option<u32>,
}

impl AccountFilter {
    fn query(&self) -> AccountQuery {
        AccountQuery {
            address: self
                .address
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(ToString::to_string),
            is_active: match self.is_active.as_deref() {
                Some("true") => Some(true),
                Some("false") => Some(false),
                _ => None,
            },
            page: self.page.unwrap_or(1).max(1),
            ..AccountQuery::default()
        }
    }

    fn page_href(&self, page: u32) -> String {
        let query = self.query();
        let mut href = format!("/accounts?page={page}");
        if let Some(address) = &query.address {
            href.push_str("&address=");
            href.push_str(&encode_query_value(address));
        }
        if let Some(active) = query.is_active {
            href.push_str(&format!("&is_active={active}"));
        }
        href
    }
}

fn encode_query_value(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                char::from(b).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

/// Row of the account table
#[derive(Debug, Clone)]
pub struct AccountRow {
    /// Account ID
    pub id: String,
    /// Address
    pub address: String,
    /// Active flag
    pub is_active: bool,
    /// Quota usage
    pub usage_percent: u8,
    /// Creation time
    pub created: String,
}

/// `GET /accounts`
#[derive(Template)]
#[template(path = "accounts.html")]
pub struct AccountsTemplate {
    /// Layout flag
    pub authenticated: bool,
    /// Current page rows
    pub accounts: Vec<AccountRow>,
    /// Total matching accounts
    pub total: u64,
    /// Current page
    pub page: u32,
    /// Previous page link, empty on the first page
    pub prev_href: String,
    /// Next page link, empty on the last page
    pub next_href: String,
    /// Address filter as entered
    pub filter_address: String,
    /// Activation filter: `true`, `false` or empty
    pub filter_active: String,
    /// Active domains offered as address suffixes
    pub domains: Vec<String>,
}

/// Account creation form
#[derive(Debug, Deserialize, Validate)]
pub struct AccountForm {
    /// Full address
    #[validate(email(message = "Enter a valid email address"))]
    pub address: String,
    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Mailbox line in the account detail sidebar
#[derive(Debug, Clone)]
pub struct MailboxRow {
    /// Mailbox ID
    pub id: String,
    /// Path such as `INBOX`
    pub path: String,
    /// Unread messages
    pub unread: u64,
    /// Total messages
    pub total: u64,
    /// Currently shown
    pub selected: bool,
    /// System mailboxes cannot be deleted
    pub is_system: bool,
}

/// `GET /accounts/{id}`
#[derive(Template)]
#[template(path = "account_detail.html")]
pub struct AccountDetailTemplate {
    /// Layout flag
    pub authenticated: bool,
    /// Account ID
    pub id: String,
    /// Address
    pub address: String,
    /// Active flag
    pub is_active: bool,
    /// Bytes used
    pub used: u64,
    /// Quota in bytes
    pub quota: u64,
    /// Quota usage
    pub usage_percent: u8,
    /// Creation time
    pub created: String,
    /// Mailboxes
    pub mailboxes: Vec<MailboxRow>,
    /// Shown mailbox ID, empty when the account has none
    pub mailbox_id: String,
    /// Shown mailbox path
    pub mailbox_path: String,
    /// Messages of the shown mailbox
    pub messages: Vec<MessageRow>,
    /// Element message rows load into
    pub view_target: &'static str,
}

/// Mailbox selection on the detail page
#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    /// Mailbox to show; the inbox when absent
    #[serde(default)]
    pub mailbox: Option<String>,
}

/// Mailbox creation form
#[derive(Debug, Deserialize, Validate)]
pub struct MailboxForm {
    /// Mailbox path
    #[validate(length(min = 1, max = 64, message = "Mailbox name is required"))]
    pub path: String,
}

/// `GET /accounts`
pub async fn list(
    State(state): State<AppState>,
    HxPartial(partial): HxPartial,
    Query(filter): Query<AccountFilter>,
) -> Result<Response, AppError> {
    let store = state.store();
    let query = filter.query();
    let collection = store.fetch_accounts_page(&query).await?;
    if store.domains().is_empty() {
        // Only used for the address hint; the page works without it.
        let _ = store.fetch_domains().await;
    }

    let template = AccountsTemplate {
        authenticated: true,
        prev_href: if query.page > 1 {
            filter.page_href(query.page - 1)
        } else {
            String::new()
        },
        next_href: if collection.has_next() {
            filter.page_href(query.page + 1)
        } else {
            String::new()
        },
        accounts: collection
            .member
            .iter()
            .map(|a| AccountRow {
                id: a.id.clone(),
                address: a.address.clone(),
                is_active: a.is_active,
                usage_percent: a.usage_percent(),
                created: format_timestamp(&a.created_at),
            })
            .collect(),
        total: collection.total_items,
        page: query.page,
        filter_address: query.address.clone().unwrap_or_default(),
        filter_active: query.is_active.map(|a| a.to_string()).unwrap_or_default(),
        domains: store
            .domains()
            .into_iter()
            .filter(|d| d.is_active)
            .map(|d| d.domain)
            .collect(),
    };
    Ok(template.render_htmx(partial))
}

/// `POST /accounts`
pub async fn create(
    State(state): State<AppState>,
    Form(form): Form<AccountForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let account = state
        .store()
        .create_account(form.address.trim(), &form.password, None)
        .await?;
    Ok(Redirect::to(&format!("/accounts/{}", account.id)))
}

/// `DELETE /accounts/{id}`
///
/// Answers with an empty body for the removed row plus a toast.
pub async fn remove(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<HxSwapOob, AppError> {
    state.store().delete_account(&account_id).await?;
    state.refresh().forget_account(&account_id);
    let mut response = HxSwapOob::with_primary("");
    response.append(
        TOASTS_TARGET,
        render_toast(NoticeLevel::Success, "Account deleted"),
    );
    Ok(response)
}

/// `GET /accounts/{id}`
pub async fn detail(
    State(state): State<AppState>,
    HxPartial(partial): HxPartial,
    Path(account_id): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Result<Response, AppError> {
    let store = state.store();
    let account = store.fetch_account(&account_id).await?;
    let mailboxes = store.fetch_mailboxes(&account_id).await?;

    let selected = match query.mailbox.as_deref() {
        Some(id) => Some(
            mailboxes
                .iter()
                .find(|m| m.id == id)
                .ok_or_else(|| AppError::NotFound("Mailbox".to_string()))?,
        ),
        None => pick_inbox(&mailboxes),
    }
    .cloned();

    store.set_current_account(Some(account.clone()));
    store.set_current_mailbox(selected.clone());

    let (mailbox_id, mailbox_path, messages) = match &selected {
        Some(mailbox) => {
            let base = messages_path(&account_id, &mailbox.id);
            let rows = store
                .fetch_messages(&account_id, &mailbox.id)
                .await?
                .iter()
                .map(|m| MessageRow::new(m, format!("{base}/{}", m.id)))
                .collect();
            (mailbox.id.clone(), mailbox.path.clone(), rows)
        }
        None => (String::new(), String::new(), Vec::new()),
    };

    let template = AccountDetailTemplate {
        authenticated: true,
        id: account.id.clone(),
        address: account.address.clone(),
        is_active: account.is_active,
        used: account.used,
        quota: account.quota,
        usage_percent: account.usage_percent(),
        created: format_timestamp(&account.created_at),
        mailboxes: mailboxes
            .iter()
            .map(|m| MailboxRow {
                id: m.id.clone(),
                path: m.path.clone(),
                unread: m.total_unread_messages,
                total: m.total_messages,
                selected: m.id == mailbox_id,
                is_system: m.is_system.unwrap_or(false) || m.is_inbox(),
            })
            .collect(),
        mailbox_id,
        mailbox_path,
        messages,
        view_target: "#message-view",
    };
    Ok(template.render_htmx(partial))
}

/// `POST /accounts/{id}/mailboxes`
pub async fn create_mailbox(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Form(form): Form<MailboxForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let mailbox = client(&state)?
        .mailboxes(&account_id)
        .create(&MailboxCreate {
            path: form.path.trim().to_string(),
        })
        .await?;
    info!(account_id, mailbox_id = %mailbox.id, path = %mailbox.path, "Mailbox created");
    Ok(Redirect::to(&format!(
        "/accounts/{account_id}?mailbox={}",
        mailbox.id
    )))
}

/// `DELETE /accounts/{id}/mailboxes/{mailbox}`
pub async fn remove_mailbox(
    State(state): State<AppState>,
    Path((account_id, mailbox_id)): Path<(String, String)>,
) -> Result<Redirect, AppError> {
    client(&state)?
        .mailboxes(&account_id)
        .delete(&mailbox_id)
        .await?;
    info!(account_id, mailbox_id, "Mailbox deleted");
    Ok(Redirect::to(&format!("/accounts/{account_id}")))
}
