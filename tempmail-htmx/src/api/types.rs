//! Wire models for the smtp.dev API
//!
//! Field names follow the API's camelCase JSON. Collections use the Hydra
//! envelope (`member`, `totalItems`, `view`, `search`), but several endpoints
//! answer with a bare array instead; [`ListPayload`] absorbs both.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

/// Hydra pagination links
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationView {
    /// IRI of the current page
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Hydra type, usually `PartialCollectionView`
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// First page IRI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    /// Last page IRI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    /// Previous page IRI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    /// Next page IRI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// One variable of a Hydra IRI template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMapping {
    /// Hydra type
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Template variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    /// Filtered property
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    /// Whether the filter is mandatory
    #[serde(default)]
    pub required: bool,
}

/// Hydra search template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchView {
    /// Hydra type, usually `IriTemplate`
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// IRI template, e.g. `/accounts{?address,isActive}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Variable representation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_representation: Option<String>,
    /// Template variables
    #[serde(default)]
    pub mapping: Vec<SearchMapping>,
}

/// A page of entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection<T> {
    /// Entities on this page
    #[serde(alias = "hydra:member")]
    pub member: Vec<T>,
    /// Total number of entities across all pages
    #[serde(default, alias = "hydra:totalItems")]
    pub total_items: u64,
    /// Pagination links
    #[serde(default, alias = "hydra:view", skip_serializing_if = "Option::is_none")]
    pub view: Option<PaginationView>,
    /// Search template
    #[serde(default, alias = "hydra:search", skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchView>,
}

impl<T> Collection<T> {
    /// Wrap a plain list, with no pagination metadata
    #[must_use]
    pub fn from_vec(member: Vec<T>) -> Self {
        Self {
            total_items: member.len() as u64,
            member,
            view: None,
            search: None,
        }
    }

    /// Page a full list locally and synthesize the Hydra view
    ///
    /// `page` is 1-based; a page past the end yields an empty `member`.
    #[must_use]
    pub fn paged(all: Vec<T>, base_path: &str, page: u32, items_per_page: u32) -> Self {
        let page = page.max(1);
        let per_page = items_per_page.max(1);
        let total = all.len() as u64;
        let last_page = total.div_ceil(u64::from(per_page)).max(1);
        let start = usize::try_from(u64::from(page - 1) * u64::from(per_page)).unwrap_or(usize::MAX);

        let member: Vec<T> = all
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();

        let view = PaginationView {
            id: Some(format!("{base_path}?page={page}")),
            kind: Some("PartialCollectionView".to_string()),
            first: Some(format!("{base_path}?page=1")),
            last: Some(format!("{base_path}?page={last_page}")),
            previous: (page > 1).then(|| format!("{base_path}?page={}", page - 1)),
            next: (u64::from(page) < last_page).then(|| format!("{base_path}?page={}", page + 1)),
        };

        Self {
            member,
            total_items: total,
            view: Some(view),
            search: None,
        }
    }

    /// Attach a search template
    #[must_use]
    pub fn with_search(mut self, search: SearchView) -> Self {
        self.search = Some(search);
        self
    }

    /// Whether another page follows this one
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.view.as_ref().is_some_and(|v| v.next.is_some())
    }
}

/// Raw shapes a list endpoint may answer with
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    /// Bare JSON array
    Array(Vec<T>),
    /// Hydra collection
    Collection(Collection<T>),
    /// Account object carrying its mailboxes
    Nested {
        /// Nested mailbox list
        mailboxes: Vec<T>,
    },
}

impl<T> ListPayload<T> {
    /// Normalize into a collection without paging bare arrays
    #[must_use]
    pub fn into_collection(self) -> Collection<T> {
        match self {
            Self::Array(items) | Self::Nested { mailboxes: items } => Collection::from_vec(items),
            Self::Collection(collection) => collection,
        }
    }
}

/// A sending domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    /// Domain ID
    pub id: String,
    /// Domain name, e.g. `example.com`
    pub domain: String,
    /// Whether accounts can be created on it
    #[serde(default)]
    pub is_active: bool,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: String,
}

/// Body of `POST /domains`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainCreate {
    /// Domain name
    pub domain: String,
    /// Activate immediately
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Body of `PATCH /domains/{id}`
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainUpdate {
    /// New activation state
    pub is_active: bool,
}

/// A disposable mailbox identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account ID
    pub id: String,
    /// Email address
    pub address: String,
    /// Storage quota in bytes
    #[serde(default)]
    pub quota: u64,
    /// Storage used in bytes
    #[serde(default)]
    pub used: u64,
    /// Whether the account receives mail
    #[serde(default)]
    pub is_active: bool,
    /// Soft-deletion marker
    #[serde(default)]
    pub is_deleted: bool,
    /// Mailboxes, when embedded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailboxes: Option<Vec<Mailbox>>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: String,
}

impl Account {
    /// Quota usage in percent, clamped to 0..=100
    #[must_use]
    pub fn usage_percent(&self) -> u8 {
        if self.quota == 0 {
            return 0;
        }
        let pct = self.used.saturating_mul(100) / self.quota;
        u8::try_from(pct.min(100)).unwrap_or(100)
    }
}

/// Body of `POST /accounts`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreate {
    /// Full address, `user@domain`
    pub address: String,
    /// Mailbox password
    pub password: String,
    /// Activate immediately
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Body of `PATCH /accounts/{id}`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    /// New password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// New activation state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// A folder under an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mailbox {
    /// Mailbox ID
    pub id: String,
    /// Folder path, e.g. `INBOX`
    pub path: String,
    /// System folders cannot be deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_system: Option<bool>,
    /// Auto-delete enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_delete_enabled: Option<bool>,
    /// Auto-delete age
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_delete_seconds: Option<u64>,
    /// Message count
    #[serde(default)]
    pub total_messages: u64,
    /// Unread message count
    #[serde(default)]
    pub total_unread_messages: u64,
    /// Owning account IRI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Mailbox {
    /// Whether this is the inbox (case-insensitive path match)
    #[must_use]
    pub fn is_inbox(&self) -> bool {
        self.path.eq_ignore_ascii_case("inbox")
    }
}

/// Pick the inbox, falling back to the first mailbox
#[must_use]
pub fn pick_inbox(mailboxes: &[Mailbox]) -> Option<&Mailbox> {
    mailboxes
        .iter()
        .find(|m| m.is_inbox())
        .or_else(|| mailboxes.first())
}

/// Body of `POST /accounts/{id}/mailboxes`
#[derive(Debug, Clone, Serialize)]
pub struct MailboxCreate {
    /// Folder path
    pub path: String,
}

/// Body of `PATCH /accounts/{id}/mailboxes/{id}`
#[derive(Debug, Clone, Serialize)]
pub struct MailboxUpdate {
    /// New folder path
    pub path: String,
}

/// Sender or recipient
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Address
    #[serde(default)]
    pub address: String,
}

impl EmailAddress {
    /// `Name <address>`, or just the address when unnamed
    #[must_use]
    pub fn display(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("{name} <{}>", self.address),
            _ => self.address.clone(),
        }
    }
}

/// Message as returned by the list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    /// Message ID
    pub id: String,
    /// RFC 5322 Message-ID
    #[serde(default)]
    pub msgid: String,
    /// Sender
    #[serde(default, deserialize_with = "null_as_default")]
    pub from: EmailAddress,
    /// Recipients
    #[serde(default, deserialize_with = "null_as_default")]
    pub to: Vec<EmailAddress>,
    /// Subject line
    #[serde(default)]
    pub subject: String,
    /// Body preview
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,
    /// Read flag
    #[serde(default)]
    pub is_read: bool,
    /// Flagged
    #[serde(default)]
    pub is_flagged: bool,
    /// Has attachments
    #[serde(default)]
    pub has_attachments: bool,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// Raw download IRI
    #[serde(default)]
    pub download_url: String,
    /// Arrival timestamp
    #[serde(default)]
    pub created_at: String,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: String,
}

impl MessageSummary {
    /// Parsed arrival time, if well-formed
    #[must_use]
    pub fn created(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.created_at).ok()
    }
}

/// Sort newest first
///
/// Malformed timestamps sort after well-formed ones.
pub fn sort_newest_first(messages: &mut [MessageSummary]) {
    messages.sort_by(|a, b| match (a.created(), b.created()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b.created_at.cmp(&a.created_at),
    });
}

/// Attachment metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Attachment ID
    pub id: String,
    /// File name
    #[serde(default)]
    pub filename: String,
    /// MIME type
    #[serde(default)]
    pub content_type: String,
    /// `attachment` or `inline`
    #[serde(default)]
    pub disposition: String,
    /// Transfer encoding
    #[serde(default)]
    pub transfer_encoding: String,
    /// Related (inline) part
    #[serde(default)]
    pub related: bool,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// Download IRI
    #[serde(default)]
    pub download_url: String,
}

/// Full message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Header fields shared with the list view
    #[serde(flatten)]
    pub summary: MessageSummary,
    /// CC recipients
    #[serde(default, deserialize_with = "null_as_default")]
    pub cc: Vec<String>,
    /// BCC recipients
    #[serde(default, deserialize_with = "null_as_default")]
    pub bcc: Vec<String>,
    /// Verification results
    #[serde(default, deserialize_with = "null_as_default")]
    pub verifications: Vec<String>,
    /// Auto-delete enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_delete_enabled: Option<bool>,
    /// Expiry timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Plain text body
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    /// HTML body parts
    #[serde(default, deserialize_with = "one_or_many")]
    pub html: Vec<String>,
    /// Attachments
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<Attachment>,
    /// Raw source IRI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl Message {
    /// All HTML parts joined, empty when the message is text-only
    #[must_use]
    pub fn html_body(&self) -> String {
        self.html.concat()
    }

    /// Whether neither a text nor an HTML body is present
    #[must_use]
    pub fn has_empty_body(&self) -> bool {
        self.text.trim().is_empty() && self.html.iter().all(|part| part.trim().is_empty())
    }
}

/// Body of `PATCH .../messages/{id}`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUpdate {
    /// Read flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    /// Flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_flagged: Option<bool>,
    /// Auto-delete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_delete_enabled: Option<bool>,
    /// Expiry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl MessageUpdate {
    /// Mark as read and nothing else
    #[must_use]
    pub fn read() -> Self {
        Self {
            is_read: Some(true),
            ..Self::default()
        }
    }
}

/// Body of `PUT .../messages/{id}/move`
#[derive(Debug, Clone, Serialize)]
pub struct MessageMove {
    /// Target mailbox ID
    pub mailbox: String,
}

/// Raw RFC 5322 source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageSource {
    /// Source text
    #[serde(default)]
    pub raw: String,
}

/// An API token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Token ID
    pub id: String,
    /// Token name
    pub name: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Secret, only present right after creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: String,
}

/// Body of `POST /tokens`
#[derive(Debug, Clone, Serialize)]
pub struct TokenCreate {
    /// Token name
    pub name: String,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) if s.is_empty() => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(parts)) => parts,
        None => Vec::new(),
    })
}
