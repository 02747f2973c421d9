//! View models shared by several pages
//!
//! Templates only see plain strings, numbers and booleans; formatting of
//! addresses, dates and sizes happens here.

use askama::Template;

use crate::api::{Message, MessageSummary};

/// Route prefix for one mailbox's messages
#[must_use]
pub fn messages_path(account_id: &str, mailbox_id: &str) -> String {
    format!("/accounts/{account_id}/mailboxes/{mailbox_id}/messages")
}

/// `2024-01-01 09:30`, or the raw value when it does not parse
#[must_use]
pub fn format_timestamp(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map_or_else(|_| raw.to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}

/// Human readable byte count
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    match bytes {
        0..=1023 => format!("{bytes} B"),
        1024..=1_048_575 => format!("{:.1} KB", bytes as f64 / 1024.0),
        _ => format!("{:.1} MB", bytes as f64 / 1_048_576.0),
    }
}

/// One line of a message list
#[derive(Debug, Clone)]
pub struct MessageRow {
    /// Message ID
    pub id: String,
    /// URL the row loads into the message view
    pub href: String,
    /// Sender
    pub from: String,
    /// Subject, or a placeholder
    pub subject: String,
    /// Preview text
    pub intro: String,
    /// Arrival time
    pub received: String,
    /// Read flag
    pub is_read: bool,
    /// Has attachments
    pub has_attachments: bool,
}

impl MessageRow {
    /// Row for `message` linking to `href`
    #[must_use]
    pub fn new(message: &MessageSummary, href: String) -> Self {
        Self {
            id: message.id.clone(),
            href,
            from: message.from.display(),
            subject: subject_or_placeholder(&message.subject),
            intro: message.intro.clone().unwrap_or_default(),
            received: format_timestamp(&message.created_at),
            is_read: message.is_read,
            has_attachments: message.has_attachments,
        }
    }
}

fn subject_or_placeholder(subject: &str) -> String {
    if subject.trim().is_empty() {
        "(no subject)".to_string()
    } else {
        subject.to_string()
    }
}

/// Message list fragment
#[derive(Template)]
#[template(path = "partials/message_list.html")]
pub struct MessageListTemplate {
    /// Rows, newest first
    pub messages: Vec<MessageRow>,
    /// Element a row loads into
    pub view_target: &'static str,
}

/// Attachment link
#[derive(Debug, Clone)]
pub struct AttachmentRow {
    /// File name
    pub filename: String,
    /// Formatted size
    pub size: String,
    /// Download URL
    pub href: String,
}

/// Message detail fragment
#[derive(Template)]
#[template(path = "partials/message_detail.html")]
pub struct MessageDetailTemplate {
    /// Subject, or a placeholder
    pub subject: String,
    /// Sender
    pub from: String,
    /// Recipients
    pub to: String,
    /// Copy recipients
    pub cc: String,
    /// Arrival time
    pub received: String,
    /// HTML body, shown sandboxed; empty for text-only mail
    pub html: String,
    /// Text body
    pub text: String,
    /// Attachments
    pub attachments: Vec<AttachmentRow>,
    /// `.eml` download URL
    pub download_href: String,
    /// Raw source URL
    pub source_href: String,
    /// Delete URL; empty hides the button
    pub delete_href: String,
}

impl MessageDetailTemplate {
    /// Detail view for `message` in the given mailbox
    #[must_use]
    pub fn new(message: &Message, account_id: &str, mailbox_id: &str) -> Self {
        let base = format!(
            "{}/{}",
            messages_path(account_id, mailbox_id),
            message.summary.id
        );
        let summary = &message.summary;
        Self {
            subject: subject_or_placeholder(&summary.subject),
            from: summary.from.display(),
            to: summary
                .to
                .iter()
                .map(crate::api::EmailAddress::display)
                .collect::<Vec<_>>()
                .join(", "),
            cc: message.cc.join(", "),
            received: format_timestamp(&summary.created_at),
            html: message.html_body(),
            text: message.text.clone(),
            attachments: message
                .attachments
                .iter()
                .map(|a| AttachmentRow {
                    filename: a.filename.clone(),
                    size: format_size(a.size),
                    href: format!("{base}/attachments/{}", a.id),
                })
                .collect(),
            download_href: format!("{base}/download"),
            source_href: format!("{base}/source"),
            delete_href: base,
        }
    }

    /// Hide the delete button
    #[must_use]
    pub fn without_delete(mut self) -> Self {
        self.delete_href.clear();
        self
    }
}
