//! Message list, detail, deletion and downloads for one mailbox

use askama::Template;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use super::client;
use super::views::{messages_path, MessageDetailTemplate, MessageListTemplate, MessageRow};
use crate::api::Download;
use crate::error::AppError;
use crate::htmx::{HxSwapOob, SwapStrategy, TOASTS_TARGET};
use crate::refresh::NoticeLevel;
use crate::state::AppState;
use crate::template::{render_toast, HxTemplate};

const MESSAGE_VIEW: &str = "#message-view";
const EMPTY_VIEW: &str = r#"<p class="muted">Select a message to read it.</p>"#;

fn rows(state: &AppState, account_id: &str, mailbox_id: &str) -> Vec<MessageRow> {
    let base = messages_path(account_id, mailbox_id);
    state
        .store()
        .messages()
        .iter()
        .map(|m| MessageRow::new(m, format!("{base}/{}", m.id)))
        .collect()
}

/// `GET .../messages`: message list fragment, bypassing caches
pub async fn list(
    State(state): State<AppState>,
    Path((account_id, mailbox_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    state
        .store()
        .fetch_messages(&account_id, &mailbox_id)
        .await?;
    Ok(MessageListTemplate {
        messages: rows(&state, &account_id, &mailbox_id),
        view_target: MESSAGE_VIEW,
    }
    .render_html())
}

/// `GET .../messages/{id}`: detail fragment; marks the message read
pub async fn show(
    State(state): State<AppState>,
    Path((account_id, mailbox_id, message_id)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let store = state.store();
    let message = store
        .fetch_message(&account_id, &mailbox_id, &message_id)
        .await?;
    if !message.summary.is_read {
        store
            .mark_message_as_read(&account_id, &mailbox_id, &message_id)
            .await;
    }
    Ok(MessageDetailTemplate::new(&message, &account_id, &mailbox_id).render_html())
}

/// `DELETE .../messages/{id}`
///
/// Replaces the message list, clears the detail view and shows a toast.
pub async fn remove(
    State(state): State<AppState>,
    Path((account_id, mailbox_id, message_id)): Path<(String, String, String)>,
) -> Result<HxSwapOob, AppError> {
    state
        .store()
        .delete_message(&account_id, &mailbox_id, &message_id)
        .await?;

    let list = MessageListTemplate {
        messages: rows(&state, &account_id, &mailbox_id),
        view_target: MESSAGE_VIEW,
    };
    let mut response = HxSwapOob::with_primary(list.render()?);
    response.add("message-view", EMPTY_VIEW, SwapStrategy::InnerHTML);
    response.append(
        TOASTS_TARGET,
        render_toast(NoticeLevel::Success, "Message deleted"),
    );
    Ok(response)
}

/// `GET .../messages/{id}/source`: raw RFC 822 source as text
pub async fn source(
    State(state): State<AppState>,
    Path((account_id, mailbox_id, message_id)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let source = client(&state)?
        .messages(&account_id, &mailbox_id)
        .source(&message_id)
        .await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        source.raw,
    )
        .into_response())
}

/// `GET .../messages/{id}/download`: the message as `.eml`
pub async fn download(
    State(state): State<AppState>,
    Path((account_id, mailbox_id, message_id)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let download = client(&state)?
        .messages(&account_id, &mailbox_id)
        .download(&message_id)
        .await?;
    Ok(attachment_response(
        download,
        "message/rfc822",
        &format!("{message_id}.eml"),
    ))
}

/// `GET .../messages/{id}/attachments/{attachment}`
///
/// The file name comes from the current message when it is loaded.
pub async fn attachment(
    State(state): State<AppState>,
    Path((account_id, mailbox_id, message_id, attachment_id)): Path<(
        String,
        String,
        String,
        String,
    )>,
) -> Result<Response, AppError> {
    let download = client(&state)?
        .messages(&account_id, &mailbox_id)
        .download_attachment(&message_id, &attachment_id)
        .await?;
    let filename = state
        .store()
        .current_message()
        .filter(|m| m.summary.id == message_id)
        .and_then(|m| {
            m.attachments
                .into_iter()
                .find(|a| a.id == attachment_id)
                .map(|a| a.filename)
        })
        .filter(|name| !name.is_empty())
        .unwrap_or(attachment_id);
    Ok(attachment_response(
        download,
        "application/octet-stream",
        &filename,
    ))
}

fn attachment_response(download: Download, fallback_type: &str, filename: &str) -> Response {
    let content_type = download
        .content_type
        .unwrap_or_else(|| fallback_type.to_string());
    let safe_name: String = filename
        .chars()
        .map(|c| if c == '"' || c.is_control() { '_' } else { c })
        .collect();
    (
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{safe_name}\""),
            ),
        ],
        download.bytes,
    )
        .into_response()
}
