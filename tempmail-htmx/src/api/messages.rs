//! `/accounts/{id}/mailboxes/{id}/messages` endpoints

use bytes::Bytes;
use reqwest::Method;
use tracing::{debug, warn};

use super::types::{
    Collection, ListPayload, Message, MessageMove, MessageSource, MessageSummary, MessageUpdate,
};
use super::{unix_millis, ApiError, SmtpDevClient};

/// Whether a message listing should defeat intermediary caches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheBust {
    /// Plain request
    #[default]
    Off,
    /// Append `_t` with the current time
    Now,
    /// Append `_t` with a caller-chosen timestamp
    At(i64),
}

/// Binary payload fetched from the API
#[derive(Debug, Clone)]
pub struct Download {
    /// Raw bytes
    pub bytes: Bytes,
    /// Upstream content type, if sent
    pub content_type: Option<String>,
}

/// Message service view scoped to one mailbox
#[derive(Debug, Clone, Copy)]
pub struct Messages<'a> {
    client: &'a SmtpDevClient,
    account_id: &'a str,
    mailbox_id: &'a str,
}

impl<'a> Messages<'a> {
    pub(crate) const fn new(client: &'a SmtpDevClient, account_id: &'a str, mailbox_id: &'a str) -> Self {
        Self {
            client,
            account_id,
            mailbox_id,
        }
    }

    fn path(&self) -> String {
        format!(
            "/accounts/{}/mailboxes/{}/messages",
            self.account_id, self.mailbox_id
        )
    }

    /// List messages
    ///
    /// Unless `cache_bust` is [`CacheBust::Off`], a `_t` parameter carrying a
    /// millisecond timestamp is appended.
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn list(
        &self,
        page: Option<u32>,
        cache_bust: CacheBust,
    ) -> Result<Collection<MessageSummary>, ApiError> {
        let mut params = Vec::new();
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        let timestamp = match cache_bust {
            CacheBust::Off => None,
            CacheBust::Now => Some(unix_millis()),
            CacheBust::At(ts) => Some(ts),
        };
        if let Some(ts) = timestamp {
            debug!(timestamp = ts, "Listing messages without cache");
            params.push(("_t", ts.to_string()));
        }
        let payload: ListPayload<MessageSummary> =
            self.client.get_json(&self.path(), &params).await?;
        Ok(payload.into_collection())
    }

    /// Fetch one message
    ///
    /// When the body is empty but a source IRI is present, the raw source is
    /// fetched and used as the text body. A failing source fetch is logged
    /// and the message returned as is.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs.
    pub async fn get(&self, message_id: &str) -> Result<Message, ApiError> {
        let mut message: Message = self
            .client
            .get_json(&format!("{}/{message_id}", self.path()), &[])
            .await?;

        if message.has_empty_body() && message.source_url.is_some() {
            match self.source(message_id).await {
                Ok(source) if !source.raw.is_empty() => message.text = source.raw,
                Ok(_) => {}
                Err(e) => warn!(message_id, error = %e, "Failed to fetch message source"),
            }
        }

        Ok(message)
    }

    /// Update flags
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn update(&self, message_id: &str, data: &MessageUpdate) -> Result<Message, ApiError> {
        self.client
            .send_json(
                Method::PATCH,
                &format!("{}/{message_id}", self.path()),
                data,
            )
            .await
    }

    /// Delete a message
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn delete(&self, message_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("{}/{message_id}", self.path()))
            .await
    }

    /// Raw RFC 5322 source
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn source(&self, message_id: &str) -> Result<MessageSource, ApiError> {
        self.client
            .get_json(&format!("{}/{message_id}/source", self.path()), &[])
            .await
    }

    /// Download one attachment
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn download_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Download, ApiError> {
        let (bytes, content_type) = self
            .client
            .get_bytes(&format!(
                "{}/{message_id}/attachment/{attachment_id}",
                self.path()
            ))
            .await?;
        Ok(Download {
            bytes,
            content_type,
        })
    }

    /// Download the message as `.eml`
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn download(&self, message_id: &str) -> Result<Download, ApiError> {
        let (bytes, content_type) = self
            .client
            .get_bytes(&format!("{}/{message_id}/download", self.path()))
            .await?;
        Ok(Download {
            bytes,
            content_type,
        })
    }

    /// Move a message to another mailbox of the same account
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn move_to(&self, message_id: &str, target_mailbox_id: &str) -> Result<serde_json::Value, ApiError> {
        self.client
            .send_json(
                Method::PUT,
                &format!("{}/{message_id}/move", self.path()),
                &MessageMove {
                    mailbox: target_mailbox_id.to_string(),
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockUpstream;

    #[tokio::test]
    async fn test_list_sends_cache_buster() {
        let upstream = MockUpstream::start().await;
        let (account, inbox) = upstream.add_account_with_inbox("fay@mock.test");
        upstream.deliver(&account, &inbox, "Hello");

        let client = upstream.client();
        let page = client
            .messages(&account, &inbox)
            .list(Some(1), CacheBust::At(1_700_000_000_000))
            .await
            .unwrap();
        assert_eq!(page.member.len(), 1);
        assert_eq!(
            upstream.last_query("_t").as_deref(),
            Some("1700000000000")
        );
    }

    #[tokio::test]
    async fn test_get_falls_back_to_source() {
        let upstream = MockUpstream::start().await;
        let (account, inbox) = upstream.add_account_with_inbox("gus@mock.test");
        let id = upstream.deliver_raw_only(&account, &inbox, "Subject: raw\r\n\r\nbody");

        let message = upstream
            .client()
            .messages(&account, &inbox)
            .get(&id)
            .await
            .unwrap();
        assert!(message.text.contains("Subject: raw"));
    }

    #[tokio::test]
    async fn test_mark_read_and_delete() {
        let upstream = MockUpstream::start().await;
        let (account, inbox) = upstream.add_account_with_inbox("hal@mock.test");
        let id = upstream.deliver(&account, &inbox, "Ping");
        let client = upstream.client();
        let messages = client.messages(&account, &inbox);

        let updated = messages.update(&id, &MessageUpdate::read()).await.unwrap();
        assert!(updated.summary.is_read);

        messages.delete(&id).await.unwrap();
        assert!(messages.list(None, CacheBust::Off).await.unwrap().member.is_empty());
    }

    #[tokio::test]
    async fn test_downloads() {
        let upstream = MockUpstream::start().await;
        let (account, inbox) = upstream.add_account_with_inbox("ivy@mock.test");
        let id = upstream.deliver(&account, &inbox, "Files");
        let client = upstream.client();
        let messages = client.messages(&account, &inbox);

        let eml = messages.download(&id).await.unwrap();
        assert_eq!(eml.content_type.as_deref(), Some("message/rfc822"));

        let attachment = messages.download_attachment(&id, "att1").await.unwrap();
        assert_eq!(&attachment.bytes[..], b"attachment-bytes");
    }

    #[tokio::test]
    async fn test_move_to_other_mailbox() {
        let upstream = MockUpstream::start().await;
        let (account, inbox) = upstream.add_account_with_inbox("jo@mock.test");
        let id = upstream.deliver(&account, &inbox, "Move me");
        let client = upstream.client();
        let archive = client
            .mailboxes(&account)
            .create(&crate::api::MailboxCreate {
                path: "Archive".into(),
            })
            .await
            .unwrap();

        client
            .messages(&account, &inbox)
            .move_to(&id, &archive.id)
            .await
            .unwrap();

        let moved = client.messages(&account, &archive.id).list(None, CacheBust::Off).await.unwrap();
        assert_eq!(moved.member.len(), 1);
    }
}
