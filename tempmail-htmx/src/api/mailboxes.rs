//! `/accounts/{id}/mailboxes` endpoints

use reqwest::Method;

use super::types::{Collection, ListPayload, Mailbox, MailboxCreate, MailboxUpdate};
use super::{ApiError, SmtpDevClient};

/// Mailbox service view scoped to one account
#[derive(Debug, Clone, Copy)]
pub struct Mailboxes<'a> {
    client: &'a SmtpDevClient,
    account_id: &'a str,
}

impl<'a> Mailboxes<'a> {
    pub(crate) const fn new(client: &'a SmtpDevClient, account_id: &'a str) -> Self {
        Self { client, account_id }
    }

    fn path(&self) -> String {
        format!("/accounts/{}/mailboxes", self.account_id)
    }

    /// List mailboxes
    ///
    /// Accepts a Hydra collection, a bare array, or an account object with
    /// an embedded `mailboxes` array.
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn list(&self, page: Option<u32>) -> Result<Collection<Mailbox>, ApiError> {
        let params: Vec<(&str, String)> = page.map(|p| ("page", p.to_string())).into_iter().collect();
        let payload: ListPayload<Mailbox> = self.client.get_json(&self.path(), &params).await?;
        Ok(payload.into_collection())
    }

    /// Create a folder
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn create(&self, data: &MailboxCreate) -> Result<Mailbox, ApiError> {
        self.client.send_json(Method::POST, &self.path(), data).await
    }

    /// Fetch one folder
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs.
    pub async fn get(&self, mailbox_id: &str) -> Result<Mailbox, ApiError> {
        self.client
            .get_json(&format!("{}/{mailbox_id}", self.path()), &[])
            .await
    }

    /// Delete a folder
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn delete(&self, mailbox_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("{}/{mailbox_id}", self.path()))
            .await
    }

    /// Rename a folder
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn update(&self, mailbox_id: &str, data: &MailboxUpdate) -> Result<Mailbox, ApiError> {
        self.client
            .send_json(Method::PATCH, &format!("{}/{mailbox_id}", self.path()), data)
            .await
    }
}
