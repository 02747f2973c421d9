//! `/domains` endpoints

use reqwest::Method;

use super::types::{Collection, Domain, DomainCreate, DomainUpdate, ListPayload};
use super::{ApiError, SmtpDevClient};

/// Domain service view over a [`SmtpDevClient`]
#[derive(Debug, Clone, Copy)]
pub struct Domains<'a> {
    client: &'a SmtpDevClient,
}

impl<'a> Domains<'a> {
    pub(crate) const fn new(client: &'a SmtpDevClient) -> Self {
        Self { client }
    }

    /// List domains, optionally filtered by activation
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn list(
        &self,
        is_active: Option<bool>,
        page: Option<u32>,
    ) -> Result<Collection<Domain>, ApiError> {
        let mut params = Vec::new();
        if let Some(active) = is_active {
            params.push(("isActive", active.to_string()));
        }
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        let payload: ListPayload<Domain> = self.client.get_json("/domains", &params).await?;
        Ok(payload.into_collection())
    }

    /// Register a domain
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn create(&self, data: &DomainCreate) -> Result<Domain, ApiError> {
        self.client.send_json(Method::POST, "/domains", data).await
    }

    /// Fetch one domain
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs.
    pub async fn get(&self, id: &str) -> Result<Domain, ApiError> {
        self.client.get_json(&format!("/domains/{id}"), &[]).await
    }

    /// Remove a domain
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/domains/{id}")).await
    }

    /// Toggle activation
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn update(&self, id: &str, data: DomainUpdate) -> Result<Domain, ApiError> {
        self.client
            .send_json(Method::PATCH, &format!("/domains/{id}"), &data)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockUpstream;

    #[tokio::test]
    async fn test_list_and_filter() {
        let upstream = MockUpstream::start().await;
        upstream.add_domain("off.test", false);

        let client = upstream.client();
        let all = client.domains().list(None, None).await.unwrap();
        assert_eq!(all.member.len(), 2);

        let active = client.domains().list(Some(true), Some(1)).await.unwrap();
        assert_eq!(active.member.len(), 1);
        assert_eq!(active.member[0].domain, "mock.test");
    }

    #[tokio::test]
    async fn test_create_toggle_delete() {
        let upstream = MockUpstream::start().await;
        let client = upstream.client();

        let domain = client
            .domains()
            .create(&DomainCreate {
                domain: "new.test".into(),
                is_active: Some(true),
            })
            .await
            .unwrap();
        assert!(domain.is_active);

        let toggled = client
            .domains()
            .update(&domain.id, DomainUpdate { is_active: false })
            .await
            .unwrap();
        assert!(!toggled.is_active);

        client.domains().delete(&domain.id).await.unwrap();
        assert!(client.domains().get(&domain.id).await.is_err());
    }
}
