//! `/accounts` endpoints

use reqwest::Method;
use tracing::debug;

use super::types::{
    Account, AccountCreate, AccountUpdate, Collection, ListPayload, SearchMapping, SearchView,
};
use super::{ApiError, SmtpDevClient};

/// Default page size used when the API answers with a bare array
pub const DEFAULT_ITEMS_PER_PAGE: u32 = 10;

/// Filters for [`Accounts::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountQuery {
    /// Exact address filter
    pub address: Option<String>,
    /// Activation filter
    pub is_active: Option<bool>,
    /// 1-based page
    pub page: u32,
    /// Page size
    pub items_per_page: u32,
}

impl Default for AccountQuery {
    fn default() -> Self {
        Self {
            address: None,
            is_active: None,
            page: 1,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

impl AccountQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(4);
        if let Some(address) = &self.address {
            params.push(("address", address.clone()));
        }
        if let Some(active) = self.is_active {
            params.push(("isActive", active.to_string()));
        }
        params.push(("page", self.page.to_string()));
        params.push(("itemsPerPage", self.items_per_page.to_string()));
        params
    }
}

/// Account service view over a [`SmtpDevClient`]
#[derive(Debug, Clone, Copy)]
pub struct Accounts<'a> {
    client: &'a SmtpDevClient,
}

impl<'a> Accounts<'a> {
    pub(crate) const fn new(client: &'a SmtpDevClient) -> Self {
        Self { client }
    }

    /// List accounts
    ///
    /// A bare-array answer is paged locally with `query.items_per_page`, and
    /// the Hydra view and search template are synthesized.
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn list(&self, query: &AccountQuery) -> Result<Collection<Account>, ApiError> {
        debug!(?query, "Listing accounts");
        let payload: ListPayload<Account> = self.client.get_json("/accounts", &query.params()).await?;

        Ok(match payload {
            ListPayload::Array(all) => {
                Collection::paged(all, "/accounts", query.page, query.items_per_page)
                    .with_search(account_search())
            }
            other => other.into_collection(),
        })
    }

    /// Create an account
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when the address is taken or malformed.
    pub async fn create(&self, data: &AccountCreate) -> Result<Account, ApiError> {
        debug!(address = %data.address, is_active = ?data.is_active, "Creating account");
        self.client
            .send_json(Method::POST, "/accounts", data)
            .await
    }

    /// Fetch one account
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs.
    pub async fn get(&self, id: &str) -> Result<Account, ApiError> {
        self.client.get_json(&format!("/accounts/{id}"), &[]).await
    }

    /// Delete an account
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/accounts/{id}")).await
    }

    /// Update password or activation
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] on failure.
    pub async fn update(&self, id: &str, data: &AccountUpdate) -> Result<Account, ApiError> {
        self.client
            .send_json(Method::PATCH, &format!("/accounts/{id}"), data)
            .await
    }
}

fn account_search() -> SearchView {
    let mapping = |name: &str| SearchMapping {
        kind: Some("IriTemplateMapping".to_string()),
        variable: Some(name.to_string()),
        property: Some(name.to_string()),
        required: false,
    };
    SearchView {
        kind: Some("IriTemplate".to_string()),
        template: Some("/accounts{?address,isActive}".to_string()),
        variable_representation: Some("BasicRepresentation".to_string()),
        mapping: vec![mapping("address"), mapping("isActive")],
    }
}
