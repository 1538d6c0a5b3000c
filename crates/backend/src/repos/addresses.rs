//! Saved customer addresses.

use serde::Serialize;
use tracing::instrument;

use parfumerie_core::models::{Address, NewAddress, ShippingAddress};
use parfumerie_core::{AddressId, UserId};

use super::first_row;
use super::tables::ADDRESSES;
use crate::client::BackendClient;
use crate::error::BackendError;
use crate::query::Query;

#[derive(Serialize)]
struct AddressPatch<'a> {
    #[serde(flatten)]
    fields: &'a ShippingAddress,
    is_default: bool,
}

#[derive(Serialize)]
struct DefaultPatch {
    is_default: bool,
}

/// Repository for addresses. Needs a user-scoped client.
pub struct AddressRepository<'a> {
    client: &'a BackendClient,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// A user's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn list(&self, user: UserId) -> Result<Vec<Address>, BackendError> {
        let query = Query::table(ADDRESSES)
            .eq("user_id", user)
            .order("is_default", false)
            .order("id", true)
            .with_count(false);
        Ok(self.client.fetch(&query).await?.data)
    }

    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the address does not exist or
    /// belongs to someone else.
    pub async fn get(&self, user: UserId, id: AddressId) -> Result<Address, BackendError> {
        let query = Query::table(ADDRESSES).eq("id", id).eq("user_id", user);
        self.client
            .fetch_one(&query)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("address {id}")))
    }

    /// The user's default address, if any.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn default_for(&self, user: UserId) -> Result<Option<Address>, BackendError> {
        let query = Query::table(ADDRESSES)
            .eq("user_id", user)
            .eq("is_default", true);
        self.client.fetch_one(&query).await
    }

    /// Save a new address. A default address replaces the previous default.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if a write fails.
    #[instrument(skip(self, address), fields(user_id = %address.user_id))]
    pub async fn create(&self, address: &NewAddress) -> Result<Address, BackendError> {
        if address.is_default {
            self.clear_default(address.user_id, None).await?;
        }
        let rows = self.client.insert(ADDRESSES, address, &[]).await?;
        first_row(rows, || "created address".to_string())
    }

    /// Replace an address's fields.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the address does not exist or
    /// belongs to someone else.
    #[instrument(skip(self, fields))]
    pub async fn update(
        &self,
        user: UserId,
        id: AddressId,
        fields: &ShippingAddress,
        is_default: bool,
    ) -> Result<Address, BackendError> {
        if is_default {
            self.clear_default(user, Some(id)).await?;
        }
        let rows = self
            .client
            .update(
                &Query::table(ADDRESSES).eq("id", id).eq("user_id", user),
                &AddressPatch { fields, is_default },
                &[],
            )
            .await?;
        first_row(rows, || format!("address {id}"))
    }

    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the address does not exist or
    /// belongs to someone else.
    pub async fn delete(&self, user: UserId, id: AddressId) -> Result<(), BackendError> {
        let rows: Vec<Address> = self
            .client
            .delete(
                &Query::table(ADDRESSES).eq("id", id).eq("user_id", user),
                &[],
            )
            .await?;
        first_row(rows, || format!("address {id}")).map(|_| ())
    }

    async fn clear_default(
        &self,
        user: UserId,
        except: Option<AddressId>,
    ) -> Result<(), BackendError> {
        let mut query = Query::table(ADDRESSES)
            .eq("user_id", user)
            .eq("is_default", true);
        if let Some(id) = except {
            query = query.neq("id", id);
        }
        let _: Vec<Address> = self
            .client
            .update(&query, &DefaultPatch { is_default: false }, &[])
            .await?;
        Ok(())
    }
}
