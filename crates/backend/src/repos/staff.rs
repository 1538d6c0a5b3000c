//! Staff membership checks.

use tracing::instrument;

use super::rpc::IS_STAFF;
use crate::client::BackendClient;
use crate::error::BackendError;

/// Asks the backend whether the client's user is staff.
pub struct StaffRepository<'a> {
    client: &'a BackendClient,
}

impl<'a> StaffRepository<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// Result of the `is_staff` procedure for the current user.
    ///
    /// Anonymous clients are never staff and make no request.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the call fails.
    #[instrument(skip(self), fields(scope = %self.client.scope()))]
    pub async fn is_staff(&self) -> Result<bool, BackendError> {
        if self.client.user_id().is_none() {
            return Ok(false);
        }
        let result: Option<bool> = self
            .client
            .rpc_query(IS_STAFF, &serde_json::json!({}))
            .await?;
        Ok(result.unwrap_or(false))
    }
}
