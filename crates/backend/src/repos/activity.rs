//! Back-office activity log.

use serde::Deserialize;
use tracing::instrument;

use parfumerie_core::UserId;
use parfumerie_core::models::{ActivityLog, NewActivityLog};

use super::first_row;
use super::tables::ACTIVITY_LOGS;
use crate::client::{BackendClient, Page};
use crate::error::BackendError;
use crate::query::{Pagination, Query};

/// Activity listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActivityFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub actor_id: Option<UserId>,
}

/// Repository for activity log entries.
pub struct ActivityRepository<'a> {
    client: &'a BackendClient,
}

impl<'a> ActivityRepository<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the insert fails.
    #[instrument(skip(self, entry), fields(action = ?entry.action, entity_type = %entry.entity_type))]
    pub async fn record(&self, entry: &NewActivityLog) -> Result<ActivityLog, BackendError> {
        let rows = self.client.insert(ACTIVITY_LOGS, entry, &[]).await?;
        first_row(rows, || "created activity log".to_string())
    }

    /// Entries matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn list(
        &self,
        filter: &ActivityFilter,
        pagination: Pagination,
    ) -> Result<Page<ActivityLog>, BackendError> {
        let mut query = Query::table(ACTIVITY_LOGS);
        if let Some(entity_type) = filter.entity_type.as_deref() {
            query = query.eq("entity_type", entity_type);
        }
        if let Some(entity_id) = filter.entity_id.as_deref() {
            query = query.eq("entity_id", entity_id);
        }
        if let Some(actor) = filter.actor_id {
            query = query.eq("actor_id", actor);
        }
        self.client
            .fetch(
                &query
                    .order("created_at", false)
                    .order("id", false)
                    .paginate(pagination),
            )
            .await
    }
}
