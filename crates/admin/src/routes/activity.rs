//! Activity log listing.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use parfumerie_backend::repos::{ActivityFilter, ActivityRepository};
use parfumerie_core::UserId;
use parfumerie_core::models::ActivityLog;

use super::{PageParams, PageResponse};
use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// `GET /activity` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub actor_id: Option<UserId>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ActivityQuery {
    fn filter(&self) -> ActivityFilter {
        let non_blank = |s: &Option<String>| s.clone().filter(|v| !v.trim().is_empty());
        ActivityFilter {
            entity_type: non_blank(&self.entity_type),
            entity_id: non_blank(&self.entity_id),
            actor_id: self.actor_id,
        }
    }
}

/// Newest entries first.
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<PageResponse<ActivityLog>>> {
    let pagination = PageParams {
        page: query.page,
        per_page: query.per_page,
    }
    .pagination();
    let client = staff.client(state.backend());
    let page = ActivityRepository::new(&client)
        .list(&query.filter(), pagination)
        .await?;
    Ok(Json(PageResponse::new(page, pagination)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_filters_ignored() {
        let uri: axum::http::Uri = "/activity?entity_type=order&entity_id=&page=3"
            .parse()
            .unwrap();
        let Query(query) = Query::<ActivityQuery>::try_from_uri(&uri).unwrap();
        let filter = query.filter();
        assert_eq!(filter.entity_type.as_deref(), Some("order"));
        assert!(filter.entity_id.is_none());
        assert!(filter.actor_id.is_none());
        assert_eq!(query.page, Some(3));
    }
}
