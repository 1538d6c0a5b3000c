//! Audit trail for staff mutations.

use serde_json::Value;

use parfumerie_backend::BackendClient;
use parfumerie_backend::repos::ActivityRepository;
use parfumerie_core::ActivityAction;
use parfumerie_core::models::NewActivityLog;

use crate::models::CurrentStaff;

/// Entity type names written to `activity_logs.entity_type`.
pub mod entity {
    pub const PRODUCT: &str = "product";
    pub const VARIANT: &str = "variant";
    pub const PRODUCT_IMAGE: &str = "product_image";
    pub const ORDER: &str = "order";
    pub const BRAND: &str = "brand";
    pub const CATEGORY: &str = "category";
    pub const DISCOUNT: &str = "discount";
    pub const REVIEW: &str = "review";
}

/// Record a staff action. A failed write is logged and otherwise ignored;
/// the action it describes has already happened.
pub async fn record(
    client: &BackendClient,
    staff: &CurrentStaff,
    action: ActivityAction,
    entity_type: &str,
    entity_id: impl ToString,
    details: Value,
) {
    let entry = NewActivityLog::new(staff.id, action, entity_type, entity_id)
        .by(staff.email.as_str())
        .with_details(details);

    if let Err(e) = ActivityRepository::new(client).record(&entry).await {
        tracing::warn!(
            error = %e,
            action = ?entry.action,
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            "Failed to write activity log"
        );
    }
}
