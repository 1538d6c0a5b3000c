//! Brand management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use parfumerie_backend::repos::BrandRepository;
use parfumerie_core::models::{Brand, BrandInput};
use parfumerie_core::{ActivityAction, BrandId};

use super::name_and_slug;
use crate::activity::{self, entity};
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// Brand create/update body.
#[derive(Debug, Deserialize)]
pub struct BrandForm {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl BrandForm {
    fn into_input(self) -> Result<BrandInput> {
        let (name, slug) = name_and_slug(&self.name, self.slug.as_deref())?;
        let logo_url = self.logo_url.filter(|u| !u.trim().is_empty());
        if let Some(url) = logo_url.as_deref() {
            url::Url::parse(url)
                .map_err(|e| AppError::Validation(format!("Invalid logo URL: {e}")))?;
        }
        Ok(BrandInput {
            name,
            slug,
            description: self.description.filter(|d| !d.trim().is_empty()),
            logo_url,
        })
    }
}

fn brand_not_found(id: BrandId) -> impl FnOnce(parfumerie_backend::BackendError) -> AppError {
    move |e| AppError::or_not_found(e, || format!("Brand {id} not found"))
}

pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
) -> Result<Json<Vec<Brand>>> {
    let client = staff.client(state.backend());
    Ok(Json(BrandRepository::new(&client).list().await?))
}

#[instrument(skip_all, fields(staff_id = %staff.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Json(form): Json<BrandForm>,
) -> Result<(StatusCode, Json<Brand>)> {
    let input = form.into_input()?;
    let client = staff.client(state.backend());
    let brand = BrandRepository::new(&client).create(&input).await?;

    activity::record(
        &client,
        &staff,
        ActivityAction::Created,
        entity::BRAND,
        brand.id,
        json!({ "name": brand.name, "slug": brand.slug }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(brand)))
}

#[instrument(skip_all, fields(staff_id = %staff.id, brand_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<BrandId>,
    Json(form): Json<BrandForm>,
) -> Result<Json<Brand>> {
    let input = form.into_input()?;
    let client = staff.client(state.backend());
    let brand = BrandRepository::new(&client)
        .update(id, &input)
        .await
        .map_err(brand_not_found(id))?;

    activity::record(
        &client,
        &staff,
        ActivityAction::Updated,
        entity::BRAND,
        id,
        json!({ "name": brand.name, "slug": brand.slug }),
    )
    .await;
    Ok(Json(brand))
}

/// Delete a brand. Fails with 409 while products still reference it.
#[instrument(skip_all, fields(staff_id = %staff.id, brand_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<BrandId>,
) -> Result<StatusCode> {
    let client = staff.client(state.backend());
    BrandRepository::new(&client)
        .delete(id)
        .await
        .map_err(brand_not_found(id))?;

    activity::record(
        &client,
        &staff,
        ActivityAction::Deleted,
        entity::BRAND,
        id,
        json!({}),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_optionals_dropped() {
        let form: BrandForm = serde_json::from_str(
            r#"{"name":"Maison Lumière","description":" ","logo_url":""}"#,
        )
        .unwrap();
        let input = form.into_input().unwrap();
        assert_eq!(input.slug, "maison-lumi-re");
        assert!(input.description.is_none());
        assert!(input.logo_url.is_none());
    }

    #[test]
    fn test_bad_logo_url_rejected() {
        let form: BrandForm =
            serde_json::from_str(r#"{"name":"Oakmoss","logo_url":"not a url"}"#).unwrap();
        assert!(matches!(form.into_input(), Err(AppError::Validation(_))));
    }
}
