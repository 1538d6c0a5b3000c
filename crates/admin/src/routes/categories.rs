//! Category management.
//!
//! Parents are checked against the current tree so an update can never
//! close a cycle.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use parfumerie_backend::repos::CategoryRepository;
use parfumerie_core::catalog::{CatalogError, CategoryNode, descendant_ids};
use parfumerie_core::models::{Category, CategoryInput};
use parfumerie_core::{ActivityAction, CategoryId};

use super::name_and_slug;
use crate::activity::{self, entity};
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// Category create/update body.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub sort_order: i32,
}

impl CategoryForm {
    fn into_input(self) -> Result<CategoryInput> {
        let (name, slug) = name_and_slug(&self.name, self.slug.as_deref())?;
        Ok(CategoryInput {
            name,
            slug,
            parent_id: self.parent_id,
            sort_order: self.sort_order,
        })
    }
}

/// Check that `parent` exists and is neither `id` nor below it.
fn check_parent(
    tree: &[CategoryNode],
    id: Option<CategoryId>,
    parent: Option<CategoryId>,
) -> Result<()> {
    let Some(parent) = parent else {
        return Ok(());
    };
    if id == Some(parent) {
        return Err(CatalogError::SelfParent.into());
    }
    let known = tree.iter().any(|root| contains(root, parent));
    if !known {
        return Err(CatalogError::UnknownCategory(parent.to_string()).into());
    }
    if let Some(id) = id
        && descendant_ids(tree, id).contains(&parent)
    {
        return Err(AppError::Validation(
            "a category cannot be moved below one of its own subcategories".to_string(),
        ));
    }
    Ok(())
}

fn contains(node: &CategoryNode, id: CategoryId) -> bool {
    node.category.id == id || node.children.iter().any(|child| contains(child, id))
}

fn category_not_found(id: CategoryId) -> impl FnOnce(parfumerie_backend::BackendError) -> AppError {
    move |e| AppError::or_not_found(e, || format!("Category {id} not found"))
}

/// The category tree.
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
) -> Result<Json<Vec<CategoryNode>>> {
    let client = staff.client(state.backend());
    Ok(Json(CategoryRepository::new(&client).tree().await?))
}

#[instrument(skip_all, fields(staff_id = %staff.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Json(form): Json<CategoryForm>,
) -> Result<(StatusCode, Json<Category>)> {
    let input = form.into_input()?;
    let client = staff.client(state.backend());
    let categories = CategoryRepository::new(&client);
    if input.parent_id.is_some() {
        check_parent(&categories.tree().await?, None, input.parent_id)?;
    }
    let category = categories.create(&input).await?;

    activity::record(
        &client,
        &staff,
        ActivityAction::Created,
        entity::CATEGORY,
        category.id,
        json!({ "name": category.name, "parent_id": category.parent_id }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(category)))
}

#[instrument(skip_all, fields(staff_id = %staff.id, category_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<CategoryId>,
    Json(form): Json<CategoryForm>,
) -> Result<Json<Category>> {
    let input = form.into_input()?;
    let client = staff.client(state.backend());
    let categories = CategoryRepository::new(&client);
    if input.parent_id.is_some() {
        check_parent(&categories.tree().await?, Some(id), input.parent_id)?;
    }
    let category = categories
        .update(id, &input)
        .await
        .map_err(category_not_found(id))?;

    activity::record(
        &client,
        &staff,
        ActivityAction::Updated,
        entity::CATEGORY,
        id,
        json!({ "name": category.name, "parent_id": category.parent_id }),
    )
    .await;
    Ok(Json(category))
}

/// Delete a category. Fails with 409 while products or subcategories
/// still reference it.
#[instrument(skip_all, fields(staff_id = %staff.id, category_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    let client = staff.client(state.backend());
    CategoryRepository::new(&client)
        .delete(id)
        .await
        .map_err(category_not_found(id))?;

    activity::record(
        &client,
        &staff,
        ActivityAction::Deleted,
        entity::CATEGORY,
        id,
        json!({}),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use parfumerie_core::catalog::build_category_tree;

    use super::*;

    fn tree() -> Vec<CategoryNode> {
        let cat = |id: i64, name: &str, parent: Option<i64>| Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            slug: name.to_lowercase(),
            parent_id: parent.map(CategoryId::new),
            sort_order: 0,
        };
        build_category_tree(vec![
            cat(1, "Women", None),
            cat(2, "Floral", Some(1)),
            cat(3, "Rose", Some(2)),
            cat(4, "Men", None),
        ])
    }

    #[test]
    fn test_valid_parent() {
        let tree = tree();
        assert!(check_parent(&tree, None, Some(CategoryId::new(2))).is_ok());
        assert!(check_parent(&tree, Some(CategoryId::new(3)), Some(CategoryId::new(4))).is_ok());
        assert!(check_parent(&tree, Some(CategoryId::new(3)), None).is_ok());
    }

    #[test]
    fn test_self_parent() {
        let err = check_parent(&tree(), Some(CategoryId::new(2)), Some(CategoryId::new(2)));
        assert!(matches!(err, Err(AppError::Catalog(CatalogError::SelfParent))));
    }

    #[test]
    fn test_unknown_parent() {
        let err = check_parent(&tree(), None, Some(CategoryId::new(99)));
        assert!(matches!(
            err,
            Err(AppError::Catalog(CatalogError::UnknownCategory(_)))
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let err = check_parent(&tree(), Some(CategoryId::new(1)), Some(CategoryId::new(3)));
        assert!(matches!(err, Err(AppError::Validation(_))));
    }
}
