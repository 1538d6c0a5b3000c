//! Product, variant and image management.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use parfumerie_backend::repos::{
    CategoryRepository, NewProductImage, ProductFilter, ProductRepository,
};
use parfumerie_backend::storage::{
    MAX_UPLOAD_BYTES, PRODUCT_IMAGES_BUCKET, is_supported_image, sanitize_file_name,
};
use parfumerie_backend::StorageClient;
use parfumerie_core::catalog::descendant_ids;
use parfumerie_core::models::{Product, ProductImage, ProductInput, ProductVariant, VariantInput};
use parfumerie_core::{ActivityAction, BrandId, CategoryId, Gender, ProductId};

use super::{PageParams, PageResponse, name_and_slug};
use crate::activity::{self, entity};
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// `GET /products` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub search: Option<String>,
    pub brand_id: Option<BrandId>,
    /// Matches the category and everything below it.
    pub category_id: Option<CategoryId>,
    /// Inactive products are listed unless this is `false`.
    pub include_inactive: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Product create/update body. A missing slug is derived from the name.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

const fn default_active() -> bool {
    true
}

impl ProductForm {
    fn into_input(self) -> Result<ProductInput> {
        let (name, slug) = name_and_slug(&self.name, self.slug.as_deref())?;
        Ok(ProductInput {
            name,
            slug,
            description: self.description.filter(|d| !d.trim().is_empty()),
            brand_id: self.brand_id,
            category_id: self.category_id,
            gender: self.gender,
            is_active: self.is_active,
            is_featured: self.is_featured,
        })
    }
}

/// Check a variant body before it reaches the backend.
pub(crate) fn check_variant(input: &VariantInput) -> Result<()> {
    if input.sku.trim().is_empty() {
        return Err(AppError::Validation("SKU cannot be empty".to_string()));
    }
    if input.price.is_sign_negative() {
        return Err(AppError::Validation("price cannot be negative".to_string()));
    }
    if input.size_ml.is_some_and(|ml| ml <= 0) {
        return Err(AppError::Validation("size must be positive".to_string()));
    }
    if input
        .compare_at_price
        .is_some_and(|compare| compare < input.price)
    {
        return Err(AppError::Validation(
            "compare-at price must not be below the price".to_string(),
        ));
    }
    Ok(())
}

fn product_not_found(id: ProductId) -> impl FnOnce(parfumerie_backend::BackendError) -> AppError {
    move |e| AppError::or_not_found(e, || format!("Product {id} not found"))
}

#[instrument(skip_all, fields(staff_id = %staff.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<PageResponse<Product>>> {
    let client = staff.client(state.backend());
    let pagination = PageParams {
        page: query.page,
        per_page: query.per_page,
    }
    .pagination();

    let category_ids = match query.category_id {
        Some(id) => {
            let tree = CategoryRepository::new(&client).tree().await?;
            descendant_ids(&tree, id)
        }
        None => Vec::new(),
    };
    let filter = ProductFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        brand_id: query.brand_id,
        category_ids,
        include_inactive: query.include_inactive.unwrap_or(true),
        ..ProductFilter::default()
    };

    let page = ProductRepository::new(&client)
        .list(&filter, pagination)
        .await?;
    Ok(Json(PageResponse::new(page, pagination)))
}

pub async fn show(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let client = staff.client(state.backend());
    let product = ProductRepository::new(&client)
        .get(id)
        .await
        .map_err(product_not_found(id))?;
    Ok(Json(product))
}

#[instrument(skip_all, fields(staff_id = %staff.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Json(form): Json<ProductForm>,
) -> Result<(StatusCode, Json<Product>)> {
    let input = form.into_input()?;
    let client = staff.client(state.backend());
    let product = ProductRepository::new(&client).create(&input).await?;

    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    activity::record(
        &client,
        &staff,
        ActivityAction::Created,
        entity::PRODUCT,
        product.id,
        json!({ "name": product.name, "slug": product.slug }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip_all, fields(staff_id = %staff.id, product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<ProductId>,
    Json(form): Json<ProductForm>,
) -> Result<Json<Product>> {
    let input = form.into_input()?;
    let client = staff.client(state.backend());
    let product = ProductRepository::new(&client)
        .update(id, &input)
        .await
        .map_err(product_not_found(id))?;

    activity::record(
        &client,
        &staff,
        ActivityAction::Updated,
        entity::PRODUCT,
        id,
        json!({
            "name": product.name,
            "slug": product.slug,
            "is_active": product.is_active,
        }),
    )
    .await;
    Ok(Json(product))
}

#[instrument(skip_all, fields(staff_id = %staff.id, product_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    let client = staff.client(state.backend());
    ProductRepository::new(&client)
        .delete(id)
        .await
        .map_err(product_not_found(id))?;

    tracing::info!("Product deleted");
    activity::record(
        &client,
        &staff,
        ActivityAction::Deleted,
        entity::PRODUCT,
        id,
        json!({}),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(staff_id = %staff.id, product_id = %id))]
pub async fn create_variant(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<ProductId>,
    Json(input): Json<VariantInput>,
) -> Result<(StatusCode, Json<ProductVariant>)> {
    check_variant(&input)?;
    let client = staff.client(state.backend());
    let products = ProductRepository::new(&client);
    products.get(id).await.map_err(product_not_found(id))?;
    let variant = products.create_variant(id, &input).await?;

    activity::record(
        &client,
        &staff,
        ActivityAction::Created,
        entity::VARIANT,
        variant.id,
        json!({ "product_id": id, "sku": variant.sku, "price": variant.price }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(variant)))
}

/// Upload one image (`file` part, optional `alt` part) and attach it at the
/// end of the product's gallery.
#[instrument(skip_all, fields(staff_id = %staff.id, product_id = %id))]
pub async fn upload_image(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<ProductId>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ProductImage>)> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut alt: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            Some("alt") => {
                alt = Some(field.text().await?).filter(|a| !a.trim().is_empty());
            }
            _ => {}
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Missing `file` part".to_string()))?;
    if !is_supported_image(&content_type) {
        return Err(AppError::BadRequest(format!(
            "Unsupported image type `{content_type}`"
        )));
    }
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Empty file".to_string()));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest(format!(
            "Image exceeds {} MB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }

    let client = staff.client(state.backend());
    let products = ProductRepository::new(&client);
    products.get(id).await.map_err(product_not_found(id))?;

    let path = format!("{id}/{}-{}", Uuid::new_v4(), sanitize_file_name(&file_name));
    let url = StorageClient::new(&client)
        .upload(PRODUCT_IMAGES_BUCKET, &path, bytes, &content_type)
        .await?;
    let position = products.next_image_position(id).await?;
    let image = products
        .add_image(&NewProductImage {
            product_id: id,
            url,
            alt,
            position,
        })
        .await?;

    tracing::info!(image_id = %image.id, path = %path, "Product image uploaded");
    activity::record(
        &client,
        &staff,
        ActivityAction::Created,
        entity::PRODUCT_IMAGE,
        image.id,
        json!({ "product_id": id, "path": path }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(image)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn variant(sku: &str, price: i64, compare: Option<i64>) -> VariantInput {
        VariantInput {
            sku: sku.to_string(),
            size_ml: Some(50),
            price: Decimal::new(price, 2),
            compare_at_price: compare.map(|c| Decimal::new(c, 2)),
            is_active: true,
        }
    }

    #[test]
    fn test_form_defaults() {
        let form: ProductForm = serde_json::from_str(r#"{"name":"Vetiver Noir"}"#).unwrap();
        let input = form.into_input().unwrap();
        assert_eq!(input.slug, "vetiver-noir");
        assert!(input.is_active);
        assert!(!input.is_featured);
    }

    #[test]
    fn test_form_rejects_blank_name() {
        let form: ProductForm = serde_json::from_str(r#"{"name":"  "}"#).unwrap();
        assert!(matches!(form.into_input(), Err(AppError::Catalog(_))));
    }

    #[test]
    fn test_variant_checks() {
        assert!(check_variant(&variant("VN-50", 8900, Some(9900))).is_ok());
        assert!(check_variant(&variant(" ", 8900, None)).is_err());
        assert!(check_variant(&variant("VN-50", -1, None)).is_err());
        assert!(check_variant(&variant("VN-50", 8900, Some(5000))).is_err());
    }

    #[test]
    fn test_list_query_parses_ids() {
        let uri: axum::http::Uri = "/products?brand_id=4&category_id=9&include_inactive=false&page=2"
            .parse()
            .unwrap();
        let Query(query) = Query::<ProductListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.brand_id, Some(BrandId::new(4)));
        assert_eq!(query.category_id, Some(CategoryId::new(9)));
        assert_eq!(query.include_inactive, Some(false));
        assert_eq!(query.page, Some(2));
    }
}
