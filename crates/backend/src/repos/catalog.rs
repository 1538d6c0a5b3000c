//! Products, variants, images, brands and categories.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use parfumerie_core::catalog::{CategoryNode, build_category_tree};
use parfumerie_core::models::{
    Brand, BrandInput, Category, CategoryInput, Product, ProductImage, ProductInput,
    ProductVariant, VariantInput,
};
use parfumerie_core::{BrandId, CategoryId, Gender, ProductId, VariantId};

use super::first_row;
use super::tables::{BRANDS, CATEGORIES, PRODUCT_IMAGES, PRODUCT_VARIANTS, PRODUCTS};
use crate::client::{BackendClient, Page};
use crate::error::BackendError;
use crate::query::{Pagination, Query};

const PRODUCT_LIST_SELECT: &str =
    "*, brand:brands(*), category:categories(*), images:product_images(*)";
const PRODUCT_DETAIL_SELECT: &str = "*, brand:brands(*), category:categories(*), \
     images:product_images(*), variants:product_variants(*)";
const VARIANT_SELECT: &str = "*, product:products(name, slug)";
const SEARCH_COLUMNS: &[&str] = &["name", "description"];

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

/// Listing filters. Empty fields do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub brand_id: Option<BrandId>,
    /// Categories to match, usually a category and its descendants.
    pub category_ids: Vec<CategoryId>,
    pub gender: Option<Gender>,
    pub featured: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Include inactive products (admin listings).
    pub include_inactive: bool,
    pub sort: ProductSort,
}

impl ProductFilter {
    fn apply(&self, mut query: Query) -> Query {
        if !self.include_inactive {
            query = query.eq("is_active", true);
        }
        if let Some(brand) = self.brand_id {
            query = query.eq("brand_id", brand);
        }
        match self.category_ids.as_slice() {
            [] => {}
            [only] => query = query.eq("category_id", only),
            many => query = query.in_list("category_id", many),
        }
        if let Some(gender) = self.gender {
            query = query.eq("gender", gender.as_str());
        }
        if let Some(featured) = self.featured {
            query = query.eq("is_featured", featured);
        }
        if let Some(min) = self.min_price {
            query = query.gte("price_from", min);
        }
        if let Some(max) = self.max_price {
            query = query.lte("price_from", max);
        }
        if let Some(term) = self.search.as_deref() {
            query = query.search(term, SEARCH_COLUMNS);
        }
        match self.sort {
            ProductSort::Newest => query.order("created_at", false).order("id", false),
            ProductSort::PriceAsc => query.order("price_from", true).order("id", true),
            ProductSort::PriceDesc => query.order("price_from", false).order("id", true),
            ProductSort::Name => query.order("name", true).order("id", true),
        }
    }
}

/// Insert payload for `product_variants`.
#[derive(Debug, Serialize)]
struct NewVariant<'a> {
    product_id: ProductId,
    #[serde(flatten)]
    fields: &'a VariantInput,
}

/// Insert payload for `product_images`.
#[derive(Debug, Clone, Serialize)]
pub struct NewProductImage {
    pub product_id: ProductId,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    pub position: i32,
}

/// Repository for products, their variants and images.
pub struct ProductRepository<'a> {
    client: &'a BackendClient,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// List products with brand, category and images embedded.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> Result<Page<Product>, BackendError> {
        let query = filter.apply(Query::table(PRODUCTS).select(PRODUCT_LIST_SELECT));
        self.client.fetch(&query.paginate(pagination)).await
    }

    /// Featured active products.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn featured(&self, limit: u32) -> Result<Vec<Product>, BackendError> {
        let filter = ProductFilter {
            featured: Some(true),
            ..ProductFilter::default()
        };
        let query = filter.apply(Query::table(PRODUCTS).select(PRODUCT_LIST_SELECT));
        Ok(self.client.fetch(&query.limit(limit)).await?.data)
    }

    /// Active product by slug with variants embedded.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if no active product has the slug.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<Product, BackendError> {
        let query = Query::table(PRODUCTS)
            .select(PRODUCT_DETAIL_SELECT)
            .eq("slug", slug)
            .eq("is_active", true);
        self.client
            .fetch_one(&query)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("product {slug}")))
    }

    /// Product by id, active or not.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the product does not exist.
    pub async fn get(&self, id: ProductId) -> Result<Product, BackendError> {
        let query = Query::table(PRODUCTS)
            .select(PRODUCT_DETAIL_SELECT)
            .eq("id", id);
        self.client
            .fetch_one(&query)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("product {id}")))
    }

    /// Number of products.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn count(&self) -> Result<u64, BackendError> {
        self.client.count(&Query::table(PRODUCTS)).await
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if the slug is taken.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: &ProductInput) -> Result<Product, BackendError> {
        let rows = self.client.insert(PRODUCTS, input, &[]).await?;
        first_row(rows, || "created product".to_string())
    }

    /// Replace a product's writable fields.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the product does not exist.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: ProductId, input: &ProductInput) -> Result<Product, BackendError> {
        let rows = self
            .client
            .update(&Query::table(PRODUCTS).eq("id", id), input, &[])
            .await?;
        first_row(rows, || format!("product {id}"))
    }

    /// Delete a product. Variants and images cascade in the database.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), BackendError> {
        let rows: Vec<serde_json::Value> = self
            .client
            .delete(
                &Query::table(PRODUCTS).eq("id", id),
                &[PRODUCT_VARIANTS, PRODUCT_IMAGES],
            )
            .await?;
        first_row(rows, || format!("product {id}")).map(|_| ())
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// Variants with their product name, read fresh (no cache).
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn variants_by_ids(
        &self,
        ids: &[VariantId],
    ) -> Result<Vec<ProductVariant>, BackendError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::table(PRODUCT_VARIANTS)
            .select(VARIANT_SELECT)
            .in_list("id", ids)
            .with_count(false);
        Ok(self.client.fetch_fresh(&query).await?.data)
    }

    /// One variant by id.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the variant does not exist.
    pub async fn get_variant(&self, id: VariantId) -> Result<ProductVariant, BackendError> {
        let query = Query::table(PRODUCT_VARIANTS)
            .select(VARIANT_SELECT)
            .eq("id", id);
        self.client
            .fetch_one(&query)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("variant {id}")))
    }

    /// Add a variant to a product.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if the SKU is taken.
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_variant(
        &self,
        product_id: ProductId,
        input: &VariantInput,
    ) -> Result<ProductVariant, BackendError> {
        let payload = NewVariant {
            product_id,
            fields: input,
        };
        let rows = self
            .client
            .insert(PRODUCT_VARIANTS, &payload, &[PRODUCTS])
            .await?;
        first_row(rows, || "created variant".to_string())
    }

    /// Replace a variant's writable fields. Stock is changed separately.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the variant does not exist.
    #[instrument(skip(self, input))]
    pub async fn update_variant(
        &self,
        id: VariantId,
        input: &VariantInput,
    ) -> Result<ProductVariant, BackendError> {
        let rows = self
            .client
            .update(
                &Query::table(PRODUCT_VARIANTS).eq("id", id),
                input,
                &[PRODUCTS],
            )
            .await?;
        first_row(rows, || format!("variant {id}"))
    }

    /// Active variants at or below `threshold`, lowest stock first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn low_stock(
        &self,
        threshold: i32,
        limit: u32,
    ) -> Result<Vec<ProductVariant>, BackendError> {
        let query = Query::table(PRODUCT_VARIANTS)
            .select(VARIANT_SELECT)
            .eq("is_active", true)
            .lte("stock", threshold)
            .order("stock", true)
            .order("id", true)
            .limit(limit);
        Ok(self.client.fetch(&query).await?.data)
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Record an uploaded image.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the insert fails.
    pub async fn add_image(&self, image: &NewProductImage) -> Result<ProductImage, BackendError> {
        let rows = self
            .client
            .insert(PRODUCT_IMAGES, image, &[PRODUCTS])
            .await?;
        first_row(rows, || "created image".to_string())
    }

    /// Next free image position for a product.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn next_image_position(&self, product_id: ProductId) -> Result<i32, BackendError> {
        let query = Query::table(PRODUCT_IMAGES)
            .eq("product_id", product_id)
            .order("position", false);
        let last: Option<ProductImage> = self.client.fetch_one(&query).await?;
        Ok(last.map_or(0, |img| img.position.saturating_add(1)))
    }
}

/// Repository for brands.
pub struct BrandRepository<'a> {
    client: &'a BackendClient,
}

impl<'a> BrandRepository<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// All brands by name.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn list(&self) -> Result<Vec<Brand>, BackendError> {
        let query = Query::table(BRANDS).order("name", true).with_count(false);
        Ok(self.client.fetch(&query).await?.data)
    }

    /// Brand by slug.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Brand>, BackendError> {
        self.client
            .fetch_one(&Query::table(BRANDS).eq("slug", slug))
            .await
    }

    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &BrandInput) -> Result<Brand, BackendError> {
        let rows = self.client.insert(BRANDS, input, &[PRODUCTS]).await?;
        first_row(rows, || "created brand".to_string())
    }

    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the brand does not exist.
    pub async fn update(&self, id: BrandId, input: &BrandInput) -> Result<Brand, BackendError> {
        let rows = self
            .client
            .update(&Query::table(BRANDS).eq("id", id), input, &[PRODUCTS])
            .await?;
        first_row(rows, || format!("brand {id}"))
    }

    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the brand does not exist, or
    /// `Conflict` if products still reference it.
    pub async fn delete(&self, id: BrandId) -> Result<(), BackendError> {
        let rows: Vec<serde_json::Value> = self
            .client
            .delete(&Query::table(BRANDS).eq("id", id), &[PRODUCTS])
            .await?;
        first_row(rows, || format!("brand {id}")).map(|_| ())
    }
}

/// Repository for categories.
pub struct CategoryRepository<'a> {
    client: &'a BackendClient,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// All categories, flat.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, BackendError> {
        let query = Query::table(CATEGORIES)
            .order("sort_order", true)
            .order("name", true)
            .with_count(false);
        Ok(self.client.fetch(&query).await?.data)
    }

    /// All categories as a tree.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn tree(&self) -> Result<Vec<CategoryNode>, BackendError> {
        Ok(build_category_tree(self.list().await?))
    }

    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &CategoryInput) -> Result<Category, BackendError> {
        let rows = self.client.insert(CATEGORIES, input, &[PRODUCTS]).await?;
        first_row(rows, || "created category".to_string())
    }

    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the category does not exist.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, BackendError> {
        let rows = self
            .client
            .update(&Query::table(CATEGORIES).eq("id", id), input, &[PRODUCTS])
            .await?;
        first_row(rows, || format!("category {id}"))
    }

    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the category does not exist.
    pub async fn delete(&self, id: CategoryId) -> Result<(), BackendError> {
        let rows: Vec<serde_json::Value> = self
            .client
            .delete(&Query::table(CATEGORIES).eq("id", id), &[PRODUCTS])
            .await?;
        first_row(rows, || format!("category {id}")).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(filter: &ProductFilter) -> Vec<(String, String)> {
        filter.apply(Query::table(PRODUCTS)).to_pairs()
    }

    #[test]
    fn test_default_filter_shows_active_newest_first() {
        let pairs = pairs(&ProductFilter::default());
        assert!(pairs.contains(&("is_active".to_string(), "eq.true".to_string())));
        assert!(pairs.contains(&("order".to_string(), "created_at.desc,id.desc".to_string())));
    }

    #[test]
    fn test_category_filter_uses_in_for_many() {
        let one = pairs(&ProductFilter {
            category_ids: vec![CategoryId::new(4)],
            ..ProductFilter::default()
        });
        assert!(one.contains(&("category_id".to_string(), "eq.4".to_string())));

        let many = pairs(&ProductFilter {
            category_ids: vec![CategoryId::new(4), CategoryId::new(9)],
            ..ProductFilter::default()
        });
        assert!(many.contains(&("category_id".to_string(), "in.(4,9)".to_string())));
    }

    #[test]
    fn test_price_and_search_filters() {
        let pairs = pairs(&ProductFilter {
            search: Some("rose".to_string()),
            min_price: Some(Decimal::new(2000, 2)),
            gender: Some(Gender::Women),
            include_inactive: true,
            sort: ProductSort::PriceAsc,
            ..ProductFilter::default()
        });
        assert!(!pairs.iter().any(|(k, _)| k == "is_active"));
        assert!(pairs.contains(&("price_from".to_string(), "gte.20.00".to_string())));
        assert!(pairs.contains(&("gender".to_string(), "eq.women".to_string())));
        assert!(pairs.contains(&(
            "or".to_string(),
            "(name.ilike.*rose*,description.ilike.*rose*)".to_string()
        )));
        assert!(pairs.contains(&("order".to_string(), "price_from.asc,id.asc".to_string())));
    }

    #[test]
    fn test_sort_parses_from_snake_case() {
        let sort: ProductSort = serde_json::from_str("\"price_desc\"").unwrap_or_default();
        assert_eq!(sort, ProductSort::PriceDesc);
    }
}
