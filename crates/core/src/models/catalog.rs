//! Catalog records: brands, categories, products, variants and images.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{BrandId, CategoryId, Gender, ImageId, ProductId, VariantId};

/// A fragrance house.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Writable brand fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandInput {
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

/// A node in the category hierarchy as stored (flat, with a parent link).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub sort_order: i32,
}

/// Writable category fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub sort_order: i32,
}

/// A product with optional embedded relations.
///
/// Embedded fields are only present when the select string asks for them,
/// e.g. `*, brand:brands(*), variants:product_variants(*)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub price_from: Option<Decimal>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<Brand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ProductImage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Active variants ordered by price.
    #[must_use]
    pub fn active_variants(&self) -> Vec<&ProductVariant> {
        let mut variants: Vec<&ProductVariant> =
            self.variants.iter().filter(|v| v.is_active).collect();
        variants.sort_by(|a, b| a.price.cmp(&b.price));
        variants
    }

    /// Whether any active variant has stock.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.variants.iter().any(|v| v.is_active && v.stock > 0)
    }

    /// Image with the lowest position, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images.iter().min_by_key(|img| img.position)
    }
}

/// Writable product fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

/// A purchasable size of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub sku: String,
    #[serde(default)]
    pub size_ml: Option<i32>,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Parent product, when embedded with `product:products(name, slug)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<VariantProduct>,
}

impl ProductVariant {
    /// Human label for the variant, e.g. `50 ml`.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.size_ml.map(|ml| format!("{ml} ml"))
    }

    /// Whether the variant is discounted against its compare-at price.
    #[must_use]
    pub fn on_sale(&self) -> bool {
        self.compare_at_price.is_some_and(|cmp| cmp > self.price)
    }
}

/// Minimal product fields embedded in a variant row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantProduct {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Writable variant fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantInput {
    pub sku: String,
    #[serde(default)]
    pub size_ml: Option<i32>,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A product photo stored in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ImageId,
    pub product_id: ProductId,
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub position: i32,
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product_json() -> serde_json::Value {
        json!({
            "id": 1,
            "name": "Oud Nuit",
            "slug": "oud-nuit",
            "brand_id": 3,
            "gender": "unisex",
            "price_from": 89.5,
            "is_active": true,
            "brand": { "id": 3, "name": "Maison Lune", "slug": "maison-lune" },
            "images": [
                { "id": 11, "product_id": 1, "url": "b.jpg", "position": 2 },
                { "id": 10, "product_id": 1, "url": "a.jpg", "position": 1 }
            ],
            "variants": [
                { "id": 21, "product_id": 1, "sku": "ON-100", "size_ml": 100, "price": "139.00", "stock": 0 },
                { "id": 20, "product_id": 1, "sku": "ON-50", "size_ml": 50, "price": 89.5, "stock": 4,
                  "compare_at_price": 99 }
            ]
        })
    }

    #[test]
    fn test_product_deserializes_with_embeds() {
        let product: Product = serde_json::from_value(product_json()).unwrap();
        assert_eq!(product.brand.as_ref().unwrap().name, "Maison Lune");
        assert_eq!(product.price_from, Some(Decimal::new(895, 1)));
        assert_eq!(product.primary_image().unwrap().url, "a.jpg");
        assert!(product.in_stock());
    }

    #[test]
    fn test_active_variants_sorted_by_price() {
        let product: Product = serde_json::from_value(product_json()).unwrap();
        let skus: Vec<&str> = product
            .active_variants()
            .iter()
            .map(|v| v.sku.as_str())
            .collect();
        assert_eq!(skus, vec!["ON-50", "ON-100"]);
    }

    #[test]
    fn test_variant_label_and_sale() {
        let product: Product = serde_json::from_value(product_json()).unwrap();
        let cheapest = product.active_variants()[0];
        assert_eq!(cheapest.label().as_deref(), Some("50 ml"));
        assert!(cheapest.on_sale());
    }

    #[test]
    fn test_product_without_embeds() {
        let product: Product = serde_json::from_value(json!({
            "id": 2, "name": "Bare", "slug": "bare"
        }))
        .unwrap();
        assert!(product.is_active);
        assert!(product.variants.is_empty());
        assert!(!product.in_stock());
    }
}
