//! Stock commands.

use std::io::Write;

use parfumerie_backend::BackendClient;
use parfumerie_backend::repos::{InventoryRepository, ProductRepository};
use parfumerie_core::VariantId;
use parfumerie_core::models::ProductVariant;

use super::CliError;

pub async fn show(
    client: &BackendClient,
    variant: VariantId,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let stock = InventoryRepository::new(client).current(variant).await?;
    writeln!(out, "variant {variant}: {stock}")?;
    Ok(())
}

pub async fn adjust(
    client: &BackendClient,
    variant: VariantId,
    delta: i32,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let stock = InventoryRepository::new(client)
        .adjust(variant, delta)
        .await?;
    writeln!(out, "variant {variant}: {stock} ({delta:+})")?;
    Ok(())
}

pub async fn set(
    client: &BackendClient,
    variant: VariantId,
    target: i32,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let change = InventoryRepository::new(client).set(variant, target).await?;
    if change.changed() {
        writeln!(out, "variant {variant}: {} (was {})", change.level, change.previous)?;
    } else {
        writeln!(out, "variant {variant}: {} (unchanged)", change.level)?;
    }
    Ok(())
}

pub async fn low(
    client: &BackendClient,
    threshold: i32,
    limit: u32,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let variants = ProductRepository::new(client)
        .low_stock(threshold, limit)
        .await?;
    if variants.is_empty() {
        tracing::info!(threshold, "No variants at or below threshold");
    }
    write_low_stock(&variants, out)?;
    Ok(())
}

/// One line per variant: stock, SKU, product name.
fn write_low_stock(variants: &[ProductVariant], out: &mut impl Write) -> std::io::Result<()> {
    for variant in variants {
        let product = variant
            .product
            .as_ref()
            .map_or("-", |p| p.name.as_str());
        writeln!(
            out,
            "{:>5}  {:<20}  {product}",
            variant.stock, variant.sku
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use parfumerie_core::ProductId;
    use parfumerie_core::models::VariantProduct;
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_low_stock_lines() {
        let variant = ProductVariant {
            id: VariantId::new(41),
            product_id: ProductId::new(7),
            sku: "ORC-50".to_string(),
            size_ml: Some(50),
            price: Decimal::new(11900, 2),
            compare_at_price: None,
            stock: 2,
            is_active: true,
            product: Some(VariantProduct {
                name: "Orchidée".to_string(),
                slug: None,
            }),
        };
        let mut out = Vec::new();
        write_low_stock(&[variant], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("    2  ORC-50"));
        assert!(text.trim_end().ends_with("Orchidée"));
    }
}
