//! Discount commands.

use std::io::Write;

use chrono::Utc;
use rust_decimal::Decimal;

use parfumerie_backend::BackendClient;
use parfumerie_backend::repos::DiscountRepository;
use parfumerie_core::round_money;

use super::CliError;

/// Quote `code` against `subtotal` as of now. A rejected code is an error.
pub async fn check(
    client: &BackendClient,
    code: &str,
    subtotal: Decimal,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let quote = DiscountRepository::new(client)
        .quote(code, subtotal, Utc::now())
        .await?;
    let remaining = round_money(subtotal - quote.amount);
    writeln!(
        out,
        "{}: -{} on {} leaves {}",
        quote.code,
        round_money(quote.amount),
        round_money(subtotal),
        remaining
    )?;
    if let Some(max) = quote.discount.max_uses {
        writeln!(out, "uses: {}/{max}", quote.discount.used_count)?;
    }
    Ok(())
}
