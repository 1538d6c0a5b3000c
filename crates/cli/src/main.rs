//! Parfumerie CLI - operator tools against the hosted backend.
//!
//! # Usage
//!
//! ```bash
//! # Receive 12 units of variant 41
//! pf-cli stock adjust 41 12
//!
//! # Write off 2 damaged units
//! pf-cli stock adjust 41 -2
//!
//! # Correct a stock count after a stocktake
//! pf-cli stock set 41 30
//!
//! # Variants at or below 5 units
//! pf-cli stock low --threshold 5
//!
//! # Would SPRING10 apply to an 80.00 order right now?
//! pf-cli discount check SPRING10 --subtotal 80.00
//!
//! # Print the category hierarchy
//! pf-cli categories tree
//! ```
//!
//! # Environment Variables
//!
//! - `BACKEND_URL`, `BACKEND_ANON_KEY` - Hosted backend
//! - `BACKEND_SERVICE_ROLE_KEY` - Service role key; every command runs with it

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use parfumerie_backend::{BackendClient, BackendConfig};
use parfumerie_core::VariantId;

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "pf-cli")]
#[command(author, version, about = "Parfumerie operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and change stock levels
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
    /// Discount code tools
    Discount {
        #[command(subcommand)]
        action: DiscountAction,
    },
    /// Category tools
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },
}

#[derive(Subcommand)]
enum StockAction {
    /// Show a variant's current stock
    Show { variant: VariantId },
    /// Change stock by a signed delta
    Adjust {
        variant: VariantId,
        #[arg(allow_hyphen_values = true)]
        delta: i32,
    },
    /// Set stock to an absolute level
    Set { variant: VariantId, stock: i32 },
    /// List active variants at or below a threshold
    Low {
        #[arg(short, long, default_value_t = 5)]
        threshold: i32,
        #[arg(short, long, default_value_t = 50)]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum DiscountAction {
    /// Check whether a code applies to an order subtotal
    Check {
        code: String,
        #[arg(short, long)]
        subtotal: Decimal,
    },
}

#[derive(Subcommand)]
enum CategoryAction {
    /// Print the category hierarchy
    Tree,
}

#[tokio::main]
async fn main() {
    // Before the subscriber, so RUST_LOG from .env applies
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parfumerie_cli=info,parfumerie_backend=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

/// Service-role client from the environment.
fn service_client() -> Result<BackendClient, CliError> {
    let config = BackendConfig::from_env()?.with_service_role_from_env()?;
    Ok(BackendClient::new(&config).as_service()?)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let client = service_client()?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Stock { action } => match action {
            StockAction::Show { variant } => {
                commands::stock::show(&client, variant, &mut out).await?;
            }
            StockAction::Adjust { variant, delta } => {
                commands::stock::adjust(&client, variant, delta, &mut out).await?;
            }
            StockAction::Set { variant, stock } => {
                commands::stock::set(&client, variant, stock, &mut out).await?;
            }
            StockAction::Low { threshold, limit } => {
                commands::stock::low(&client, threshold, limit, &mut out).await?;
            }
        },
        Commands::Discount { action } => match action {
            DiscountAction::Check { code, subtotal } => {
                commands::discount::check(&client, &code, subtotal, &mut out).await?;
            }
        },
        Commands::Categories { action } => match action {
            CategoryAction::Tree => commands::categories::tree(&client, &mut out).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_delta_parses() {
        let cli = Cli::try_parse_from(["pf-cli", "stock", "adjust", "41", "-2"]).unwrap();
        match cli.command {
            Commands::Stock {
                action: StockAction::Adjust { variant, delta },
            } => {
                assert_eq!(variant, VariantId::new(41));
                assert_eq!(delta, -2);
            }
            _ => panic!("expected stock adjust"),
        }
    }

    #[test]
    fn test_discount_subtotal_is_decimal() {
        let cli = Cli::try_parse_from(["pf-cli", "discount", "check", "spring10", "-s", "80.00"])
            .unwrap();
        match cli.command {
            Commands::Discount {
                action: DiscountAction::Check { code, subtotal },
            } => {
                assert_eq!(code, "spring10");
                assert_eq!(subtotal, Decimal::new(8000, 2));
            }
            _ => panic!("expected discount check"),
        }
        assert!(Cli::try_parse_from(["pf-cli", "discount", "check", "X", "-s", "lots"]).is_err());
    }
}
