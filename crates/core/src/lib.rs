//! Parfumerie Core - Shared types and business rules.
//!
//! This crate provides the domain layer used across all Parfumerie components:
//! - `backend` - Client for the hosted database/auth/storage service
//! - `storefront` - Public-facing shop API
//! - `admin` - Back-office API for staff
//! - `cli` - Operator tooling
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Everything here can be unit tested without a network.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, and statuses
//! - [`models`] - Records mirrored from the external schema
//! - [`pricing`] - Order totals and shipping fees
//! - [`discount`] - Discount code validation
//! - [`stock`] - Stock adjustment arithmetic
//! - [`catalog`] - Category tree building
//! - [`cart`] - Session cart and cart pricing
//! - [`wishlist`] - Wishlist toggling
//! - [`reviews`] - Review validation and rating summaries

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod discount;
pub mod models;
pub mod pricing;
pub mod reviews;
pub mod stock;
pub mod types;
pub mod wishlist;

pub use types::*;
