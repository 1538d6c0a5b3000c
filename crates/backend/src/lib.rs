//! Parfumerie Backend - Client for the hosted database, auth and storage service.
//!
//! All persistence is delegated to a PostgREST-style service. This crate wraps
//! it in a typed API:
//!
//! - [`query`] - Builder for table reads (filters, sort, pagination, search)
//! - [`client`] - [`BackendClient`] with cached fetch, RPC and table mutations
//! - [`cache`] - Scoped query cache with per-resource invalidation
//! - [`auth`] - Hosted auth API (password login, signup, refresh, logout)
//! - [`storage`] - Object storage uploads and public URLs
//! - [`repos`] - Per-entity repositories used by the services and CLI
//!
//! # Example
//!
//! ```rust,ignore
//! use parfumerie_backend::{BackendClient, BackendConfig, Query};
//! use parfumerie_core::models::Brand;
//!
//! let client = BackendClient::new(&BackendConfig::from_env()?);
//! let brands = client
//!     .fetch::<Brand>(&Query::table("brands").order("name", true))
//!     .await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod repos;
pub mod storage;

pub use auth::{AuthClient, AuthSession, AuthUser, SignUpOutcome};
pub use cache::{CacheKey, CacheScope, QueryCache};
pub use client::{BackendClient, Credentials, Page};
pub use config::{BackendConfig, ConfigError};
pub use error::{ApiErrorBody, BackendError};
pub use query::{Filter, Pagination, Query, Search};
pub use storage::StorageClient;
