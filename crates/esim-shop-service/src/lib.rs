//! eSIM shop HTTP API service.
//!
//! This crate provides the HTTP API behind the eSIM storefront, including:
//!
//! - The plan catalog
//! - Saved payment methods
//! - The three-step checkout wizard and order submission
//! - Order lookup
//!
//! # Sessions
//!
//! Shoppers are anonymous. Every `/v1` request other than session creation and
//! the plan catalog identifies its shopper by the `x-session-id` header or the
//! `esim_session` cookie.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for the router

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod orders;
pub mod routes;
pub mod sessions;
pub mod state;

pub use config::{ServiceConfig, StorageBackend};
pub use error::ApiError;
pub use orders::{OrderService, SimulatedGateway};
pub use routes::create_router;
pub use state::AppState;
