//! eSIM Shop Client SDK.
//!
//! This crate provides a typed client for the eSIM shop HTTP API and a
//! simulated provisioning client for managing eSIM profiles after purchase.
//!
//! # Example
//!
//! ```no_run
//! use esim_shop_client::EsimShopClient;
//!
//! # async fn example() -> Result<(), esim_shop_client::ClientError> {
//! let client = EsimShopClient::new("http://localhost:8080")?;
//! let session = client.create_session().await?;
//! let client = client.with_session(session.session_id);
//!
//! let checkout = client.start_checkout(Some("japan-3gb")).await?;
//! println!("Total: {}", checkout.summary.total_formatted);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
pub mod provisioning;
mod types;

pub use client::{ClientOptions, EsimShopClient};
pub use error::ClientError;
pub use provisioning::{ProvisioningError, SimulatedProvisioner};
pub use types::*;
