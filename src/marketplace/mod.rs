//! Marketplace requester API integration.
//!
//! This module wraps the remote crowdsourcing marketplace: creating HITs,
//! listing and reviewing assignments, and querying the account balance.
//! The [`MarketplaceApi`] trait is the seam between orchestration code and
//! the wire; [`MarketplaceClient`] is its HTTP implementation.
//!
//! # Example
//!
//! ```ignore
//! use crowdforge::config::MarketplaceConfig;
//! use crowdforge::marketplace::{MarketplaceApi, MarketplaceClient};
//!
//! let client = MarketplaceClient::new(MarketplaceConfig::from_env()?);
//! let balance = client.account_balance().await?;
//! println!("Available balance: {balance}");
//! ```

pub mod client;
#[cfg(test)]
pub mod testing;
pub mod types;

pub use client::{MarketplaceApi, MarketplaceClient};
pub use types::{
    Assignment, AssignmentStatus, Comparator, Hit, HitSpec, Locale, QualificationRequirement,
};
