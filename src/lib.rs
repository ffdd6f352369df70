//! crowdforge: Orchestration layer over a crowdsourcing marketplace.
//!
//! This library launches batches of HITs from HTML task templates,
//! fetches and parses submitted work, and serves a local web viewer for
//! reviewing it.

// Core modules
pub mod answer;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod launcher;
pub mod marketplace;
pub mod review;
pub mod template;

// Re-export commonly used error types
pub use error::{AnswerError, LaunchError, MarketplaceError, ReviewError, TemplateError};
