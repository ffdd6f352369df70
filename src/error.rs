//! Error types for crowdforge operations.
//!
//! Defines error types for the major subsystems:
//! - Marketplace API interactions (HIT creation, assignment listing, review)
//! - Worker answer parsing
//! - Question and review-page templating
//! - Launch orchestration
//! - Review cache and web viewer

use thiserror::Error;

/// Errors that can occur while talking to the marketplace API.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("Missing API token: CROWDFORGE_API_TOKEN environment variable not set")]
    MissingApiToken,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse marketplace response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("HIT '{0}' not found")]
    HitNotFound(String),

    #[error("Assignment '{0}' not found")]
    AssignmentNotFound(String),

    #[error("Failed to delete HIT '{hit_id}': {reason}")]
    DeleteFailed { hit_id: String, reason: String },

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while parsing a worker's answer payload.
///
/// All of these are recoverable: a malformed answer means the submission
/// is unusable, not that the fetch failed.
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("Answer payload is not valid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Answer envelope is missing the free-text answer field")]
    MissingAnswerField,

    #[error("Free-text answer is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during question or review-page templating.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template directory '{0}' could not be loaded")]
    DirectoryLoadFailed(String),

    #[error("Tera template rendering error: {0}")]
    Tera(#[from] tera::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while launching a batch of HITs.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Marketplace error: {0}")]
    Marketplace(#[from] MarketplaceError),

    #[error("Batch size must be greater than zero")]
    ZeroBatchSize,
}

/// Errors that can occur in the review cache and web viewer.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Results file '{0}' not found")]
    ResultsNotFound(String),

    #[error("Marketplace error: {0}")]
    Marketplace(#[from] MarketplaceError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid review request: {0}")]
    BadRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
