//! Minimal web viewer for reviewing submitted work.
//!
//! Three routes: a home page, a results view that builds (or reuses) the
//! cached review bundle for a results file, and an endpoint that applies
//! approve/reject verdicts remotely and records them in the cache.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tera::Context;
use tower_http::trace::TraceLayer;

use crate::error::{MarketplaceError, ReviewError, TemplateError};
use crate::fetcher::Requester;
use crate::marketplace::MarketplaceApi;
use crate::template::TaskTemplates;

use super::cache;

/// Shared state for the review viewer.
#[derive(Clone)]
pub struct AppState {
    /// Marketplace handle used by the approve/reject endpoint.
    pub api: Arc<dyn MarketplaceApi>,
    /// Loaded template set; review pages live under `review/`.
    pub templates: Arc<TaskTemplates>,
}

/// Error wrapper that renders as an HTTP response.
struct ServeError(ReviewError);

impl From<ReviewError> for ServeError {
    fn from(e: ReviewError) -> Self {
        Self(e)
    }
}

impl From<TemplateError> for ServeError {
    fn from(e: TemplateError) -> Self {
        Self(ReviewError::Template(e))
    }
}

impl From<MarketplaceError> for ServeError {
    fn from(e: MarketplaceError) -> Self {
        Self(ReviewError::Marketplace(e))
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ReviewError::ResultsNotFound(_) => StatusCode::NOT_FOUND,
            ReviewError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(error = %self.0, "Review request failed");
        (status, self.0.to_string()).into_response()
    }
}

/// Build the review viewer router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/task", get(task))
        .route("/interface", post(interface))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the review viewer until the process is stopped.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), ReviewError> {
    let app = router(state);
    tracing::info!(%addr, "Starting review viewer");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// GET /
async fn home(State(state): State<AppState>) -> Result<Html<String>, ServeError> {
    let html = state
        .templates
        .render_with_context("review/home.html", &Context::new())?;
    Ok(Html(html))
}

/// Query parameters for the results view.
#[derive(Debug, Deserialize)]
struct TaskQuery {
    /// Review template name (relative to `review/`).
    task: String,
    /// Path to the raw results file.
    results: PathBuf,
}

/// GET /task?task=<template>&results=<path>
///
/// Renders a task's results, computing and caching the worker-organized
/// view on first access.
async fn task(
    State(state): State<AppState>,
    Query(params): Query<TaskQuery>,
) -> Result<Html<String>, ServeError> {
    let bundle = cache::load_or_build(&params.results).await?;
    let cache_file = cache::cache_path(&params.results)?;

    let mut context = Context::new();
    context.insert("results", &bundle);
    context.insert("task", &params.results.display().to_string());
    context.insert("eresults_file", &cache_file.display().to_string());

    let html = state
        .templates
        .render_with_context(&format!("review/{}", params.task), &context)?;
    Ok(Html(html))
}

/// Form body for the approve/reject endpoint.
///
/// `assignment_ids` and `approve` arrive JSON-encoded inside the form
/// fields, matching what the review pages' JavaScript posts.
#[derive(Debug, Deserialize)]
struct InterfaceForm {
    assignment_ids: String,
    approve: String,
    eresults_file: String,
}

/// POST /interface
///
/// Applies the verdict remotely for each assignment, then records it on
/// the matching cached entries.
async fn interface(
    State(state): State<AppState>,
    Form(form): Form<InterfaceForm>,
) -> Result<&'static str, ServeError> {
    let assignment_ids: Vec<String> = serde_json::from_str(&form.assignment_ids)
        .map_err(|e| ReviewError::BadRequest(format!("assignment_ids: {e}")))?;
    let approve: bool = serde_json::from_str(&form.approve)
        .map_err(|e| ReviewError::BadRequest(format!("approve: {e}")))?;

    let requester = Requester::new(state.api.as_ref());
    for assignment_id in &assignment_ids {
        if approve {
            requester.approve_assignment(assignment_id, false, false).await?;
        } else {
            requester.reject_assignment(assignment_id).await?;
        }
    }

    cache::set_approval(Path::new(&form.eresults_file), &assignment_ids, approve).await?;
    Ok("Success")
}
