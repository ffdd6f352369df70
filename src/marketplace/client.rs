//! HTTP client for the marketplace requester API.
//!
//! All operations are plain JSON-over-HTTP request/response calls. List
//! operations follow `next_token` pagination until exhausted; nothing here
//! retries, backs off, or runs concurrently.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::MarketplaceConfig;
use crate::error::MarketplaceError;

use super::types::{Assignment, AssignmentStatus, Hit, HitSpec};

/// Remote operations against the marketplace, abstracted for testing.
///
/// [`MarketplaceClient`] is the production implementation; tests substitute
/// an in-memory mock to observe call sequences.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Create a HIT and return the marketplace's view of it.
    async fn create_hit(&self, spec: &HitSpec) -> Result<Hit, MarketplaceError>;

    /// Fetch a single HIT by ID.
    async fn get_hit(&self, hit_id: &str) -> Result<Hit, MarketplaceError>;

    /// List every HIT on the account, following pagination.
    async fn list_hits(&self) -> Result<Vec<Hit>, MarketplaceError>;

    /// Delete a HIT. Fails if the HIT is still live.
    async fn delete_hit(&self, hit_id: &str) -> Result<(), MarketplaceError>;

    /// Move a HIT's expiration, typically to the past to take it offline.
    async fn update_expiration(
        &self,
        hit_id: &str,
        expire_at: DateTime<Utc>,
    ) -> Result<(), MarketplaceError>;

    /// List a HIT's assignments in the given states, following pagination.
    async fn list_assignments(
        &self,
        hit_id: &str,
        statuses: &[AssignmentStatus],
    ) -> Result<Vec<Assignment>, MarketplaceError>;

    /// Fetch a single assignment by ID.
    async fn get_assignment(&self, assignment_id: &str) -> Result<Assignment, MarketplaceError>;

    /// Approve an assignment so the worker gets paid.
    async fn approve_assignment(
        &self,
        assignment_id: &str,
        feedback: &str,
        override_rejection: bool,
    ) -> Result<(), MarketplaceError>;

    /// Reject an assignment with feedback for the worker.
    async fn reject_assignment(
        &self,
        assignment_id: &str,
        feedback: &str,
    ) -> Result<(), MarketplaceError>;

    /// Available account balance as a decimal string.
    async fn account_balance(&self) -> Result<String, MarketplaceError>;

    /// Delete a HIT, force-expiring it first if a plain delete fails.
    ///
    /// Live HITs cannot be deleted directly; moving the expiration to now
    /// and retrying handles that case.
    async fn force_delete_hit(&self, hit_id: &str) -> Result<(), MarketplaceError> {
        match self.delete_hit(hit_id).await {
            Ok(()) => Ok(()),
            Err(first) => {
                tracing::debug!(hit_id, error = %first, "Delete failed, expiring HIT and retrying");
                self.update_expiration(hit_id, Utc::now()).await?;
                self.delete_hit(hit_id)
                    .await
                    .map_err(|e| MarketplaceError::DeleteFailed {
                        hit_id: hit_id.to_string(),
                        reason: e.to_string(),
                    })
            }
        }
    }
}

/// Client for the marketplace requester API.
pub struct MarketplaceClient {
    config: MarketplaceConfig,
    http_client: Client,
}

impl MarketplaceClient {
    /// Create a new client from an explicit configuration.
    pub fn new(config: MarketplaceConfig) -> Self {
        Self {
            config,
            http_client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Create a new client configured from environment variables.
    ///
    /// See [`MarketplaceConfig::from_env`] for the variables read.
    pub fn from_env() -> Result<Self, MarketplaceError> {
        Ok(Self::new(MarketplaceConfig::from_env()?))
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    /// Worker-facing preview URL for a HIT group.
    pub fn preview_url(&self, hit_group_id: &str) -> String {
        format!("{}?groupId={}", self.config.preview_url, hit_group_id)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint, path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("Authorization", format!("Bearer {}", self.config.api_token))
    }

    /// Decode an unsuccessful response into a [`MarketplaceError`].
    async fn error_from_response(response: reqwest::Response) -> MarketplaceError {
        let status_code = response.status().as_u16();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());

        if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
            if status_code == 429 {
                return MarketplaceError::RateLimited(error_response.error.message);
            }
            return MarketplaceError::ApiError {
                code: status_code,
                message: error_response.error.message,
            };
        }

        MarketplaceError::ApiError {
            code: status_code,
            message: error_text,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MarketplaceError> {
        let response = self
            .authed(self.http_client.get(self.url(path)).query(query))
            .send()
            .await
            .map_err(|e| MarketplaceError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| MarketplaceError::ParseError(e.to_string()))
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, MarketplaceError> {
        let response = self
            .authed(self.http_client.post(self.url(path)).json(body))
            .send()
            .await
            .map_err(|e| MarketplaceError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| MarketplaceError::ParseError(e.to_string()))
    }
}

/// Response envelope for a single HIT.
#[derive(Debug, Deserialize)]
struct HitResponse {
    hit: Hit,
}

/// Response page for HIT listing.
#[derive(Debug, Deserialize)]
struct HitListResponse {
    hits: Vec<Hit>,
    next_token: Option<String>,
}

/// Response envelope for a single assignment.
#[derive(Debug, Deserialize)]
struct AssignmentResponse {
    assignment: Assignment,
}

/// Response page for assignment listing.
#[derive(Debug, Deserialize)]
struct AssignmentListResponse {
    assignments: Vec<Assignment>,
    next_token: Option<String>,
}

/// Response envelope for the balance query.
#[derive(Debug, Deserialize)]
struct BalanceResponse {
    available_balance: String,
}

/// Acknowledgement body returned by mutation endpoints.
#[derive(Debug, Deserialize)]
#[allow(dead_code)] // Field kept for complete API deserialization
struct AckResponse {
    ok: bool,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

/// Error detail from the API.
#[derive(Debug, Deserialize)]
#[allow(dead_code)] // Fields kept for complete API error deserialization
struct ApiErrorDetail {
    message: String,
    code: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApproveRequest<'a> {
    feedback: &'a str,
    override_rejection: bool,
}

#[derive(Debug, Serialize)]
struct RejectRequest<'a> {
    feedback: &'a str,
}

#[derive(Debug, Serialize)]
struct ExpireRequest {
    expire_at: DateTime<Utc>,
}

#[async_trait]
impl MarketplaceApi for MarketplaceClient {
    async fn create_hit(&self, spec: &HitSpec) -> Result<Hit, MarketplaceError> {
        let response: HitResponse = self.post_json("/hits", spec).await?;
        tracing::info!(hit_id = %response.hit.hit_id, title = %spec.title, "Created HIT");
        Ok(response.hit)
    }

    async fn get_hit(&self, hit_id: &str) -> Result<Hit, MarketplaceError> {
        let response: HitResponse = self
            .get_json(&format!("/hits/{hit_id}"), &[])
            .await
            .map_err(|e| match e {
                MarketplaceError::ApiError { code: 404, .. } => {
                    MarketplaceError::HitNotFound(hit_id.to_string())
                }
                other => other,
            })?;
        Ok(response.hit)
    }

    async fn list_hits(&self) -> Result<Vec<Hit>, MarketplaceError> {
        let mut hits = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(token) = &next_token {
                query.push(("next_token", token.clone()));
            }
            let page: HitListResponse = self.get_json("/hits", &query).await?;
            hits.extend(page.hits);
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(hits)
    }

    async fn delete_hit(&self, hit_id: &str) -> Result<(), MarketplaceError> {
        let response = self
            .authed(self.http_client.delete(self.url(&format!("/hits/{hit_id}"))))
            .send()
            .await
            .map_err(|e| MarketplaceError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }

    async fn update_expiration(
        &self,
        hit_id: &str,
        expire_at: DateTime<Utc>,
    ) -> Result<(), MarketplaceError> {
        let _: AckResponse = self
            .post_json(&format!("/hits/{hit_id}/expire"), &ExpireRequest { expire_at })
            .await?;
        Ok(())
    }

    async fn list_assignments(
        &self,
        hit_id: &str,
        statuses: &[AssignmentStatus],
    ) -> Result<Vec<Assignment>, MarketplaceError> {
        let statuses_param = statuses
            .iter()
            .map(AssignmentStatus::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let mut assignments = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let mut query: Vec<(&str, String)> =
                vec![("statuses", statuses_param.clone())];
            if let Some(token) = &next_token {
                query.push(("next_token", token.clone()));
            }
            let page: AssignmentListResponse = self
                .get_json(&format!("/hits/{hit_id}/assignments"), &query)
                .await?;
            assignments.extend(page.assignments);
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(assignments)
    }

    async fn get_assignment(&self, assignment_id: &str) -> Result<Assignment, MarketplaceError> {
        let response: AssignmentResponse = self
            .get_json(&format!("/assignments/{assignment_id}"), &[])
            .await
            .map_err(|e| match e {
                MarketplaceError::ApiError { code: 404, .. } => {
                    MarketplaceError::AssignmentNotFound(assignment_id.to_string())
                }
                other => other,
            })?;
        Ok(response.assignment)
    }

    async fn approve_assignment(
        &self,
        assignment_id: &str,
        feedback: &str,
        override_rejection: bool,
    ) -> Result<(), MarketplaceError> {
        let _: AckResponse = self
            .post_json(
                &format!("/assignments/{assignment_id}/approve"),
                &ApproveRequest {
                    feedback,
                    override_rejection,
                },
            )
            .await?;
        tracing::info!(assignment_id, "Approved assignment");
        Ok(())
    }

    async fn reject_assignment(
        &self,
        assignment_id: &str,
        feedback: &str,
    ) -> Result<(), MarketplaceError> {
        let _: AckResponse = self
            .post_json(
                &format!("/assignments/{assignment_id}/reject"),
                &RejectRequest { feedback },
            )
            .await?;
        tracing::info!(assignment_id, feedback, "Rejected assignment");
        Ok(())
    }

    async fn account_balance(&self) -> Result<String, MarketplaceError> {
        let response: BalanceResponse = self.get_json("/account/balance", &[]).await?;
        Ok(response.available_balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> MarketplaceClient {
        // Port that is unlikely to have a server.
        MarketplaceClient::new(
            MarketplaceConfig::sandbox("test-token").with_endpoint("http://localhost:65535"),
        )
    }

    #[test]
    fn test_preview_url() {
        let client = test_client();
        assert_eq!(
            client.preview_url("GROUP123"),
            format!("{}?groupId=GROUP123", client.config().preview_url)
        );
    }

    #[tokio::test]
    async fn test_balance_connection_error() {
        let client = test_client();
        let result = client.account_balance().await;
        assert!(matches!(result, Err(MarketplaceError::RequestFailed(_))));
    }

    #[tokio::test]
    async fn test_list_assignments_connection_error_propagates() {
        // Listing failures must surface as errors, not as an empty page.
        let client = test_client();
        let result = client
            .list_assignments("HIT1", &AssignmentStatus::ALL)
            .await;
        assert!(matches!(result, Err(MarketplaceError::RequestFailed(_))));
    }

    #[tokio::test]
    async fn test_force_delete_expires_and_retries() {
        use crate::marketplace::testing::MockMarketplace;
        use std::sync::atomic::Ordering;

        let mock = MockMarketplace::new();
        mock.fail_next_delete.store(true, Ordering::SeqCst);

        mock.force_delete_hit("HIT1").await.expect("force delete");
        assert_eq!(*mock.expired.lock().unwrap(), vec!["HIT1".to_string()]);
        assert_eq!(*mock.deleted.lock().unwrap(), vec!["HIT1".to_string()]);
    }

    #[test]
    fn test_error_decoding_structured_body() {
        let body = r#"{"error": {"message": "no such HIT", "code": "NotFound"}}"#;
        let parsed: ApiErrorResponse =
            serde_json::from_str(body).expect("error body should parse");
        assert_eq!(parsed.error.message, "no such HIT");
    }

    /// Bind a throwaway local server for the given router and return its
    /// base URL.
    async fn spawn_stub(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub server");
        let endpoint = format!("http://{}", listener.local_addr().expect("local addr"));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve stub");
        });
        endpoint
    }

    fn stub_assignment(assignment_id: &str, worker_id: &str) -> serde_json::Value {
        serde_json::json!({
            "assignment_id": assignment_id,
            "hit_id": "HIT1",
            "worker_id": worker_id,
            "status": "Submitted",
            "answer": "<QuestionFormAnswers/>",
            "submit_time": "2024-01-01T00:00:00Z",
        })
    }

    #[tokio::test]
    async fn test_list_assignments_follows_next_token_pagination() {
        use axum::extract::Query;
        use axum::routing::get;
        use axum::Json;
        use std::collections::HashMap;

        // Page one hands out a token; page two is only served for that
        // token and closes the listing.
        let app = axum::Router::new().route(
            "/hits/HIT1/assignments",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                match query.get("next_token").map(String::as_str) {
                    None => Json(serde_json::json!({
                        "assignments": [stub_assignment("A1", "w1")],
                        "next_token": "page2",
                    })),
                    Some("page2") => Json(serde_json::json!({
                        "assignments": [stub_assignment("A2", "w2")],
                        "next_token": null,
                    })),
                    Some(other) => panic!("unexpected next_token {other}"),
                }
            }),
        );
        let endpoint = spawn_stub(app).await;

        let client = MarketplaceClient::new(
            MarketplaceConfig::sandbox("tok").with_endpoint(endpoint),
        );
        let assignments = client
            .list_assignments("HIT1", &AssignmentStatus::ALL)
            .await
            .expect("paginated listing");
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].assignment_id, "A1");
        assert_eq!(assignments[1].assignment_id, "A2");
    }

    #[tokio::test]
    async fn test_list_hits_follows_next_token_pagination() {
        use axum::extract::Query;
        use axum::routing::get;
        use axum::Json;
        use std::collections::HashMap;

        fn stub_hit(hit_id: &str) -> serde_json::Value {
            serde_json::json!({
                "hit_id": hit_id,
                "title": "Caption some pictures",
                "max_assignments": 1,
                "creation_time": "2024-01-01T00:00:00Z",
                "expiration": null,
            })
        }

        let app = axum::Router::new().route(
            "/hits",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                match query.get("next_token").map(String::as_str) {
                    None => Json(serde_json::json!({
                        "hits": [stub_hit("HIT1"), stub_hit("HIT2")],
                        "next_token": "page2",
                    })),
                    Some("page2") => Json(serde_json::json!({
                        "hits": [stub_hit("HIT3")],
                        "next_token": null,
                    })),
                    Some(other) => panic!("unexpected next_token {other}"),
                }
            }),
        );
        let endpoint = spawn_stub(app).await;

        let client = MarketplaceClient::new(
            MarketplaceConfig::sandbox("tok").with_endpoint(endpoint),
        );
        let hits = client.list_hits().await.expect("paginated listing");
        assert_eq!(
            hits.iter().map(|h| h.hit_id.as_str()).collect::<Vec<_>>(),
            vec!["HIT1", "HIT2", "HIT3"]
        );
    }
}
