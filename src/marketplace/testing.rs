//! In-memory marketplace mock for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::MarketplaceError;

use super::client::MarketplaceApi;
use super::types::{Assignment, AssignmentStatus, Hit, HitSpec};

/// A scripted marketplace that records every call.
#[derive(Default)]
pub struct MockMarketplace {
    /// HIT specs received by `create_hit`, in call order.
    pub created: Mutex<Vec<HitSpec>>,
    /// Assignments served by listing and lookup calls, keyed by HIT ID.
    pub assignments: Mutex<HashMap<String, Vec<Assignment>>>,
    /// Assignment IDs approved, in call order.
    pub approved: Mutex<Vec<String>>,
    /// Assignment IDs rejected, in call order.
    pub rejected: Mutex<Vec<String>>,
    /// HIT IDs whose expiration was moved.
    pub expired: Mutex<Vec<String>>,
    /// When set, the next `delete_hit` call fails once.
    pub fail_next_delete: AtomicBool,
    /// HIT IDs deleted.
    pub deleted: Mutex<Vec<String>>,
}

impl MockMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an assignment for a HIT.
    pub fn push_assignment(&self, assignment: Assignment) {
        self.assignments
            .lock()
            .unwrap()
            .entry(assignment.hit_id.clone())
            .or_default()
            .push(assignment);
    }

    fn all_assignments(&self) -> Vec<Assignment> {
        self.assignments
            .lock()
            .unwrap()
            .values()
            .flatten()
            .cloned()
            .collect()
    }
}

/// Build a test assignment with the given IDs and raw answer payload.
pub fn assignment(
    assignment_id: &str,
    hit_id: &str,
    worker_id: &str,
    status: AssignmentStatus,
    answer: &str,
) -> Assignment {
    Assignment {
        assignment_id: assignment_id.to_string(),
        hit_id: hit_id.to_string(),
        worker_id: worker_id.to_string(),
        status,
        answer: answer.to_string(),
        submit_time: Utc::now(),
    }
}

/// Wrap a JSON payload in the answer envelope used by the templates.
pub fn answer_envelope(json: &str) -> String {
    format!(
        "<QuestionFormAnswers><Answer>\
         <QuestionIdentifier>results</QuestionIdentifier>\
         <FreeText>{json}</FreeText>\
         </Answer></QuestionFormAnswers>"
    )
}

#[async_trait]
impl MarketplaceApi for MockMarketplace {
    async fn create_hit(&self, spec: &HitSpec) -> Result<Hit, MarketplaceError> {
        let mut created = self.created.lock().unwrap();
        created.push(spec.clone());
        Ok(Hit {
            hit_id: format!("HIT{}", created.len()),
            title: spec.title.clone(),
            max_assignments: spec.max_assignments,
            creation_time: Utc::now(),
            expiration: None,
        })
    }

    async fn get_hit(&self, hit_id: &str) -> Result<Hit, MarketplaceError> {
        let created = self.created.lock().unwrap();
        let spec = created
            .iter()
            .enumerate()
            .find(|(i, _)| format!("HIT{}", i + 1) == hit_id)
            .map(|(_, s)| s.clone());
        match spec {
            Some(spec) => Ok(Hit {
                hit_id: hit_id.to_string(),
                title: spec.title,
                max_assignments: spec.max_assignments,
                creation_time: Utc::now(),
                expiration: None,
            }),
            None => Ok(Hit {
                hit_id: hit_id.to_string(),
                title: String::new(),
                max_assignments: 1,
                creation_time: Utc::now(),
                expiration: None,
            }),
        }
    }

    async fn list_hits(&self) -> Result<Vec<Hit>, MarketplaceError> {
        let created = self.created.lock().unwrap();
        Ok(created
            .iter()
            .enumerate()
            .map(|(i, spec)| Hit {
                hit_id: format!("HIT{}", i + 1),
                title: spec.title.clone(),
                max_assignments: spec.max_assignments,
                creation_time: Utc::now(),
                expiration: None,
            })
            .collect())
    }

    async fn delete_hit(&self, hit_id: &str) -> Result<(), MarketplaceError> {
        if self.fail_next_delete.swap(false, Ordering::SeqCst) {
            return Err(MarketplaceError::ApiError {
                code: 409,
                message: "HIT is still live".to_string(),
            });
        }
        self.deleted.lock().unwrap().push(hit_id.to_string());
        Ok(())
    }

    async fn update_expiration(
        &self,
        hit_id: &str,
        _expire_at: DateTime<Utc>,
    ) -> Result<(), MarketplaceError> {
        self.expired.lock().unwrap().push(hit_id.to_string());
        Ok(())
    }

    async fn list_assignments(
        &self,
        hit_id: &str,
        statuses: &[AssignmentStatus],
    ) -> Result<Vec<Assignment>, MarketplaceError> {
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .get(hit_id)
            .map(|v| {
                v.iter()
                    .filter(|a| statuses.contains(&a.status))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_assignment(&self, assignment_id: &str) -> Result<Assignment, MarketplaceError> {
        self.all_assignments()
            .into_iter()
            .find(|a| a.assignment_id == assignment_id)
            .ok_or_else(|| MarketplaceError::AssignmentNotFound(assignment_id.to_string()))
    }

    async fn approve_assignment(
        &self,
        assignment_id: &str,
        _feedback: &str,
        _override_rejection: bool,
    ) -> Result<(), MarketplaceError> {
        self.approved.lock().unwrap().push(assignment_id.to_string());
        Ok(())
    }

    async fn reject_assignment(
        &self,
        assignment_id: &str,
        _feedback: &str,
    ) -> Result<(), MarketplaceError> {
        self.rejected.lock().unwrap().push(assignment_id.to_string());
        Ok(())
    }

    async fn account_balance(&self) -> Result<String, MarketplaceError> {
        Ok("10000.00".to_string())
    }
}
