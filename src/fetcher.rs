//! Retrieval, parsing, and review of submitted assignments.
//!
//! The [`Requester`] drives the per-HIT workflows: pull assignments, parse
//! each worker's embedded JSON answer, and approve or reject. Answer parse
//! failures are recoverable; a submission that does not parse is dropped
//! from the output and, when requested, rejected with fixed feedback.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::answer::parse_answer;
use crate::error::MarketplaceError;
use crate::marketplace::{Assignment, AssignmentStatus, MarketplaceApi};

/// Feedback sent to a worker on approval.
pub const APPROVE_FEEDBACK: &str = "Good job";
/// Feedback sent to a worker when their answer could not be parsed.
pub const REJECT_FEEDBACK: &str = "Invalid results";

/// One parsed submission: an assignment with its decoded answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub assignment_id: String,
    pub hit_id: String,
    pub worker_id: String,
    /// The worker's answer, decoded from the XML envelope.
    pub output: Value,
    pub submit_time: DateTime<Utc>,
    /// Review verdict recorded by the review viewer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approve: Option<bool>,
}

/// Completion progress of a single HIT.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HitProgress {
    /// Assignments currently in the `Submitted` state.
    pub completed: usize,
    /// Maximum assignments the HIT allows.
    pub max_assignments: u32,
}

/// Per-HIT fetch and review workflows over a [`MarketplaceApi`].
pub struct Requester<'a> {
    api: &'a dyn MarketplaceApi,
}

impl<'a> Requester<'a> {
    pub fn new(api: &'a dyn MarketplaceApi) -> Self {
        Self { api }
    }

    /// Fetch and parse every assignment of a HIT.
    ///
    /// Assignments whose answers fail to parse are dropped; with
    /// `reject_on_fail` they are also rejected remotely. Listing failures
    /// propagate rather than masquerading as "no results yet".
    pub async fn results_for_hit(
        &self,
        hit_id: &str,
        reject_on_fail: bool,
    ) -> Result<Vec<AssignmentRecord>, MarketplaceError> {
        let assignments = self
            .api
            .list_assignments(hit_id, &AssignmentStatus::ALL)
            .await?;

        let mut records = Vec::new();
        for assignment in assignments {
            match self.record_from(&assignment) {
                Some(record) => records.push(record),
                None if reject_on_fail => {
                    self.api
                        .reject_assignment(&assignment.assignment_id, REJECT_FEEDBACK)
                        .await?;
                }
                None => {}
            }
        }
        Ok(records)
    }

    /// Fetch parsed results for many HITs.
    ///
    /// Returns a map from HIT ID to its records. A HIT with zero parsed
    /// assignments contributes no entry, so a pending HIT and a HIT whose
    /// only submissions were unparsable look the same to callers. With
    /// `auto_approve`, every fetched submission is approved.
    pub async fn fetch_completed(
        &self,
        hit_ids: &[String],
        auto_approve: bool,
    ) -> Result<BTreeMap<String, Vec<AssignmentRecord>>, MarketplaceError> {
        let mut output = BTreeMap::new();
        for hit_id in hit_ids {
            let records = self.results_for_hit(hit_id, false).await?;
            if records.is_empty() {
                debug!(%hit_id, "No parsed submissions yet");
                continue;
            }
            if auto_approve {
                for record in &records {
                    self.approve_assignment(&record.assignment_id, false, false)
                        .await?;
                }
            }
            output.insert(hit_id.clone(), records);
        }
        Ok(output)
    }

    /// Approve a single submitted assignment.
    ///
    /// Only acts on assignments in the `Submitted` state. The assignment's
    /// answer is re-parsed first: an unparsable answer is never approved
    /// and, with `reject_on_fail`, is rejected instead. Returns whether an
    /// approval actually happened.
    pub async fn approve_assignment(
        &self,
        assignment_id: &str,
        reject_on_fail: bool,
        override_rejection: bool,
    ) -> Result<bool, MarketplaceError> {
        let assignment = self.api.get_assignment(assignment_id).await?;
        if assignment.status != AssignmentStatus::Submitted {
            debug!(assignment_id, status = %assignment.status, "Skipping non-submitted assignment");
            return Ok(false);
        }

        if self.record_from(&assignment).is_some() {
            self.api
                .approve_assignment(assignment_id, APPROVE_FEEDBACK, override_rejection)
                .await?;
            Ok(true)
        } else {
            if reject_on_fail {
                self.api
                    .reject_assignment(assignment_id, REJECT_FEEDBACK)
                    .await?;
            }
            Ok(false)
        }
    }

    /// Reject a single submitted assignment.
    ///
    /// Only acts on assignments in the `Submitted` state; returns whether
    /// a rejection happened.
    pub async fn reject_assignment(&self, assignment_id: &str) -> Result<bool, MarketplaceError> {
        let assignment = self.api.get_assignment(assignment_id).await?;
        if assignment.status != AssignmentStatus::Submitted {
            return Ok(false);
        }
        self.api
            .reject_assignment(assignment_id, REJECT_FEEDBACK)
            .await?;
        Ok(true)
    }

    /// Review every submitted assignment of a HIT in one pass.
    ///
    /// Submitted assignments with parsable answers are approved; with
    /// `reject_on_fail`, unparsable ones are rejected. Returns the
    /// `(approved, rejected)` assignment IDs.
    pub async fn approve_hit(
        &self,
        hit_id: &str,
        reject_on_fail: bool,
        override_rejection: bool,
    ) -> Result<(Vec<String>, Vec<String>), MarketplaceError> {
        let assignments = self
            .api
            .list_assignments(hit_id, &AssignmentStatus::ALL)
            .await?;

        let mut approve_ids = Vec::new();
        let mut reject_ids = Vec::new();
        for assignment in &assignments {
            if assignment.status != AssignmentStatus::Submitted {
                continue;
            }
            if self.record_from(assignment).is_some() {
                approve_ids.push(assignment.assignment_id.clone());
            } else if reject_on_fail {
                reject_ids.push(assignment.assignment_id.clone());
            }
        }

        for assignment_id in &approve_ids {
            self.api
                .approve_assignment(assignment_id, APPROVE_FEEDBACK, override_rejection)
                .await?;
        }
        for assignment_id in &reject_ids {
            self.api
                .reject_assignment(assignment_id, REJECT_FEEDBACK)
                .await?;
        }
        Ok((approve_ids, reject_ids))
    }

    /// Completion progress for each HIT: submitted count versus allowed.
    pub async fn hit_progress(
        &self,
        hit_ids: &[String],
    ) -> Result<BTreeMap<String, HitProgress>, MarketplaceError> {
        let mut output = BTreeMap::new();
        for hit_id in hit_ids {
            let hit = self.api.get_hit(hit_id).await?;
            let submitted = self
                .api
                .list_assignments(hit_id, &[AssignmentStatus::Submitted])
                .await?;
            output.insert(
                hit_id.clone(),
                HitProgress {
                    completed: submitted.len(),
                    max_assignments: hit.max_assignments,
                },
            );
        }
        Ok(output)
    }

    /// Parse an assignment into a record, or `None` if its answer is unusable.
    fn record_from(&self, assignment: &Assignment) -> Option<AssignmentRecord> {
        match parse_answer(&assignment.answer) {
            Ok(output) => Some(AssignmentRecord {
                assignment_id: assignment.assignment_id.clone(),
                hit_id: assignment.hit_id.clone(),
                worker_id: assignment.worker_id.clone(),
                output,
                submit_time: assignment.submit_time,
                approve: None,
            }),
            Err(e) => {
                warn!(
                    assignment_id = %assignment.assignment_id,
                    error = %e,
                    "Failed to parse worker answer"
                );
                None
            }
        }
    }
}
