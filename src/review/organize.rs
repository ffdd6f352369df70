//! Reorganization of fetched results for worker-by-worker review.
//!
//! Reviewers page through one worker's submissions at a time, so the flat
//! per-HIT results are regrouped: all of a worker's assignments become a
//! contiguous run in a single flat list, with an index range per worker.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::fetcher::AssignmentRecord;

/// A half-open index range `[start, end)` into [`ReviewBundle::hits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRange {
    pub start: usize,
    pub end: usize,
}

impl WorkerRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    /// The indices covered by this range.
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Results regrouped by worker for paging in the review viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewBundle {
    /// All assignments, ordered so each worker's run is contiguous.
    pub hits: Vec<AssignmentRecord>,
    /// Index range into `hits` for each worker.
    pub workers: HashMap<String, WorkerRange>,
    /// Workers in first-encounter order.
    pub worker_ids: Vec<String>,
}

/// Regroup per-HIT results by worker.
///
/// HITs are visited in mapping order; each assignment lands in its
/// worker's bucket, buckets being created in first-encounter order. The
/// buckets are then flattened in that order, giving every worker a
/// contiguous, non-overlapping index range whose union tiles the whole
/// flat list. Within a bucket, assignments keep HIT-iteration order, not
/// submit-time order.
pub fn organize(results: &BTreeMap<String, Vec<AssignmentRecord>>) -> ReviewBundle {
    let mut worker_ids: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<AssignmentRecord>> = HashMap::new();
    for records in results.values() {
        for record in records {
            if !buckets.contains_key(&record.worker_id) {
                worker_ids.push(record.worker_id.clone());
            }
            buckets
                .entry(record.worker_id.clone())
                .or_default()
                .push(record.clone());
        }
    }

    let mut hits = Vec::new();
    let mut workers = HashMap::new();
    for worker_id in &worker_ids {
        let bucket = buckets.remove(worker_id).unwrap_or_default();
        workers.insert(
            worker_id.clone(),
            WorkerRange {
                start: hits.len(),
                end: hits.len() + bucket.len(),
            },
        );
        hits.extend(bucket);
    }

    ReviewBundle {
        hits,
        workers,
        worker_ids,
    }
}
