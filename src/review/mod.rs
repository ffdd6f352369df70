//! Review of submitted work: reorganization, caching, and the web viewer.
//!
//! Fetched results arrive as a HIT-to-records mapping; reviewers want to
//! page through one worker at a time. [`organize`] regroups the records so
//! each worker's submissions are contiguous, [`cache`] persists that view
//! next to the raw results file, and [`server`] renders it and records
//! approve/reject verdicts.
//!
//! # Example
//!
//! ```ignore
//! use crowdforge::review::{cache, server::AppState};
//!
//! let bundle = cache::load_or_build(Path::new("results/run.json")).await?;
//! for worker_id in &bundle.worker_ids {
//!     let range = bundle.workers[worker_id];
//!     println!("{worker_id}: {} submissions", range.len());
//! }
//! ```

pub mod cache;
pub mod organize;
pub mod server;

pub use organize::{organize, ReviewBundle, WorkerRange};
pub use server::AppState;
