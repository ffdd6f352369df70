//! Command-line interface for crowdforge.
//!
//! Provides commands for launching HIT batches, fetching results,
//! approving and rejecting work, and serving the review viewer.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
