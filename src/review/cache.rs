//! Flat-file cache of reorganized review bundles.
//!
//! The cache file is a derived, rebuildable view of the raw results file.
//! Its name is the results file's name with an `_e_` marker prefixed, in
//! the same directory. When present it is trusted as-is; deleting it
//! forces a rebuild on the next view. The only mutation is the `approve`
//! flag written back by the review endpoint. Single-process access is
//! assumed; there is no locking.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::error::ReviewError;
use crate::fetcher::AssignmentRecord;

use super::organize::{organize, ReviewBundle};

/// Marker prefixed to a results file name to form its cache file name.
const CACHE_MARKER: &str = "_e_";

/// Cache file path for a results file: same directory, `_e_`-prefixed name.
///
/// Fails for paths without a file name component (e.g. `/` or `..`),
/// which cannot name a results file.
pub fn cache_path(results_path: &Path) -> Result<PathBuf, ReviewError> {
    let file_name = results_path.file_name().ok_or_else(|| {
        ReviewError::BadRequest(format!(
            "results path '{}' has no file name",
            results_path.display()
        ))
    })?;
    let file_name = file_name.to_string_lossy();
    Ok(results_path.with_file_name(format!("{CACHE_MARKER}{file_name}")))
}

/// Load the cached bundle for a results file, building it if absent.
///
/// A fresh build reads the raw HIT-to-records mapping from
/// `results_path`, reorganizes it by worker, and writes the cache file
/// before returning.
pub async fn load_or_build(results_path: &Path) -> Result<ReviewBundle, ReviewError> {
    let cache_file = cache_path(results_path)?;
    if fs::try_exists(&cache_file).await? {
        let raw = fs::read_to_string(&cache_file).await?;
        return Ok(serde_json::from_str(&raw)?);
    }

    if !fs::try_exists(results_path).await? {
        return Err(ReviewError::ResultsNotFound(
            results_path.display().to_string(),
        ));
    }
    let raw = fs::read_to_string(results_path).await?;
    let results: BTreeMap<String, Vec<AssignmentRecord>> = serde_json::from_str(&raw)?;
    let bundle = organize(&results);
    fs::write(&cache_file, serde_json::to_string(&bundle)?).await?;
    info!(
        cache = %cache_file.display(),
        hits = bundle.hits.len(),
        workers = bundle.worker_ids.len(),
        "Built review cache"
    );
    Ok(bundle)
}

/// Set the `approve` flag on the cached entries for `assignment_ids`.
///
/// Loads the cache file, updates matching entries, and rewrites the file.
/// Returns the number of entries that matched.
pub async fn set_approval(
    cache_file: &Path,
    assignment_ids: &[String],
    approve: bool,
) -> Result<usize, ReviewError> {
    let raw = fs::read_to_string(cache_file).await?;
    let mut bundle: ReviewBundle = serde_json::from_str(&raw)?;

    let mut updated = 0;
    for hit in &mut bundle.hits {
        if assignment_ids.contains(&hit.assignment_id) {
            hit.approve = Some(approve);
            updated += 1;
        }
    }
    fs::write(cache_file, serde_json::to_string(&bundle)?).await?;
    Ok(updated)
}
