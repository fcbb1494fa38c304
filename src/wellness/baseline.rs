use chrono::Utc;

use crate::db::Baseline;
use crate::error::{EngineError, EngineResult};
use crate::store::PhysioStore;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Return the subject's baseline, deriving it from the current sample on
/// first use.
///
/// The derived record goes through the store's insert-if-absent write, so
/// racing callers all get back whichever baseline landed first. Fails with
/// `MissingData` when the subject has neither a baseline nor a usable sample.
pub async fn get_or_create_baseline<S: PhysioStore>(
    store: &S,
    subject_id: &str,
) -> EngineResult<Baseline> {
    if let Some(existing) = store.get_baseline(subject_id).await? {
        return Ok(existing);
    }

    let samples = store
        .get_physiological_sample(subject_id)
        .await?
        .filter(|s| !s.all_missing())
        .ok_or_else(|| EngineError::MissingData(subject_id.to_string()))?;

    let candidate = Baseline::from_observation(subject_id, &samples, Utc::now());
    let stored = store.insert_baseline_if_absent(&candidate).await?;

    log_info!(
        "baseline for subject {} established at {}",
        subject_id,
        stored.created_at.to_rfc3339()
    );

    Ok(stored)
}
