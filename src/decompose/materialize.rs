//! Persist candidate tasks as one batch owned by the requester.

use super::{CandidateTask, DecomposeError};
use crate::identity::RequesterId;
use crate::store::{NewTaskRecord, TaskRecord, TaskStore};

/// Store every candidate under the requester's id.
///
/// An empty candidate list makes no store call.
pub async fn materialize(
    store: &dyn TaskStore,
    requester: &RequesterId,
    candidates: &[CandidateTask],
) -> Result<Vec<TaskRecord>, DecomposeError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let batch: Vec<NewTaskRecord> = candidates
        .iter()
        .map(|c| NewTaskRecord {
            title: c.title.clone(),
            is_done: c.is_done,
            owner_id: requester.as_str().to_string(),
        })
        .collect();

    store
        .insert_batch(&batch)
        .await
        .map_err(|detail| DecomposeError::PersistenceFailure { detail })
}
