//! Parse the model's reply and normalize it into candidate tasks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DecomposeError;
use crate::config::DecomposeLimits;

/// A task proposed by the model, after normalization. Not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTask {
    pub title: String,
    pub is_done: bool,
}

impl CandidateTask {
    fn pending(title: String) -> Self {
        Self {
            title,
            is_done: false,
        }
    }
}

/// Parse raw model text as a JSON array and normalize its entries.
///
/// Anything other than a syntactically valid top-level array is malformed.
/// Inside the array, bad entries are dropped rather than failing the batch.
pub fn parse_model_output(
    raw: &str,
    limits: &DecomposeLimits,
) -> Result<Vec<CandidateTask>, DecomposeError> {
    let malformed = || DecomposeError::MalformedModelOutput {
        raw: raw.to_string(),
    };

    let value: Value = serde_json::from_str(raw).map_err(|_| malformed())?;
    match value {
        Value::Array(entries) => Ok(normalize_entries(&entries, limits)),
        _ => Err(malformed()),
    }
}

/// Normalize parsed array entries. Entries without a string `title` count as
/// empty. Model-supplied `is_done` is ignored.
pub fn normalize_entries(entries: &[Value], limits: &DecomposeLimits) -> Vec<CandidateTask> {
    entries
        .iter()
        .filter_map(|entry| {
            let title = entry.get("title").and_then(Value::as_str).unwrap_or("");
            clamp_title(title, limits.max_title_chars)
        })
        .take(limits.max_tasks)
        .map(CandidateTask::pending)
        .collect()
}

/// Trim, truncate to `max_chars` characters, and drop the result if empty.
///
/// Truncation can expose trailing whitespace, so the end is trimmed again.
pub fn clamp_title(title: &str, max_chars: usize) -> Option<String> {
    let trimmed = title.trim();
    let clamped = match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => trimmed[..cut].trim_end(),
        None => trimmed,
    };
    if clamped.is_empty() {
        None
    } else {
        Some(clamped.to_string())
    }
}
