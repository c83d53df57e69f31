//! Handle expansion queue for similarity searches.
//!
//! The backend walks a queue of seed usernames and reports per-handle
//! discovery metrics alongside each status payload. The tracker is a pure
//! projection: every successful payload rebuilds the whole state, so a
//! missed update self-heals on the next one.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Per-handle discovery counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HandleMetrics {
    pub total_creators: u64,
    pub new_creators: u64,
    pub duplicate_creators: u64,
    pub batches: Option<u64>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// State of the handle expansion queue, rebuilt wholesale from each payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HandleQueueState {
    pub total_handles: u64,
    pub completed_handles: Vec<String>,
    pub remaining_handles: Vec<String>,
    pub active_handle: Option<String>,
    pub metrics: HashMap<String, HandleMetrics>,
}

/// Parse a raw `queue` payload. Non-object input yields `None`; inside an
/// object, malformed pieces are dropped at the smallest possible scope.
pub fn parse_handle_queue(raw: &Value) -> Option<HandleQueueState> {
    let obj = raw.as_object()?;

    let completed_handles = string_list(obj.get("completedHandles"));
    let remaining_handles = string_list(obj.get("remainingHandles"));

    let total_handles = obj
        .get("totalHandles")
        .and_then(Value::as_u64)
        .unwrap_or((completed_handles.len() + remaining_handles.len()) as u64);

    let active_handle = obj
        .get("activeHandle")
        .and_then(Value::as_str)
        .map(str::to_string);

    let metrics = obj
        .get("metrics")
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(key, value)| {
                    let entry = value.as_object()?;
                    let handle = entry
                        .get("handle")
                        .and_then(Value::as_str)
                        .unwrap_or(key)
                        .to_string();
                    Some((
                        handle,
                        HandleMetrics {
                            total_creators: count(entry.get("totalCreators")),
                            new_creators: count(entry.get("newCreators")),
                            duplicate_creators: count(entry.get("duplicateCreators")),
                            batches: entry.get("batches").and_then(Value::as_u64),
                            last_updated_at: entry
                                .get("lastUpdatedAt")
                                .and_then(Value::as_str)
                                .and_then(|s| s.parse::<DateTime<Utc>>().ok()),
                        },
                    ))
                })
                .collect()
        })
        .unwrap_or_default();

    Some(HandleQueueState {
        total_handles,
        completed_handles,
        remaining_handles,
        active_handle,
        metrics,
    })
}

/// Strings only, order preserved, duplicates dropped.
fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}

fn count(value: Option<&Value>) -> u64 {
    value.and_then(Value::as_u64).unwrap_or(0)
}
