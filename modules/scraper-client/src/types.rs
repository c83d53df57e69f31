use creatorscope_common::Platform;
use serde::Deserialize;
use serde_json::Value;

/// A creator record as the backend delivers it: an arbitrary JSON object
/// whose shape varies by platform and scraper version. Canonicalization
/// happens downstream in the sync engine.
pub type RawCreator = Value;

/// Query for one job-status request.
#[derive(Debug, Clone)]
pub struct StatusQuery {
    pub job_id: String,
    pub platform: Platform,
    /// Similarity searches target a seed username; routing needs to know.
    pub has_target_username: bool,
    pub offset: u64,
    pub limit: u32,
}

/// The ambiguous wire shape of the `progress` field, decoded once at the
/// response boundary and never re-interpreted downstream.
///
/// Untagged: a bare number, an object carrying `percentComplete`, or anything
/// else the server chooses to send (kept as raw JSON so decoding stays total).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProgressField {
    Percent(f64),
    Detailed {
        #[serde(rename = "percentComplete")]
        percent_complete: f64,
    },
    Other(Value),
}

/// Pagination block of a status response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePagination {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub limit: Option<u32>,
    /// Absent and `null` both mean there is no further page.
    #[serde(default)]
    pub next_offset: Option<u64>,
}

/// One job-status response from the execution backend.
///
/// Fields whose malformation must be tolerated per-entry rather than failing
/// the whole body (`results`, `queue`, the progress pair) stay as raw JSON or
/// tolerant enums; everything else is typed strictly — a body that breaks the
/// strict fields is a protocol error and is retried by the next tick.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "progressPercent")]
    pub progress_percent: Option<ProgressField>,
    #[serde(default)]
    pub progress: Option<ProgressField>,
    #[serde(default)]
    pub results: Option<Value>,
    #[serde(default, rename = "totalCreators")]
    pub total_creators: Option<u64>,
    #[serde(default)]
    pub pagination: Option<WirePagination>,
    #[serde(default)]
    pub queue: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusResponse {
    /// Flatten `results[].creators[]` into one batch, dropping anything that
    /// is not shaped as an array along the way. Never fails: a `creators`
    /// field holding `"not-an-array"` simply contributes nothing.
    pub fn extract_creators_array(&self) -> Vec<RawCreator> {
        let Some(envelopes) = self.results.as_ref().and_then(Value::as_array) else {
            return Vec::new();
        };

        let mut creators = Vec::new();
        for envelope in envelopes {
            if let Some(batch) = envelope.get("creators").and_then(Value::as_array) {
                creators.extend(batch.iter().cloned());
            }
        }
        creators
    }
}
