use serde::{Deserialize, Serialize};

/// Social platform a discovery job searches. The backend's routing layer
/// decides which endpoint serves each platform; this core only carries the
/// hint through identity derivation and request building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    TikTok,
    Instagram,
    YouTube,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::YouTube => "youtube",
        }
    }

    pub fn parse(s: &str) -> Option<Platform> {
        match s.trim().to_lowercase().as_str() {
            "tiktok" => Some(Platform::TikTok),
            "instagram" => Some(Platform::Instagram),
            "youtube" => Some(Platform::YouTube),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a search job as reported by the execution backend.
///
/// Wire statuses are decoded once at the response boundary; an unrecognized
/// string leaves a session's current status untouched rather than downgrading
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Dispatching,
    Processing,
    Searching,
    Enriching,
    Completed,
    Error,
    Timeout,
    Failed,
}

impl JobStatus {
    pub fn parse(s: &str) -> Option<JobStatus> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(JobStatus::Pending),
            "dispatching" => Some(JobStatus::Dispatching),
            "processing" => Some(JobStatus::Processing),
            "searching" => Some(JobStatus::Searching),
            "enriching" => Some(JobStatus::Enriching),
            "completed" => Some(JobStatus::Completed),
            "error" => Some(JobStatus::Error),
            "timeout" => Some(JobStatus::Timeout),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Statuses the poller keeps ticking for.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            JobStatus::Pending
                | JobStatus::Dispatching
                | JobStatus::Processing
                | JobStatus::Searching
                | JobStatus::Enriching
        )
    }

    /// Statuses after which polling permanently stops.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Dispatching => "dispatching",
            JobStatus::Processing => "processing",
            JobStatus::Searching => "searching",
            JobStatus::Enriching => "enriching",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Timeout => "timeout",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
