//! HTTP client for the job execution backend: the status endpoint a search
//! dashboard polls while a creator-discovery job runs remotely.
//!
//! Which URL serves which platform/mode combination is the host's concern;
//! the client consumes an [`EndpointRouter`] and only fills in the
//! `jobId`/`offset`/`limit` query parameters.

pub mod error;
pub mod types;

pub use error::{Result, ScraperError};
pub use types::{ProgressField, RawCreator, StatusQuery, StatusResponse, WirePagination};

use std::sync::Arc;

use async_trait::async_trait;
use creatorscope_common::Platform;

/// Host-supplied routing table: which endpoint serves a platform, and
/// whether the job is a similarity search (seeded by a target username).
pub trait EndpointRouter: Send + Sync {
    fn status_url(&self, platform: Platform, has_target_username: bool) -> String;
}

/// The seam the sync engine consumes the backend through. Production code
/// uses [`ScraperClient`]; tests substitute scripted fakes.
#[async_trait]
pub trait JobStatusFetch: Send + Sync {
    async fn fetch_status(&self, query: &StatusQuery) -> Result<StatusResponse>;
}

pub struct ScraperClient {
    client: reqwest::Client,
    router: Arc<dyn EndpointRouter>,
}

impl ScraperClient {
    pub fn new(router: Arc<dyn EndpointRouter>) -> Self {
        Self {
            client: reqwest::Client::new(),
            router,
        }
    }
}

#[async_trait]
impl JobStatusFetch for ScraperClient {
    async fn fetch_status(&self, query: &StatusQuery) -> Result<StatusResponse> {
        let url = self
            .router
            .status_url(query.platform, query.has_target_username);

        tracing::debug!(
            job_id = query.job_id.as_str(),
            platform = %query.platform,
            offset = query.offset,
            limit = query.limit,
            "Fetching job status"
        );

        let offset = query.offset.to_string();
        let limit = query.limit.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("jobId", query.job_id.as_str()),
                ("offset", offset.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScraperError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        // Decode from text so a non-JSON body surfaces as Parse, not Network.
        let body = resp.text().await?;
        let parsed: StatusResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }
}
