//! Session records and the manager that owns them.
//!
//! Every mutation funnels through the manager: poll ticks, manual page
//! loads, lifecycle calls. Responses carry the job id they were requested
//! for and are routed back by that id, so a late response from a job the
//! user has navigated away from can never touch a different session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use creatorscope_common::{JobStatus, Platform, SyncConfig, SyncError};
use scraper_client::{JobStatusFetch, StatusQuery, StatusResponse, WirePagination};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::SnapshotCache;
use crate::merge::{merge, CanonicalCreator};
use crate::poller::PollerHandle;
use crate::progress;
use crate::queue::{parse_handle_queue, HandleQueueState};

/// Cursor over the server-side result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: Option<u64>,
    pub limit: u32,
    /// `None` means there is no further page to load.
    pub next_offset: Option<u64>,
}

/// One search job's client-side view. Ephemeral: lives exactly as long as
/// the host keeps it, and is never a system of record.
#[derive(Debug)]
pub(crate) struct JobSession {
    pub job_id: String,
    pub platform: Platform,
    pub target_username: Option<String>,
    pub status: JobStatus,
    pub progress: f64,
    pub pagination: Pagination,
    pub creator_buffer: Vec<CanonicalCreator>,
    pub handle_queue: Option<HandleQueueState>,
    pub results_error: Option<String>,
}

/// Read-only projection of a session for the host UI.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub job_id: String,
    pub platform: Platform,
    pub status: JobStatus,
    pub progress: f64,
    pub pagination: Pagination,
    pub creators: Arc<[CanonicalCreator]>,
    /// Derived count: `pagination.total` when the server reported one,
    /// otherwise what the buffer holds. One precedence order, everywhere.
    pub total_creators: u64,
    pub handle_queue: Option<HandleQueueState>,
    pub results_error: Option<String>,
}

/// What a tick application decided about the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Continue,
    Terminal,
    /// The target session is no longer tracked; the response was discarded.
    Dropped,
}

/// Owns every tracked [`JobSession`], keyed by job id.
#[derive(Clone)]
pub struct SessionManager {
    pub(crate) sessions: Arc<Mutex<HashMap<String, JobSession>>>,
    pub(crate) pollers: Arc<Mutex<HashMap<String, PollerHandle>>>,
    cache: Arc<Mutex<SnapshotCache>>,
    pub(crate) fetcher: Arc<dyn JobStatusFetch>,
    pub(crate) config: SyncConfig,
}

impl SessionManager {
    pub fn new(fetcher: Arc<dyn JobStatusFetch>, config: SyncConfig) -> Self {
        let cache = SnapshotCache::new(config.snapshot_cache_capacity);
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            pollers: Arc::new(Mutex::new(HashMap::new())),
            cache: Arc::new(Mutex::new(cache)),
            fetcher,
            config,
        }
    }

    /// Track a keyword-search job. Re-creating an id resets its session.
    pub fn create_session(&self, job_id: &str, platform: Platform, page_limit: Option<u32>) {
        self.insert_session(job_id, platform, page_limit, None);
    }

    /// Track a similarity-search job seeded by a target username. These are
    /// the jobs that report a handle expansion queue.
    pub fn create_similarity_session(
        &self,
        job_id: &str,
        platform: Platform,
        page_limit: Option<u32>,
        target_username: &str,
    ) {
        self.insert_session(job_id, platform, page_limit, Some(target_username.to_string()));
    }

    fn insert_session(
        &self,
        job_id: &str,
        platform: Platform,
        page_limit: Option<u32>,
        target_username: Option<String>,
    ) {
        self.stop_polling(job_id);
        let limit = page_limit.unwrap_or(self.config.default_page_limit);
        let session = JobSession {
            job_id: job_id.to_string(),
            platform,
            target_username,
            status: JobStatus::Pending,
            progress: 0.0,
            pagination: Pagination {
                total: None,
                limit,
                next_offset: None,
            },
            creator_buffer: Vec::new(),
            handle_queue: None,
            results_error: None,
        };
        self.sessions_lock().insert(job_id.to_string(), session);
        self.cache_lock().purge_session(job_id);
        info!(job_id, platform = %platform, limit, "Session created");
    }

    /// Stop polling and drop the session. Safe to call for unknown ids.
    pub fn destroy_session(&self, job_id: &str) {
        self.stop_polling(job_id);
        let removed = self.sessions_lock().remove(job_id).is_some();
        self.cache_lock().purge_session(job_id);
        if removed {
            info!(job_id, "Session destroyed");
        }
    }

    /// Read-only view of a session. Creator lists are memoized between
    /// updates, so hosts may call this as often as they re-render.
    pub fn get_snapshot(&self, job_id: &str) -> Option<SessionSnapshot> {
        let sessions = self.sessions_lock();
        let session = sessions.get(job_id)?;
        let buffered = session.creator_buffer.len();

        let creators = {
            let mut cache = self.cache_lock();
            match cache.get(job_id, buffered) {
                Some(hit) => hit,
                None => {
                    let fresh: Arc<[CanonicalCreator]> = session.creator_buffer.clone().into();
                    cache.insert(job_id, buffered, fresh.clone());
                    fresh
                }
            }
        };

        Some(SessionSnapshot {
            job_id: session.job_id.clone(),
            platform: session.platform,
            status: session.status,
            progress: session.progress,
            pagination: session.pagination,
            creators,
            total_creators: session.pagination.total.unwrap_or(buffered as u64),
            handle_queue: session.handle_queue.clone(),
            results_error: session.results_error.clone(),
        })
    }

    /// Fetch and apply one status update immediately, outside the poll
    /// cadence: the hydration path for a freshly tracked job, and the manual
    /// retry hook after a terminal error.
    pub async fn refresh(&self, job_id: &str) -> Result<(), SyncError> {
        let query = {
            let sessions = self.sessions_lock();
            let session = sessions
                .get(job_id)
                .ok_or_else(|| SyncError::UnknownSession(job_id.to_string()))?;
            StatusQuery {
                job_id: session.job_id.clone(),
                platform: session.platform,
                has_target_username: session.target_username.is_some(),
                offset: 0,
                limit: session.pagination.limit,
            }
        };

        let result = self.fetcher.fetch_status(&query).await;
        self.apply_tick(job_id, result);
        Ok(())
    }

    /// Load the next page of an already-computed result set. A no-op when
    /// the cursor is exhausted; a failure never discards accumulated
    /// results or moves the cursor.
    pub async fn fetch_next_page(&self, job_id: &str) -> Result<(), SyncError> {
        let query = {
            let sessions = self.sessions_lock();
            let session = sessions
                .get(job_id)
                .ok_or_else(|| SyncError::UnknownSession(job_id.to_string()))?;
            let Some(offset) = session.pagination.next_offset else {
                debug!(job_id, "No next page to fetch");
                return Ok(());
            };
            StatusQuery {
                job_id: job_id.to_string(),
                platform: session.platform,
                has_target_username: session.target_username.is_some(),
                offset,
                limit: session.pagination.limit,
            }
        };

        info!(job_id, offset = query.offset, limit = query.limit, "Fetching next page");

        match self.fetcher.fetch_status(&query).await {
            Ok(response) => self.apply_page(job_id, response),
            Err(err) => {
                warn!(job_id, error = %err, "Page fetch failed, keeping accumulated results");
                self.record_results_error(job_id, err.to_string());
            }
        }
        Ok(())
    }

    /// Build the query for one poll tick: the first page at the session's
    /// limit. Returns `None` when the session is gone or already terminal.
    pub(crate) fn poll_query(&self, job_id: &str) -> Option<StatusQuery> {
        let sessions = self.sessions_lock();
        let session = sessions.get(job_id)?;
        if session.status.is_terminal() {
            return None;
        }
        Some(StatusQuery {
            job_id: session.job_id.clone(),
            platform: session.platform,
            has_target_username: session.target_username.is_some(),
            offset: 0,
            limit: session.pagination.limit,
        })
    }

    /// Route one settled poll tick into session state.
    pub(crate) fn apply_tick(
        &self,
        job_id: &str,
        result: scraper_client::Result<StatusResponse>,
    ) -> TickOutcome {
        match result {
            Ok(response) => self.apply_status_update(job_id, response),
            Err(err) => {
                let mut sessions = self.sessions_lock();
                let Some(session) = sessions.get_mut(job_id) else {
                    debug!(job_id, "Dropping failed tick for untracked session");
                    return TickOutcome::Dropped;
                };
                warn!(job_id, error = %err, "Poll tick failed, next tick retries");
                session.results_error = Some(err.to_string());
                TickOutcome::Continue
            }
        }
    }

    fn apply_status_update(&self, job_id: &str, mut response: StatusResponse) -> TickOutcome {
        let mut sessions = self.sessions_lock();
        let Some(session) = sessions.get_mut(job_id) else {
            debug!(job_id, "Dropping stale response for untracked session");
            return TickOutcome::Dropped;
        };

        // Server-reported failure: terminal, message kept for manual retry.
        if let Some(message) = response.error.take() {
            let status = response
                .status
                .as_deref()
                .and_then(JobStatus::parse)
                .filter(JobStatus::is_terminal)
                .unwrap_or(JobStatus::Error);
            warn!(job_id, status = %status, error = message.as_str(), "Job reported failure");
            session.status = status;
            session.results_error = Some(message);
            self.cache_lock().purge_session(job_id);
            return TickOutcome::Terminal;
        }

        // Unrecognized status strings leave the current status untouched.
        if let Some(status) = response.status.as_deref().and_then(JobStatus::parse) {
            session.status = status;
        }

        session.progress = progress::project(&response, session.progress);
        if session.status == JobStatus::Completed {
            session.progress = 100.0;
        }

        // Queue state is rebuilt wholesale; an unusable payload keeps the
        // previous projection until a good one arrives.
        if let Some(raw_queue) = response.queue.as_ref() {
            if let Some(state) = parse_handle_queue(raw_queue) {
                session.handle_queue = Some(state);
            }
        }

        let incoming = response.extract_creators_array();
        let (buffer, stats) = merge(
            std::mem::take(&mut session.creator_buffer),
            &incoming,
            session.platform,
            true,
        );
        session.creator_buffer = buffer;

        reconcile_pagination(session, response.pagination.as_ref(), response.total_creators);
        session.results_error = None;

        debug!(
            job_id,
            status = %session.status,
            progress = session.progress,
            new = stats.new_creators,
            duplicates = stats.duplicate_creators,
            buffered = session.creator_buffer.len(),
            "Applied status update"
        );

        let outcome = if session.status.is_terminal() {
            TickOutcome::Terminal
        } else {
            TickOutcome::Continue
        };
        self.cache_lock().purge_session(job_id);
        outcome
    }

    fn apply_page(&self, job_id: &str, mut response: StatusResponse) {
        if let Some(message) = response.error.take() {
            warn!(job_id, error = message.as_str(), "Page fetch reported an error");
            self.record_results_error(job_id, message);
            return;
        }

        let mut sessions = self.sessions_lock();
        let Some(session) = sessions.get_mut(job_id) else {
            debug!(job_id, "Dropping page response for untracked session");
            return;
        };

        let incoming = response.extract_creators_array();
        let (buffer, stats) = merge(
            std::mem::take(&mut session.creator_buffer),
            &incoming,
            session.platform,
            true,
        );
        session.creator_buffer = buffer;

        reconcile_pagination(session, response.pagination.as_ref(), response.total_creators);
        session.results_error = None;

        debug!(
            job_id,
            appended = stats.new_creators,
            duplicates = stats.duplicate_creators,
            buffered = session.creator_buffer.len(),
            "Applied page"
        );
        self.cache_lock().purge_session(job_id);
    }

    fn record_results_error(&self, job_id: &str, message: String) {
        let mut sessions = self.sessions_lock();
        if let Some(session) = sessions.get_mut(job_id) {
            session.results_error = Some(message);
        }
    }

    pub(crate) fn sessions_lock(&self) -> MutexGuard<'_, HashMap<String, JobSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn pollers_lock(&self) -> MutexGuard<'_, HashMap<String, PollerHandle>> {
        self.pollers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cache_lock(&self) -> MutexGuard<'_, SnapshotCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Fold a response's pagination block into the session cursor. Absent and
/// null `nextOffset` both mean exhausted; a response with no block at all
/// derives the cursor from the resolved total so "load more" still works
/// against backends that only report `totalCreators`.
fn reconcile_pagination(
    session: &mut JobSession,
    wire: Option<&WirePagination>,
    total_creators: Option<u64>,
) {
    match wire {
        Some(block) => {
            if let Some(total) = block.total {
                session.pagination.total = Some(total);
            } else if let Some(total) = total_creators {
                session.pagination.total = Some(total);
            }
            if let Some(limit) = block.limit {
                session.pagination.limit = limit;
            }
            session.pagination.next_offset = block.next_offset;
        }
        None => {
            if let Some(total) = total_creators {
                session.pagination.total = Some(total);
            }
            let buffered = session.creator_buffer.len() as u64;
            let total = session.pagination.total.unwrap_or(buffered);
            session.pagination.next_offset = if buffered < total {
                Some(buffered)
            } else {
                None
            };
        }
    }
}
