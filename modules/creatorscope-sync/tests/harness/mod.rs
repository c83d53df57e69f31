//! Test harness: a scripted stand-in for the job execution backend.
//!
//! Responses are queued per job id and popped one per request; a job can be
//! gated behind a semaphore so the test controls exactly when an in-flight
//! request resolves. Recorded calls let suites assert request shape and
//! cadence.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use creatorscope_sync::{
    JobStatusFetch, Platform, ScraperError, SessionManager, StatusQuery, StatusResponse,
    SyncConfig,
};

/// One scripted reply: a JSON body, or an error message surfaced as a
/// network failure.
pub enum Reply {
    Body(Value),
    NetworkError(String),
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub job_id: String,
    pub offset: u64,
    pub limit: u32,
    pub at: Instant,
}

#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    /// Reply when a job's script runs dry. `None` ends the job: a bare
    /// `completed` status.
    fallback: Mutex<Option<Value>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, job_id: &str, reply: Reply) {
        self.scripts
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn push_body(&self, job_id: &str, body: Value) {
        self.push(job_id, Reply::Body(body));
    }

    pub fn set_fallback(&self, body: Value) {
        *self.fallback.lock().unwrap() = Some(body);
    }

    /// Gate a job: requests block until [`release`](Self::release) grants a
    /// permit each.
    pub fn gate(&self, job_id: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert(job_id.to_string(), gate.clone());
        gate
    }

    pub fn release(gate: &Semaphore) {
        gate.add_permits(1);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, job_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.job_id == job_id)
            .count()
    }
}

#[async_trait]
impl JobStatusFetch for ScriptedFetcher {
    async fn fetch_status(&self, query: &StatusQuery) -> Result<StatusResponse, ScraperError> {
        let gate = self.gates.lock().unwrap().get(&query.job_id).cloned();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .expect("test gate semaphore closed")
                .forget();
        }

        self.calls.lock().unwrap().push(RecordedCall {
            job_id: query.job_id.clone(),
            offset: query.offset,
            limit: query.limit,
            at: Instant::now(),
        });

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&query.job_id)
            .and_then(VecDeque::pop_front);

        let body = match next {
            Some(Reply::NetworkError(message)) => return Err(ScraperError::Network(message)),
            Some(Reply::Body(body)) => body,
            None => self
                .fallback
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| serde_json::json!({"status": "completed"})),
        };

        let response = serde_json::from_value(body).expect("scripted body decodes");
        Ok(response)
    }
}

/// Manager wired to a scripted fetcher with a short poll interval.
pub fn manager_with(fetcher: Arc<ScriptedFetcher>) -> SessionManager {
    let config = SyncConfig::builder()
        .poll_interval(std::time::Duration::from_secs(3))
        .build();
    SessionManager::new(fetcher, config)
}

/// Spin (in virtual time) until `predicate` holds, or fail the test.
pub async fn wait_until<F: FnMut() -> bool>(mut predicate: F) {
    for _ in 0..2000 {
        if predicate() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    panic!("condition not reached before the wait window closed");
}

pub const PLATFORM: Platform = Platform::TikTok;
