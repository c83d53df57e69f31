//! Bounded memoization of snapshot creator projections.
//!
//! Hosts poll `get_snapshot` far more often than the buffer changes; caching
//! the cloned creator list keyed by `(job_id, buffer_len)` makes repeated
//! reads between merges cheap. Owned per manager instance — never
//! process-global — and FIFO-bounded to cap memory.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::merge::CanonicalCreator;

pub(crate) struct SnapshotCache {
    capacity: usize,
    entries: HashMap<(String, usize), Arc<[CanonicalCreator]>>,
    order: VecDeque<(String, usize)>,
}

impl SnapshotCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub(crate) fn get(&self, job_id: &str, len: usize) -> Option<Arc<[CanonicalCreator]>> {
        self.entries.get(&(job_id.to_string(), len)).cloned()
    }

    pub(crate) fn insert(&mut self, job_id: &str, len: usize, creators: Arc<[CanonicalCreator]>) {
        let key = (job_id.to_string(), len);
        if self.entries.insert(key.clone(), creators).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    /// Drop every entry for one session. Called when an update is applied
    /// (a field-merge can change content without changing length) and when
    /// the session is destroyed.
    pub(crate) fn purge_session(&mut self, job_id: &str) {
        self.entries.retain(|(id, _), _| id != job_id);
        self.order.retain(|(id, _)| id != job_id);
    }
}
