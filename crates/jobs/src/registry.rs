//! Process/page state registry on top of [`TtlCache`].
//!
//! The cache holds one [`ProcessRecord`] per process, so every mutation is a
//! get-modify-put of the whole record. Those sequences run under a
//! per-process lock: two pages of the same process finishing at the same
//! moment are serialised and neither update is lost. Different processes
//! never contend.
//!
//! Every mutation re-persists the record with a fresh TTL; reads never do.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use indexmap::IndexMap;
use taleify_core::error::CoreError;
use taleify_core::page::{PageEntry, PageState};
use taleify_core::types::{PageId, ProcessId};

use crate::cache::{TtlCache, DEFAULT_CAPACITY, DEFAULT_TTL};

/// Pages of one process in submission order.
pub type ProcessRecord = IndexMap<PageId, PageEntry>;

/// Owner of all process and page state.
///
/// Built once at startup and shared via `Arc` with the service, the page
/// pipelines and the HTTP layer.
pub struct JobRegistry {
    cache: TtlCache<ProcessId, ProcessRecord>,
    ttl: Duration,
    locks: ProcessLocks,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl JobRegistry {
    /// Registry holding at most `capacity` processes, each kept alive for
    /// `ttl` after its last mutation.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: TtlCache::new(capacity, ttl),
            ttl,
            locks: ProcessLocks::default(),
        }
    }

    /// Create an empty process record and return its id.
    pub fn initiate(&self) -> Result<ProcessId, CoreError> {
        let process_id = uuid::Uuid::new_v4();
        self.persist(process_id, ProcessRecord::new())?;
        tracing::info!(%process_id, ttl_secs = self.ttl.as_secs(), "Process initiated");
        Ok(process_id)
    }

    /// Register `page_id` as pending under an existing process.
    ///
    /// Fails with `NotFound` if the process is unknown or expired and with
    /// `Conflict` if the page id is already taken.
    pub fn submit_page(&self, process_id: ProcessId, page_id: PageId) -> Result<PageEntry, CoreError> {
        self.locks.with_lock(process_id, || {
            let mut record = self
                .cache
                .get(&process_id)
                .ok_or_else(|| CoreError::not_found("Process", process_id))?;

            if record.contains_key(&page_id) {
                return Err(CoreError::Conflict(format!(
                    "page {page_id} already exists in process {process_id}"
                )));
            }

            let entry = PageEntry::now(PageState::Pending);
            record.insert(page_id, entry.clone());
            self.persist(process_id, record)?;
            tracing::debug!(%process_id, %page_id, "Page registered as pending");
            Ok(entry)
        })
    }

    /// Move `page_id` to `next`, leaving sibling pages untouched.
    ///
    /// If the process record has vanished (expired or evicted) it is
    /// recreated with only this page. A transition that is not strictly
    /// forward is rejected with `Conflict` and nothing is written.
    pub fn transition(
        &self,
        process_id: ProcessId,
        page_id: PageId,
        next: PageState,
    ) -> Result<(), CoreError> {
        self.locks.with_lock(process_id, || {
            let mut record = self.cache.get(&process_id).unwrap_or_else(|| {
                tracing::warn!(%process_id, %page_id, "Process record missing, recreating it");
                ProcessRecord::new()
            });

            if let Some(current) = record.get(&page_id) {
                if !current.state.can_transition_to(&next) {
                    return Err(CoreError::Conflict(format!(
                        "page {page_id} cannot move from {} to {}",
                        current.state.kind(),
                        next.kind(),
                    )));
                }
            }

            let status = next.kind();
            record.insert(page_id, PageEntry::now(next));
            self.persist(process_id, record)?;
            tracing::debug!(%process_id, %page_id, %status, "Page transitioned");
            Ok(())
        })
    }

    /// Snapshot of a live process record. Does not refresh its TTL.
    pub fn record(&self, process_id: ProcessId) -> Option<ProcessRecord> {
        self.cache.get(&process_id)
    }

    /// The underlying cache, for introspection and sweeping.
    pub fn cache(&self) -> &TtlCache<ProcessId, ProcessRecord> {
        &self.cache
    }

    /// TTL applied to every process record write.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn persist(&self, process_id: ProcessId, record: ProcessRecord) -> Result<(), CoreError> {
        if self.cache.set(process_id, record, Some(self.ttl)) {
            Ok(())
        } else {
            tracing::error!(%process_id, "Failed to persist process record");
            Err(CoreError::Internal(format!(
                "failed to persist process {process_id}"
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Per-process locks
// ---------------------------------------------------------------------------

/// Table of per-process mutexes. A slot exists only while some caller holds
/// or waits for it.
#[derive(Default)]
struct ProcessLocks {
    table: Mutex<HashMap<ProcessId, Arc<Mutex<()>>>>,
}

impl ProcessLocks {
    /// Run `f` while holding the lock for `process_id`.
    ///
    /// `f` must not block on async work: the guard is a std mutex.
    fn with_lock<T>(&self, process_id: ProcessId, f: impl FnOnce() -> T) -> T {
        let slot = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(process_id).or_default())
        };

        let result = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the table, one here: nobody else is queued.
        if Arc::strong_count(&slot) == 2 {
            table.remove(&process_id);
        }
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
