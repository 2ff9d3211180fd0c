// Lock Manager
//
// Per-page shared/exclusive locks with in-place upgrade. The manager
// keeps one PageLock per page: its `entries` mutex guards the holder
// list and makes every acquire/release/holds query atomic, while its
// `gate` mutex lets only one waiter at a time run the retry loop for
// that page. Deadlock avoidance is left to the caller's acquisition
// timeout; there is no wait-for graph.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::storage::page::PageId;
use crate::transaction::concurrency::transaction::TransactionId;

/// Lock mode held on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug, Clone, Copy)]
struct LockEntry {
    tid: TransactionId,
    mode: LockMode,
}

/// Lock state for a single page.
pub struct PageLock {
    // Serializes the acquisition loop: one waiter per page at a time.
    gate: Mutex<()>,
    entries: Mutex<Vec<LockEntry>>,
}

impl PageLock {
    fn new() -> Self {
        PageLock {
            gate: Mutex::new(()),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Run `f` while holding this page's waiter gate.
    pub fn with_gate<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.gate.lock();
        f()
    }
}

pub struct LockManager {
    table: Mutex<HashMap<PageId, Arc<PageLock>>>,
}

impl LockManager {
    pub fn new() -> Self {
        LockManager {
            table: Mutex::new(HashMap::new()),
        }
    }

    /// The PageLock for `pid`, created on first use.
    pub fn page_lock(&self, pid: PageId) -> Arc<PageLock> {
        self.table
            .lock()
            .entry(pid)
            .or_insert_with(|| Arc::new(PageLock::new()))
            .clone()
    }

    /// Attempt to take `mode` on the page guarded by `page_lock` for
    /// `tid`. Returns whether the lock was granted; a denied request
    /// leaves the holder list untouched.
    pub fn acquire_lock(&self, page_lock: &PageLock, tid: TransactionId, mode: LockMode) -> bool {
        let mut entries = page_lock.entries.lock();

        if entries.is_empty() {
            entries.push(LockEntry { tid, mode });
            return true;
        }

        if let Some(pos) = entries.iter().position(|e| e.tid == tid) {
            return match (entries[pos].mode, mode) {
                // X subsumes everything; repeated S requests are idempotent.
                (LockMode::Exclusive, _) | (LockMode::Shared, LockMode::Shared) => true,
                (LockMode::Shared, LockMode::Exclusive) => {
                    // Upgrade in place, but only as the sole holder.
                    if entries.len() == 1 {
                        entries[pos].mode = LockMode::Exclusive;
                        true
                    } else {
                        false
                    }
                }
            };
        }

        // tid holds nothing here: a new shared lock coexists with other
        // shared holders, everything else waits.
        if mode == LockMode::Shared && entries.iter().all(|e| e.mode == LockMode::Shared) {
            entries.push(LockEntry { tid, mode });
            return true;
        }
        false
    }

    /// Drop `tid`'s lock on `pid`, if any. Idempotent.
    pub fn release_lock(&self, tid: TransactionId, pid: PageId) {
        let page_lock = match self.table.lock().get(&pid) {
            Some(pl) => pl.clone(),
            None => return,
        };
        let mut entries = page_lock.entries.lock();
        if let Some(pos) = entries.iter().position(|e| e.tid == tid) {
            entries.remove(pos);
        }
    }

    /// Drop every lock held by `tid`, across all pages.
    pub fn release_all(&self, tid: TransactionId) {
        let page_locks: Vec<Arc<PageLock>> = self.table.lock().values().cloned().collect();
        for page_lock in page_locks {
            page_lock.entries.lock().retain(|e| e.tid != tid);
        }
    }

    /// Whether `tid` holds any lock on `pid`.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.held_mode(tid, pid).is_some()
    }

    /// The mode `tid` holds on `pid`, if any.
    pub fn held_mode(&self, tid: TransactionId, pid: PageId) -> Option<LockMode> {
        let page_lock = self.table.lock().get(&pid)?.clone();
        let entries = page_lock.entries.lock();
        entries.iter().find(|e| e.tid == tid).map(|e| e.mode)
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
