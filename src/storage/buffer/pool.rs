// Buffer Pool
//
// Bounded cache of heap pages shared by every transaction, and the
// place where page locks are taken. A fetch acquires the page lock
// (shared or exclusive, retried up to a randomized deadline), then
// serves the page from cache or disk, evicting a clean page when the
// cache is at capacity. Dirty pages are only ever written out through
// the WAL-ordered flush path, and never before their transaction
// commits (NO-STEAL).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::{Mutex, RwLock};
use rand::Rng;

use crate::catalog::Catalog;
use crate::common::types::{Permissions, TableId};
use crate::storage::buffer::BufferPoolError;
use crate::storage::page::{HeapPage, PageError, PageId};
use crate::storage::tuple::Tuple;
use crate::storage::DbFile;
use crate::transaction::concurrency::{LockManager, LockMode};
use crate::transaction::wal::LogFile;
use crate::transaction::TransactionId;

/// Shared handle to a resident page.
pub type PagePtr = Arc<RwLock<HeapPage>>;

// Lock waits abort somewhere in [0, 2s); the jitter keeps two deadlocked
// transactions from timing out in lockstep and retrying forever.
const MAX_LOCK_WAIT_MS: u64 = 2000;
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(10);

pub struct BufferPool {
    num_pages: usize,
    pages: Mutex<HashMap<PageId, PagePtr>>,
    lock_manager: LockManager,
    catalog: Arc<Catalog>,
    log: Arc<LogFile>,
}

impl BufferPool {
    /// A pool caching at most `num_pages` pages, resolving table files
    /// through `catalog` and logging page writes through `log`.
    pub fn new(num_pages: usize, catalog: Arc<Catalog>, log: Arc<LogFile>) -> Self {
        BufferPool {
            num_pages,
            pages: Mutex::new(HashMap::new()),
            lock_manager: LockManager::new(),
            catalog,
            log,
        }
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    /// Number of pages currently resident.
    pub fn resident_pages(&self) -> usize {
        self.pages.lock().len()
    }

    fn file(&self, table_id: TableId) -> Result<Arc<dyn DbFile>, BufferPoolError> {
        self.catalog
            .database_file(table_id)
            .ok_or(BufferPoolError::UnknownTable(table_id))
    }

    /// Fetch `pid` on behalf of `tid` with `perm`, locking, reading
    /// from disk on a miss and evicting if the cache is full.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> Result<PagePtr, BufferPoolError> {
        let mode = match perm {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        };

        // One waiter loops per page at a time. The attempt comes before
        // the deadline check so an uncontended lock is granted even when
        // the randomized timeout draws zero.
        let page_lock = self.lock_manager.page_lock(pid);
        page_lock.with_gate(|| {
            let timeout =
                Duration::from_millis(rand::thread_rng().gen_range(0..MAX_LOCK_WAIT_MS));
            let start = Instant::now();
            loop {
                if self.lock_manager.acquire_lock(&page_lock, tid, mode) {
                    return Ok(());
                }
                if start.elapsed() > timeout {
                    debug!("lock wait on {:?} timed out, aborting {:?}", pid, tid);
                    return Err(BufferPoolError::TransactionAborted);
                }
                std::thread::sleep(LOCK_RETRY_INTERVAL);
            }
        })?;

        {
            let mut pages = self.pages.lock();
            if let Some(page) = pages.get(&pid) {
                return Ok(page.clone());
            }
            while pages.len() >= self.num_pages {
                Self::evict(&mut pages)?;
            }
        }

        // Miss: read outside the cache mutex. The page lock just taken
        // still covers pid, so nobody mutates it underneath us.
        let file = self.file(pid.table_id())?;
        let page = Arc::new(RwLock::new(file.read_page(pid)?));

        let mut pages = self.pages.lock();
        while pages.len() >= self.num_pages && !pages.contains_key(&pid) {
            Self::evict(&mut pages)?;
        }
        // On a racing double read the first insert wins.
        Ok(pages.entry(pid).or_insert(page).clone())
    }

    // NO-STEAL eviction: only clean pages leave the cache, so the flush
    // before discard has nothing to write. Every resident dirty means
    // the pool is too small for the active transactions.
    fn evict(pages: &mut HashMap<PageId, PagePtr>) -> Result<(), BufferPoolError> {
        let victim = pages
            .iter()
            .find(|(_, page)| page.read().is_dirty().is_none())
            .map(|(pid, _)| *pid);
        match victim {
            Some(pid) => {
                debug!("evicting clean page {:?}", pid);
                pages.remove(&pid);
                Ok(())
            }
            None => Err(BufferPoolError::AllDirty),
        }
    }

    /// Add `tuple` to `table_id` on behalf of `tid`, taking write locks
    /// through the heap file's page scan.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: Tuple,
    ) -> Result<(), BufferPoolError> {
        let file = self.file(table_id)?;
        let dirtied = file.insert_tuple(tid, tuple, self)?;
        self.adopt_dirtied(dirtied, tid)
    }

    /// Remove `tuple` from its page on behalf of `tid`.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<(), BufferPoolError> {
        let rid = tuple.record_id().ok_or(PageError::TupleMismatch)?;
        let file = self.file(rid.page_id().table_id())?;
        let dirtied = file.delete_tuple(tid, tuple, self)?;
        self.adopt_dirtied(vec![dirtied], tid)
    }

    // Mark the pages a mutation touched as dirtied by tid and make sure
    // the cache holds exactly these instances.
    fn adopt_dirtied(
        &self,
        dirtied: Vec<PagePtr>,
        tid: TransactionId,
    ) -> Result<(), BufferPoolError> {
        for page in dirtied {
            let pid = {
                let mut guard = page.write();
                guard.mark_dirty(Some(tid));
                guard.id()
            };
            let mut pages = self.pages.lock();
            if !pages.contains_key(&pid) {
                while pages.len() >= self.num_pages {
                    Self::evict(&mut pages)?;
                }
            }
            pages.insert(pid, page);
        }
        Ok(())
    }

    /// Flush `pid` if it is resident and dirty.
    pub fn flush_page(&self, pid: PageId) -> Result<(), BufferPoolError> {
        let page = self.pages.lock().get(&pid).cloned();
        match page {
            Some(page) => self.flush_entry(&page),
            None => Ok(()),
        }
    }

    // WAL ordering: log the before/after images and force the log
    // before the data page goes to disk.
    fn flush_entry(&self, page: &PagePtr) -> Result<(), BufferPoolError> {
        let mut guard = page.write();
        let tid = match guard.is_dirty() {
            Some(tid) => tid,
            None => return Ok(()),
        };
        self.log
            .log_write(tid, &guard.before_image_data(), &guard.page_data())?;
        self.log.force()?;

        let file = self.file(guard.id().table_id())?;
        file.write_page(&guard)?;
        guard.mark_dirty(None);
        Ok(())
    }

    /// Write every page dirtied by `tid` to disk, then checkpoint the
    /// before-image of every resident page.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<(), BufferPoolError> {
        let resident: Vec<PagePtr> = self.pages.lock().values().cloned().collect();
        for page in &resident {
            if page.read().is_dirty() == Some(tid) {
                self.flush_entry(page)?;
            }
            page.read().set_before_image();
        }
        Ok(())
    }

    // Abort path: every page tid dirtied is replaced by a fresh disk
    // image, discarding the uncommitted mutations.
    fn restore_pages(&self, tid: TransactionId) -> Result<(), BufferPoolError> {
        let resident: Vec<(PageId, PagePtr)> = self
            .pages
            .lock()
            .iter()
            .map(|(pid, page)| (*pid, page.clone()))
            .collect();
        for (pid, page) in resident {
            if page.read().is_dirty() == Some(tid) {
                let file = self.file(pid.table_id())?;
                let fresh = Arc::new(RwLock::new(file.read_page(pid)?));
                self.pages.lock().insert(pid, fresh);
            }
        }
        Ok(())
    }

    /// Commit or abort `tid`: flush or restore its dirty pages, then
    /// release every lock it holds. Flushing strictly precedes lock
    /// release.
    pub fn transaction_complete(
        &self,
        tid: TransactionId,
        commit: bool,
    ) -> Result<(), BufferPoolError> {
        if commit {
            self.flush_pages(tid)?;
        } else {
            self.restore_pages(tid)?;
        }
        self.lock_manager.release_all(tid);
        debug!(
            "transaction {:?} complete ({})",
            tid,
            if commit { "commit" } else { "abort" }
        );
        Ok(())
    }

    /// Whether `tid` currently holds a lock on `pid`.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds_lock(tid, pid)
    }

    /// Drop `pid` from the cache without flushing.
    pub fn discard_page(&self, pid: PageId) {
        self.pages.lock().remove(&pid);
    }
}
