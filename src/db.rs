// Database Handle
//
// Wires the catalog, the write-ahead log and the buffer pool together
// at startup and hands out shared handles. Dropping the database drops
// resident pages and lock state without flushing.

use std::path::Path;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::common::types::{TableId, DEFAULT_POOL_PAGES};
use crate::storage::buffer::BufferPool;
use crate::storage::DbFile;
use crate::transaction::wal::{LogFile, LogFileError};

pub struct Database {
    catalog: Arc<Catalog>,
    log: Arc<LogFile>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    /// A database with the default buffer pool capacity.
    pub fn new(log_path: impl AsRef<Path>) -> Result<Self, LogFileError> {
        Self::with_pool_size(log_path, DEFAULT_POOL_PAGES)
    }

    /// A database whose buffer pool caches at most `num_pages` pages.
    pub fn with_pool_size(
        log_path: impl AsRef<Path>,
        num_pages: usize,
    ) -> Result<Self, LogFileError> {
        let catalog = Arc::new(Catalog::new());
        let log = Arc::new(LogFile::new(log_path)?);
        let buffer_pool = Arc::new(BufferPool::new(num_pages, catalog.clone(), log.clone()));
        Ok(Database {
            catalog,
            log,
            buffer_pool,
        })
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.clone()
    }

    pub fn buffer_pool(&self) -> Arc<BufferPool> {
        self.buffer_pool.clone()
    }

    pub fn log_file(&self) -> Arc<LogFile> {
        self.log.clone()
    }

    /// Register a table file with the catalog.
    pub fn add_table(&self, file: Arc<dyn DbFile>, name: impl Into<String>) -> TableId {
        self.catalog.add_table(file, name)
    }
}
