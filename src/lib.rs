// Export public modules
pub mod catalog;
pub mod common;
pub mod db;
pub mod query;
pub mod storage;
pub mod transaction;

// Re-export key items for convenient access
pub use catalog::{Catalog, FieldType, TupleDesc};
pub use common::types::Permissions;
pub use db::Database;
pub use storage::buffer::{BufferPool, BufferPoolError, PagePtr};
pub use storage::heap::{HeapFile, HeapFileError, HeapFileIterator};
pub use storage::page::{HeapPage, PageError, PageId};
pub use storage::tuple::{Field, RecordId, Tuple};
pub use storage::{DbFile, DbFileIterator};
pub use transaction::concurrency::{LockManager, LockMode};
pub use transaction::wal::LogFile;
pub use transaction::TransactionId;
