// Transaction Management Module

pub mod concurrency;
pub mod wal;

// Public exports
pub use concurrency::transaction::TransactionId;
pub use concurrency::{LockManager, LockMode, PageLock};
pub use wal::{LogFile, LogFileError};
