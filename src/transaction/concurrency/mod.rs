pub mod lock_manager;
pub mod transaction;

pub use lock_manager::{LockManager, LockMode, PageLock};
pub use transaction::TransactionId;
