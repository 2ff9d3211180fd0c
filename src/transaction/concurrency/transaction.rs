use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque unique transaction identifier with value equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Allocate a fresh, process-unique id.
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}
