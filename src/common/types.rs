use std::sync::atomic::{AtomicUsize, Ordering};

/// Default page size in bytes (4KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of pages cached by a buffer pool
pub const DEFAULT_POOL_PAGES: usize = 50;

/// Table ID type, derived from the backing file's absolute path
pub type TableId = u64;

// Process-wide so that every page constructed in one run agrees on the
// slot layout. Only tests ever change it.
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Current page size in bytes.
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::SeqCst)
}

/// Override the page size. Intended for tests only; pages constructed
/// under different sizes do not mix.
pub fn set_page_size(size: usize) {
    PAGE_SIZE.store(size, Ordering::SeqCst);
}

/// Restore the default page size.
pub fn reset_page_size() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::SeqCst);
}

/// Access permission requested when fetching a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}
