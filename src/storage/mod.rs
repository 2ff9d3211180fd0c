// Storage Module
//
// Pages, heap files and the buffer pool, plus the DbFile seam through
// which the catalog and buffer pool address any table file.

pub mod buffer;
pub mod heap;
pub mod page;
pub mod tuple;

use std::sync::Arc;

use crate::catalog::TupleDesc;
use crate::common::types::TableId;
use crate::storage::buffer::{BufferPool, BufferPoolError, PagePtr};
use crate::storage::heap::HeapFileError;
use crate::storage::page::{HeapPage, PageId};
use crate::storage::tuple::Tuple;
use crate::transaction::TransactionId;

/// A table file: page-aligned storage for tuples of one schema.
pub trait DbFile: Send + Sync {
    /// Stable identifier of this file, used as the table id.
    fn id(&self) -> TableId;

    fn tuple_desc(&self) -> Arc<TupleDesc>;

    /// Read one page directly from disk, bypassing the buffer pool.
    fn read_page(&self, pid: PageId) -> Result<HeapPage, HeapFileError>;

    /// Write one page directly to disk, growing the file if needed.
    fn write_page(&self, page: &HeapPage) -> Result<(), HeapFileError>;

    fn num_pages(&self) -> Result<usize, HeapFileError>;

    /// Place `tuple` somewhere in the file, fetching candidate pages
    /// with write permission through `pool`. Returns the dirtied pages.
    fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<PagePtr>, BufferPoolError>;

    /// Remove `tuple` from the page its record id names. Returns the
    /// dirtied page.
    fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &Tuple,
        pool: &BufferPool,
    ) -> Result<PagePtr, BufferPoolError>;

    /// A tuple scan over the whole file on behalf of `tid`, driven by
    /// buffer-pool fetches.
    fn iterator(
        self: Arc<Self>,
        tid: TransactionId,
        pool: Arc<BufferPool>,
    ) -> Box<dyn DbFileIterator>;
}

/// External cursor over a file's tuples. `rewind` restarts the scan;
/// `next` on a closed cursor yields `None`.
pub trait DbFileIterator {
    fn open(&mut self) -> Result<(), BufferPoolError>;
    fn next(&mut self) -> Result<Option<Tuple>, BufferPoolError>;
    fn rewind(&mut self) -> Result<(), BufferPoolError>;
    fn close(&mut self);
}
