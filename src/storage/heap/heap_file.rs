// Heap File
//
// One operating-system file holding the pages of one table, in no
// particular order. The file length is always a whole number of pages;
// page i occupies bytes [i * page_size, (i + 1) * page_size). Raw page
// I/O opens the file per call so handles never outlive an operation;
// tuple-level operations go back through the buffer pool so locking and
// caching stay in one place.

use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::catalog::TupleDesc;
use crate::common::types::{page_size, Permissions, TableId};
use crate::storage::buffer::{BufferPool, BufferPoolError, PagePtr};
use crate::storage::heap::HeapFileIterator;
use crate::storage::page::{HeapPage, PageError, PageId};
use crate::storage::tuple::Tuple;
use crate::storage::{DbFile, DbFileIterator};
use crate::transaction::TransactionId;

#[derive(Error, Debug)]
pub enum HeapFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("short read: page {0:?} lies past the end of the file")]
    ShortRead(PageId),
    #[error("page error: {0}")]
    Page(#[from] PageError),
}

pub struct HeapFile {
    path: PathBuf,
    td: Arc<TupleDesc>,
    table_id: TableId,
}

impl HeapFile {
    /// Open a heap file at `path`, creating it empty if absent. The
    /// table id is a deterministic hash of the absolute path, so the
    /// same file always maps to the same id.
    pub fn new(path: impl AsRef<Path>, td: Arc<TupleDesc>) -> Result<Self, HeapFileError> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_ref())?;
        let path = std::fs::canonicalize(path.as_ref())?;

        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        let table_id = hasher.finish();

        Ok(HeapFile { path, td, table_id })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Append one zero page and return its page number.
    fn extend_one_page(&self) -> Result<usize, HeapFileError> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        let old_len = file.metadata()?.len();
        file.write_all(&HeapPage::empty_page_data())?;
        file.flush()?;
        Ok((old_len / page_size() as u64) as usize)
    }
}

impl DbFile for HeapFile {
    fn id(&self) -> TableId {
        self.table_id
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.td.clone()
    }

    fn read_page(&self, pid: PageId) -> Result<HeapPage, HeapFileError> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start((pid.page_no() * page_size()) as u64))?;

        let mut data = vec![0u8; page_size()];
        match file.read_exact(&mut data) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(HeapFileError::ShortRead(pid));
            }
            Err(e) => return Err(e.into()),
        }
        Ok(HeapPage::new(pid, self.td.clone(), &data)?)
    }

    fn write_page(&self, page: &HeapPage) -> Result<(), HeapFileError> {
        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.seek(SeekFrom::Start((page.id().page_no() * page_size()) as u64))?;
        file.write_all(&page.page_data())?;
        file.flush()?;
        Ok(())
    }

    fn num_pages(&self) -> Result<usize, HeapFileError> {
        let len = std::fs::metadata(&self.path)?.len() as usize;
        Ok((len + page_size() - 1) / page_size())
    }

    fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<PagePtr>, BufferPoolError> {
        for page_no in 0..self.num_pages()? {
            let pid = PageId::new(self.table_id, page_no);
            let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
            let has_room = page.read().num_empty_slots() > 0;
            if has_room {
                page.write().insert_tuple(tuple)?;
                return Ok(vec![page]);
            }
        }

        // Every existing page is full: grow the file by one zero page
        // and place the tuple there, going through the pool so the new
        // page is locked and cached like any other.
        let page_no = self.extend_one_page()?;
        let pid = PageId::new(self.table_id, page_no);
        let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
        page.write().insert_tuple(tuple)?;
        Ok(vec![page])
    }

    fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &Tuple,
        pool: &BufferPool,
    ) -> Result<PagePtr, BufferPoolError> {
        let rid = tuple.record_id().ok_or(PageError::TupleMismatch)?;
        let page = pool.get_page(tid, rid.page_id(), Permissions::ReadWrite)?;
        page.write().delete_tuple(tuple)?;
        Ok(page)
    }

    fn iterator(
        self: Arc<Self>,
        tid: TransactionId,
        pool: Arc<BufferPool>,
    ) -> Box<dyn DbFileIterator> {
        Box::new(HeapFileIterator::new(self, tid, pool))
    }
}
