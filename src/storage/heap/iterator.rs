// Heap File Iterator
//
// Sequential tuple scan over one heap file. Every page is fetched
// through the buffer pool with read permission, so a scan takes shared
// locks and populates the cache exactly like any other reader.

use std::sync::Arc;

use crate::common::types::Permissions;
use crate::storage::buffer::{BufferPool, BufferPoolError};
use crate::storage::heap::HeapFile;
use crate::storage::page::PageId;
use crate::storage::tuple::Tuple;
use crate::storage::{DbFile, DbFileIterator};
use crate::transaction::TransactionId;

pub struct HeapFileIterator {
    tid: TransactionId,
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    page_no: usize,
    // None when closed; Some(exhausted) between pages.
    tuples: Option<std::vec::IntoIter<Tuple>>,
}

impl HeapFileIterator {
    pub fn new(file: Arc<HeapFile>, tid: TransactionId, pool: Arc<BufferPool>) -> Self {
        HeapFileIterator {
            tid,
            file,
            pool,
            page_no: 0,
            tuples: None,
        }
    }

    // Fetch one page through the pool and materialize its occupied
    // tuples; the page guard is not held across iteration.
    fn load_page(&self, page_no: usize) -> Result<std::vec::IntoIter<Tuple>, BufferPoolError> {
        let pid = PageId::new(self.file.id(), page_no);
        let page = self.pool.get_page(self.tid, pid, Permissions::ReadOnly)?;
        let tuples: Vec<Tuple> = page.read().iter().cloned().collect();
        Ok(tuples.into_iter())
    }
}

impl DbFileIterator for HeapFileIterator {
    fn open(&mut self) -> Result<(), BufferPoolError> {
        self.page_no = 0;
        if self.file.num_pages()? == 0 {
            self.tuples = Some(Vec::new().into_iter());
        } else {
            self.tuples = Some(self.load_page(0)?);
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, BufferPoolError> {
        match self.tuples.as_mut() {
            None => return Ok(None), // closed
            Some(cursor) => {
                if let Some(t) = cursor.next() {
                    return Ok(Some(t));
                }
            }
        }

        // Current page exhausted: walk forward until some page yields a
        // tuple or the file runs out.
        while self.page_no + 1 < self.file.num_pages()? {
            self.page_no += 1;
            let mut cursor = self.load_page(self.page_no)?;
            let next = cursor.next();
            self.tuples = Some(cursor);
            if let Some(t) = next {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }

    fn rewind(&mut self) -> Result<(), BufferPoolError> {
        self.close();
        self.open()
    }

    fn close(&mut self) {
        self.tuples = None;
        self.page_no = 0;
    }
}
