use thiserror::Error;

use crate::common::types::TableId;
use crate::storage::heap::HeapFileError;
use crate::storage::page::PageError;
use crate::transaction::wal::LogFileError;

#[derive(Error, Debug)]
pub enum BufferPoolError {
    #[error("transaction aborted: lock wait timed out")]
    TransactionAborted,

    #[error("cannot evict: every buffered page is dirty")]
    AllDirty,

    #[error("no table registered under id {0}")]
    UnknownTable(TableId),

    #[error("page error: {0}")]
    Page(#[from] PageError),

    #[error("heap file error: {0}")]
    File(#[from] HeapFileError),

    #[error("log error: {0}")]
    Log(#[from] LogFileError),
}
