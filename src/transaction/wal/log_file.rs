// Write-Ahead Log File
//
// Append-only log of page images. The buffer pool records the before
// and after image of every dirty page it is about to write, then forces
// the log, then writes the data page. Replay of the log is out of
// scope; the file exists so the write ordering can be enforced and
// inspected.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use byteorder::{BigEndian, WriteBytesExt};
use log::trace;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transaction::concurrency::transaction::TransactionId;

#[derive(Error, Debug)]
pub enum LogFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode log record: {0}")]
    Encode(String),
}

/// One update record: the page image before and after a mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub tid: u64,
    pub before_image: Vec<u8>,
    pub after_image: Vec<u8>,
}

pub struct LogFile {
    file: Mutex<File>,
}

impl LogFile {
    /// Open (or create) the log at `path` for appending.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, LogFileError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(LogFile {
            file: Mutex::new(file),
        })
    }

    /// Append an update record. Records are framed as a big-endian u32
    /// length followed by the encoded record.
    pub fn log_write(
        &self,
        tid: TransactionId,
        before_image: &[u8],
        after_image: &[u8],
    ) -> Result<(), LogFileError> {
        let record = LogRecord {
            tid: tid.id(),
            before_image: before_image.to_vec(),
            after_image: after_image.to_vec(),
        };
        let encoded =
            bincode::serialize(&record).map_err(|e| LogFileError::Encode(e.to_string()))?;

        let mut file = self.file.lock();
        file.write_u32::<BigEndian>(encoded.len() as u32)?;
        file.write_all(&encoded)?;
        Ok(())
    }

    /// Force everything appended so far onto stable storage.
    pub fn force(&self) -> Result<(), LogFileError> {
        let mut file = self.file.lock();
        file.flush()?;
        file.sync_all()?;
        trace!("log forced");
        Ok(())
    }
}
