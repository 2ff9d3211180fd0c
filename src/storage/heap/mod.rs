mod heap_file;
mod iterator;

pub use heap_file::{HeapFile, HeapFileError};
pub use iterator::HeapFileIterator;
