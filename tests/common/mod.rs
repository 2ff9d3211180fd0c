use std::sync::Arc;

use anyhow::Result;
use tempfile::NamedTempFile;

use heapdb::{Database, Field, FieldType, HeapFile, Tuple, TupleDesc};

// Create a database backed by a temporary log file. The NamedTempFile
// must stay alive for the duration of the test.
#[allow(dead_code)]
pub fn create_database(pool_size: usize) -> Result<(Database, NamedTempFile)> {
    let log = NamedTempFile::new()?;
    let db = Database::with_pool_size(log.path(), pool_size)?;
    Ok((db, log))
}

// Create a heap file on a fresh temporary file and register it with the
// database under `name`.
#[allow(dead_code)]
pub fn create_table(
    db: &Database,
    td: Arc<TupleDesc>,
    name: &str,
) -> Result<(Arc<HeapFile>, NamedTempFile)> {
    let backing = NamedTempFile::new()?;
    let file = Arc::new(HeapFile::new(backing.path(), td)?);
    db.add_table(file.clone(), name);
    Ok((file, backing))
}

#[allow(dead_code)]
pub fn int_desc() -> Arc<TupleDesc> {
    Arc::new(TupleDesc::new(vec![FieldType::Int]))
}

#[allow(dead_code)]
pub fn two_int_desc() -> Arc<TupleDesc> {
    Arc::new(TupleDesc::new(vec![FieldType::Int, FieldType::Int]))
}

#[allow(dead_code)]
pub fn int_tuple(td: &Arc<TupleDesc>, v: i32) -> Tuple {
    Tuple::new(td.clone(), vec![Field::Int(v)])
}

#[allow(dead_code)]
pub fn pair_tuple(td: &Arc<TupleDesc>, a: i32, b: i32) -> Tuple {
    Tuple::new(td.clone(), vec![Field::Int(a), Field::Int(b)])
}

#[allow(dead_code)]
pub fn int_value(t: &Tuple, i: usize) -> i32 {
    match t.field(i) {
        Some(Field::Int(v)) => *v,
        other => panic!("expected int field at {}, got {:?}", i, other),
    }
}
