use std::sync::Arc;

use anyhow::Result;

use heapdb::common::Permissions;
use heapdb::{
    BufferPoolError, DbFile, DbFileIterator, HeapPage, LockMode, PageId, TransactionId,
};

mod common;
use common::{create_database, create_table, int_desc, int_tuple, int_value};

#[test]
fn test_abort_discards_uncommitted_insert() -> Result<()> {
    let (db, _log) = create_database(10)?;
    let td = int_desc();
    let (file, backing) = create_table(&db, td.clone(), "numbers")?;
    let pool = db.buffer_pool();

    let t1 = TransactionId::new();
    pool.insert_tuple(t1, file.id(), int_tuple(&td, 42))?;
    pool.transaction_complete(t1, false)?;

    // a later transaction sees nothing
    let t2 = TransactionId::new();
    let mut scan = Arc::clone(&file).iterator(t2, pool.clone());
    scan.open()?;
    assert!(scan.next()?.is_none());
    pool.transaction_complete(t2, true)?;

    // and no data page was modified on disk: the file grew by one page
    // of zeros and stayed that way
    let bytes = std::fs::read(backing.path())?;
    assert!(bytes.iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn test_commit_persists_to_disk_and_log() -> Result<()> {
    let (db, log) = create_database(10)?;
    let td = int_desc();
    let (file, _backing) = create_table(&db, td.clone(), "numbers")?;
    let pool = db.buffer_pool();

    let log_len_before = std::fs::metadata(log.path())?.len();

    let t1 = TransactionId::new();
    pool.insert_tuple(t1, file.id(), int_tuple(&td, 7))?;
    pool.transaction_complete(t1, true)?;

    // the tuple is on disk, readable without the pool
    let page = file.read_page(PageId::new(file.id(), 0))?;
    let values: Vec<i32> = page.iter().map(|t| int_value(t, 0)).collect();
    assert_eq!(values, vec![7]);

    // and the write-ahead record preceded it
    let log_len_after = std::fs::metadata(log.path())?.len();
    assert!(log_len_after > log_len_before);
    Ok(())
}

#[test]
fn test_clean_transaction_commits_without_logging() -> Result<()> {
    let (db, log) = create_database(10)?;
    let td = int_desc();
    let (file, _backing) = create_table(&db, td.clone(), "numbers")?;
    let pool = db.buffer_pool();

    let pid = PageId::new(file.id(), 0);
    file.write_page(&HeapPage::new(pid, td.clone(), &HeapPage::empty_page_data())?)?;

    let t1 = TransactionId::new();
    pool.get_page(t1, pid, Permissions::ReadOnly)?;
    pool.transaction_complete(t1, true)?;

    // nothing dirty, nothing logged
    assert_eq!(std::fs::metadata(log.path())?.len(), 0);
    Ok(())
}

#[test]
fn test_lock_upgrade_without_contention() -> Result<()> {
    let (db, _log) = create_database(10)?;
    let td = int_desc();
    let (file, _backing) = create_table(&db, td.clone(), "numbers")?;
    let pool = db.buffer_pool();

    let pid = PageId::new(file.id(), 0);
    file.write_page(&HeapPage::new(pid, td.clone(), &HeapPage::empty_page_data())?)?;

    let t1 = TransactionId::new();
    pool.get_page(t1, pid, Permissions::ReadOnly)?;
    assert_eq!(pool.lock_manager().held_mode(t1, pid), Some(LockMode::Shared));

    // sole shared holder upgrades in place, without blocking
    pool.get_page(t1, pid, Permissions::ReadWrite)?;
    assert_eq!(
        pool.lock_manager().held_mode(t1, pid),
        Some(LockMode::Exclusive)
    );
    pool.transaction_complete(t1, true)?;
    Ok(())
}

#[test]
fn test_upgrade_under_contention_times_out() -> Result<()> {
    let (db, _log) = create_database(10)?;
    let td = int_desc();
    let (file, _backing) = create_table(&db, td.clone(), "numbers")?;
    let pool = db.buffer_pool();

    let pid = PageId::new(file.id(), 0);
    file.write_page(&HeapPage::new(pid, td.clone(), &HeapPage::empty_page_data())?)?;

    let t1 = TransactionId::new();
    let t2 = TransactionId::new();
    pool.get_page(t2, pid, Permissions::ReadOnly)?;
    pool.get_page(t1, pid, Permissions::ReadOnly)?;

    // t2 still shares the page, so t1 cannot upgrade and must abort
    let result = pool.get_page(t1, pid, Permissions::ReadWrite);
    assert!(matches!(result, Err(BufferPoolError::TransactionAborted)));

    // the standard response: abort t1, leaving t2 untouched
    pool.transaction_complete(t1, false)?;
    assert!(!pool.holds_lock(t1, pid));
    assert!(pool.holds_lock(t2, pid));
    pool.transaction_complete(t2, true)?;
    Ok(())
}

#[test]
fn test_completion_releases_all_locks() -> Result<()> {
    let (db, _log) = create_database(10)?;
    let td = int_desc();
    let (file, _backing) = create_table(&db, td.clone(), "numbers")?;
    let pool = db.buffer_pool();

    for page_no in 0..3 {
        let pid = PageId::new(file.id(), page_no);
        file.write_page(&HeapPage::new(pid, td.clone(), &HeapPage::empty_page_data())?)?;
    }

    let t1 = TransactionId::new();
    for page_no in 0..3 {
        pool.get_page(t1, PageId::new(file.id(), page_no), Permissions::ReadWrite)?;
    }
    pool.transaction_complete(t1, true)?;

    // a second writer takes every page without waiting
    let t2 = TransactionId::new();
    for page_no in 0..3 {
        let pid = PageId::new(file.id(), page_no);
        assert!(!pool.holds_lock(t1, pid));
        pool.get_page(t2, pid, Permissions::ReadWrite)?;
    }
    pool.transaction_complete(t2, true)?;
    Ok(())
}

#[test]
fn test_abort_then_retry_succeeds() -> Result<()> {
    let (db, _log) = create_database(10)?;
    let td = int_desc();
    let (file, _backing) = create_table(&db, td.clone(), "numbers")?;
    let pool = db.buffer_pool();

    let t1 = TransactionId::new();
    pool.insert_tuple(t1, file.id(), int_tuple(&td, 1))?;
    pool.transaction_complete(t1, false)?;

    let t2 = TransactionId::new();
    pool.insert_tuple(t2, file.id(), int_tuple(&td, 2))?;
    pool.transaction_complete(t2, true)?;

    let t3 = TransactionId::new();
    let mut scan = Arc::clone(&file).iterator(t3, pool.clone());
    scan.open()?;
    let mut seen = Vec::new();
    while let Some(t) = scan.next()? {
        seen.push(int_value(&t, 0));
    }
    assert_eq!(seen, vec![2]);
    pool.transaction_complete(t3, true)?;
    Ok(())
}

#[test]
fn test_parallel_writers_on_separate_tables() -> Result<()> {
    let (db, _log) = create_database(20)?;
    let td = int_desc();
    let (file_a, _backing_a) = create_table(&db, td.clone(), "a")?;
    let (file_b, _backing_b) = create_table(&db, td.clone(), "b")?;
    let pool = db.buffer_pool();

    let spawn_writer = |file: Arc<heapdb::HeapFile>, base: i32| {
        let pool = pool.clone();
        let td = td.clone();
        std::thread::spawn(move || -> Result<(), BufferPoolError> {
            let tid = TransactionId::new();
            for v in 0..50 {
                pool.insert_tuple(tid, file.id(), int_tuple(&td, base + v))?;
            }
            pool.transaction_complete(tid, true)
        })
    };

    let ha = spawn_writer(file_a.clone(), 0);
    let hb = spawn_writer(file_b.clone(), 1000);
    ha.join().expect("writer a panicked")?;
    hb.join().expect("writer b panicked")?;

    let tid = TransactionId::new();
    for (file, base) in [(file_a, 0), (file_b, 1000)] {
        let mut scan = file.iterator(tid, pool.clone());
        scan.open()?;
        let mut seen = Vec::new();
        while let Some(t) = scan.next()? {
            seen.push(int_value(&t, 0));
        }
        assert_eq!(seen, (base..base + 50).collect::<Vec<_>>());
    }
    pool.transaction_complete(tid, true)?;
    Ok(())
}
