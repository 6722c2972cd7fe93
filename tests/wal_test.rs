use std::sync::Arc;

use anyhow::Result;
use serial_test::serial;

mod common;
use common::{create_test_buffer_pool_with_wal, rid};

use tarndb::common::types::{Lsn, PAGE_SIZE};
use tarndb::storage::page::set_page_lsn;
use tarndb::transaction::concurrency::LockManager;
use tarndb::transaction::wal::{LogRecord, LogRecordContent};
use tarndb::TransactionManager;

// the logging-enabled flag is process-wide, so flush-thread tests are serial

#[test]
#[serial]
fn test_group_commit_waits_for_durability() -> Result<()> {
    let (_buffer_pool, log_manager, _file) = create_test_buffer_pool_with_wal(8)?;
    log_manager.run_flush_thread();

    let lock_manager = Arc::new(LockManager::new(false));
    let txn_manager = Arc::new(TransactionManager::new(
        lock_manager,
        Some(log_manager.clone()),
    ));

    // leave bytes in the log buffer before the concurrent commits
    let seed = txn_manager.begin();
    let mut record = LogRecord::new_insert(seed.id(), seed.prev_lsn(), rid(1, 0), vec![1; 40]);
    log_manager.append_log_record(&mut record)?;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let txn_manager = txn_manager.clone();
        let log_manager = log_manager.clone();
        handles.push(std::thread::spawn(move || {
            let txn = txn_manager.begin();
            let commit_floor = log_manager.next_lsn();
            txn_manager.commit(&txn);
            // commit returned only after its record became durable
            assert!(log_manager.persistent_lsn() >= commit_floor);
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    log_manager.stop_flush_thread();
    Ok(())
}

#[test]
#[serial]
fn test_eviction_respects_wal_rule() -> Result<()> {
    // three frames force evictions quickly
    let (buffer_pool, log_manager, _file) = create_test_buffer_pool_with_wal(3)?;
    log_manager.run_flush_thread();

    // a data change whose log record is still buffered
    let mut record = LogRecord::new_insert(0, -1, rid(1, 0), b"payload".to_vec());
    let lsn = log_manager.append_log_record(&mut record)?;

    let (page, page_id) = buffer_pool.new_page()?;
    {
        let mut data = page.write_latch();
        set_page_lsn(&mut data, lsn);
        data[100..107].copy_from_slice(b"payload");
    }
    buffer_pool.unpin_page(page_id, true);

    // churn the pool until the dirty page is evicted
    for _ in 0..3 {
        let (_, filler) = buffer_pool.new_page()?;
        buffer_pool.unpin_page(filler, false);
    }

    // the eviction had to wait for the log to reach the page's LSN
    assert!(log_manager.persistent_lsn() > lsn);
    let mut raw = [0u8; PAGE_SIZE];
    buffer_pool.disk_manager().read_page(page_id, &mut raw)?;
    assert_eq!(&raw[100..107], b"payload");

    log_manager.stop_flush_thread();
    Ok(())
}

#[test]
#[serial]
fn test_log_survives_on_disk() -> Result<()> {
    let (_buffer_pool, log_manager, _file) = create_test_buffer_pool_with_wal(4)?;
    log_manager.run_flush_thread();

    let mut lsns: Vec<Lsn> = Vec::new();
    let mut prev = -1;
    for i in 0..5u32 {
        let mut record = LogRecord::new_insert(3, prev, rid(2, i), vec![i as u8; 16]);
        prev = log_manager.append_log_record(&mut record)?;
        lsns.push(prev);
    }

    let done = log_manager.request_flush();
    done.recv().unwrap();
    log_manager.stop_flush_thread();

    // read the records back from the raw log stream
    let disk = _buffer_pool.disk_manager();
    let mut buffer = vec![0u8; 4096];
    assert!(disk.read_log(&mut buffer, 0)?);

    let mut offset = 0usize;
    for (i, expected_lsn) in lsns.iter().enumerate() {
        let record = LogRecord::deserialize(&buffer[offset..]).expect("record readable");
        assert_eq!(record.lsn, *expected_lsn);
        assert_eq!(record.txn_id, 3);
        match &record.content {
            LogRecordContent::Tuple { rid: r, tuple } => {
                assert_eq!(*r, rid(2, i as u32));
                assert_eq!(tuple, &vec![i as u8; 16]);
            }
            other => panic!("unexpected content {:?}", other),
        }
        offset += record.size as usize;
    }
    Ok(())
}
