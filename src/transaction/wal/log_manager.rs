use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, info};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::common::config::{LOG_BUFFER_SIZE, LOG_TIMEOUT};
use crate::common::types::Lsn;
use crate::storage::disk::{DiskManager, DiskManagerError};
use crate::transaction::wal::log_record::{LogRecord, LogRecordError};

/// Process-wide gate on WAL emission. Toggled only by the log manager's
/// flush-thread lifecycle; read it through `LogManager::is_enabled`.
static LOGGING_ENABLED: AtomicBool = AtomicBool::new(false);

#[derive(Error, Debug)]
pub enum LogManagerError {
    #[error("Disk error: {0}")]
    DiskError(#[from] DiskManagerError),

    #[error("Log record error: {0}")]
    LogRecordError(#[from] LogRecordError),
}

/// Result type for log manager operations
pub type Result<T> = std::result::Result<T, LogManagerError>;

/// Write-ahead log manager with two equal-sized buffers: writers append to
/// the active log buffer; a dedicated flush task consumes the flush buffer.
///
/// The flush task wakes on a swap request or every `LOG_TIMEOUT`. After
/// every write it advances `persistent_lsn` to `next_lsn` (appends are
/// serialised by the same mutex, so no record can slip in between) and
/// completes all registered one-shot notifications: `()` for force-flush
/// waiters and the new durable LSN for group-commit waiters.
///
/// LSNs are byte offsets into the log stream: each append is assigned the
/// current `next_lsn`, which then advances by the record size.
pub struct LogManager {
    disk_manager: Arc<DiskManager>,
    inner: Mutex<LogInner>,
    /// wakes the flush task
    flush_cv: Condvar,
    /// wakes writers waiting for capacity or for an in-flight flush
    append_cv: Condvar,
    persistent_lsn: AtomicI32,
    flush_thread: Mutex<Option<JoinHandle<()>>>,
}

struct LogInner {
    log_buffer: Box<[u8]>,
    flush_buffer: Box<[u8]>,
    /// bytes appended to the active buffer
    log_size: usize,
    /// bytes handed to the flush task
    flush_size: usize,
    /// set while the flush buffer holds a pending swap
    flush_requested: bool,
    next_lsn: Lsn,
    flush_waiters: Vec<Sender<()>>,
    commit_waiters: Vec<Sender<Lsn>>,
}

impl LogManager {
    pub fn new(disk_manager: Arc<DiskManager>) -> Result<Self> {
        // LSNs are log-file offsets, so both watermarks resume from the
        // current length of the log.
        let durable = disk_manager.log_len()? as Lsn;

        Ok(Self {
            disk_manager,
            inner: Mutex::new(LogInner {
                log_buffer: vec![0u8; LOG_BUFFER_SIZE].into_boxed_slice(),
                flush_buffer: vec![0u8; LOG_BUFFER_SIZE].into_boxed_slice(),
                log_size: 0,
                flush_size: 0,
                flush_requested: false,
                next_lsn: durable,
                flush_waiters: Vec::new(),
                commit_waiters: Vec::new(),
            }),
            flush_cv: Condvar::new(),
            append_cv: Condvar::new(),
            persistent_lsn: AtomicI32::new(durable),
            flush_thread: Mutex::new(None),
        })
    }

    /// Whether WAL emission is enabled process-wide.
    pub fn is_enabled(&self) -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// LSN up to which the log is known durable.
    pub fn persistent_lsn(&self) -> Lsn {
        self.persistent_lsn.load(Ordering::SeqCst)
    }

    /// LSN that the next appended record will receive.
    pub fn next_lsn(&self) -> Lsn {
        self.inner.lock().next_lsn
    }

    /// Append a log record, assigning its LSN. If the active buffer cannot
    /// take the record the caller either swaps the buffers itself (no flush
    /// in progress) or waits until the in-flight flush completes.
    pub fn append_log_record(&self, record: &mut LogRecord) -> Result<Lsn> {
        let size = record.size as usize;
        assert!(size <= LOG_BUFFER_SIZE, "log record larger than the log buffer");

        let mut inner = self.inner.lock();

        while inner.log_size + size > LOG_BUFFER_SIZE && inner.flush_requested {
            self.append_cv.wait(&mut inner);
        }

        if inner.log_size + size > LOG_BUFFER_SIZE {
            // no flush in progress; hand the full buffer over
            inner.swap_buffers();
            self.flush_cv.notify_one();
        }

        let lsn = inner.next_lsn;
        record.lsn = lsn;
        let offset = inner.log_size;
        record.serialize_into(&mut inner.log_buffer[offset..offset + size])?;
        inner.log_size += size;
        inner.next_lsn += size as Lsn;
        Ok(lsn)
    }

    /// Register a one-shot force-flush notification: ensures a swap is
    /// scheduled (waiting out any in-flight flush first), wakes the flush
    /// task, and returns the receiver the caller must wait on. Used by the
    /// buffer pool before evicting a page whose LSN is not yet durable.
    pub fn request_flush(&self) -> Receiver<()> {
        let (tx, rx) = channel();
        let mut inner = self.inner.lock();

        while inner.flush_requested {
            self.append_cv.wait(&mut inner);
        }

        inner.swap_buffers();
        inner.flush_waiters.push(tx);
        self.flush_cv.notify_one();
        rx
    }

    /// Register a one-shot group-commit notification. The receiver yields
    /// the durable LSN after the next flush; callers loop until it reaches
    /// their commit LSN.
    pub fn register_commit_waiter(&self) -> Receiver<Lsn> {
        let (tx, rx) = channel();
        self.inner.lock().commit_waiters.push(tx);
        rx
    }

    /// Enable logging and start the flush task.
    pub fn run_flush_thread(self: &Arc<Self>) {
        let mut handle = self.flush_thread.lock();
        if handle.is_some() {
            return;
        }
        LOGGING_ENABLED.store(true, Ordering::SeqCst);
        info!("log flush thread started");

        let manager = Arc::clone(self);
        *handle = Some(std::thread::spawn(move || manager.flush_loop()));
    }

    /// Disable logging, then stop and join the flush task.
    pub fn stop_flush_thread(&self) {
        let handle = self.flush_thread.lock().take();
        if let Some(handle) = handle {
            LOGGING_ENABLED.store(false, Ordering::SeqCst);
            self.flush_cv.notify_one();
            let _ = handle.join();
            info!("log flush thread stopped");
        }
    }

    fn flush_loop(&self) {
        while LOGGING_ENABLED.load(Ordering::SeqCst) {
            let mut inner = self.inner.lock();
            self.flush_cv
                .wait_while_for(&mut inner, |i| !i.flush_requested, LOG_TIMEOUT);

            if inner.flush_requested {
                // woken by a swap (append overflow or force-flush)
                self.disk_manager
                    .write_log(&inner.flush_buffer[..inner.flush_size])
                    .expect("log write failed");
                inner.flush_requested = false;
                for waiter in inner.flush_waiters.drain(..) {
                    let _ = waiter.send(());
                }
            } else if inner.log_size > 0 {
                // timeout: swap and write whatever is buffered
                inner.swap_buffers();
                inner.flush_requested = false;
                self.disk_manager
                    .write_log(&inner.flush_buffer[..inner.flush_size])
                    .expect("log write failed");
            }

            // Appends hold the same mutex, so every assigned LSN is now on
            // disk and the watermark may advance to next_lsn.
            let durable = inner.next_lsn;
            self.persistent_lsn.store(durable, Ordering::SeqCst);
            for waiter in inner.commit_waiters.drain(..) {
                let _ = waiter.send(durable);
            }
            self.append_cv.notify_all();
            debug!("log flushed, persistent_lsn = {}", durable);
        }
    }
}

impl Drop for LogManager {
    fn drop(&mut self) {
        self.stop_flush_thread();
    }
}

impl LogInner {
    /// Exchange the active and flush buffers and mark the flush pending.
    fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.log_buffer, &mut self.flush_buffer);
        self.flush_size = self.log_size;
        self.log_size = 0;
        self.flush_requested = true;
    }
}
