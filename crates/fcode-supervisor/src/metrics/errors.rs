use chrono::{DateTime, Duration as ChronoDuration, Utc};
use fcode_types::{ErrorCategory, ProcessError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use super::ring_buffer::BoundedRingBuffer;

pub const ERROR_HISTORY_CAPACITY: usize = 50;

const RATE_WINDOW_SECS: i64 = 3600;

pub struct ErrorCounter {
    ipc: AtomicU64,
    crash: AtomicU64,
    timeout: AtomicU64,
    other: AtomicU64,
    total: AtomicU64,
    history: BoundedRingBuffer<DateTime<Utc>>,
    last_error: RwLock<Option<String>>,
}

impl ErrorCounter {
    pub fn new() -> Self {
        Self::with_capacity(ERROR_HISTORY_CAPACITY)
    }

    pub fn with_capacity(history_capacity: usize) -> Self {
        Self {
            ipc: AtomicU64::new(0),
            crash: AtomicU64::new(0),
            timeout: AtomicU64::new(0),
            other: AtomicU64::new(0),
            total: AtomicU64::new(0),
            history: BoundedRingBuffer::new(history_capacity),
            last_error: RwLock::new(None),
        }
    }

    pub fn record(&self, category: ErrorCategory, message: impl Into<String>) {
        self.record_at(category, message, Utc::now());
    }

    pub fn record_at(&self, category: ErrorCategory, message: impl Into<String>, at: DateTime<Utc>) {
        let counter = match category {
            ErrorCategory::Ipc => &self.ipc,
            ErrorCategory::Crash => &self.crash,
            ErrorCategory::Timeout => &self.timeout,
            ErrorCategory::Other => &self.other,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
        self.history.add(at);
        *self.last_error.write() = Some(message.into());
    }

    pub fn record_process_error(&self, error: &ProcessError) {
        self.record(error.category(), error.to_string());
    }

    pub fn record_message(&self, message: &str) {
        self.record(ErrorCategory::classify_message(message), message);
    }

    pub fn count(&self, category: ErrorCategory) -> u64 {
        match category {
            ErrorCategory::Ipc => self.ipc.load(Ordering::Relaxed),
            ErrorCategory::Crash => self.crash.load(Ordering::Relaxed),
            ErrorCategory::Timeout => self.timeout.load(Ordering::Relaxed),
            ErrorCategory::Other => self.other.load(Ordering::Relaxed),
        }
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Errors per hour, counted over the retained history only.
    ///
    /// With more than `ERROR_HISTORY_CAPACITY` errors inside the hour the oldest
    /// ones have already been overwritten, so the result is a lower bound; see
    /// [`ErrorCounter::window_saturated`].
    pub fn error_rate(&self) -> f64 {
        let cutoff = Utc::now() - ChronoDuration::seconds(RATE_WINDOW_SECS);
        self.history.count_where(|ts| *ts > cutoff) as f64
    }

    /// True when every retained entry is inside the rate window and the history is full.
    pub fn window_saturated(&self) -> bool {
        if self.history.len() < self.history.capacity() {
            return false;
        }
        let cutoff = Utc::now() - ChronoDuration::seconds(RATE_WINDOW_SECS);
        self.history.count_where(|ts| *ts > cutoff) == self.history.capacity()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }
}

impl Default for ErrorCounter {
    fn default() -> Self {
        Self::new()
    }
}
