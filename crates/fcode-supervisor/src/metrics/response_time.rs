use dashmap::DashMap;
use parking_lot::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;

use super::ring_buffer::BoundedRingBuffer;

/// Returned by [`ResponseTimeTracker::complete_measurement`] for an id that was never started.
pub const UNKNOWN_REQUEST: f64 = -1.0;

/// Open measurements kept per worker before old ones are dropped.
pub const MAX_PENDING_MEASUREMENTS: usize = 1024;

/// Measurements left open longer than this are dropped once the limit is hit.
pub const PENDING_MEASUREMENT_TTL: Duration = Duration::from_secs(600);

#[derive(Clone, Copy, Debug, Default)]
struct Summary {
    last_ms: Option<f64>,
    average_ms: f64,
}

pub struct ResponseTimeTracker {
    pending: DashMap<String, Instant>,
    pending_limit: usize,
    history: BoundedRingBuffer<f64>,
    summary: RwLock<Summary>,
}

impl ResponseTimeTracker {
    pub fn new(history_capacity: usize) -> Self {
        Self::with_pending_limit(history_capacity, MAX_PENDING_MEASUREMENTS)
    }

    pub fn with_pending_limit(history_capacity: usize, pending_limit: usize) -> Self {
        Self {
            pending: DashMap::new(),
            pending_limit: pending_limit.max(1),
            history: BoundedRingBuffer::new(history_capacity),
            summary: RwLock::new(Summary::default()),
        }
    }

    pub fn start_measurement(&self, request_id: &str) {
        let now = Instant::now();
        if self.pending.len() >= self.pending_limit && !self.pending.contains_key(request_id) {
            self.evict_pending(now);
        }
        self.pending.insert(request_id.to_string(), now);
    }

    /// Drops expired measurements, then the oldest one if still at the limit.
    fn evict_pending(&self, now: Instant) {
        self.pending
            .retain(|_, started| now.saturating_duration_since(*started) < PENDING_MEASUREMENT_TTL);
        if self.pending.len() < self.pending_limit {
            return;
        }

        let oldest = self
            .pending
            .iter()
            .min_by_key(|entry| *entry.value())
            .map(|entry| entry.key().clone());
        if let Some(request_id) = oldest {
            debug!("Dropping unfinished measurement {}", request_id);
            self.pending.remove(&request_id);
        }
    }

    /// Elapsed milliseconds since the matching `start_measurement`, or [`UNKNOWN_REQUEST`].
    pub fn complete_measurement(&self, request_id: &str) -> f64 {
        let Some((_, started)) = self.pending.remove(request_id) else {
            return UNKNOWN_REQUEST;
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        // Held across the add so `last_ms` always names the newest entry.
        let mut summary = self.summary.write();
        self.history.add(elapsed_ms);
        // Buffer is capacity-bounded, so the mean is rebuilt from what it holds.
        *summary = Summary {
            last_ms: Some(elapsed_ms),
            average_ms: self.history.get_average(|v| *v),
        };
        elapsed_ms
    }

    pub fn cancel_measurement(&self, request_id: &str) -> bool {
        self.pending.remove(request_id).is_some()
    }

    pub fn last_ms(&self) -> Option<f64> {
        self.summary.read().last_ms
    }

    pub fn average_ms(&self) -> f64 {
        self.summary.read().average_ms
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn sample_count(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self, n: usize) -> Vec<f64> {
        self.history.get_last(n)
    }
}
