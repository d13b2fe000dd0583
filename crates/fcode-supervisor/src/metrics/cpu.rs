use parking_lot::Mutex;
use std::time::{Duration, Instant};

use super::ring_buffer::BoundedRingBuffer;

#[derive(Clone, Copy, Debug)]
pub struct CpuSample {
    pub pid: u32,
    pub cpu_time: Duration,
    pub wall: Instant,
}

/// Turns cumulative CPU-time readings of one process into a percentage of total host capacity.
pub struct ProcessMetricsTracker {
    baseline: Mutex<Option<CpuSample>>,
    history: BoundedRingBuffer<f64>,
    cores: usize,
}

impl ProcessMetricsTracker {
    pub fn new(history_capacity: usize) -> Self {
        Self::with_cores(history_capacity, num_cpus::get())
    }

    pub fn with_cores(history_capacity: usize, cores: usize) -> Self {
        Self {
            baseline: Mutex::new(None),
            history: BoundedRingBuffer::new(history_capacity),
            cores: cores.max(1),
        }
    }

    /// Returns `0.0` and re-baselines when there is no earlier sample for `pid`.
    /// Every value returned from a new reading, that `0.0` included, lands in the history.
    pub fn record(&self, pid: u32, cpu_time: Duration, wall: Instant) -> f64 {
        let current = CpuSample { pid, cpu_time, wall };
        let mut baseline = self.baseline.lock();

        let previous = match *baseline {
            Some(prev) if prev.pid == pid => prev,
            _ => {
                *baseline = Some(current);
                self.history.add(0.0);
                return 0.0;
            }
        };

        let wall_elapsed = wall.saturating_duration_since(previous.wall);
        if wall_elapsed.is_zero() {
            return self.last_usage();
        }

        let cpu_elapsed = cpu_time.saturating_sub(previous.cpu_time);
        let usage = (cpu_elapsed.as_secs_f64() / wall_elapsed.as_secs_f64()) * 100.0
            / self.cores as f64;
        let usage = usage.clamp(0.0, 100.0);

        *baseline = Some(current);
        self.history.add(usage);
        usage
    }

    pub fn last_usage(&self) -> f64 {
        self.history.get_last(1).first().copied().unwrap_or(0.0)
    }

    pub fn average(&self) -> f64 {
        self.history.get_average(|v| *v)
    }

    pub fn peak(&self) -> f64 {
        self.history.snapshot().into_iter().fold(0.0, f64::max)
    }

    pub fn history(&self, n: usize) -> Vec<f64> {
        self.history.get_last(n)
    }

    pub fn baseline_pid(&self) -> Option<u32> {
        self.baseline.lock().map(|s| s.pid)
    }

    pub fn cores(&self) -> usize {
        self.cores
    }
}

impl std::fmt::Debug for ProcessMetricsTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessMetricsTracker")
            .field("baseline_pid", &self.baseline_pid())
            .field("samples", &self.history.len())
            .field("cores", &self.cores)
            .finish()
    }
}
