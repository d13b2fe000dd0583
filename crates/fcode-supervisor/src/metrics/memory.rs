use fcode_types::MemoryTrend;

use super::ring_buffer::BoundedRingBuffer;

const MIN_TREND_SAMPLES: usize = 4;
const TREND_THRESHOLD: f64 = 0.10;

pub struct MemoryHistory {
    samples: BoundedRingBuffer<u64>,
}

impl MemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: BoundedRingBuffer::new(capacity),
        }
    }

    pub fn record(&self, bytes: u64) {
        self.samples.add(bytes);
    }

    pub fn latest(&self) -> Option<u64> {
        self.samples.get_last(1).first().copied()
    }

    pub fn trend(&self) -> MemoryTrend {
        let mut samples = self.samples.snapshot();
        samples.reverse();
        classify_memory_trend(&samples)
    }
}

impl std::fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHistory").field("latest", &self.latest()).finish()
    }
}

/// Compares the mean of the older half of `samples` (oldest first) against the newer half.
pub fn classify_memory_trend(samples: &[u64]) -> MemoryTrend {
    if samples.len() < MIN_TREND_SAMPLES {
        return MemoryTrend::Unknown;
    }

    let mid = samples.len() / 2;
    let mean = |s: &[u64]| s.iter().map(|&v| v as f64).sum::<f64>() / s.len() as f64;
    let older = mean(&samples[..mid]);
    let newer = mean(&samples[mid..]);

    if older == 0.0 {
        return if newer > 0.0 {
            MemoryTrend::Increasing
        } else {
            MemoryTrend::Stable
        };
    }

    let change = (newer - older) / older;
    if change > TREND_THRESHOLD {
        MemoryTrend::Increasing
    } else if change < -TREND_THRESHOLD {
        MemoryTrend::Decreasing
    } else {
        MemoryTrend::Stable
    }
}
