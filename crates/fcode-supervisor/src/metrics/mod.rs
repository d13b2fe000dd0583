mod cpu;
mod errors;
mod memory;
mod response_time;
mod ring_buffer;
mod types;

pub use cpu::{CpuSample, ProcessMetricsTracker};
pub use errors::{ErrorCounter, ERROR_HISTORY_CAPACITY};
pub use memory::{classify_memory_trend, MemoryHistory};
pub use response_time::{
    ResponseTimeTracker, MAX_PENDING_MEASUREMENTS, PENDING_MEASUREMENT_TTL, UNKNOWN_REQUEST,
};
pub use ring_buffer::BoundedRingBuffer;
pub use types::{CpuStats, ErrorStats, HealthMetrics, ResponseTimeStats};

pub const CPU_HISTORY_CAPACITY: usize = 60;
pub const RESPONSE_HISTORY_CAPACITY: usize = 100;
pub const MEMORY_HISTORY_CAPACITY: usize = 30;
