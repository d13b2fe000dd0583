mod handle;
mod probe;
mod spawner;

pub use handle::ProcessHandle;
pub use probe::{read_cpu_time, ProcessProbe, ProcessSample};
pub use spawner::{spawn, SpawnSpec};
