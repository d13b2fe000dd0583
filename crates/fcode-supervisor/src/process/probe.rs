use parking_lot::Mutex;
use std::time::{Duration, Instant};
use sysinfo::{Pid, System};

/// One OS-level reading of a worker process.
#[derive(Clone, Copy, Debug)]
pub struct ProcessSample {
    pub pid: u32,
    pub memory_bytes: Option<u64>,
    pub cpu_time: Option<Duration>,
    pub taken_at: Instant,
}

pub struct ProcessProbe {
    system: Mutex<System>,
}

impl ProcessProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// `memory_bytes` is `None` when the OS no longer knows the pid.
    pub fn sample(&self, pid: u32) -> ProcessSample {
        let sys_pid = Pid::from_u32(pid);
        let memory_bytes = {
            let mut system = self.system.lock();
            if system.refresh_process(sys_pid) {
                system.process(sys_pid).map(|p| p.memory())
            } else {
                None
            }
        };

        ProcessSample {
            pid,
            memory_bytes,
            cpu_time: read_cpu_time(pid),
            taken_at: Instant::now(),
        }
    }
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Cumulative user + system CPU time of `pid`, from `/proc/<pid>/stat`.
#[cfg(target_os = "linux")]
pub fn read_cpu_time(pid: u32) -> Option<Duration> {
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    parse_stat_cpu_ticks(&stat).map(|ticks| {
        let hz = clock_ticks_per_second();
        Duration::from_secs_f64(ticks as f64 / hz as f64)
    })
}

#[cfg(not(target_os = "linux"))]
pub fn read_cpu_time(_pid: u32) -> Option<Duration> {
    None
}

#[cfg(target_os = "linux")]
fn clock_ticks_per_second() -> i64 {
    use nix::unistd::{sysconf, SysconfVar};

    match sysconf(SysconfVar::CLK_TCK) {
        Ok(Some(hz)) if hz > 0 => hz as i64,
        _ => 100,
    }
}

/// utime + stime in clock ticks. The command name may contain spaces and
/// parentheses, so fields are counted from the last `)`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_stat_cpu_ticks(stat: &str) -> Option<u64> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}
