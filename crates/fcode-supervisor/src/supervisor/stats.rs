use fcode_types::WorkerStatus;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorStats {
    pub total_workers: usize,
    pub starting_workers: usize,
    pub running_workers: usize,
    pub unhealthy_workers: usize,
    pub crashed_workers: usize,
    pub stopping_workers: usize,
    pub awaiting_intervention: usize,
    pub total_restarts: u64,
    pub uptime_secs: u64,
}

impl SupervisorStats {
    pub fn record(&mut self, status: WorkerStatus, needs_intervention: bool) {
        self.total_workers += 1;
        match status {
            WorkerStatus::Starting => self.starting_workers += 1,
            WorkerStatus::Running => self.running_workers += 1,
            WorkerStatus::Unhealthy => self.unhealthy_workers += 1,
            WorkerStatus::Crashed => self.crashed_workers += 1,
            WorkerStatus::Stopping => self.stopping_workers += 1,
        }
        if needs_intervention {
            self.awaiting_intervention += 1;
        }
    }

    pub fn healthy_workers(&self) -> usize {
        self.starting_workers + self.running_workers
    }
}
