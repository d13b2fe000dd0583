mod store;
mod worker;

pub use store::WorkerRegistry;
pub use worker::{Incarnation, WorkerProcess, WorkerSnapshot};
