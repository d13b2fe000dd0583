mod commands;
mod worker;

use async_trait::async_trait;
use fcode_types::FcodeResult;

pub use commands::{ControlCommand, ControlResponse, ErrorCode};
pub use worker::WorkerCommandChannel;

/// Downstream interpreter for control commands arriving on the socket.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self) -> FcodeResult<()>;

    async fn send(&self, command: ControlCommand) -> FcodeResult<ControlResponse>;

    /// Connection-health check, called periodically by the supervisor.
    async fn probe(&self) -> FcodeResult<()>;

    async fn close(&self) -> FcodeResult<()>;
}
