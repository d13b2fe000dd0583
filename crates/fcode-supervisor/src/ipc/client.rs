use std::path::Path;
use std::time::Duration;

use super::connection::Connection;
use super::error::{IpcError, IpcResult};
use crate::channel::{ControlCommand, ControlResponse};

/// Request/response client for the control socket.
pub struct SupervisorClient {
    conn: Connection,
    timeout: Duration,
}

impl SupervisorClient {
    pub async fn connect(path: impl AsRef<Path>, timeout: Duration) -> IpcResult<Self> {
        let conn = tokio::time::timeout(timeout, Connection::connect(path))
            .await
            .map_err(|_| IpcError::Timeout(timeout))??;
        Ok(Self { conn, timeout })
    }

    pub async fn request(&mut self, command: ControlCommand) -> IpcResult<ControlResponse> {
        let conn = &mut self.conn;
        let exchange = async move {
            conn.send(command).await?;
            match conn.recv::<ControlResponse>().await? {
                Some(envelope) => Ok(envelope.data),
                None => Err(IpcError::ConnectionClosed),
            }
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| IpcError::Timeout(self.timeout))?
    }
}
