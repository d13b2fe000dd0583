use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;

use super::envelope::Envelope;
use super::error::{IpcError, IpcResult};
use super::framing::{read_message, write_message};
use crate::supervisor::CancellationToken;

/// Framed, enveloped message stream. Reads abort with `Cancelled` once the
/// attached token fires.
pub struct Connection<S = UnixStream> {
    stream: S,
    cancel: Option<CancellationToken>,
}

impl Connection<UnixStream> {
    pub async fn connect(path: impl AsRef<std::path::Path>) -> IpcResult<Self> {
        Ok(Self::new(UnixStream::connect(path).await?))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Wraps `data` in a fresh envelope and sends it; returns the message id.
    pub async fn send<T: Serialize>(&mut self, data: T) -> IpcResult<String> {
        let envelope = Envelope::new(data);
        write_message(&mut self.stream, &envelope).await?;
        Ok(envelope.message_id)
    }

    /// `Ok(None)` when the peer closed the connection between messages.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> IpcResult<Option<Envelope<T>>> {
        let Self { stream, cancel } = self;
        match cancel {
            Some(token) => {
                if token.is_cancelled() {
                    return Err(IpcError::Cancelled);
                }
                tokio::select! {
                    _ = token.cancelled() => Err(IpcError::Cancelled),
                    result = read_message(stream) => result,
                }
            }
            None => read_message(stream).await,
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}
