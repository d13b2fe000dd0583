use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

use super::connection::Connection;
use super::error::{IpcError, IpcResult};
use crate::channel::{CommandChannel, ControlCommand, ControlResponse, ErrorCode};
use crate::config::IpcConfig;
use crate::supervisor::CancellationToken;

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Control-plane socket. The socket file is removed when the server is dropped.
pub struct SocketServer {
    listener: UnixListener,
    path: PathBuf,
}

impl SocketServer {
    /// Removes a stale socket file left by a previous run, then binds.
    /// Fails with `AddrInUse` if a live server still accepts on the path.
    pub fn bind(config: &IpcConfig) -> IpcResult<Self> {
        let path = config.socket_path.clone();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            remove_stale_socket(&path)?;
        }

        let listener = bind_listener(&path, config.backlog)?;
        info!("Control socket listening on {}", path.display());
        Ok(Self { listener, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accepts connections until `cancel` fires. Each connection is served
    /// on its own task and stops at EOF, on a transport error, or on cancel.
    pub async fn serve(self, channel: Arc<dyn CommandChannel>, mut cancel: CancellationToken) {
        info!("Socket accept loop started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Socket server cancelled");
                    break;
                }
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => {
                            let channel = Arc::clone(&channel);
                            let token = cancel.clone();
                            tokio::spawn(async move {
                                match handle_connection(stream, channel, token).await {
                                    Ok(()) | Err(IpcError::Cancelled) => {}
                                    Err(e) => warn!("Control connection closed: {}", e),
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error on socket {}: {}", self.path.display(), e);
                            tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                        }
                    }
                }
            }
        }

        info!("Socket accept loop stopped");
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed socket file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove socket file {}: {}", self.path.display(), e),
        }
    }
}

fn remove_stale_socket(path: &Path) -> IpcResult<()> {
    match std::os::unix::net::UnixStream::connect(path) {
        Ok(_) => Err(IpcError::Io(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            format!("a server is already listening on {}", path.display()),
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
            warn!("Removing stale socket file: {}", path.display());
            std::fs::remove_file(path)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn handle_connection(
    stream: UnixStream,
    channel: Arc<dyn CommandChannel>,
    cancel: CancellationToken,
) -> IpcResult<()> {
    debug!("New control connection");
    let mut conn = Connection::new(stream).with_cancellation(cancel);

    loop {
        let response = match conn.recv::<ControlCommand>().await {
            Ok(Some(request)) => {
                debug!("Request {}: {:?}", request.message_id, request.data);
                match channel.send(request.data).await {
                    Ok(response) => response,
                    Err(e) => ControlResponse::error(ErrorCode::ChannelClosed, e.to_string()),
                }
            }
            Ok(None) => {
                debug!("Control connection closed by client");
                return Ok(());
            }
            // The frame was consumed whole, so the stream is still in sync.
            Err(IpcError::UnsupportedVersion(version)) => ControlResponse::error(
                ErrorCode::UnsupportedVersion,
                format!("Unsupported protocol version {}", version),
            ),
            Err(IpcError::Serialization(e)) => {
                ControlResponse::error(ErrorCode::InvalidRequest, e.to_string())
            }
            Err(e) => return Err(e),
        };

        conn.send(response).await?;
    }
}

#[cfg(target_os = "linux")]
fn bind_listener(path: &Path, backlog: u32) -> IpcResult<UnixListener> {
    use nix::sys::socket::{bind, listen, socket, AddressFamily, Backlog, SockFlag, SockType, UnixAddr};
    use std::os::fd::AsRawFd;

    let to_io = |e: nix::errno::Errno| IpcError::Io(std::io::Error::from(e));

    let fd = socket(
        AddressFamily::Unix,
        SockType::Stream,
        SockFlag::SOCK_CLOEXEC | SockFlag::SOCK_NONBLOCK,
        None,
    )
    .map_err(to_io)?;
    let addr = UnixAddr::new(path).map_err(to_io)?;
    bind(fd.as_raw_fd(), &addr).map_err(to_io)?;
    listen(&fd, Backlog::new(backlog as i32).map_err(to_io)?).map_err(to_io)?;

    let std_listener = std::os::unix::net::UnixListener::from(fd);
    Ok(UnixListener::from_std(std_listener)?)
}

#[cfg(all(unix, not(target_os = "linux")))]
fn bind_listener(path: &Path, _backlog: u32) -> IpcResult<UnixListener> {
    Ok(UnixListener::bind(path)?)
}
