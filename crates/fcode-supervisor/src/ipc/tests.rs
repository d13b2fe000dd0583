use super::*;
use crate::channel::{CommandChannel, ControlCommand, ControlResponse, ErrorCode};
use crate::config::IpcConfig;
use crate::supervisor::CancellationSource;
use async_trait::async_trait;
use fcode_types::FcodeResult;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

const TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Default)]
struct CountingChannel {
    calls: AtomicUsize,
}

#[async_trait]
impl CommandChannel for CountingChannel {
    fn name(&self) -> &str {
        "counting"
    }

    async fn start(&self) -> FcodeResult<()> {
        Ok(())
    }

    async fn send(&self, command: ControlCommand) -> FcodeResult<ControlResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
        Ok(match command {
            ControlCommand::Ping => ControlResponse::Pong {
                version: "test".into(),
                uptime_secs: n,
            },
            _ => ControlResponse::error(ErrorCode::InvalidRequest, "unsupported"),
        })
    }

    async fn probe(&self) -> FcodeResult<()> {
        Ok(())
    }

    async fn close(&self) -> FcodeResult<()> {
        Ok(())
    }
}

fn config(dir: &std::path::Path) -> IpcConfig {
    IpcConfig {
        socket_path: dir.join("fcode-supervisor.sock"),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_request_response_over_socket() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let channel = Arc::new(CountingChannel::default());
    let source = CancellationSource::new();

    let server = SocketServer::bind(&config).unwrap();
    let task = tokio::spawn(server.serve(channel.clone(), source.token()));

    let mut client = SupervisorClient::connect(&config.socket_path, TIMEOUT).await.unwrap();
    for expected in 0..3u64 {
        match client.request(ControlCommand::Ping).await.unwrap() {
            ControlResponse::Pong { uptime_secs, .. } => assert_eq!(uptime_secs, expected),
            other => panic!("unexpected {:?}", other),
        }
    }
    assert_eq!(channel.calls.load(Ordering::SeqCst), 3);

    source.cancel();
    tokio::time::timeout(TIMEOUT, task).await.unwrap().unwrap();
    assert!(!config.socket_path.exists());
}

#[tokio::test]
async fn test_stale_socket_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    std::fs::write(&config.socket_path, b"stale").unwrap();

    let server = SocketServer::bind(&config).unwrap();
    assert_eq!(server.path(), config.socket_path.as_path());
    drop(server);
    assert!(!config.socket_path.exists());
}

#[tokio::test]
async fn test_live_socket_is_not_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let source = CancellationSource::new();
    let server = SocketServer::bind(&config).unwrap();
    tokio::spawn(server.serve(Arc::new(CountingChannel::default()), source.token()));

    match SocketServer::bind(&config) {
        Err(IpcError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::AddrInUse),
        Err(e) => panic!("unexpected error {:?}", e),
        Ok(_) => panic!("second server bound over a live socket"),
    }

    assert!(config.socket_path.exists());
    let mut client = SupervisorClient::connect(&config.socket_path, TIMEOUT).await.unwrap();
    assert!(matches!(
        client.request(ControlCommand::Ping).await.unwrap(),
        ControlResponse::Pong { .. }
    ));
    source.cancel();
}

#[tokio::test]
async fn test_concurrent_clients() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let channel = Arc::new(CountingChannel::default());
    let source = CancellationSource::new();
    let server = SocketServer::bind(&config).unwrap();
    tokio::spawn(server.serve(channel.clone(), source.token()));

    let mut clients = Vec::new();
    for _ in 0..8 {
        let path = config.socket_path.clone();
        clients.push(tokio::spawn(async move {
            let mut client = SupervisorClient::connect(&path, TIMEOUT).await.unwrap();
            client.request(ControlCommand::Ping).await.unwrap()
        }));
    }
    for client in clients {
        assert!(matches!(client.await.unwrap(), ControlResponse::Pong { .. }));
    }
    assert_eq!(channel.calls.load(Ordering::SeqCst), 8);
    source.cancel();
}

#[tokio::test]
async fn test_unsupported_version_keeps_connection() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let source = CancellationSource::new();
    let server = SocketServer::bind(&config).unwrap();
    tokio::spawn(server.serve(Arc::new(CountingChannel::default()), source.token()));

    let mut stream = UnixStream::connect(&config.socket_path).await.unwrap();
    let future = br#"{"version":9,"messageId":"m1","timestamp":"2024-01-01T00:00:00Z","data":{"type":"ping"}}"#;
    write_frame(&mut stream, future).await.unwrap();

    let mut conn = Connection::new(stream);
    let reply: Envelope<ControlResponse> = conn.recv().await.unwrap().unwrap();
    match reply.data {
        ControlResponse::Error { code, .. } => assert_eq!(code, ErrorCode::UnsupportedVersion),
        other => panic!("unexpected {:?}", other),
    }

    conn.send(ControlCommand::Ping).await.unwrap();
    let reply: Envelope<ControlResponse> = conn.recv().await.unwrap().unwrap();
    assert!(matches!(reply.data, ControlResponse::Pong { .. }));
    source.cancel();
}

#[tokio::test]
async fn test_invalid_frame_length_drops_only_that_connection() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let source = CancellationSource::new();
    let server = SocketServer::bind(&config).unwrap();
    tokio::spawn(server.serve(Arc::new(CountingChannel::default()), source.token()));

    let mut bystander = SupervisorClient::connect(&config.socket_path, TIMEOUT).await.unwrap();
    assert!(matches!(
        bystander.request(ControlCommand::Ping).await.unwrap(),
        ControlResponse::Pong { .. }
    ));

    let mut stream = UnixStream::connect(&config.socket_path).await.unwrap();
    stream.write_all(&[0, 0, 0, 0]).await.unwrap();

    let mut conn = Connection::new(stream);
    let reply = tokio::time::timeout(TIMEOUT, conn.recv::<ControlResponse>())
        .await
        .unwrap();
    assert!(matches!(reply, Ok(None) | Err(IpcError::Io(_))));

    // The accept loop and the other connection are unaffected.
    assert!(matches!(
        bystander.request(ControlCommand::Ping).await.unwrap(),
        ControlResponse::Pong { .. }
    ));
    let mut late = SupervisorClient::connect(&config.socket_path, TIMEOUT).await.unwrap();
    assert!(matches!(
        late.request(ControlCommand::Ping).await.unwrap(),
        ControlResponse::Pong { .. }
    ));
    source.cancel();
}

#[tokio::test]
async fn test_client_times_out_without_server_reply() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("silent.sock");
    let listener = tokio::net::UnixListener::bind(&path).unwrap();
    let _hold = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(stream);
    });

    let timeout = Duration::from_millis(100);
    let mut client = SupervisorClient::connect(&path, timeout).await.unwrap();
    assert!(matches!(
        client.request(ControlCommand::Ping).await,
        Err(IpcError::Timeout(_))
    ));
}

#[tokio::test]
async fn test_connect_to_missing_socket_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = SupervisorClient::connect(dir.path().join("absent.sock"), TIMEOUT).await;
    assert!(matches!(result, Err(IpcError::Io(_))));
}
