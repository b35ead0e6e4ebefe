use crate::core::event::{EventSink, TransportEvent};
use crate::domain::config::TcpConfig;
use crate::domain::error::{EchoError, EchoResult};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// TCP echo server. Accepts connections indefinitely and serves each
/// one on its own task, so a slow peer never blocks the others. Every
/// byte received on a connection is written straight back to it.
pub struct TcpEchoServer {
    listener: Option<TcpListener>,
    bind_addr: SocketAddr,
    config: TcpConfig,
    sink: Arc<dyn EventSink>,
    active: Arc<AtomicUsize>,
    shutdown_sender: mpsc::Sender<()>,
    shutdown_receiver: Option<mpsc::Receiver<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

/// Stream socket with SO_REUSEADDR, bound to all interfaces, listening
/// with the configured backlog. Any failure here is fatal and names
/// the failing step.
fn bind_listener(port: u16, backlog: u32) -> EchoResult<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
        .map_err(|e| EchoError::Setup {
            operation: "socket creation",
            source: e,
        })?;
    socket
        .set_reuse_address(true)
        .map_err(|e| EchoError::Setup {
            operation: "setsockopt",
            source: e,
        })?;
    let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into()).map_err(|e| EchoError::Setup {
        operation: "bind",
        source: e,
    })?;
    socket
        .listen(backlog as i32)
        .map_err(|e| EchoError::Setup {
            operation: "listen",
            source: e,
        })?;
    socket.set_nonblocking(true).map_err(|e| EchoError::Setup {
        operation: "set_nonblocking",
        source: e,
    })?;
    TcpListener::from_std(socket.into()).map_err(|e| EchoError::Setup {
        operation: "listener registration",
        source: e,
    })
}

impl TcpEchoServer {
    pub async fn new(
        port: u16,
        config: TcpConfig,
        sink: Arc<dyn EventSink>,
    ) -> EchoResult<Self> {
        let listener = bind_listener(port, config.backlog)?;
        let bind_addr = listener.local_addr().map_err(|e| EchoError::Setup {
            operation: "local_addr",
            source: e,
        })?;
        let (shutdown_sender, shutdown_receiver) = mpsc::channel(1);

        info!("TCP echo server bound to {}", bind_addr);

        Ok(Self {
            listener: Some(listener),
            bind_addr,
            config,
            sink,
            active: Arc::new(AtomicUsize::new(0)),
            shutdown_sender,
            shutdown_receiver: Some(shutdown_receiver),
            server_handle: None,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn is_running(&self) -> bool {
        self.server_handle.is_some()
    }

    /// Number of connections currently being served.
    pub fn connection_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Spawn the accept loop. Accept failures are reported and the loop
    /// continues; only `stop` or process termination ends it.
    pub async fn start(&mut self) -> EchoResult<()> {
        if self.server_handle.is_some() {
            return Err(EchoError::Server("server is already running".to_string()));
        }

        let listener = self
            .listener
            .take()
            .ok_or_else(|| EchoError::Server("server cannot be restarted".to_string()))?;
        let mut shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| EchoError::Server("server cannot be restarted".to_string()))?;
        let sink = Arc::clone(&self.sink);
        let active = Arc::clone(&self.active);
        let config = self.config.clone();
        let bind_addr = self.bind_addr;

        let server_handle = tokio::spawn(async move {
            sink.emit(TransportEvent::Listening { addr: bind_addr }).await;
            info!("TCP echo server listening on {}", bind_addr);

            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, peer)) => {
                                info!("new connection from {}", peer);
                                sink.emit(TransportEvent::ConnectionOpened { peer }).await;
                                active.fetch_add(1, Ordering::SeqCst);

                                let sink = Arc::clone(&sink);
                                let active = Arc::clone(&active);
                                let config = config.clone();
                                tokio::spawn(async move {
                                    serve_connection(stream, peer, &config, &sink).await;
                                    active.fetch_sub(1, Ordering::SeqCst);
                                    sink.emit(TransportEvent::ConnectionClosed { peer }).await;
                                    info!("connection from {} closed", peer);
                                });
                            }
                            Err(e) => {
                                warn!("accept failed: {}", e);
                                sink.emit(TransportEvent::AcceptFailed {
                                    error: e.to_string(),
                                }).await;
                            }
                        }
                    }
                    _ = shutdown_receiver.recv() => {
                        info!("shutdown requested, stopping TCP echo server");
                        break;
                    }
                }
            }
        });

        self.server_handle = Some(server_handle);
        Ok(())
    }

    /// Stop accepting. Connections already being served run to their
    /// natural end.
    pub async fn stop(&mut self) -> EchoResult<()> {
        if let Some(handle) = self.server_handle.take() {
            if let Err(e) = self.shutdown_sender.send(()).await {
                warn!("failed to send shutdown signal: {}", e);
            }
            if let Err(e) = handle.await {
                warn!("server task completed with error: {}", e);
            }
            info!("TCP echo server stopped");
        }
        Ok(())
    }
}

/// Echo sub-loop for one connection. A zero-byte read is an orderly
/// close, not an error. Partial writes are reported but not retried,
/// and the idle deadline bounds every read so a silent peer cannot
/// hold the worker forever.
async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    config: &TcpConfig,
    sink: &Arc<dyn EventSink>,
) {
    let mut buffer = vec![0u8; config.buffer_size];
    let idle_deadline = Duration::from_millis(config.idle_timeout_ms);

    loop {
        match tokio::time::timeout(idle_deadline, stream.read(&mut buffer)).await {
            Ok(Ok(0)) => {
                debug!("peer {} disconnected (EOF)", peer);
                sink.emit(TransportEvent::PeerClosed { peer }).await;
                break;
            }
            Ok(Ok(n)) => {
                debug!("received {} bytes from {}", n, peer);
                match stream.write(&buffer[..n]).await {
                    Ok(written) => {
                        if written < n {
                            warn!("partial send to {} ({}/{} bytes)", peer, written, n);
                            sink.emit(TransportEvent::PartialWrite {
                                peer,
                                written,
                                expected: n,
                            })
                            .await;
                        }
                        if let Err(e) = stream.flush().await {
                            error!("flush to {} failed: {}", peer, e);
                            sink.emit(TransportEvent::SessionError {
                                peer,
                                error: e.to_string(),
                            })
                            .await;
                            break;
                        }
                        sink.emit(TransportEvent::BytesEchoed { peer, len: written }).await;
                    }
                    Err(e) => {
                        error!("send to {} failed: {}", peer, e);
                        sink.emit(TransportEvent::SessionError {
                            peer,
                            error: e.to_string(),
                        })
                        .await;
                        break;
                    }
                }
            }
            Ok(Err(e)) => {
                error!("recv from {} failed: {}", peer, e);
                sink.emit(TransportEvent::SessionError {
                    peer,
                    error: e.to_string(),
                })
                .await;
                break;
            }
            Err(_) => {
                debug!("idle deadline expired for {}", peer);
                sink.emit(TransportEvent::IdleTimeout { peer }).await;
                break;
            }
        }
    }
}

impl Drop for TcpEchoServer {
    fn drop(&mut self) {
        if self.server_handle.is_some() {
            warn!("TcpEchoServer dropped while still running");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::{ChannelSink, NullSink};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn next_event(receiver: &mut UnboundedReceiver<TransportEvent>) -> TransportEvent {
        tokio::time::timeout(Duration::from_secs(2), receiver.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn server_binds_ephemeral_port() {
        let server = TcpEchoServer::new(0, TcpConfig::default(), Arc::new(NullSink))
            .await
            .unwrap();
        assert!(!server.is_running());
        assert_ne!(server.local_addr().port(), 0);
        assert_eq!(server.connection_count(), 0);
    }

    #[tokio::test]
    async fn server_start_stop_and_double_start() {
        let mut server = TcpEchoServer::new(0, TcpConfig::default(), Arc::new(NullSink))
            .await
            .unwrap();

        server.start().await.unwrap();
        assert!(server.is_running());
        assert!(server.start().await.is_err());

        server.stop().await.unwrap();
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn server_echoes_bytes_verbatim() {
        let mut server = TcpEchoServer::new(0, TcpConfig::default(), Arc::new(NullSink))
            .await
            .unwrap();
        let addr = server.local_addr();
        server.start().await.unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let payload = b"hello\n";
        client.write_all(payload).await.unwrap();

        let mut response = vec![0u8; payload.len()];
        client.read_exact(&mut response).await.unwrap();
        assert_eq!(response, payload);

        drop(client);
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn server_serves_clients_concurrently() {
        let mut server = TcpEchoServer::new(0, TcpConfig::default(), Arc::new(NullSink))
            .await
            .unwrap();
        let addr = server.local_addr();
        server.start().await.unwrap();

        // Both connections stay open while each gets its echo.
        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();

        second.write_all(b"second").await.unwrap();
        let mut response = vec![0u8; 6];
        second.read_exact(&mut response).await.unwrap();
        assert_eq!(&response, b"second");

        first.write_all(b"first").await.unwrap();
        let mut response = vec![0u8; 5];
        first.read_exact(&mut response).await.unwrap();
        assert_eq!(&response, b"first");

        drop(first);
        drop(second);
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn server_accepts_again_after_disconnect() {
        let (sink, mut events) = ChannelSink::new();
        let mut server = TcpEchoServer::new(0, TcpConfig::default(), Arc::new(sink))
            .await
            .unwrap();
        let addr = server.local_addr();
        server.start().await.unwrap();

        match next_event(&mut events).await {
            TransportEvent::Listening { addr: a } => assert_eq!(a, addr),
            other => panic!("unexpected event: {:?}", other),
        }

        // Client A connects, echoes once, disconnects.
        let mut first = TcpStream::connect(addr).await.unwrap();
        first.write_all(b"a").await.unwrap();
        let mut byte = [0u8; 1];
        first.read_exact(&mut byte).await.unwrap();
        drop(first);

        // Orderly close must surface as PeerClosed, not an error.
        let mut saw_peer_closed = false;
        loop {
            match next_event(&mut events).await {
                TransportEvent::PeerClosed { .. } => saw_peer_closed = true,
                TransportEvent::ConnectionClosed { .. } => break,
                TransportEvent::SessionError { error, .. } => {
                    panic!("orderly close reported as error: {}", error)
                }
                _ => {}
            }
        }
        assert!(saw_peer_closed);

        // Client B is still served.
        let mut second = TcpStream::connect(addr).await.unwrap();
        second.write_all(b"b").await.unwrap();
        second.read_exact(&mut byte).await.unwrap();
        assert_eq!(&byte, b"b");

        drop(second);
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn oversized_payload_echoes_in_buffer_sized_chunks() {
        let config = TcpConfig {
            buffer_size: 8,
            ..TcpConfig::default()
        };
        let mut server = TcpEchoServer::new(0, config, Arc::new(NullSink))
            .await
            .unwrap();
        let addr = server.local_addr();
        server.start().await.unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let payload = b"0123456789abcdef";
        client.write_all(payload).await.unwrap();

        // Stream semantics: every byte still arrives, across echo cycles.
        let mut response = vec![0u8; payload.len()];
        client.read_exact(&mut response).await.unwrap();
        assert_eq!(&response, payload);

        drop(client);
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn idle_peer_is_disconnected() {
        let config = TcpConfig {
            idle_timeout_ms: 50,
            ..TcpConfig::default()
        };
        let (sink, mut events) = ChannelSink::new();
        let mut server = TcpEchoServer::new(0, config, Arc::new(sink))
            .await
            .unwrap();
        let addr = server.local_addr();
        server.start().await.unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();

        let mut saw_idle_timeout = false;
        loop {
            match next_event(&mut events).await {
                TransportEvent::IdleTimeout { .. } => saw_idle_timeout = true,
                TransportEvent::ConnectionClosed { .. } => break,
                _ => {}
            }
        }
        assert!(saw_idle_timeout);

        server.stop().await.unwrap();
    }
}
