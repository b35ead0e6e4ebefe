use crate::core::event::{EventSink, TransportEvent};
use crate::domain::config::TcpConfig;
use crate::domain::endpoint::Endpoint;
use crate::domain::error::{EchoError, EchoResult};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Fixed message script sent by the `tcp-client` binary.
pub const DEFAULT_SCRIPT: &[&str] = &[
    "Hello from TCP client!\n",
    "This is a test message.\n",
    "Testing echo functionality.\n",
];

/// TCP echo client. Connects once and runs a fixed request/response
/// script; any I/O failure is terminal for the run. No retry,
/// reconnect, or backoff.
pub struct TcpEchoClient {
    stream: TcpStream,
    peer: SocketAddr,
    config: TcpConfig,
    sink: Arc<dyn EventSink>,
}

impl TcpEchoClient {
    pub async fn connect(
        endpoint: Endpoint,
        config: TcpConfig,
        sink: Arc<dyn EventSink>,
    ) -> EchoResult<Self> {
        let peer = endpoint.socket_addr();
        let connect_deadline = Duration::from_millis(config.connect_timeout_ms);

        let stream = tokio::time::timeout(connect_deadline, TcpStream::connect(peer))
            .await
            .map_err(|_| EchoError::Timeout {
                operation: "connect",
            })?
            .map_err(|e| EchoError::Setup {
                operation: "connect",
                source: e,
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("failed to set TCP_NODELAY: {}", e);
        }

        info!("connected to {}", peer);

        Ok(Self {
            stream,
            peer,
            config,
            sink,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Send each message, wait for its echoed reply, pause between
    /// steps. A short write is reported but not retried; a zero-byte
    /// read means the server closed and ends the script early.
    pub async fn run_script(&mut self, messages: &[&str]) -> EchoResult<()> {
        let mut buffer = vec![0u8; self.config.buffer_size];
        let reply_deadline = Duration::from_millis(self.config.reply_timeout_ms);
        let pacing = Duration::from_millis(self.config.message_delay_ms);

        for (index, message) in messages.iter().enumerate() {
            let payload = message.as_bytes();
            let written = self.stream.write(payload).await?;
            if written < payload.len() {
                warn!(
                    "partial send to {} ({}/{} bytes)",
                    self.peer,
                    written,
                    payload.len()
                );
                self.sink
                    .emit(TransportEvent::PartialWrite {
                        peer: self.peer,
                        written,
                        expected: payload.len(),
                    })
                    .await;
            }
            self.stream.flush().await?;
            debug!("sent {} bytes to {}", written, self.peer);
            self.sink
                .emit(TransportEvent::MessageSent {
                    peer: self.peer,
                    len: written,
                })
                .await;

            let received = tokio::time::timeout(reply_deadline, self.stream.read(&mut buffer))
                .await
                .map_err(|_| EchoError::Timeout {
                    operation: "receive",
                })??;

            if received == 0 {
                info!("server closed the connection");
                self.sink
                    .emit(TransportEvent::PeerClosed { peer: self.peer })
                    .await;
                return Ok(());
            }

            self.sink
                .emit(TransportEvent::Reply {
                    peer: self.peer,
                    data: buffer[..received].to_vec(),
                })
                .await;

            if index + 1 < messages.len() {
                tokio::time::sleep(pacing).await;
            }
        }

        Ok(())
    }

    pub async fn close(mut self) -> EchoResult<()> {
        if let Err(e) = self.stream.shutdown().await {
            warn!("failed to shut down stream: {}", e);
        }
        info!("connection to {} closed", self.peer);
        Ok(())
    }
}
