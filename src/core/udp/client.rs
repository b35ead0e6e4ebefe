use crate::core::event::{EventSink, TransportEvent};
use crate::domain::config::UdpConfig;
use crate::domain::endpoint::Endpoint;
use crate::domain::error::{EchoError, EchoResult};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// Fixed message script sent by the `udp-client` binary.
pub const DEFAULT_SCRIPT: &[&str] = &[
    "Hello from UDP client!\n",
    "This is a test message.\n",
    "Testing UDP echo functionality.\n",
    "UDP is connectionless and fast!\n",
];

/// UDP echo client. Sends a fixed datagram script to one destination,
/// waiting for a reply after each send. Every receive is bounded by a
/// deadline, so a lost reply fails the step instead of blocking
/// forever; there is no retransmission.
pub struct UdpEchoClient {
    socket: UdpSocket,
    destination: SocketAddr,
    config: UdpConfig,
    sink: Arc<dyn EventSink>,
}

impl UdpEchoClient {
    pub async fn new(
        destination: Endpoint,
        config: UdpConfig,
        sink: Arc<dyn EventSink>,
    ) -> EchoResult<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(|e| EchoError::Setup {
                operation: "bind",
                source: e,
            })?;

        info!("UDP client sending to {}", destination);

        Ok(Self {
            socket,
            destination: destination.socket_addr(),
            config,
            sink,
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Send each message as one datagram and wait for one reply,
    /// pacing between steps. Any send/receive failure or deadline
    /// expiry aborts the remaining script.
    pub async fn run_script(&self, messages: &[&str]) -> EchoResult<()> {
        let mut buffer = vec![0u8; self.config.buffer_size];
        let pacing = Duration::from_millis(self.config.message_delay_ms);

        for (index, message) in messages.iter().enumerate() {
            let payload = message.as_bytes();
            let sent = self.socket.send_to(payload, self.destination).await?;
            if sent < payload.len() {
                warn!(
                    "partial send to {} ({}/{} bytes)",
                    self.destination,
                    sent,
                    payload.len()
                );
                self.sink
                    .emit(TransportEvent::PartialWrite {
                        peer: self.destination,
                        written: sent,
                        expected: payload.len(),
                    })
                    .await;
            }
            debug!("sent {} bytes to {}", sent, self.destination);
            self.sink
                .emit(TransportEvent::MessageSent {
                    peer: self.destination,
                    len: sent,
                })
                .await;

            let (len, from) = self.await_reply(&mut buffer).await?;
            self.sink
                .emit(TransportEvent::Reply {
                    peer: from,
                    data: buffer[..len].to_vec(),
                })
                .await;

            if index + 1 < messages.len() {
                tokio::time::sleep(pacing).await;
            }
        }

        Ok(())
    }

    /// Wait for one reply within the deadline. In strict mode a
    /// datagram from any sender other than the destination is reported
    /// and discarded, and the wait continues on the remaining time.
    async fn await_reply(&self, buffer: &mut [u8]) -> EchoResult<(usize, SocketAddr)> {
        let deadline = tokio::time::Instant::now()
            + Duration::from_millis(self.config.reply_timeout_ms);

        loop {
            let (received, from) =
                tokio::time::timeout_at(deadline, self.socket.recv_from(buffer))
                    .await
                    .map_err(|_| EchoError::Timeout {
                        operation: "receive",
                    })??;

            if self.config.strict_reply_source && from != self.destination {
                warn!(
                    "ignoring reply from {} (expected {})",
                    from, self.destination
                );
                self.sink
                    .emit(TransportEvent::ForeignReply {
                        peer: from,
                        expected: self.destination,
                    })
                    .await;
                continue;
            }

            let len = if received >= buffer.len() {
                let capped = buffer.len() - 1;
                warn!("reply from {} truncated (max {} bytes)", from, capped);
                self.sink
                    .emit(TransportEvent::DatagramTruncated {
                        peer: from,
                        capped_len: capped,
                    })
                    .await;
                capped
            } else {
                received
            };

            return Ok((len, from));
        }
    }
}
