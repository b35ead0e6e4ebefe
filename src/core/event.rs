use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::net::SocketAddr;
use tokio::sync::mpsc;

fn lossy_utf8<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(data))
}

/// Structured events emitted by the transport core. The core never
/// prints; a presentation layer consumes these and decides how they
/// appear.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransportEvent {
    /// Server socket is bound and accepting work
    Listening { addr: SocketAddr },
    /// TCP connection accepted
    ConnectionOpened { peer: SocketAddr },
    /// Peer performed an orderly close (zero-byte read)
    PeerClosed { peer: SocketAddr },
    /// Connection torn down, worker finished
    ConnectionClosed { peer: SocketAddr },
    /// Per-read idle deadline expired; the connection is dropped
    IdleTimeout { peer: SocketAddr },
    /// Payload echoed back to the peer
    BytesEchoed { peer: SocketAddr, len: usize },
    /// Fewer bytes written than requested; not retried
    PartialWrite {
        peer: SocketAddr,
        written: usize,
        expected: usize,
    },
    /// A single accept failed; the server keeps listening
    AcceptFailed { error: String },
    /// A single datagram receive failed; the server keeps listening
    ReceiveFailed { error: String },
    /// Stream I/O error; ends that connection only
    SessionError { peer: SocketAddr, error: String },
    /// Datagram captured along with its sender
    DatagramReceived { peer: SocketAddr, len: usize },
    /// Datagram filled the buffer; logical length capped at capacity-1
    DatagramTruncated { peer: SocketAddr, capped_len: usize },
    /// Zero-length datagram, skipped
    EmptyDatagram { peer: SocketAddr },
    /// Client script message sent
    MessageSent { peer: SocketAddr, len: usize },
    /// Echoed reply received by a client
    Reply {
        peer: SocketAddr,
        #[serde(serialize_with = "lossy_utf8")]
        data: Vec<u8>,
    },
    /// Reply arrived from an address other than the configured
    /// destination and was discarded (strict source checking)
    ForeignReply {
        peer: SocketAddr,
        expected: SocketAddr,
    },
}

/// Consumer of transport events. Implemented by the console reporter
/// and by channel-backed sinks in tests.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: TransportEvent);
}

/// Forwards events into an unbounded channel.
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<TransportEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&self, event: TransportEvent) {
        // Receiver may be gone during shutdown; nothing to do then.
        let _ = self.sender.send(event);
    }
}

/// Discards every event.
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn emit(&self, _event: TransportEvent) {}
}
