use crate::core::event::{EventSink, TransportEvent};
use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON lines output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Renders transport events for the console: progress and results on
/// stdout, failures and integrity warnings on stderr with the failing
/// operation named. The transport core itself never prints.
pub struct ConsoleReporter {
    format: OutputFormat,
}

impl ConsoleReporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn write_text(&self, event: &TransportEvent) {
        match event {
            TransportEvent::Listening { addr } => {
                println!("Listening on {}", addr);
            }
            TransportEvent::ConnectionOpened { peer } => {
                println!("New connection from {}", peer);
            }
            TransportEvent::PeerClosed { peer } => {
                println!("Peer {} disconnected (EOF)", peer);
            }
            TransportEvent::ConnectionClosed { peer } => {
                println!("Connection to {} closed", peer);
            }
            TransportEvent::IdleTimeout { peer } => {
                println!("Peer {} idle too long, closing connection", peer);
            }
            TransportEvent::BytesEchoed { peer, len } => {
                println!("Echoed {} bytes to {}", len, peer);
            }
            TransportEvent::PartialWrite {
                peer,
                written,
                expected,
            } => {
                eprintln!(
                    "Warning: partial send to {} ({}/{} bytes)",
                    peer, written, expected
                );
            }
            TransportEvent::AcceptFailed { error } => {
                eprintln!("accept failed: {}", error);
            }
            TransportEvent::ReceiveFailed { error } => {
                eprintln!("recvfrom failed: {}", error);
            }
            TransportEvent::SessionError { peer, error } => {
                eprintln!("I/O error with {}: {}", peer, error);
            }
            TransportEvent::DatagramReceived { peer, len } => {
                println!("Received {} bytes from {}", len, peer);
            }
            TransportEvent::DatagramTruncated { peer, capped_len } => {
                eprintln!(
                    "Warning: datagram from {} truncated (max {} bytes)",
                    peer, capped_len
                );
            }
            TransportEvent::EmptyDatagram { peer } => {
                println!("Received empty datagram from {}", peer);
            }
            TransportEvent::MessageSent { peer, len } => {
                println!("Sent {} bytes to {}", len, peer);
            }
            TransportEvent::Reply { peer, data } => {
                println!(
                    "Received {} bytes from {}: {}",
                    data.len(),
                    peer,
                    String::from_utf8_lossy(data).trim_end()
                );
            }
            TransportEvent::ForeignReply { peer, expected } => {
                eprintln!(
                    "Warning: ignoring reply from {} (expected {})",
                    peer, expected
                );
            }
        }
    }

    fn write_json(&self, event: &TransportEvent) {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("failed to encode event: {}", e),
        }
    }
}

#[async_trait]
impl EventSink for ConsoleReporter {
    async fn emit(&self, event: TransportEvent) {
        match self.format {
            OutputFormat::Text => self.write_text(&event),
            OutputFormat::Json => self.write_json(&event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn output_format_defaults_to_text() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }

    #[tokio::test]
    async fn reporter_handles_every_event_variant() {
        let reporter = ConsoleReporter::new(OutputFormat::Json);
        let peer = "127.0.0.1:9000".parse().unwrap();
        reporter
            .emit(TransportEvent::ConnectionOpened { peer })
            .await;
        reporter
            .emit(TransportEvent::Reply {
                peer,
                data: b"ok\n".to_vec(),
            })
            .await;
    }
}
