// UDP module - Datagram echo server and scripted client
pub mod client;
pub mod server;

use std::net::SocketAddr;

pub use client::UdpEchoClient;
pub use server::UdpEchoServer;

/// One self-contained message paired with the address it came from.
/// Datagrams have no relationship to each other; each is a complete
/// request/reply unit.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub data: Vec<u8>,
    pub peer: SocketAddr,
}
