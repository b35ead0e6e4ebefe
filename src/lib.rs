//! NetEcho Library
//!
//! TCP and UDP echo client/server toolkit for network debugging,
//! providing concurrent echo servers and scripted echo clients with
//! structured transport events.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::event::{ChannelSink, EventSink, NullSink, TransportEvent};
pub use crate::core::tcp::{TcpEchoClient, TcpEchoServer};
pub use crate::core::udp::{Datagram, UdpEchoClient, UdpEchoServer};
pub use crate::domain::config::EchoConfig;
pub use crate::domain::endpoint::Endpoint;
pub use crate::domain::error::{EchoError, EchoResult};
