use crate::domain::error::{EchoError, EchoResult};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// Parse a port argument. The whole string must be a base-10 integer
/// in [1, 65535]; trailing characters or out-of-range values are usage
/// errors.
pub fn parse_port(value: &str) -> EchoResult<u16> {
    match value.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(EchoError::InvalidPort(value.to_string())),
    }
}

/// Parse a host argument as an IPv4 dotted-quad address.
pub fn parse_host(value: &str) -> EchoResult<Ipv4Addr> {
    value
        .parse::<Ipv4Addr>()
        .map_err(|_| EchoError::InvalidHost(value.to_string()))
}

/// An IPv4 (host, port) pair identifying a network peer. Built once
/// from command-line input and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    host: Ipv4Addr,
    port: u16,
}

impl Endpoint {
    pub fn new(host: Ipv4Addr, port: u16) -> Self {
        Self { host, port }
    }

    /// Resolve raw command-line strings into an endpoint.
    pub fn parse(host: &str, port: &str) -> EchoResult<Self> {
        Ok(Self {
            host: parse_host(host)?,
            port: parse_port(port)?,
        })
    }

    pub fn host(&self) -> Ipv4Addr {
        self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.host, self.port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<Endpoint> for SocketAddr {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.socket_addr()
    }
}
