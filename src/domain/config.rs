use serde::{Deserialize, Serialize};

/// NetEcho configuration. Buffer sizes and pacing default to the
/// original echo tool constants (1024/4096 bytes, 100/200 ms).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoConfig {
    /// TCP transport settings
    #[serde(default)]
    pub tcp: TcpConfig,
    /// UDP transport settings
    #[serde(default)]
    pub udp: UdpConfig,
}

/// TCP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpConfig {
    /// Per-receive buffer capacity in bytes
    #[serde(default = "default_tcp_buffer")]
    pub buffer_size: usize,
    /// Listen backlog
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// Client connect deadline in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Server-side deadline for each read; a silent peer is disconnected
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_ms: u64,
    /// Client-side deadline for each echoed reply
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_ms: u64,
    /// Client pacing between script messages in milliseconds
    #[serde(default = "default_tcp_delay")]
    pub message_delay_ms: u64,
}

/// UDP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpConfig {
    /// Per-datagram buffer capacity in bytes
    #[serde(default = "default_udp_buffer")]
    pub buffer_size: usize,
    /// Client-side deadline for each echoed reply
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_ms: u64,
    /// Client pacing between script messages in milliseconds
    #[serde(default = "default_udp_delay")]
    pub message_delay_ms: u64,
    /// Size of the server echo worker pool
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Capacity of the bounded datagram work queue
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
    /// Discard replies that do not originate from the configured destination
    #[serde(default = "default_strict_reply_source")]
    pub strict_reply_source: bool,
}

fn default_tcp_buffer() -> usize {
    1024
}

fn default_udp_buffer() -> usize {
    4096
}

fn default_backlog() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_idle_timeout() -> u64 {
    30000
}

fn default_reply_timeout() -> u64 {
    5000
}

fn default_tcp_delay() -> u64 {
    100
}

fn default_udp_delay() -> u64 {
    200
}

fn default_workers() -> usize {
    4
}

fn default_queue_depth() -> usize {
    64
}

fn default_strict_reply_source() -> bool {
    true
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            tcp: TcpConfig::default(),
            udp: UdpConfig::default(),
        }
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_tcp_buffer(),
            backlog: default_backlog(),
            connect_timeout_ms: default_connect_timeout(),
            idle_timeout_ms: default_idle_timeout(),
            reply_timeout_ms: default_reply_timeout(),
            message_delay_ms: default_tcp_delay(),
        }
    }
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_udp_buffer(),
            reply_timeout_ms: default_reply_timeout(),
            message_delay_ms: default_udp_delay(),
            workers: default_workers(),
            queue_depth: default_queue_depth(),
            strict_reply_source: default_strict_reply_source(),
        }
    }
}
