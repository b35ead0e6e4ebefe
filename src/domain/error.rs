use thiserror::Error;

/// NetEcho unified error type
#[derive(Error, Debug)]
pub enum EchoError {
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("{operation} failed: {source}")]
    Setup {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid port number '{0}': must be an integer between 1 and 65535")]
    InvalidPort(String),

    #[error("Invalid IP address: {0}")]
    InvalidHost(String),

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Server error: {0}")]
    Server(String),
}

pub type EchoResult<T> = Result<T, EchoError>;
