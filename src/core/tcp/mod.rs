// TCP module - Stream echo server and scripted client
pub mod client;
pub mod server;

pub use client::TcpEchoClient;
pub use server::TcpEchoServer;
