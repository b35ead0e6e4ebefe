use netecho::domain::config::UdpConfig;
use netecho::{ChannelSink, Endpoint, NullSink, TransportEvent, UdpEchoClient, UdpEchoServer};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

async fn start_server(config: UdpConfig) -> UdpEchoServer {
    let mut server = UdpEchoServer::new(0, config, Arc::new(NullSink))
        .await
        .expect("server setup failed");
    server.start().await.expect("server start failed");
    server
}

#[tokio::test]
async fn ping_scenario_replies_from_the_bound_port() {
    let mut server = start_server(UdpConfig::default()).await;
    let server_port = server.local_addr().port();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(b"ping", ("127.0.0.1", server_port))
        .await
        .unwrap();

    let mut buf = vec![0u8; 4096];
    let (n, from) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..n], b"ping");
    assert_eq!(from.ip(), "127.0.0.1".parse::<std::net::IpAddr>().unwrap());
    assert_eq!(from.port(), server_port);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn echo_identity_holds_for_datagrams_below_the_cap() {
    let mut server = start_server(UdpConfig::default()).await;
    let server_port = server.local_addr().port();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let payload: Vec<u8> = (0..4000u32).map(|i| (i % 251) as u8).collect();
    client
        .send_to(&payload, ("127.0.0.1", server_port))
        .await
        .unwrap();

    let mut buf = vec![0u8; 8192];
    let (n, _) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..n], payload.as_slice());

    server.stop().await.unwrap();
}

#[tokio::test]
async fn datagrams_are_stateless_request_reply_pairs() {
    let mut server = start_server(UdpConfig::default()).await;
    let server_port = server.local_addr().port();

    // Interleave two independent senders; each gets its own echo.
    let first = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let second = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    first
        .send_to(b"alpha", ("127.0.0.1", server_port))
        .await
        .unwrap();
    second
        .send_to(b"beta", ("127.0.0.1", server_port))
        .await
        .unwrap();

    let mut buf = vec![0u8; 64];
    let (n, _) = tokio::time::timeout(Duration::from_secs(2), first.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..n], b"alpha");
    let (n, _) = tokio::time::timeout(Duration::from_secs(2), second.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..n], b"beta");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn scripted_client_completes_against_the_server() {
    let mut server = start_server(UdpConfig::default()).await;
    let endpoint = Endpoint::new(Ipv4Addr::LOCALHOST, server.local_addr().port());

    let config = UdpConfig {
        message_delay_ms: 1,
        ..UdpConfig::default()
    };
    let (sink, mut events) = ChannelSink::new();
    let client = UdpEchoClient::new(endpoint, config, Arc::new(sink))
        .await
        .unwrap();
    client
        .run_script(netecho::core::udp::client::DEFAULT_SCRIPT)
        .await
        .unwrap();

    let mut replies = 0;
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(200), events.recv()).await
    {
        if matches!(event, TransportEvent::Reply { .. }) {
            replies += 1;
        }
    }
    assert_eq!(replies, netecho::core::udp::client::DEFAULT_SCRIPT.len());

    server.stop().await.unwrap();
}

#[tokio::test]
async fn truncated_datagram_is_reported_and_still_echoed() {
    let config = UdpConfig {
        buffer_size: 16,
        ..UdpConfig::default()
    };
    let (sink, mut events) = ChannelSink::new();
    let mut server = UdpEchoServer::new(0, config, Arc::new(sink))
        .await
        .unwrap();
    let server_port = server.local_addr().port();
    server.start().await.unwrap();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(b"0123456789abcdefEXTRA", ("127.0.0.1", server_port))
        .await
        .unwrap();

    let mut buf = vec![0u8; 64];
    let (n, _) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..n], b"0123456789abcde");

    let mut saw_truncation = false;
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(200), events.recv()).await
    {
        if let TransportEvent::DatagramTruncated { capped_len, .. } = event {
            assert_eq!(capped_len, 15);
            saw_truncation = true;
        }
    }
    assert!(saw_truncation);

    server.stop().await.unwrap();
}
