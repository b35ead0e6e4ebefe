use crate::core::event::{EventSink, TransportEvent};
use crate::core::udp::Datagram;
use crate::domain::config::UdpConfig;
use crate::domain::error::{EchoError, EchoResult};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// UDP echo server. One task receives datagrams and feeds a bounded
/// work queue; a small worker pool echoes each payload back to the
/// sender captured at receive time. No state survives between
/// datagrams.
pub struct UdpEchoServer {
    socket: Arc<UdpSocket>,
    bind_addr: SocketAddr,
    config: UdpConfig,
    sink: Arc<dyn EventSink>,
    shutdown_sender: mpsc::Sender<()>,
    shutdown_receiver: Option<mpsc::Receiver<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
    worker_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl UdpEchoServer {
    pub async fn new(
        port: u16,
        config: UdpConfig,
        sink: Arc<dyn EventSink>,
    ) -> EchoResult<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(|e| EchoError::Setup {
                operation: "bind",
                source: e,
            })?;
        let bind_addr = socket.local_addr().map_err(|e| EchoError::Setup {
            operation: "local_addr",
            source: e,
        })?;
        let (shutdown_sender, shutdown_receiver) = mpsc::channel(1);

        info!("UDP echo server bound to {}", bind_addr);

        Ok(Self {
            socket: Arc::new(socket),
            bind_addr,
            config,
            sink,
            shutdown_sender,
            shutdown_receiver: Some(shutdown_receiver),
            server_handle: None,
            worker_handles: Vec::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn is_running(&self) -> bool {
        self.server_handle.is_some()
    }

    /// Spawn the receive loop and the echo worker pool. Receive
    /// failures are reported and the loop continues; connectionless
    /// semantics mean there is nothing to tear down.
    pub async fn start(&mut self) -> EchoResult<()> {
        if self.server_handle.is_some() {
            return Err(EchoError::Server("server is already running".to_string()));
        }

        let mut shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| EchoError::Server("server cannot be restarted".to_string()))?;

        let (work_sender, work_receiver) = mpsc::channel::<Datagram>(self.config.queue_depth.max(1));
        let work_receiver = Arc::new(Mutex::new(work_receiver));

        for worker_id in 0..self.config.workers.max(1) {
            let socket = Arc::clone(&self.socket);
            let sink = Arc::clone(&self.sink);
            let work_receiver = Arc::clone(&work_receiver);

            self.worker_handles.push(tokio::spawn(async move {
                loop {
                    let datagram = { work_receiver.lock().await.recv().await };
                    let Some(datagram) = datagram else {
                        debug!("echo worker {} draining, queue closed", worker_id);
                        break;
                    };

                    match socket.send_to(&datagram.data, datagram.peer).await {
                        Ok(sent) => {
                            if sent < datagram.data.len() {
                                warn!(
                                    "partial send to {} ({}/{} bytes)",
                                    datagram.peer,
                                    sent,
                                    datagram.data.len()
                                );
                                sink.emit(TransportEvent::PartialWrite {
                                    peer: datagram.peer,
                                    written: sent,
                                    expected: datagram.data.len(),
                                })
                                .await;
                            }
                            debug!(
                                "worker {} echoed {} bytes to {}",
                                worker_id, sent, datagram.peer
                            );
                            sink.emit(TransportEvent::BytesEchoed {
                                peer: datagram.peer,
                                len: sent,
                            })
                            .await;
                        }
                        Err(e) => {
                            error!("sendto {} failed: {}", datagram.peer, e);
                            sink.emit(TransportEvent::SessionError {
                                peer: datagram.peer,
                                error: e.to_string(),
                            })
                            .await;
                        }
                    }
                }
            }));
        }

        let socket = Arc::clone(&self.socket);
        let sink = Arc::clone(&self.sink);
        let config = self.config.clone();
        let bind_addr = self.bind_addr;

        let server_handle = tokio::spawn(async move {
            sink.emit(TransportEvent::Listening { addr: bind_addr }).await;
            info!("UDP echo server listening on {}", bind_addr);

            let mut buffer = vec![0u8; config.buffer_size];
            loop {
                tokio::select! {
                    recv_result = socket.recv_from(&mut buffer) => {
                        match recv_result {
                            Ok((received, peer)) => {
                                if received == 0 {
                                    debug!("empty datagram from {}, skipped", peer);
                                    sink.emit(TransportEvent::EmptyDatagram { peer }).await;
                                    continue;
                                }

                                // A full buffer means the datagram may have been
                                // cut off by the kernel; cap the logical length
                                // at capacity-1. One packet or nothing.
                                let len = if received >= config.buffer_size {
                                    let capped = config.buffer_size - 1;
                                    warn!(
                                        "datagram from {} truncated (max {} bytes)",
                                        peer, capped
                                    );
                                    sink.emit(TransportEvent::DatagramTruncated {
                                        peer,
                                        capped_len: capped,
                                    })
                                    .await;
                                    capped
                                } else {
                                    received
                                };

                                debug!("received {} bytes from {}", len, peer);
                                sink.emit(TransportEvent::DatagramReceived { peer, len }).await;

                                let datagram = Datagram {
                                    data: buffer[..len].to_vec(),
                                    peer,
                                };
                                if work_sender.send(datagram).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("recvfrom failed: {}", e);
                                sink.emit(TransportEvent::ReceiveFailed {
                                    error: e.to_string(),
                                })
                                .await;
                            }
                        }
                    }
                    _ = shutdown_receiver.recv() => {
                        info!("shutdown requested, stopping UDP echo server");
                        break;
                    }
                }
            }
            // Dropping work_sender here closes the queue and drains the workers.
        });

        self.server_handle = Some(server_handle);
        Ok(())
    }

    /// Stop receiving and wait for queued datagrams to be echoed.
    pub async fn stop(&mut self) -> EchoResult<()> {
        if let Some(handle) = self.server_handle.take() {
            if let Err(e) = self.shutdown_sender.send(()).await {
                warn!("failed to send shutdown signal: {}", e);
            }
            if let Err(e) = handle.await {
                warn!("server task completed with error: {}", e);
            }
            for worker in self.worker_handles.drain(..) {
                if let Err(e) = worker.await {
                    warn!("echo worker completed with error: {}", e);
                }
            }
            info!("UDP echo server stopped");
        }
        Ok(())
    }
}

impl Drop for UdpEchoServer {
    fn drop(&mut self) {
        if self.server_handle.is_some() {
            warn!("UdpEchoServer dropped while still running");
        }
    }
}
