//! TCP transport to the ultrasound machine

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Transport;
use crate::{Result, StreamError};

/// TCP connection to the device.
pub struct TcpTransport {
    stream: TcpStream,

    /// Remote address, for logging
    peer: Option<SocketAddr>,

    /// Optional deadline for each read
    read_timeout: Option<Duration>,

    /// Aborts a pending read when cancelled
    cancel: Option<CancellationToken>,

    closed: bool,
}

impl TcpTransport {
    /// Connect to the device at `address` (`host:port`).
    pub async fn connect(address: &str) -> Result<Self> {
        debug!("Connecting to A-mode device at {}", address);

        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| StreamError::connection_failed(address, e))?;

        let transport = Self::from_stream(stream);
        info!(peer = ?transport.peer, "Connection to A-mode ultrasound machine established");
        Ok(transport)
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        // Frames are small and latency sensitive
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }
        let peer = stream.peer_addr().ok();
        Self { stream, peer, read_timeout: None, cancel: None, closed: false }
    }

    /// Fail a read with `TimedOut` when no bytes arrive within `timeout`.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Fail a pending read with `Interrupted` once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read = timed_read(&mut self.stream, self.read_timeout, buf);
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(std::io::Error::new(
                    std::io::ErrorKind::Interrupted,
                    "read cancelled",
                )),
                result = read => result,
            },
            None => read.await,
        }
    }

    async fn close(&mut self) -> std::io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        debug!(peer = ?self.peer, "Shutting down device connection");
        match self.stream.shutdown().await {
            Ok(()) => Ok(()),
            // The device may already have gone away
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e),
        }
    }
}

async fn timed_read(
    stream: &mut TcpStream,
    timeout: Option<Duration>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, stream.read(buf)).await.map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("no data from device within {:?}", timeout),
            )
        })?,
        None => stream.read(buf).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn reads_bytes_and_observes_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let device = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(&[1, 2, 3, 4]).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        let mut transport = TcpTransport::connect(&address).await.unwrap();
        assert!(transport.peer_addr().is_some());

        let mut received = Vec::new();
        let mut buf = [0u8; 16];
        loop {
            let n = transport.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(received, vec![1, 2, 3, 4]);

        transport.close().await.unwrap();
        // Second close is a no-op
        transport.close().await.unwrap();
        device.await.unwrap();
    }

    #[tokio::test]
    async fn stalled_device_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let device = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            drop(socket);
        });

        let mut transport = TcpTransport::connect(&address)
            .await
            .unwrap()
            .with_read_timeout(Some(Duration::from_millis(50)));

        let mut buf = [0u8; 8];
        let err = transport.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
        device.await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_stalled_read() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let device = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            drop(socket);
        });

        let token = CancellationToken::new();
        let mut transport =
            TcpTransport::connect(&address).await.unwrap().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let mut buf = [0u8; 8];
        let err = tokio::time::timeout(Duration::from_millis(400), transport.read(&mut buf))
            .await
            .expect("cancelled read should return promptly")
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Interrupted);

        transport.close().await.unwrap();
        canceller.await.unwrap();
        device.await.unwrap();
    }

    #[tokio::test]
    async fn connect_failure_names_address() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = TcpTransport::connect(&address).await.err().expect("connect should fail");
        assert!(matches!(err, StreamError::Connection { .. }));
        assert!(err.to_string().contains(&address));
    }
}
