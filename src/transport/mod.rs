//! Transport trait for device byte streams

mod tcp;

pub use tcp::TcpTransport;

/// An established, bidirectional byte stream to the device.
///
/// The session only ever reads from the transport and closes it once. Address
/// resolution and connection setup happen before the session starts.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Read up to `buf.len()` bytes.
    ///
    /// Returns:
    /// - `Ok(n)` with `n > 0` - bytes received
    /// - `Ok(0)` - the remote side closed the stream
    /// - `Err(e)` - the transport failed
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Release the connection. Called exactly once when the session ends.
    async fn close(&mut self) -> std::io::Result<()>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (**self).read(buf).await
    }

    async fn close(&mut self) -> std::io::Result<()> {
        (**self).close().await
    }
}
