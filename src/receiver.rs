//! Frame receiver: one transport read, gated by the exact-size rule.
//!
//! TCP gives no framing guarantee, so a read may return part of a frame or
//! straddle two. Under [`ReadPolicy::SingleRead`] any read whose byte count is
//! not exactly one frame is dropped as corrupt and never decoded. Under
//! [`ReadPolicy::Exact`] reads are accumulated until a whole frame is present.
//! Either way callers only ever observe whole frames or an explicit
//! "no frame" status.

use tracing::{debug, trace, warn};

use crate::config::{ReadPolicy, SessionConfig};
use crate::decoder::FrameDecoder;
use crate::geometry::FrameGeometry;
use crate::transport::Transport;
use crate::types::Frame;

/// Outcome of one receive call.
#[derive(Debug)]
pub enum Received {
    /// A whole frame was read and decoded
    Frame(Frame),
    /// A read of the wrong size was discarded; the stream is still usable
    Corrupt { expected: usize, actual: usize },
    /// The device closed the connection
    StreamEnded,
    /// The read failed
    TransportFailure(std::io::Error),
}

impl Received {
    /// Whether the session loop should stop after this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Received::StreamEnded | Received::TransportFailure(_))
    }
}

/// Reads frames from a transport into a reusable buffer.
pub struct FrameReceiver {
    decoder: FrameDecoder,
    policy: ReadPolicy,
    buffer: Vec<u8>,
}

impl FrameReceiver {
    pub fn new(config: &SessionConfig) -> Self {
        let geometry = FrameGeometry::new(config);
        Self {
            decoder: FrameDecoder::new(geometry),
            policy: config.read_policy(),
            buffer: vec![0u8; geometry.transport_read_size],
        }
    }

    pub fn geometry(&self) -> &FrameGeometry {
        self.decoder.geometry()
    }

    /// Receive the next frame.
    pub async fn receive<T>(&mut self, transport: &mut T) -> Received
    where
        T: Transport + ?Sized,
    {
        match self.policy {
            ReadPolicy::SingleRead => self.receive_single(transport).await,
            ReadPolicy::Exact => self.receive_exact(transport).await,
        }
    }

    async fn receive_single<T>(&mut self, transport: &mut T) -> Received
    where
        T: Transport + ?Sized,
    {
        let expected = self.buffer.len();

        match transport.read(&mut self.buffer).await {
            Ok(0) => {
                debug!("Connection closed by A-mode device");
                Received::StreamEnded
            }
            Ok(n) if n == expected => {
                trace!(bytes = n, "Frame received");
                Received::Frame(self.decoder.decode(&self.buffer))
            }
            Ok(n) => {
                warn!(expected, actual = n, "Dropping frame with unexpected size");
                Received::Corrupt { expected, actual: n }
            }
            Err(e) => {
                debug!("Read from A-mode device failed: {}", e);
                Received::TransportFailure(e)
            }
        }
    }

    async fn receive_exact<T>(&mut self, transport: &mut T) -> Received
    where
        T: Transport + ?Sized,
    {
        let expected = self.buffer.len();
        let mut filled = 0usize;

        while filled < expected {
            match transport.read(&mut self.buffer[filled..]).await {
                Ok(0) => {
                    if filled > 0 {
                        warn!(
                            expected,
                            received = filled,
                            "Stream ended mid-frame, dropping partial frame"
                        );
                    } else {
                        debug!("Connection closed by A-mode device");
                    }
                    return Received::StreamEnded;
                }
                Ok(n) if n > expected - filled => {
                    warn!(expected, actual = filled + n, "Transport over-reported read size");
                    return Received::Corrupt { expected, actual: filled + n };
                }
                Ok(n) => filled += n,
                Err(e) => {
                    debug!("Read from A-mode device failed: {}", e);
                    return Received::TransportFailure(e);
                }
            }
        }

        trace!(bytes = filled, "Frame assembled");
        Received::Frame(self.decoder.decode(&self.buffer))
    }
}
