//! Streaming session: the receive, decode and persist loop
//!
//! A [`StreamingSession`] owns one transport connection, one sink and one
//! cancellation signal. It runs until the device closes the stream, the
//! transport fails, or cancellation is requested, then releases the transport
//! and the sink and reports cumulative statistics.
//!
//! ```text
//! Idle -> Streaming -> Closing -> Closed
//!           |  ^
//!           +--+  accept / reject
//! ```
//!
//! Cancellation is polled after every receive, so a blocked read is only
//! interrupted by the transport itself (a read timeout, or a transport
//! that watches the same token and fails the read with `Interrupted`).

use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelSignal;
use crate::config::SessionConfig;
use crate::receiver::{FrameReceiver, Received};
use crate::sink::FrameSink;
use crate::stats::SessionStats;
use crate::transport::Transport;
use crate::{Result, StreamError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Streaming,
    Closing,
    Closed,
}

/// Why the session loop stopped.
#[derive(Debug)]
pub enum SessionEnd {
    /// The device closed the connection
    StreamEnded,
    /// The cancel signal asked the session to stop
    Cancelled,
    /// A read failed; carries the cause
    TransportFailure(StreamError),
}

/// Final statistics and termination cause of a session.
#[derive(Debug)]
pub struct SessionReport {
    pub stats: SessionStats,
    pub end: SessionEnd,
}

impl SessionReport {
    /// Statistics for an orderly end, or the transport error.
    ///
    /// Both a remote close and a cancellation count as orderly.
    pub fn into_result(self) -> Result<SessionStats> {
        match self.end {
            SessionEnd::StreamEnded | SessionEnd::Cancelled => Ok(self.stats),
            SessionEnd::TransportFailure(e) => Err(e),
        }
    }
}

/// Drives one device connection from first read to shutdown.
pub struct StreamingSession<T, S, C> {
    transport: T,
    sink: S,
    cancel: C,
    config: SessionConfig,
    receiver: FrameReceiver,
    state: SessionState,
}

impl<T, S, C> StreamingSession<T, S, C>
where
    T: Transport,
    S: FrameSink,
    C: CancelSignal,
{
    /// Create a session over an already connected transport.
    pub fn new(transport: T, config: SessionConfig, sink: S, cancel: C) -> Self {
        let receiver = FrameReceiver::new(&config);
        Self { transport, sink, cancel, config, receiver, state: SessionState::Idle }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the loop to completion.
    ///
    /// The transport and the sink are closed before this returns, whatever
    /// ended the loop.
    pub async fn run(mut self) -> SessionReport {
        let mut stats = SessionStats::new(self.config.mode());
        self.transition(SessionState::Streaming);

        let geometry = *self.receiver.geometry();
        info!(
            mode = %self.config.mode(),
            frame_bytes = geometry.transport_read_size,
            elements = geometry.decoded_len(),
            record = self.config.record(),
            "Streaming from A-mode device"
        );

        let end = loop {
            match self.receiver.receive(&mut self.transport).await {
                Received::Frame(mut frame) => {
                    let timestamp = epoch_seconds();
                    frame.stamp(timestamp);

                    if stats.record_accept(frame.sequence_index) {
                        debug!(sequence_index = ?frame.sequence_index, "Gap in device sequence index");
                    }

                    if self.config.record() {
                        if let Err(e) = self.sink.store(&frame, timestamp) {
                            stats.record_sink_failure();
                            warn!("Failed to store frame: {}", e);
                        }
                    }
                }
                Received::Corrupt { .. } => stats.record_reject(),
                Received::StreamEnded => {
                    info!("A-mode device closed the stream");
                    break SessionEnd::StreamEnded;
                }
                Received::TransportFailure(e)
                    if e.kind() == std::io::ErrorKind::Interrupted && self.cancel.should_stop() =>
                {
                    info!("Pending read interrupted by stop request");
                    break SessionEnd::Cancelled;
                }
                Received::TransportFailure(e) => {
                    error!("Transport failure: {}", e);
                    break SessionEnd::TransportFailure(StreamError::transport(e));
                }
            }

            if self.cancel.should_stop() {
                info!("Stop requested, ending session");
                break SessionEnd::Cancelled;
            }
        };

        self.transition(SessionState::Closing);
        self.release().await;
        stats.finish();
        self.transition(SessionState::Closed);

        info!(
            elapsed_secs = stats.elapsed().as_secs_f64(),
            frames = stats.accepted_frames(),
            rejected = stats.rejected_frames(),
            sink_failures = stats.sink_failures(),
            index_gaps = stats.index_gaps(),
            mean_interval_ms = stats.mean_frame_interval().map(|d| d.as_secs_f64() * 1000.0),
            "Session finished"
        );

        SessionReport { stats, end }
    }

    async fn release(&mut self) {
        if let Err(e) = self.sink.close() {
            warn!("Failed to close sink: {}", e);
        }
        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport: {}", e);
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

impl<T, S> StreamingSession<T, S, CancellationToken>
where
    T: Transport + 'static,
    S: FrameSink + 'static,
{
    /// Run a session on its own task.
    ///
    /// Sessions share nothing, so one task per device is enough to stream
    /// from several devices at once.
    pub fn spawn(transport: T, config: SessionConfig, sink: S) -> SessionHandle {
        let cancel = CancellationToken::new();
        let session = Self::new(transport, config, sink, cancel.clone());
        let join = tokio::spawn(session.run());
        SessionHandle { cancel, join }
    }
}

/// Handle to a session spawned with [`StreamingSession::spawn`].
#[derive(Debug)]
pub struct SessionHandle {
    cancel: CancellationToken,
    join: JoinHandle<SessionReport>,
}

impl SessionHandle {
    /// Ask the session to stop after its current receive.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the session to finish.
    pub async fn join(self) -> std::result::Result<SessionReport, JoinError> {
        self.join.await
    }
}

fn epoch_seconds() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}
