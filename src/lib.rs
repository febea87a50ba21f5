//! Streaming client for A-mode ultrasound devices.
//!
//! The device pushes fixed-length frames over TCP: a 4 byte header, a
//! sequence index and a block of samples. This crate receives those frames,
//! drops any read that is not exactly one frame long, decodes the rest into
//! typed payloads and hands them to a sink.
//!
//! # Features
//!
//! - **Exact framing**: frame size derived once per session, wrong sizes rejected
//! - **Two data modes**: raw 16-bit samples or 64-bit depth values
//! - **Pluggable seams**: [`Transport`], [`FrameSink`] and [`CancelSignal`] traits
//! - **Recording**: 16-bit TIFF per raw frame, CSV row per depth frame
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use amode_stream::{DataMode, SessionConfig, StreamingSession, TcpTransport, sink_for};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::builder(DataMode::Depth).record(true).build()?;
//!     let transport = TcpTransport::connect("192.168.0.2:6340").await?;
//!     let sink = sink_for(&config, "amode-log".as_ref())?;
//!
//!     let cancel = CancellationToken::new();
//!     let report = StreamingSession::new(transport, config, sink, cancel).run().await;
//!     println!("{} frames", report.stats.accepted_frames());
//!     report.into_result()?;
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Frame pipeline
pub mod config;
pub mod decoder;
pub mod geometry;
pub mod receiver;

// Session and its collaborators
pub mod cancel;
pub mod session;
pub mod sink;
pub mod stats;
pub mod transport;

// Core exports
pub use error::*;
pub use types::*;

pub use cancel::{CancelSignal, NeverCancel};
pub use config::{HEADER_SIZE, ReadPolicy, SessionConfig, SessionConfigBuilder, StreamSettings};
pub use decoder::FrameDecoder;
pub use geometry::FrameGeometry;
pub use receiver::{FrameReceiver, Received};
pub use session::{SessionEnd, SessionHandle, SessionReport, StreamingSession};
pub use sink::{DepthCsvSink, FrameSink, FrameTap, NullSink, RawImageSink, sink_for};
pub use stats::SessionStats;
pub use transport::{TcpTransport, Transport};
