//! Persistence sinks for decoded frames
//!
//! The session hands every accepted frame to a [`FrameSink`] when recording is
//! enabled. File formats live entirely behind this trait:
//!
//! - [`RawImageSink`] writes one 16-bit TIFF per raw frame
//! - [`DepthCsvSink`] appends one CSV row per depth frame
//! - [`FrameTap`] publishes the latest frame for live monitoring
//!
//! Two sinks can be combined as a tuple `(a, b)`; both receive every frame.

mod csv;
mod tap;
mod tiff;

pub use csv::DepthCsvSink;
pub use tap::FrameTap;
pub use tiff::RawImageSink;

use std::path::Path;
use tracing::info;

use crate::config::SessionConfig;
use crate::types::{DataMode, Frame};
use crate::{Result, StreamError};

/// Destination for decoded frames.
///
/// Sinks are synchronous and run on the session task, so their latency adds
/// directly to the per-frame loop period.
pub trait FrameSink: Send {
    /// Persist one frame captured at `timestamp` (seconds since the Unix epoch).
    fn store(&mut self, frame: &Frame, timestamp: f64) -> Result<()>;

    /// Flush and release any open files. Called once when the session ends.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn store(&mut self, frame: &Frame, timestamp: f64) -> Result<()> {
        (**self).store(frame, timestamp)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<A: FrameSink, B: FrameSink> FrameSink for (A, B) {
    fn store(&mut self, frame: &Frame, timestamp: f64) -> Result<()> {
        let first = self.0.store(frame, timestamp);
        let second = self.1.store(frame, timestamp);
        first.and(second)
    }

    fn close(&mut self) -> Result<()> {
        let first = self.0.close();
        let second = self.1.close();
        first.and(second)
    }
}

/// Sink that discards every frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn store(&mut self, _frame: &Frame, _timestamp: f64) -> Result<()> {
        Ok(())
    }
}

/// Build the file sink matching the session's data mode.
///
/// Creates `output_dir` when it does not exist.
pub fn sink_for(config: &SessionConfig, output_dir: &Path) -> Result<Box<dyn FrameSink>> {
    match config.mode() {
        DataMode::Raw => {
            let sink = RawImageSink::create(output_dir, config.samples(), config.probes())?;
            info!("Recording raw frames as TIFF images in {}", output_dir.display());
            Ok(Box::new(sink))
        }
        DataMode::Depth => {
            let sink = DepthCsvSink::create(output_dir, None)?;
            info!("Recording depth frames to {}", sink.path().display());
            Ok(Box::new(sink))
        }
    }
}

pub(crate) fn create_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| StreamError::file_error(dir.to_path_buf(), e))
}

/// File stem for a timestamp, six decimal places.
pub(crate) fn timestamp_stem(timestamp: f64) -> String {
    format!("{:.6}", timestamp)
}
