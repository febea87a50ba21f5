//! TIFF image sink for raw frames

use image::{ImageBuffer, ImageFormat, Luma};
use std::path::{Path, PathBuf};
use tracing::trace;

use super::{FrameSink, create_output_dir, timestamp_stem};
use crate::types::Frame;
use crate::{Result, StreamError};

/// Writes each raw frame as a 16-bit grayscale TIFF.
///
/// The image has one row per probe and one column per sample. Files are named
/// `<timestamp>.tiff`, or `<timestamp>_<index>.tiff` when the frame carries a
/// device index.
#[derive(Debug, Clone)]
pub struct RawImageSink {
    dir: PathBuf,
    samples: usize,
    probes: usize,
}

impl RawImageSink {
    /// Create the sink, creating `dir` if needed.
    pub fn create(dir: &Path, samples: usize, probes: usize) -> Result<Self> {
        create_output_dir(dir)?;
        Ok(Self { dir: dir.to_path_buf(), samples, probes })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the frame would be written to.
    pub fn path_for(&self, frame: &Frame, timestamp: f64) -> PathBuf {
        let stem = timestamp_stem(timestamp);
        let name = match frame.sequence_index {
            Some(index) => format!("{}_{}.tiff", stem, index),
            None => format!("{}.tiff", stem),
        };
        self.dir.join(name)
    }
}

impl FrameSink for RawImageSink {
    fn store(&mut self, frame: &Frame, timestamp: f64) -> Result<()> {
        let samples = frame
            .raw_samples()
            .ok_or_else(|| StreamError::sink_failed("raw image sink received a depth frame"))?;

        let expected = self.samples * self.probes;
        if samples.len() != expected {
            return Err(StreamError::sink_failed(format!(
                "frame has {} samples, image needs {}",
                samples.len(),
                expected
            )));
        }

        let image: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(self.samples as u32, self.probes as u32, samples.to_vec())
                .ok_or_else(|| StreamError::sink_failed("image buffer size mismatch"))?;

        let path = self.path_for(frame, timestamp);
        image
            .save_with_format(&path, ImageFormat::Tiff)
            .map_err(|source| StreamError::Image { path: path.clone(), source })?;

        trace!("Wrote {}", path.display());
        Ok(())
    }
}
