//! Payload decoding for validated frame buffers.
//!
//! The decoder has no error path: it is only called once the receiver has
//! confirmed the buffer is exactly one frame long.

use tracing::trace;

use crate::geometry::FrameGeometry;
use crate::types::{DataMode, Frame, Payload};

/// Converts raw frame bytes into typed [`Frame`]s.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    geometry: FrameGeometry,
}

impl FrameDecoder {
    pub fn new(geometry: FrameGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    /// Decode one frame.
    ///
    /// `buffer` must be exactly `transport_read_size` bytes long.
    pub fn decode(&self, buffer: &[u8]) -> Frame {
        debug_assert_eq!(buffer.len(), self.geometry.transport_read_size);

        let frame = match self.geometry.mode {
            DataMode::Raw => self.decode_raw(buffer),
            DataMode::Depth => self.decode_depth(buffer),
        };

        trace!(
            elements = frame.payload.len(),
            sequence_index = ?frame.sequence_index,
            "Decoded frame"
        );
        frame
    }

    // A retained index is read as the first u16 of the sample sequence, which
    // is how the device packs it.
    fn decode_raw(&self, buffer: &[u8]) -> Frame {
        let bytes = buffer.get(self.geometry.skip_size..).unwrap_or_default();
        let values: Vec<u16> =
            bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect();

        let use_index = self.geometry.use_data_index;
        let sequence_index = if use_index { values.first().map(|&v| u64::from(v)) } else { None };

        Frame::new(Payload::Raw(values), sequence_index, use_index)
    }

    fn decode_depth(&self, buffer: &[u8]) -> Frame {
        let bytes = buffer.get(self.geometry.data_range()).unwrap_or_default();
        let values: Vec<f64> = bytes.chunks_exact(8).map(read_f64_le).collect();

        let sequence_index = if self.geometry.use_data_index {
            buffer.get(self.geometry.index_range()).map(|index| index_to_u64(read_f64_le(index)))
        } else {
            None
        };

        Frame::new(Payload::Depth(values), sequence_index, false)
    }
}

fn read_f64_le(bytes: &[u8]) -> f64 {
    f64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

// Depth frames carry their counter as a double.
fn index_to_u64(value: f64) -> u64 {
    if value.is_finite() && value >= 0.0 { value as u64 } else { 0 }
}
