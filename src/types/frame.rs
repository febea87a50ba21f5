//! Decoded frame types

use super::DataMode;

/// Typed numeric payload of one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Unsigned 16-bit samples. When the device index is retained it occupies
    /// slot 0, ahead of the samples.
    Raw(Vec<u16>),
    /// Depth values, one per probe-sample pair. Never contains the index.
    Depth(Vec<f64>),
}

impl Payload {
    /// Number of decoded elements, including a folded index slot.
    pub fn len(&self) -> usize {
        match self {
            Payload::Raw(values) => values.len(),
            Payload::Depth(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mode(&self) -> DataMode {
        match self {
            Payload::Raw(_) => DataMode::Raw,
            Payload::Depth(_) => DataMode::Depth,
        }
    }
}

/// One fixed-size delivery from the device, decoded.
///
/// Frames are created by [`FrameDecoder`](crate::FrameDecoder) and live for a
/// single loop iteration of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Decoded payload
    pub payload: Payload,

    /// Device sequence counter, present when the index is retained
    pub sequence_index: Option<u64>,

    /// Whether `payload` starts with the folded index slot (raw mode only)
    pub index_folded: bool,

    /// Seconds since the Unix epoch, assigned by the session on receipt
    pub capture_timestamp: Option<f64>,
}

impl Frame {
    /// Create a frame that has not yet been stamped.
    pub fn new(payload: Payload, sequence_index: Option<u64>, index_folded: bool) -> Self {
        Self { payload, sequence_index, index_folded, capture_timestamp: None }
    }

    /// Assign the capture timestamp.
    pub fn stamp(&mut self, timestamp: f64) {
        self.capture_timestamp = Some(timestamp);
    }

    pub fn mode(&self) -> DataMode {
        self.payload.mode()
    }

    /// Raw samples without the folded index slot.
    pub fn raw_samples(&self) -> Option<&[u16]> {
        match &self.payload {
            Payload::Raw(values) if self.index_folded => values.get(1..),
            Payload::Raw(values) => Some(values),
            Payload::Depth(_) => None,
        }
    }

    /// Depth values.
    pub fn depth_values(&self) -> Option<&[f64]> {
        match &self.payload {
            Payload::Depth(values) => Some(values),
            Payload::Raw(_) => None,
        }
    }
}
