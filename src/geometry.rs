//! Frame geometry derived from the session configuration.
//!
//! ## Wire Layout
//!
//! Every frame the device pushes has the same length for the whole session:
//!
//! ```text
//! ┌────────────────┬──────────────────────┬────────────────────────────────────┐
//! │ Header 4 bytes │ Index 2 (raw) or     │ Payload                            │
//! │                │ 8 (depth) bytes      │ element_count * element_width      │
//! └────────────────┴──────────────────────┴────────────────────────────────────┘
//! ```
//!
//! When the index is retained, decoding starts right after the header;
//! otherwise the index bytes are skipped with the header.

use crate::config::SessionConfig;
use crate::types::DataMode;

/// Sizes and offsets for one session, computed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub mode: DataMode,
    pub element_count: usize,
    pub element_width: usize,
    pub header_size: usize,
    pub index_size: usize,
    pub use_data_index: bool,
    /// Bytes decoded into the payload, including the index when retained
    pub payload_size: usize,
    /// Offset at which decoding starts
    pub skip_size: usize,
    /// Exact byte count of every frame on the wire
    pub transport_read_size: usize,
}

impl FrameGeometry {
    /// Derive the geometry. The configuration has already been validated, so
    /// this cannot fail.
    pub fn new(config: &SessionConfig) -> Self {
        let mode = config.mode();
        let element_count = config.element_count();
        let element_width = mode.element_width();
        let header_size = config.header_size();
        let index_size = config.index_size();
        let use_data_index = config.use_data_index();

        let data_size = element_width * element_count;
        let (skip_size, payload_size) = if use_data_index {
            (header_size, index_size + data_size)
        } else {
            (header_size + index_size, data_size)
        };

        Self {
            mode,
            element_count,
            element_width,
            header_size,
            index_size,
            use_data_index,
            payload_size,
            skip_size,
            transport_read_size: header_size + index_size + data_size,
        }
    }

    /// Number of elements the decoder emits.
    ///
    /// Raw mode folds a retained index into the sample sequence (one extra
    /// 16-bit slot); depth mode never does.
    pub fn decoded_len(&self) -> usize {
        match self.mode {
            DataMode::Raw if self.use_data_index => self.payload_size / self.element_width,
            _ => self.element_count,
        }
    }

    /// Byte range of the device index within a frame.
    pub fn index_range(&self) -> std::ops::Range<usize> {
        self.header_size..self.header_size + self.index_size
    }

    /// Byte range of the sample data within a frame.
    pub fn data_range(&self) -> std::ops::Range<usize> {
        self.header_size + self.index_size..self.transport_read_size
    }
}
