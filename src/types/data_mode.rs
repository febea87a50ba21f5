//! Device data mode definitions

use serde::{Deserialize, Serialize};

use crate::{Result, StreamError};

/// Encoding of the numeric payload pushed by the device.
///
/// The device is switched between modes on the ultrasound machine itself;
/// the client must be configured to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    /// Unsigned 16-bit samples, one per probe-sample pair
    Raw,
    /// 64-bit floating point depth values
    Depth,
}

/// Fixed sample/probe layout the device uses for a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePreset {
    pub samples: usize,
    pub probes: usize,
}

impl DataMode {
    /// Numeric selector used by the command line (`0` raw, `1` depth).
    pub const fn selector(&self) -> u8 {
        match self {
            DataMode::Raw => 0,
            DataMode::Depth => 1,
        }
    }

    /// Returns the size in bytes of one payload element.
    pub const fn element_width(&self) -> usize {
        match self {
            DataMode::Raw => 2,
            DataMode::Depth => 8,
        }
    }

    /// Returns the size in bytes of the device sequence counter.
    pub const fn index_width(&self) -> usize {
        match self {
            DataMode::Raw => 2,
            DataMode::Depth => 8,
        }
    }

    /// The layout the device streams in this mode by default.
    pub const fn preset(&self) -> DevicePreset {
        match self {
            DataMode::Raw => DevicePreset { samples: 1500, probes: 30 },
            DataMode::Depth => DevicePreset { samples: 2, probes: 30 },
        }
    }
}

impl TryFrom<u8> for DataMode {
    type Error = StreamError;

    fn try_from(selector: u8) -> Result<Self> {
        match selector {
            0 => Ok(DataMode::Raw),
            1 => Ok(DataMode::Depth),
            other => Err(StreamError::invalid_configuration(format!(
                "unknown data mode selector {} (expected 0 for raw or 1 for depth)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for DataMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataMode::Raw => f.write_str("raw"),
            DataMode::Depth => f.write_str("depth"),
        }
    }
}
