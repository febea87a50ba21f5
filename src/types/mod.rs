//! Core types for A-mode frame representation.
//!
//! - [`DataMode`] selects the payload encoding and carries the device presets
//! - [`Frame`] is one decoded device delivery with its typed [`Payload`]
//!
//! ## Usage Example
//!
//! ```rust
//! use amode_stream::types::{DataMode, Frame, Payload};
//!
//! let preset = DataMode::Raw.preset();
//! assert_eq!(preset.samples * preset.probes, 45_000);
//!
//! let frame = Frame::new(Payload::Raw(vec![3, 100, 200]), Some(3), true);
//! assert_eq!(frame.raw_samples(), Some(&[100u16, 200][..]));
//! ```

mod data_mode;
mod frame;

pub use data_mode::{DataMode, DevicePreset};
pub use frame::{Frame, Payload};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn presets_match_device_layout() {
        assert_eq!(DataMode::Raw.preset(), DevicePreset { samples: 1500, probes: 30 });
        assert_eq!(DataMode::Depth.preset(), DevicePreset { samples: 2, probes: 30 });
        assert_eq!(DataMode::Raw.index_width(), 2);
        assert_eq!(DataMode::Depth.index_width(), 8);
        assert_eq!(DataMode::Raw.element_width(), 2);
        assert_eq!(DataMode::Depth.element_width(), 8);
    }

    #[test]
    fn selector_round_trip() {
        for mode in [DataMode::Raw, DataMode::Depth] {
            assert_eq!(DataMode::try_from(mode.selector()).unwrap(), mode);
        }
    }

    proptest! {
        #[test]
        fn unknown_selectors_are_rejected(selector in 2u8..=u8::MAX) {
            let result = DataMode::try_from(selector);
            prop_assert!(
                matches!(result, Err(crate::StreamError::InvalidConfiguration { .. })),
                "expected InvalidConfiguration error"
            );
        }
    }

    #[test]
    fn data_mode_deserializes_lowercase() {
        let mode: DataMode = serde_yaml_ng::from_str("depth").unwrap();
        assert_eq!(mode, DataMode::Depth);
        assert_eq!(mode.to_string(), "depth");
    }
}
