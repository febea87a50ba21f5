//! Session and application configuration.
//!
//! [`SessionConfig`] is the immutable per-session configuration consumed by the
//! geometry, receiver and session. It is built once, validated, and never
//! changes while a session runs.
//!
//! [`StreamSettings`] is the full application configuration (device address,
//! output directory, flags). It can be deserialized from YAML and converted
//! into a [`SessionConfig`].
//!
//! ```rust
//! use amode_stream::{DataMode, SessionConfig};
//!
//! let config = SessionConfig::builder(DataMode::Depth)
//!     .use_data_index(false)
//!     .record(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.element_count(), 60);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::types::DataMode;
use crate::{Result, StreamError};

/// Leading envelope bytes in every frame, never passed to the application.
pub const HEADER_SIZE: usize = 4;

/// How the receiver turns transport reads into frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPolicy {
    /// One read per frame; anything other than the exact frame size is dropped.
    #[default]
    SingleRead,
    /// Keep reading until a whole frame has been assembled.
    Exact,
}

/// Immutable configuration for one streaming session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    mode: DataMode,
    samples: usize,
    probes: usize,
    use_data_index: bool,
    record: bool,
    read_policy: ReadPolicy,
}

impl SessionConfig {
    /// Configuration matching the device preset for `mode`.
    pub fn preset(mode: DataMode) -> Result<Self> {
        Self::builder(mode).build()
    }

    /// Configuration with caller supplied counts, bypassing the preset table.
    ///
    /// The payload is interpreted as raw samples unless a mode is set through
    /// [`SessionConfig::builder`].
    pub fn custom(samples: usize, probes: usize) -> Result<Self> {
        Self::builder(DataMode::Raw).samples(samples).probes(probes).build()
    }

    pub fn builder(mode: DataMode) -> SessionConfigBuilder {
        SessionConfigBuilder::new(mode)
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn probes(&self) -> usize {
        self.probes
    }

    /// Number of payload elements per frame (`samples * probes`).
    pub fn element_count(&self) -> usize {
        self.samples * self.probes
    }

    pub fn header_size(&self) -> usize {
        HEADER_SIZE
    }

    pub fn index_size(&self) -> usize {
        self.mode.index_width()
    }

    pub fn use_data_index(&self) -> bool {
        self.use_data_index
    }

    pub fn record(&self) -> bool {
        self.record
    }

    pub fn read_policy(&self) -> ReadPolicy {
        self.read_policy
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    mode: DataMode,
    samples: usize,
    probes: usize,
    use_data_index: bool,
    record: bool,
    read_policy: ReadPolicy,
}

impl SessionConfigBuilder {
    fn new(mode: DataMode) -> Self {
        let preset = mode.preset();
        Self {
            mode,
            samples: preset.samples,
            probes: preset.probes,
            use_data_index: false,
            record: false,
            read_policy: ReadPolicy::SingleRead,
        }
    }

    pub fn samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn probes(mut self, probes: usize) -> Self {
        self.probes = probes;
        self
    }

    /// Keep the device index in decoded frames for gap detection.
    pub fn use_data_index(mut self, flag: bool) -> Self {
        self.use_data_index = flag;
        self
    }

    /// Forward decoded frames to the sink.
    pub fn record(mut self, flag: bool) -> Self {
        self.record = flag;
        self
    }

    pub fn read_policy(mut self, policy: ReadPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<SessionConfig> {
        if self.samples == 0 {
            return Err(StreamError::invalid_configuration("sample count must be positive"));
        }
        if self.probes == 0 {
            return Err(StreamError::invalid_configuration("probe count must be positive"));
        }

        // The whole frame must be addressable as a single buffer
        let frame_bytes = self
            .samples
            .checked_mul(self.probes)
            .and_then(|count| count.checked_mul(self.mode.element_width()))
            .and_then(|bytes| bytes.checked_add(HEADER_SIZE + self.mode.index_width()))
            .filter(|bytes| *bytes <= isize::MAX as usize);
        if frame_bytes.is_none() {
            return Err(StreamError::invalid_configuration(format!(
                "{} samples x {} probes overflows the frame size",
                self.samples, self.probes
            )));
        }

        debug!(
            mode = %self.mode,
            samples = self.samples,
            probes = self.probes,
            use_data_index = self.use_data_index,
            record = self.record,
            "Session configuration validated"
        );

        Ok(SessionConfig {
            mode: self.mode,
            samples: self.samples,
            probes: self.probes,
            use_data_index: self.use_data_index,
            record: self.record,
            read_policy: self.read_policy,
        })
    }
}

/// Application settings, loadable from YAML.
///
/// Missing fields take the defaults of the bench acquisition setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamSettings {
    /// Device IP address or host name
    pub address: String,
    /// Device TCP port
    pub port: u16,
    /// Payload encoding
    pub mode: DataMode,
    /// Sample count override (preset when absent)
    pub samples: Option<usize>,
    /// Probe count override (preset when absent)
    pub probes: Option<usize>,
    /// Directory for recorded frames
    pub output_dir: PathBuf,
    /// Persist decoded frames
    pub record: bool,
    /// Keep the device index in frames
    pub use_data_index: bool,
    /// Frame assembly policy
    pub read_policy: ReadPolicy,
    /// Per-read deadline in milliseconds; none blocks indefinitely
    pub read_timeout_ms: Option<u64>,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            address: "192.168.0.2".to_string(),
            port: 6340,
            mode: DataMode::Raw,
            samples: None,
            probes: None,
            output_dir: PathBuf::from("amode-log"),
            record: true,
            use_data_index: true,
            read_policy: ReadPolicy::SingleRead,
            read_timeout_ms: None,
        }
    }
}

impl StreamSettings {
    /// Parse settings from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| StreamError::Config {
            context: "StreamSettings deserialization".to_string(),
            details: e.to_string(),
        })
    }

    /// Load settings from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| StreamError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Build the session configuration these settings describe.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let mut builder = SessionConfig::builder(self.mode)
            .use_data_index(self.use_data_index)
            .record(self.record)
            .read_policy(self.read_policy);
        if let Some(samples) = self.samples {
            builder = builder.samples(samples);
        }
        if let Some(probes) = self.probes {
            builder = builder.probes(probes);
        }
        builder.build()
    }

    /// `host:port` of the device.
    pub fn device_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}
