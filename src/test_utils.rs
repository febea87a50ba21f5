//! Test utilities: in-memory transport, recording sink and frame builders
//!
//! These helpers are shared by the unit tests and the benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::sink::FrameSink;
use crate::transport::Transport;
use crate::types::Frame;
use crate::{Result, StreamError};

/// Envelope header used by the builders. The decoder never looks at it.
pub const TEST_HEADER: [u8; 4] = [0xA5, 0x5A, 0x00, 0x01];

/// Build a raw-mode frame: header, u16 index, u16 samples.
pub fn raw_frame_bytes(index: u16, samples: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(TEST_HEADER.len() + 2 + samples.len() * 2);
    bytes.extend_from_slice(&TEST_HEADER);
    bytes.extend_from_slice(&index.to_le_bytes());
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Build a depth-mode frame: header, f64 index, f64 depths.
pub fn depth_frame_bytes(index: f64, depths: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(TEST_HEADER.len() + 8 + depths.len() * 8);
    bytes.extend_from_slice(&TEST_HEADER);
    bytes.extend_from_slice(&index.to_le_bytes());
    for depth in depths {
        bytes.extend_from_slice(&depth.to_le_bytes());
    }
    bytes
}

/// One scripted outcome of [`ScriptedTransport::read`].
#[derive(Debug)]
pub enum ScriptedRead {
    /// Deliver these bytes; anything beyond the read buffer stays queued
    Bytes(Vec<u8>),
    /// Report `n` bytes read regardless of the buffer size
    Report(usize),
    /// Remote closed the stream
    Closed,
    /// The read fails with this error kind
    Fail(std::io::ErrorKind),
}

/// In-memory transport that replays a script of reads.
///
/// Once the script is exhausted every read reports a closed stream.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: VecDeque<ScriptedRead>,
    reads: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<ScriptedRead>) -> Self {
        Self {
            script: script.into(),
            reads: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn reads_issued(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Shared flag set when the session closes the transport.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    /// Shared read counter.
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        match self.script.pop_front() {
            None | Some(ScriptedRead::Closed) => Ok(0),
            Some(ScriptedRead::Bytes(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.script.push_front(ScriptedRead::Bytes(bytes[n..].to_vec()));
                }
                Ok(n)
            }
            Some(ScriptedRead::Report(n)) => {
                let fill = n.min(buf.len());
                buf[..fill].fill(0);
                Ok(n)
            }
            Some(ScriptedRead::Fail(kind)) => Err(std::io::Error::new(kind, "scripted failure")),
        }
    }

    async fn close(&mut self) -> std::io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Sink that keeps every stored frame for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<(Frame, f64)>>>,
    closed: Arc<AtomicBool>,
    fail_stores: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every `store` fails.
    pub fn failing() -> Self {
        Self { fail_stores: true, ..Self::default() }
    }

    pub fn frames(&self) -> Vec<(Frame, f64)> {
        self.frames.lock().map(|frames| frames.clone()).unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl FrameSink for RecordingSink {
    fn store(&mut self, frame: &Frame, timestamp: f64) -> Result<()> {
        if self.fail_stores {
            return Err(StreamError::sink_failed("scripted sink failure"));
        }
        self.frames
            .lock()
            .map_err(|_| StreamError::sink_failed("recording sink poisoned"))?
            .push((frame.clone(), timestamp));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
