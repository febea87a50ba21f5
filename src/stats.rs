//! Cumulative session statistics

use std::time::{Duration, Instant};

use crate::types::DataMode;

/// Counters owned by one streaming session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    started: Instant,
    finished: Option<Duration>,
    accepted_frames: u64,
    rejected_frames: u64,
    sink_failures: u64,
    index_gaps: u64,
    last_index: Option<u64>,
    index_mask: u64,
}

impl SessionStats {
    /// Start counting now.
    pub fn new(mode: DataMode) -> Self {
        let index_mask = match mode {
            DataMode::Raw => u64::from(u16::MAX),
            DataMode::Depth => u64::MAX,
        };
        Self {
            started: Instant::now(),
            finished: None,
            accepted_frames: 0,
            rejected_frames: 0,
            sink_failures: 0,
            index_gaps: 0,
            last_index: None,
            index_mask,
        }
    }

    /// Count an accepted frame and check its sequence index for a gap.
    ///
    /// Returns `true` when the index did not follow the previous one.
    pub fn record_accept(&mut self, sequence_index: Option<u64>) -> bool {
        self.accepted_frames += 1;

        let Some(index) = sequence_index else {
            return false;
        };
        let gap = match self.last_index {
            Some(last) => index != (last.wrapping_add(1) & self.index_mask),
            None => false,
        };
        if gap {
            self.index_gaps += 1;
        }
        self.last_index = Some(index);
        gap
    }

    pub fn record_reject(&mut self) {
        self.rejected_frames += 1;
    }

    pub fn record_sink_failure(&mut self) {
        self.sink_failures += 1;
    }

    /// Freeze the elapsed time.
    pub(crate) fn finish(&mut self) {
        self.finished = Some(self.started.elapsed());
    }

    /// Time from session start until the loop ended.
    ///
    /// Reads the live clock while the session is still running.
    pub fn elapsed(&self) -> Duration {
        self.finished.unwrap_or_else(|| self.started.elapsed())
    }

    pub fn accepted_frames(&self) -> u64 {
        self.accepted_frames
    }

    /// Reads dropped for having the wrong size.
    pub fn rejected_frames(&self) -> u64 {
        self.rejected_frames
    }

    pub fn sink_failures(&self) -> u64 {
        self.sink_failures
    }

    /// Breaks in the device sequence counter. Always zero without an index.
    pub fn index_gaps(&self) -> u64 {
        self.index_gaps
    }

    /// Mean time between accepted frames, `None` before the first one.
    pub fn mean_frame_interval(&self) -> Option<Duration> {
        if self.accepted_frames == 0 {
            return None;
        }
        Some(self.elapsed().div_f64(self.accepted_frames as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn counts_accepts_and_rejects() {
        let mut stats = SessionStats::new(DataMode::Depth);
        assert_eq!(stats.mean_frame_interval(), None);

        stats.record_accept(None);
        stats.record_reject();
        stats.record_accept(None);
        stats.record_sink_failure();
        stats.finish();

        assert_eq!(stats.accepted_frames(), 2);
        assert_eq!(stats.rejected_frames(), 1);
        assert_eq!(stats.sink_failures(), 1);
        assert_eq!(stats.index_gaps(), 0);
        assert_eq!(stats.mean_frame_interval(), Some(stats.elapsed().div_f64(2.0)));
    }

    #[test]
    fn detects_index_gaps() {
        let mut stats = SessionStats::new(DataMode::Depth);
        assert!(!stats.record_accept(Some(10)));
        assert!(!stats.record_accept(Some(11)));
        assert!(stats.record_accept(Some(14)));
        assert!(!stats.record_accept(Some(15)));
        assert!(stats.record_accept(Some(15)));
        assert_eq!(stats.index_gaps(), 2);
    }

    #[test]
    fn raw_index_wraps_at_u16() {
        let mut stats = SessionStats::new(DataMode::Raw);
        stats.record_accept(Some(u64::from(u16::MAX)));
        assert!(!stats.record_accept(Some(0)));
        assert_eq!(stats.index_gaps(), 0);
    }

    #[test]
    fn elapsed_is_frozen_after_finish() {
        let mut stats = SessionStats::new(DataMode::Raw);
        stats.finish();
        let first = stats.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(stats.elapsed(), first);
    }

    proptest! {
        #[test]
        fn consecutive_indices_never_gap(start in 0u64..u64::from(u16::MAX), len in 1usize..200) {
            let mut stats = SessionStats::new(DataMode::Raw);
            for offset in 0..len as u64 {
                stats.record_accept(Some((start + offset) & u64::from(u16::MAX)));
            }
            prop_assert_eq!(stats.index_gaps(), 0);
            prop_assert_eq!(stats.accepted_frames(), len as u64);
        }
    }
}
