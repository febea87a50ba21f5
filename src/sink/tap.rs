//! Live frame tap built on a watch channel

use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::FrameSink;
use crate::Result;
use crate::types::Frame;

#[derive(Debug, Clone)]
enum TapState {
    Waiting,
    Frame(Arc<Frame>),
    Closed,
}

/// Publishes the most recent frame to any number of subscribers.
///
/// Subscribers see "latest wins" semantics: a slow consumer skips frames
/// rather than slowing the session down.
#[derive(Debug, Clone)]
pub struct FrameTap {
    tx: Arc<watch::Sender<TapState>>,
}

impl Default for FrameTap {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTap {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(TapState::Waiting);
        Self { tx: Arc::new(tx) }
    }

    /// Most recent frame, if one has been stored and the tap is still open.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        match &*self.tx.borrow() {
            TapState::Frame(frame) => Some(Arc::clone(frame)),
            TapState::Waiting | TapState::Closed => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.tx.borrow(), TapState::Closed)
    }

    /// Stream of frames as they are stored.
    ///
    /// Ends once the tap is closed, including when no frame was ever stored
    /// or the tap was already closed at subscription time.
    pub fn subscribe(&self) -> impl Stream<Item = Arc<Frame>> + 'static {
        WatchStream::new(self.tx.subscribe())
            .take_while(|state| {
                let open = !matches!(state, TapState::Closed);
                async move { open }
            })
            .filter_map(|state| async move {
                match state {
                    TapState::Frame(frame) => Some(frame),
                    TapState::Waiting | TapState::Closed => None,
                }
            })
    }
}

impl FrameSink for FrameTap {
    fn store(&mut self, frame: &Frame, timestamp: f64) -> Result<()> {
        let mut frame = frame.clone();
        frame.stamp(timestamp);
        self.tx.send_replace(TapState::Frame(Arc::new(frame)));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.tx.send_replace(TapState::Closed);
        Ok(())
    }
}
