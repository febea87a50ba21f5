//! Cooperative cancellation
//!
//! The session polls its [`CancelSignal`] once per loop iteration, after the
//! receive call returns. A read that is blocked waiting for the device is not
//! interrupted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// "Should the session stop?" query, polled by the session loop.
pub trait CancelSignal: Send {
    fn should_stop(&self) -> bool;
}

impl CancelSignal for CancellationToken {
    fn should_stop(&self) -> bool {
        self.is_cancelled()
    }
}

impl CancelSignal for AtomicBool {
    fn should_stop(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<C: CancelSignal + Sync + ?Sized> CancelSignal for Arc<C> {
    fn should_stop(&self) -> bool {
        (**self).should_stop()
    }
}

impl<F> CancelSignal for F
where
    F: Fn() -> bool + Send,
{
    fn should_stop(&self) -> bool {
        self()
    }
}

/// Signal that never requests a stop.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    fn should_stop(&self) -> bool {
        false
    }
}
