//! Barge-in signal shared by every flow of one session.
//!
//! Three producers can raise it (client control message, model-reported
//! interruption, wake word repeated while awake); only the synthesis loop
//! clears it, after it has dropped all pending text and told the client to
//! stop playback.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Who raised an interruption. Used for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptSource {
    /// The client sent `{"type":"interrupt"}`.
    Client,
    /// The model reported the user talking over it.
    Model,
    /// The wake word was said again while already awake.
    WakeWord,
}

#[derive(Debug, Default)]
struct Inner {
    flag: AtomicBool,
    notify: Notify,
}

/// Edge-triggered interruption flag.
///
/// Clones share state. Setting an already-set flag is a no-op.
#[derive(Debug, Clone, Default)]
pub struct InterruptSignal {
    inner: Arc<Inner>,
}

impl InterruptSignal {
    /// Create a new, cleared signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal.
    ///
    /// Returns `true` if this call set it, `false` if it was already set.
    pub fn trigger(&self, source: InterruptSource) -> bool {
        let newly_set = !self.inner.flag.swap(true, Ordering::SeqCst);
        if newly_set {
            tracing::info!(?source, "Interrupt signalled");
            self.inner.notify.notify_waiters();
        } else {
            tracing::debug!(?source, "Interrupt already pending");
        }
        newly_set
    }

    /// Whether an interruption is pending.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Acknowledge the interruption.
    ///
    /// Must only be called by the consumer once its drain has completed.
    pub fn clear(&self) {
        self.inner.flag.store(false, Ordering::SeqCst);
    }

    /// Resolve once the signal is set (immediately if it already is).
    pub async fn triggered(&self) {
        loop {
            let notified = self.inner.notify.notified();
            let mut notified = std::pin::pin!(notified);
            // Register before checking the flag so a trigger between the
            // check and the await is not lost.
            notified.as_mut().enable();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}
