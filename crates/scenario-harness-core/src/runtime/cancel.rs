// crates/scenario-harness-core/src/runtime/cancel.rs
// ============================================================================
// Module: Suite Cancellation
// Description: Cloneable cancellation signal shared by every in-flight run.
// Purpose: Propagate the suite timeout to drivers and grading calls.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! [`CancelSignal`] wraps a `tokio::sync::watch` channel. Cancellation is
//! one-way and sticky: once fired, every clone observes it immediately and
//! [`CancelSignal::cancelled`] resolves for current and future waiters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::watch;

// ============================================================================
// SECTION: Cancel Signal
// ============================================================================

/// Cloneable, sticky cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    /// Sender shared by all clones.
    sender: Arc<watch::Sender<bool>>,
    /// Receiver used for waiting.
    receiver: watch::Receiver<bool>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    /// Creates a signal in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Fires the signal.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once the signal has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the signal has fired.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // `self` holds the sender, so the channel cannot close here.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}
