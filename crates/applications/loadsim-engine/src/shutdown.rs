//! One-shot broadcast shutdown signal
//!
//! Every concurrent component of a run holds a clone of the same
//! [`ShutdownSignal`]. The first trigger to fire records its
//! [`TerminationReason`] and cancels the underlying token; later triggers
//! are no-ops. Once set, the signal is never unset.

use crate::types::TerminationReason;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Close-once signal shared by generator, dispatcher, servers and collector
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<TerminationReason>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal
    ///
    /// Returns `true` if this call set it, `false` if it was already set.
    pub fn trigger(&self, reason: TerminationReason) -> bool {
        match self.reason.set(reason) {
            Ok(()) => {
                info!(reason = ?reason, "Shutdown signal set");
                self.token.cancel();
                true
            }
            Err(_) => {
                debug!(
                    reason = ?reason,
                    first = ?self.reason(),
                    "Shutdown signal already set, ignoring trigger"
                );
                false
            }
        }
    }

    pub fn is_set(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The trigger that fired first, if any
    pub fn reason(&self) -> Option<TerminationReason> {
        self.reason.get().copied()
    }

    /// Resolves once the signal is set
    ///
    /// Cancel-safe, suitable as a `tokio::select!` branch.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
