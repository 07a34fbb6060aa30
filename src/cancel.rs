use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ClusterError;

/// Cooperative cancellation flag threaded through the long running loops.
///
/// Clones share the same flag, so a caller can keep one handle and pass another
/// into [`ClusterLifecycleManager::activate`](crate::ClusterLifecycleManager::activate).
/// Loops poll it once per outer iteration (per gene row, per candidate, per merge).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that any operation polling this token stops at its next check.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clears a previous cancellation so the token can be reused.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub(crate) fn check(&self) -> Result<(), ClusterError> {
        if self.is_cancelled() {
            Err(ClusterError::Cancelled)
        } else {
            Ok(())
        }
    }
}
