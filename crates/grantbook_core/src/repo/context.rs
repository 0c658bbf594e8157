//! Per-call deadline and cancellation carrier.
//!
//! Stores check the context before each statement; once it fires the
//! operation returns `StoreError::Cancelled` and any open transaction is
//! dropped (rolled back).

use crate::repo::error::{CancelReason, StoreError, StoreResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancelled: Option<Arc<AtomicBool>>,
}

/// Handle that cancels every context cloned from the one it was created with.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl OpContext {
    /// Context without deadline or cancellation.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Attaches a cancellation flag and returns the handle that trips it.
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        self.cancelled = Some(Arc::clone(&flag));
        (self, CancelHandle { flag })
    }

    /// Fails with `Cancelled` once cancellation was requested or the deadline passed.
    pub fn check(&self) -> StoreResult<()> {
        if let Some(flag) = self.cancelled.as_ref() {
            if flag.load(Ordering::SeqCst) {
                return Err(StoreError::Cancelled(CancelReason::Requested));
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(StoreError::Cancelled(CancelReason::DeadlineExceeded));
            }
        }
        Ok(())
    }
}
