//! Cooperative cancellation and progress reporting.
//!
//! Both facilities are optional: a run without a token never checks for
//! cancellation, and a run without a callback never reports progress. The
//! token is safe to clone across threads; cancelling any clone cancels the
//! run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{ReorderError, Result};

/// Cancellation handle shared between a caller and a running build.
///
/// # Examples
/// ```
/// use engawa_core::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the associated run.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Callback invoked with the fraction of leaves processed, in `0.0..=1.0`.
///
/// Under a parallel strategy the callback may be invoked concurrently from
/// worker threads.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Per-run control state threaded through the table builder.
pub(crate) struct RunControl {
    token: Option<CancellationToken>,
    progress: Option<ProgressCallback>,
    leaves_total: usize,
    leaves_done: AtomicUsize,
}

impl RunControl {
    pub(crate) fn new(
        token: Option<CancellationToken>,
        progress: Option<ProgressCallback>,
        leaves_total: usize,
    ) -> Self {
        Self {
            token,
            progress,
            leaves_total,
            leaves_done: AtomicUsize::new(0),
        }
    }

    /// Aborts the build when the caller has requested cancellation.
    pub(crate) fn check_cancelled(&self) -> Result<()> {
        match &self.token {
            Some(token) if token.is_cancelled() => Err(ReorderError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Records one processed leaf and reports the updated fraction.
    pub(crate) fn record_leaf(&self) {
        let done = self.leaves_done.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(progress) = &self.progress {
            if self.leaves_total > 0 {
                progress(done as f64 / self.leaves_total as f64);
            }
        }
    }
}
