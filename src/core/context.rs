//! Evaluation context threaded through every pixel request.
//!
//! The context carries the cooperative cancellation flag that operators check
//! on each recursive descent, plus counters describing how much work a
//! render caused. It is shared by reference across worker threads.

use crate::core::error::{RasterError, RasterResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Shared cancellation flag.
///
/// Clones observe the same flag, so a UI thread can hold one clone and cancel
/// a render running elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a new, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Snapshot of the fetch counters of a [`RenderContext`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Calls to `tile`
    pub tile_requests: u64,
    /// Calls to `data_region` (including `data`)
    pub region_requests: u64,
    /// Calls to `copy_data`
    pub copy_requests: u64,
    /// Pixels written into freshly allocated rasters
    pub pixels_allocated: u64,
}

#[derive(Debug, Default)]
struct FetchCounters {
    tile_requests: AtomicU64,
    region_requests: AtomicU64,
    copy_requests: AtomicU64,
    pixels_allocated: AtomicU64,
}

/// Context provided to every pixel fetch.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Cancellation flag checked at each descent.
    cancel: CancelToken,
    /// Work counters, shared between clones.
    counters: Arc<FetchCounters>,
}

impl RenderContext {
    /// Create a context with a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context observing an existing token.
    pub fn with_cancel_token(cancel: CancelToken) -> Self {
        Self {
            cancel,
            counters: Arc::default(),
        }
    }

    /// The cancellation token this context observes.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Request cancellation of the evaluation using this context.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fail with [`RasterError::Interrupted`] if cancellation was requested.
    pub fn check_interrupted(&self) -> RasterResult<()> {
        if self.cancel.is_cancelled() {
            Err(RasterError::Interrupted)
        } else {
            Ok(())
        }
    }

    pub(crate) fn record_tile(&self) {
        self.counters.tile_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_region(&self) {
        self.counters.region_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_copy(&self) {
        self.counters.copy_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_allocation(&self, pixels: u64) {
        self.counters.pixels_allocated.fetch_add(pixels, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn stats(&self) -> FetchStats {
        FetchStats {
            tile_requests: self.counters.tile_requests.load(Ordering::Relaxed),
            region_requests: self.counters.region_requests.load(Ordering::Relaxed),
            copy_requests: self.counters.copy_requests.load(Ordering::Relaxed),
            pixels_allocated: self.counters.pixels_allocated.load(Ordering::Relaxed),
        }
    }
}
