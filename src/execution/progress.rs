//! Progress tracking for rendering.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A progress update event.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderProgress {
    /// Rendering has started.
    Started {
        total_tiles: usize,
    },
    /// A tile has been written to the output.
    TileCompleted {
        tile_x: i32,
        tile_y: i32,
        index: usize,
        total: usize,
    },
    /// Overall progress percentage.
    Progress {
        percent: f32,
        elapsed_ms: u64,
        estimated_remaining_ms: Option<u64>,
    },
    /// Rendering has completed.
    Completed {
        total_duration_ms: u64,
        tiles_rendered: usize,
    },
    /// Rendering was interrupted.
    Cancelled,
    /// A tile failed.
    Error {
        tile: Option<(i32, i32)>,
        message: String,
    },
}

/// Callback type for progress updates.
pub type ProgressCallback = Arc<dyn Fn(RenderProgress) + Send + Sync>;

/// Counts finished tiles and forwards events to an optional callback.
///
/// Shared by reference across render worker threads.
pub struct ProgressTracker {
    total_tiles: usize,
    completed_tiles: AtomicU64,
    start_time: Instant,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    /// Create a new progress tracker and report `Started`.
    pub fn start(total_tiles: usize, callback: Option<ProgressCallback>) -> Self {
        let tracker = Self {
            total_tiles,
            completed_tiles: AtomicU64::new(0),
            start_time: Instant::now(),
            callback,
        };
        tracker.send_update(RenderProgress::Started { total_tiles });
        tracker
    }

    /// Report that a tile has been written.
    pub fn tile_completed(&self, tile_x: i32, tile_y: i32) {
        let index = self.completed_tiles.fetch_add(1, Ordering::Relaxed) as usize + 1;
        self.send_update(RenderProgress::TileCompleted {
            tile_x,
            tile_y,
            index,
            total: self.total_tiles,
        });
        self.send_update(RenderProgress::Progress {
            percent: self.progress_percent(),
            elapsed_ms: self.elapsed_ms(),
            estimated_remaining_ms: self.estimated_remaining_ms(),
        });
    }

    /// Report an interruption.
    pub fn cancelled(&self) {
        self.send_update(RenderProgress::Cancelled);
    }

    /// Report a failed tile.
    pub fn report_error(&self, tile: Option<(i32, i32)>, message: String) {
        self.send_update(RenderProgress::Error { tile, message });
    }

    /// Report completion.
    pub fn complete(&self) {
        self.send_update(RenderProgress::Completed {
            total_duration_ms: self.elapsed_ms(),
            tiles_rendered: self.completed(),
        });
    }

    /// Number of tiles written so far.
    pub fn completed(&self) -> usize {
        self.completed_tiles.load(Ordering::Relaxed) as usize
    }

    /// Get current progress percentage.
    pub fn progress_percent(&self) -> f32 {
        if self.total_tiles == 0 {
            return 100.0;
        }
        (self.completed() as f32 / self.total_tiles as f32) * 100.0
    }

    /// Estimate remaining time in milliseconds from the mean tile time.
    pub fn estimated_remaining_ms(&self) -> Option<u64> {
        let completed = self.completed() as u64;
        if completed == 0 {
            return None;
        }
        let remaining = (self.total_tiles as u64).saturating_sub(completed);
        Some(self.elapsed_ms() / completed * remaining)
    }

    fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    fn send_update(&self, update: RenderProgress) {
        if let Some(ref callback) = self.callback {
            callback(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_progress_calculation() {
        let tracker = ProgressTracker::start(4, None);
        assert_eq!(tracker.progress_percent(), 0.0);
        assert!(tracker.estimated_remaining_ms().is_none());

        tracker.tile_completed(0, 0);
        tracker.tile_completed(1, 0);
        assert_eq!(tracker.progress_percent(), 50.0);
        assert!(tracker.estimated_remaining_ms().is_some());
    }

    #[test]
    fn test_empty_render_is_complete() {
        let tracker = ProgressTracker::start(0, None);
        assert_eq!(tracker.progress_percent(), 100.0);
    }

    #[test]
    fn test_callback_sequence() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Arc::new(move |e| sink.lock().push(e));

        let tracker = ProgressTracker::start(1, Some(callback));
        tracker.tile_completed(3, 4);
        tracker.complete();

        let events = events.lock();
        assert_eq!(events[0], RenderProgress::Started { total_tiles: 1 });
        assert_eq!(
            events[1],
            RenderProgress::TileCompleted {
                tile_x: 3,
                tile_y: 4,
                index: 1,
                total: 1
            }
        );
        assert!(matches!(events[2], RenderProgress::Progress { .. }));
        assert!(matches!(
            events[3],
            RenderProgress::Completed { tiles_rendered: 1, .. }
        ));
    }
}
