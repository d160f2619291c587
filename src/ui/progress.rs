//! Progress indicators for apply runs
//!
//! Uses `linya` for allocation-free, concurrency-optimized progress bars.
//! One bar per release level; repositories within the level tick the bar
//! from worker threads.

use linya::{Bar, Progress};
use std::sync::{Arc, Mutex};

/// Thread-safe progress display for per-level fan-out
#[derive(Clone)]
pub struct LevelProgress {
  progress: Arc<Mutex<Progress>>,
}

impl LevelProgress {
  pub fn new() -> Self {
    Self {
      progress: Arc::new(Mutex::new(Progress::new())),
    }
  }

  /// Add a bar for one release level
  pub fn start_level(&self, index: usize, total: usize) -> Bar {
    let mut progress = self.progress.lock().unwrap();
    progress.bar(total, format!("level {}", index))
  }

  /// Tick a bar from any worker thread
  pub fn inc(&self, bar: &Bar) {
    let mut progress = self.progress.lock().unwrap();
    progress.inc_and_draw(bar, 1);
  }
}

impl Default for LevelProgress {
  fn default() -> Self {
    Self::new()
  }
}
