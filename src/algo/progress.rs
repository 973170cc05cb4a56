//! Progress callbacks for reductions.
//!
//! A [`Progress`] wraps a closure receiving `(done, total, message)`. The
//! simplifier reports removed triangles against the number it intends to
//! remove. Callers chaining several reductions can hand each one a
//! [`Stage`] so the closure sees one continuous range.
//!
//! # Example
//!
//! ```
//! use skinlod::algo::progress::Progress;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let last = Arc::new(AtomicUsize::new(0));
//! let sink = Arc::clone(&last);
//! let progress = Progress::new(move |done, _total, _message| sink.store(done, Ordering::Relaxed));
//!
//! // Second of four LODs, half way through.
//! progress.stage(1, 4).report(50, 100, "LOD 1");
//! assert_eq!(last.load(Ordering::Relaxed), 1500);
//! ```

type Callback = dyn Fn(usize, usize, &str) + Send + Sync;

/// Resolution of one stage in [`Stage::report`].
const STAGE_STEPS: usize = 1000;

/// Receives `(done, total, message)` updates.
pub struct Progress {
    callback: Box<Callback>,
}

impl Progress {
    /// Wrap `callback`.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Discards every update.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }

    /// Forward an update.
    #[inline]
    pub fn report(&self, done: usize, total: usize, message: &str) {
        (self.callback)(done, total, message);
    }

    /// Stage `index` of `count` equal stages.
    pub fn stage(&self, index: usize, count: usize) -> Stage<'_> {
        Stage {
            progress: self,
            index,
            count,
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

/// One slice of a [`Progress`] range.
///
/// Updates are rescaled to `STAGE_STEPS` steps per stage, so stage `i` of `n`
/// reports values in `[i * 1000, (i + 1) * 1000]` out of `n * 1000`.
#[derive(Debug, Clone, Copy)]
pub struct Stage<'a> {
    progress: &'a Progress,
    index: usize,
    count: usize,
}

impl Stage<'_> {
    /// Forward an update within this stage. Dropped when either total is
    /// zero.
    pub fn report(&self, done: usize, total: usize, message: &str) {
        if total == 0 || self.count == 0 {
            return;
        }
        let within = done.min(total) * STAGE_STEPS / total;
        self.progress.report(
            self.index * STAGE_STEPS + within,
            self.count * STAGE_STEPS,
            message,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Progress, Arc<Mutex<Vec<(usize, usize)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |done, total, _| sink.lock().unwrap().push((done, total)));
        (progress, seen)
    }

    #[test]
    fn test_stage_rescales() {
        let (progress, seen) = recorder();

        progress.stage(1, 4).report(5, 10, "lod 1");
        progress.stage(3, 4).report(20, 10, "overshoot");
        progress.stage(0, 4).report(1, 0, "no total");
        progress.report(2, 4, "plain");

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1500, 4000), (4000, 4000), (2, 4)]
        );
    }

    #[test]
    fn test_none_and_debug() {
        let progress = Progress::default();
        progress.report(1, 1, "discarded");
        progress.stage(0, 1).report(1, 1, "discarded");
        assert_eq!(format!("{:?}", progress), "Progress { .. }");
    }
}
