//! Coarse progress reporting.

use std::cell::Cell;

/// Callback receiving `(percent, message)` at pipeline milestones.
pub type ProgressFn<'a> = &'a (dyn Fn(u8, &str) + Sync);

/// Monotonic wrapper around an optional progress callback.
///
/// Percentages are clamped to `0..=100` and never decrease. Reporting has no
/// effect on the computation.
pub struct Progress<'a> {
    callback: Option<ProgressFn<'a>>,
    last: Cell<u8>,
}

impl<'a> Progress<'a> {
    /// Wrap `callback`; `None` discards every report.
    #[must_use]
    pub fn new(callback: Option<ProgressFn<'a>>) -> Self {
        Self {
            callback,
            last: Cell::new(0),
        }
    }

    /// A reporter that discards everything.
    #[must_use]
    pub fn silent() -> Self {
        Self::new(None)
    }

    /// Report a milestone.
    pub fn report(&self, percent: u8, message: &str) {
        let percent = percent.min(100).max(self.last.get());
        self.last.set(percent);
        if let Some(cb) = self.callback {
            cb(percent, message);
        }
    }

    /// Report a step within the `from..to` band, `done` of `total`.
    pub fn report_within(&self, from: u8, to: u8, done: usize, total: usize, message: &str) {
        let span = usize::from(to.saturating_sub(from));
        let offset = if total == 0 { span } else { span * done.min(total) / total };
        #[allow(clippy::cast_possible_truncation)]
        let percent = from.saturating_add(offset as u8);
        self.report(percent, message);
    }

    /// Report completion (always 100).
    pub fn finish(&self, message: &str) {
        self.report(100, message);
    }

    /// Last percentage reported.
    #[must_use]
    pub fn last(&self) -> u8 {
        self.last.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reports_are_monotonic_and_clamped() {
        let seen = Mutex::new(Vec::new());
        let cb = |p: u8, _: &str| seen.lock().unwrap().push(p);
        let progress = Progress::new(Some(&cb));
        progress.report(10, "a");
        progress.report(5, "b");
        progress.report(250, "c");
        progress.finish("done");
        assert_eq!(*seen.lock().unwrap(), vec![10, 10, 100, 100]);
    }

    #[test]
    fn report_within_interpolates_band() {
        let seen = Mutex::new(Vec::new());
        let cb = |p: u8, _: &str| seen.lock().unwrap().push(p);
        let progress = Progress::new(Some(&cb));
        for done in 1..=4 {
            progress.report_within(20, 60, done, 4, "step");
        }
        assert_eq!(*seen.lock().unwrap(), vec![30, 40, 50, 60]);
    }

    #[test]
    fn silent_progress_still_tracks_last() {
        let progress = Progress::silent();
        progress.report(42, "x");
        assert_eq!(progress.last(), 42);
    }
}
