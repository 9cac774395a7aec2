use std::sync::atomic::{AtomicUsize, Ordering};

/// Observer notified as tasks start and finish. Implementations must be safe to call
/// from many workers at once.
pub trait ProgressTracker: Send + Sync {
    fn set_total(&self, _total: usize) {}

    fn on_task_start(&self) {}

    fn on_task_success(&self);

    fn on_task_failure(&self);
}

#[derive(Debug, Default)]
pub struct CountingTracker {
    total: AtomicUsize,
    started: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl CountingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(succeeded, failed, total)`.
    pub fn stats(&self) -> (usize, usize, usize) {
        (
            self.succeeded.load(Ordering::SeqCst),
            self.failed.load(Ordering::SeqCst),
            self.total.load(Ordering::SeqCst),
        )
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst) + self.failed.load(Ordering::SeqCst)
    }
}

impl ProgressTracker for CountingTracker {
    fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    fn on_task_start(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_task_success(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    fn on_task_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}
