use std::sync::atomic::{AtomicUsize, Ordering};

use fanout_exec::executor::ProgressTracker;

/// Single-line progress display on stderr.
#[derive(Default)]
pub struct TerminalProgress {
    total: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    running: AtomicUsize,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn update_progress(&self) {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let running = self.running.load(Ordering::Relaxed);
        let total = self.total.load(Ordering::Relaxed);
        let done = succeeded + failed;
        let percent = if total > 0 { (done * 100) / total } else { 0 };
        eprint!(
            "\rProgress: [{}/{}] {}% (✓{} ✗{} →{})",
            done, total, percent, succeeded, failed, running
        );
        if done == total {
            eprintln!();
        }
    }

    fn finish_one(&self) {
        self.running
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)))
            .ok();
        self.update_progress();
    }
}

impl ProgressTracker for TerminalProgress {
    fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
    }

    fn on_task_start(&self) {
        self.running.fetch_add(1, Ordering::Relaxed);
        self.update_progress();
    }

    fn on_task_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.finish_one();
    }

    fn on_task_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.finish_one();
    }
}
