use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use imsg_tui::runtime::Presenter;

/// Presenter spy counting redraw requests from committing threads.
#[derive(Debug, Default)]
pub struct CountingPresenter {
    redraws: AtomicUsize,
}

impl CountingPresenter {
    pub fn redraws(&self) -> usize {
        self.redraws.load(Ordering::SeqCst)
    }
}

impl Presenter for CountingPresenter {
    fn request_redraw(&self) {
        self.redraws.fetch_add(1, Ordering::SeqCst);
    }
}

/// Polls `predicate` until it holds or `timeout` elapses; returns the final
/// predicate value so callers can assert on it.
pub fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }

        thread::sleep(Duration::from_millis(10));
    }

    predicate()
}
