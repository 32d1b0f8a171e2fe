//! Background sync engine: one long-lived polling loop.
//!
//! Every interval the loop snapshots the known chat ids under the registry
//! lock, then fetches a small history batch per session without the lock and
//! commits each merge independently, so partial progress becomes visible as
//! it lands rather than at the end of a full sweep. The shutdown signal is
//! checked at the top of each sleep interval and between per-session
//! fetches, bounding shutdown latency by roughly one backend-call timeout.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chat_backend::ChatBackend;

use crate::app::App;
use crate::config::POLL_LIMIT;
use crate::contacts::ContactDirectory;
use crate::lock_unpoisoned;
use crate::runtime::{Presenter, ShutdownSignal};

const SLEEP_SLICE: Duration = Duration::from_millis(50);

pub struct SyncEngine {
    app: Arc<Mutex<App>>,
    backend: Arc<dyn ChatBackend>,
    contacts: Arc<ContactDirectory>,
    presenter: Arc<dyn Presenter>,
    shutdown: ShutdownSignal,
    interval: Duration,
}

impl SyncEngine {
    pub fn new(
        app: Arc<Mutex<App>>,
        backend: Arc<dyn ChatBackend>,
        contacts: Arc<ContactDirectory>,
        presenter: Arc<dyn Presenter>,
        shutdown: ShutdownSignal,
        interval: Duration,
    ) -> Self {
        Self {
            app,
            backend,
            contacts,
            presenter,
            shutdown,
            interval,
        }
    }

    /// Starts the polling thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("imsg-poll-loop".to_string())
            .spawn(move || self.run())
    }

    fn run(self) {
        while self.shutdown.is_running() {
            self.sleep_interval();
            if !self.shutdown.is_running() {
                return;
            }

            self.tick();
        }
    }

    /// One poll sweep over a stable snapshot of the session list.
    fn tick(&self) {
        let chat_ids = lock_unpoisoned(&self.app).poll_targets();

        for chat_id in chat_ids {
            if !self.shutdown.is_running() {
                return;
            }

            let records = self.backend.list_history(chat_id, POLL_LIMIT);
            if records.is_empty() {
                continue;
            }

            let appended =
                lock_unpoisoned(&self.app).apply_poll_batch(chat_id, &records, &self.contacts);
            if appended > 0 {
                self.presenter.request_redraw();
            }
        }
    }

    /// Sleeps for one poll interval in short slices, re-checking the
    /// shutdown signal between slices.
    fn sleep_interval(&self) {
        let deadline = Instant::now() + self.interval;
        while self.shutdown.is_running() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }

            thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}
