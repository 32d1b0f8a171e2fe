//! Session controller: user-initiated actions committed into the registry.
//!
//! Actions (roster refresh, history load, send) are dispatched over a channel
//! to a small fixed pool of worker threads rather than spawning one thread
//! per action; the pool caps concurrent backend fan-out and makes shutdown a
//! matter of dropping the channel and joining. Every worker performs its
//! backend call without the registry lock and only takes it to commit the
//! result, then signals a redraw.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use chat_backend::{ChatBackend, ChatId};

use crate::app::{App, ChatSession};
use crate::config::{HISTORY_LIMIT, ROSTER_LIMIT};
use crate::contacts::ContactDirectory;
use crate::lock_unpoisoned;

const ACTION_WORKERS: usize = 2;

/// Redraw sink shared by every thread that commits a state mutation.
pub trait Presenter: Send + Sync + 'static {
    fn request_redraw(&self);
}

/// Process-wide cancellation signal owned by the controller and handed to
/// every task and to the polling loop.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    running: Arc<AtomicBool>,
}

impl ShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    RefreshRoster,
    LoadHistory { chat_id: ChatId },
    Send { to: String, text: String },
}

pub struct RuntimeController {
    app: Arc<Mutex<App>>,
    backend: Arc<dyn ChatBackend>,
    contacts: Arc<ContactDirectory>,
    presenter: Arc<dyn Presenter>,
    shutdown: ShutdownSignal,
    actions: Mutex<Option<Sender<Action>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl RuntimeController {
    /// Creates the controller and starts its worker pool.
    pub fn spawn(
        app: Arc<Mutex<App>>,
        backend: Arc<dyn ChatBackend>,
        contacts: Arc<ContactDirectory>,
        presenter: Arc<dyn Presenter>,
        shutdown: ShutdownSignal,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel::<Action>();
        let receiver = Arc::new(Mutex::new(receiver));

        let controller = Arc::new(Self {
            app,
            backend,
            contacts,
            presenter,
            shutdown,
            actions: Mutex::new(Some(sender)),
            workers: Mutex::new(Vec::new()),
        });

        let mut workers = lock_unpoisoned(&controller.workers);
        for index in 0..ACTION_WORKERS {
            let worker = Arc::clone(&controller);
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("imsg-action-worker-{index}"))
                .spawn(move || worker.run_worker(&receiver));

            match handle {
                Ok(handle) => workers.push(handle),
                // A failed spawn leaves a smaller pool; actions still drain.
                Err(_) => continue,
            }
        }
        drop(workers);

        controller
    }

    fn run_worker(self: &Arc<Self>, receiver: &Arc<Mutex<Receiver<Action>>>) {
        loop {
            let action = {
                let receiver = lock_unpoisoned(receiver);
                receiver.recv()
            };

            let Ok(action) = action else {
                // Channel closed: controller is shutting down.
                return;
            };

            if !self.shutdown.is_running() {
                return;
            }

            self.perform(action);
        }
    }

    fn perform(&self, action: Action) {
        match action {
            Action::RefreshRoster => self.perform_refresh(),
            Action::LoadHistory { chat_id } => self.perform_history_load(chat_id),
            Action::Send { to, text } => self.backend.send_message(&to, &text),
        }
    }

    fn perform_refresh(&self) {
        let summaries = self.backend.list_chats(ROSTER_LIMIT);
        if summaries.is_empty() {
            // Failed or empty listing: keep whatever roster we already have.
            return;
        }

        let sessions: Vec<ChatSession> = summaries
            .iter()
            .map(|summary| ChatSession::from_summary(summary, &self.contacts))
            .collect();

        lock_unpoisoned(&self.app).replace_roster(sessions);
        self.presenter.request_redraw();
    }

    fn perform_history_load(&self, chat_id: ChatId) {
        let records = self.backend.list_history(chat_id, HISTORY_LIMIT);
        if records.is_empty() {
            return;
        }

        lock_unpoisoned(&self.app).apply_history(chat_id, &records, &self.contacts);
        self.presenter.request_redraw();
    }

    fn enqueue(&self, action: Action) {
        let actions = lock_unpoisoned(&self.actions);
        if let Some(sender) = actions.as_ref() {
            let _ = sender.send(action);
        }
    }

    /// Dispatches an asynchronous full roster reload.
    pub fn refresh_chats(&self) {
        self.enqueue(Action::RefreshRoster);
    }

    /// Opens the session under the cursor and starts its history load.
    pub fn open_selected(&self) {
        let chat_id = lock_unpoisoned(&self.app).open_selected();
        if let Some(chat_id) = chat_id {
            self.enqueue(Action::LoadHistory { chat_id });
        }

        self.presenter.request_redraw();
    }

    /// Closes the active session, leaving the cursor in place.
    pub fn close_active(&self) {
        lock_unpoisoned(&self.app).close_active();
        self.presenter.request_redraw();
    }

    pub fn select_previous(&self) {
        lock_unpoisoned(&self.app).select_previous();
        self.presenter.request_redraw();
    }

    pub fn select_next(&self) {
        lock_unpoisoned(&self.app).select_next();
        self.presenter.request_redraw();
    }

    /// Dispatches a fire-and-forget send to the active session.
    ///
    /// A no-op when the text is blank, no session is open, or the open
    /// session has no routable identifier. The outgoing text is not appended
    /// locally; it becomes visible once a poll tick observes it server-side.
    pub fn send_message(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let Some(to) = lock_unpoisoned(&self.app).active_recipient() else {
            return;
        };

        self.enqueue(Action::Send {
            to,
            text: text.to_string(),
        });
    }

    /// Marks the app as exiting and trips the shared shutdown signal.
    pub fn quit(&self) {
        lock_unpoisoned(&self.app).should_exit = true;
        self.shutdown.shutdown();
        self.presenter.request_redraw();
    }

    /// Closes the action channel and joins the worker pool. Latency is
    /// bounded by at most one in-flight backend call per worker.
    pub fn join(&self) {
        lock_unpoisoned(&self.actions).take();

        let workers = std::mem::take(&mut *lock_unpoisoned(&self.workers));
        for worker in workers {
            let _ = worker.join();
        }
    }
}
