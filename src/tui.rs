//! Thin line-oriented presentation boundary.
//!
//! Rendering holds the registry lock only long enough to format a consistent
//! snapshot; `draw` itself is a pure function over `&App` so layouts are
//! testable as plain strings. Redraw requests from committing threads are
//! forwarded over a channel to one render thread and coalesced there.

use std::io::Write;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::app::App;
use crate::lock_unpoisoned;
use crate::runtime::Presenter;

/// Number of trailing messages shown for the active session.
const TRANSCRIPT_TAIL: usize = 20;

/// Formats one consistent registry snapshot.
#[must_use]
pub fn draw(app: &App) -> String {
    let mut out = String::new();

    match app.active_session() {
        Some(session) => {
            out.push_str(&format!("== {} | {} ==\n", session.service, session.display_name));
        }
        None => {
            out.push_str(&format!(
                "== iMessage | {} chats | /help for commands ==\n",
                app.sessions.len()
            ));
        }
    }

    out.push_str("CHATS\n");
    for (index, session) in app.sessions.iter().enumerate() {
        let cursor = if index == app.cursor { '>' } else { ' ' };
        let badge = if session.unread > 0 {
            format!(" ({})", session.unread)
        } else {
            String::new()
        };
        let active = if app.active == Some(index) { " <" } else { "" };
        out.push_str(&format!("{cursor} {}{badge}{active}\n", session.display_name));
    }

    if let Some(session) = app.active_session() {
        out.push('\n');
        let tail_start = session.messages.len().saturating_sub(TRANSCRIPT_TAIL);
        for message in &session.messages[tail_start..] {
            out.push_str(&format!(
                "{} {}: {}\n",
                message.timestamp, message.sender, message.text
            ));
        }
        out.push_str("imsg> ");
    } else {
        out.push_str("> ");
    }

    out
}

/// `Presenter` that forwards redraw requests to the render thread.
pub struct ChannelPresenter {
    sender: Mutex<Sender<()>>,
}

impl ChannelPresenter {
    #[must_use]
    pub fn new(sender: Sender<()>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

impl Presenter for ChannelPresenter {
    fn request_redraw(&self) {
        let _ = lock_unpoisoned(&self.sender).send(());
    }
}

/// Spawns the render thread. It exits when every presenter handle is dropped
/// or the app is marked as exiting.
pub fn spawn_render_thread(
    app: Arc<Mutex<App>>,
    requests: Receiver<()>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("imsg-render".to_string())
        .spawn(move || {
            while requests.recv().is_ok() {
                // Coalesce queued requests into one frame.
                while requests.try_recv().is_ok() {}

                let frame = {
                    let app = lock_unpoisoned(&app);
                    if app.should_exit {
                        return;
                    }
                    draw(&app)
                };

                let mut stdout = std::io::stdout();
                let _ = stdout.write_all(frame.as_bytes());
                let _ = stdout.flush();
            }
        })
}
