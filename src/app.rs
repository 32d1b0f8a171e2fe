//! Shared chat registry: the single mutable structure behind the lock.
//!
//! `App` owns the session list, the roster cursor, and the active-session
//! index. Every method here assumes the caller holds the registry lock; the
//! sync engine and the runtime controller perform backend calls first and
//! only then commit results through these methods. Sessions checked out for
//! a fetch are copied as values (`poll_targets`), never held as live
//! references across the lock boundary.

use chat_backend::{ChatId, ChatSummary, MessageRecord, RowId};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::contacts::ContactDirectory;

/// Sentinel for history records whose `created_at` cannot be parsed. Such
/// records are kept rather than dropped with their batch.
pub const UNKNOWN_TIMESTAMP: &str = "unknown";

const SELF_SENDER: &str = "me";
const FALLBACK_NAME: &str = "?";

/// One rendered chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Backend row id, retained to enforce at-most-once merging.
    pub row_id: RowId,
    /// `HH:MM` wall-clock string, or [`UNKNOWN_TIMESTAMP`].
    pub timestamp: String,
    pub sender: String,
    pub text: String,
    pub is_from_me: bool,
}

impl Message {
    /// Converts a wire record into a displayable message, resolving the
    /// sender through the contact directory.
    ///
    /// Returns `None` for empty-text records; those never become visible,
    /// though their row ids still advance the session high-water mark.
    pub fn from_record(
        record: &MessageRecord,
        fallback_sender: &str,
        contacts: &ContactDirectory,
    ) -> Option<Self> {
        if record.text.is_empty() {
            return None;
        }

        let raw_sender = record
            .sender
            .as_deref()
            .filter(|sender| !sender.is_empty())
            .unwrap_or(fallback_sender);

        let sender = if record.is_from_me {
            SELF_SENDER.to_string()
        } else {
            contacts
                .resolve(raw_sender)
                .unwrap_or(raw_sender)
                .to_string()
        };

        Some(Self {
            row_id: record.row_id,
            timestamp: format_timestamp(&record.created_at),
            sender,
            text: record.text.clone(),
            is_from_me: record.is_from_me,
        })
    }
}

fn format_timestamp(created_at: &str) -> String {
    let clock = format_description!("[hour]:[minute]");
    OffsetDateTime::parse(created_at, &Rfc3339)
        .ok()
        .and_then(|parsed| parsed.format(&clock).ok())
        .unwrap_or_else(|| UNKNOWN_TIMESTAMP.to_string())
}

/// One conversation and its locally merged history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub id: ChatId,
    pub display_name: String,
    /// Raw routable handle; empty when the backend has none for this chat.
    pub identifier: String,
    pub service: String,
    /// Chronologically ascending by row id; each row id at most once.
    pub messages: Vec<Message>,
    /// Maximum row id ever merged, including empty-text records.
    pub high_water_mark: RowId,
    pub unread: u32,
}

impl ChatSession {
    /// Builds a fresh session from a roster summary. Display-name priority:
    /// contact directory, then backend-provided name, then raw identifier.
    pub fn from_summary(summary: &ChatSummary, contacts: &ContactDirectory) -> Self {
        let display_name = contacts
            .resolve(&summary.identifier)
            .map(str::to_string)
            .or_else(|| {
                summary
                    .display_name
                    .clone()
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or_else(|| {
                if summary.identifier.is_empty() {
                    FALLBACK_NAME.to_string()
                } else {
                    summary.identifier.clone()
                }
            });

        Self {
            id: summary.id,
            display_name,
            identifier: summary.identifier.clone(),
            service: summary.service.clone(),
            messages: Vec::new(),
            high_water_mark: 0,
            unread: 0,
        }
    }

    /// Inserts `message` keeping ascending row-id order; returns false when
    /// the row id is already present.
    fn merge_message(&mut self, message: Message) -> bool {
        let position = self
            .messages
            .partition_point(|existing| existing.row_id < message.row_id);

        if self
            .messages
            .get(position)
            .is_some_and(|existing| existing.row_id == message.row_id)
        {
            return false;
        }

        self.messages.insert(position, message);
        true
    }
}

/// The chat registry plus selection state. Exclusively owned by one
/// `Arc<Mutex<App>>`; see the module docs for the locking contract.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct App {
    pub sessions: Vec<ChatSession>,
    /// Session currently opened for viewing, distinct from the cursor.
    pub active: Option<usize>,
    /// Roster navigation cursor, clamped to `[0, N-1]`.
    pub cursor: usize,
    pub should_exit: bool,
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole roster with fresh sessions.
    ///
    /// Previously loaded history is discarded even for chats that survive
    /// the refresh; the next poll tick repopulates them. The cursor is
    /// clamped to the new list and an out-of-range active index is cleared.
    pub fn replace_roster(&mut self, sessions: Vec<ChatSession>) {
        self.sessions = sessions;
        self.cursor = self.cursor.min(self.sessions.len().saturating_sub(1));
        if self.active.is_some_and(|index| index >= self.sessions.len()) {
            self.active = None;
        }
    }

    /// Commits a full history batch (newest-first) for one session.
    ///
    /// Merges every record whose row id is not already present and advances
    /// the high-water mark past every row id in the batch, empty-text
    /// records included. A no-op when the session id is gone (superseded by
    /// a roster refresh mid-fetch).
    pub fn apply_history(
        &mut self,
        chat_id: ChatId,
        newest_first: &[MessageRecord],
        contacts: &ContactDirectory,
    ) {
        let Some(index) = self.position_by_id(chat_id) else {
            return;
        };

        let fallback_sender = self.sessions[index].display_name.clone();
        let session = &mut self.sessions[index];
        let mut mark = session.high_water_mark;

        for record in newest_first.iter().rev() {
            mark = mark.max(record.row_id);
            if let Some(message) = Message::from_record(record, &fallback_sender, contacts) {
                session.merge_message(message);
            }
        }

        session.high_water_mark = mark;
    }

    /// Commits one poll batch (newest-first) for one session and returns the
    /// number of newly appended visible messages.
    ///
    /// Only records with a row id strictly above the session's current
    /// high-water mark are considered; the mark advances over all of them,
    /// and `unread` grows by the appended count while the session is not
    /// active. A no-op when the session id is gone.
    pub fn apply_poll_batch(
        &mut self,
        chat_id: ChatId,
        newest_first: &[MessageRecord],
        contacts: &ContactDirectory,
    ) -> usize {
        let Some(index) = self.position_by_id(chat_id) else {
            return 0;
        };

        let fallback_sender = self.sessions[index].display_name.clone();
        let entry_mark = self.sessions[index].high_water_mark;
        let session = &mut self.sessions[index];
        let mut mark = entry_mark;
        let mut appended = 0usize;

        for record in newest_first.iter().rev() {
            if record.row_id <= entry_mark {
                continue;
            }

            mark = mark.max(record.row_id);
            if let Some(message) = Message::from_record(record, &fallback_sender, contacts) {
                if session.merge_message(message) {
                    appended += 1;
                }
            }
        }

        session.high_water_mark = mark;

        if appended > 0 && self.active != Some(index) {
            let session = &mut self.sessions[index];
            session.unread += appended as u32;
        }

        appended
    }

    /// Moves the roster cursor up, clamped at the first entry.
    pub fn select_previous(&mut self) {
        if !self.sessions.is_empty() {
            self.cursor = self.cursor.saturating_sub(1);
        }
    }

    /// Moves the roster cursor down, clamped at the last entry.
    pub fn select_next(&mut self) {
        if !self.sessions.is_empty() {
            self.cursor = (self.cursor + 1).min(self.sessions.len() - 1);
        }
    }

    /// Opens the session under the cursor: marks it active, resets its
    /// unread counter, and returns its id so the caller can start an
    /// asynchronous history load.
    pub fn open_selected(&mut self) -> Option<ChatId> {
        if self.cursor >= self.sessions.len() {
            return None;
        }

        self.active = Some(self.cursor);
        let session = &mut self.sessions[self.cursor];
        session.unread = 0;
        Some(session.id)
    }

    /// Closes the active session without touching the cursor.
    pub fn close_active(&mut self) {
        self.active = None;
    }

    #[must_use]
    pub fn active_session(&self) -> Option<&ChatSession> {
        self.active.and_then(|index| self.sessions.get(index))
    }

    /// Returns the routable identifier of the active session, or `None`
    /// when no session is open or the session has no handle.
    #[must_use]
    pub fn active_recipient(&self) -> Option<String> {
        self.active_session()
            .map(|session| session.identifier.clone())
            .filter(|identifier| !identifier.is_empty())
    }

    /// Returns a value snapshot of the known chat ids, taken under the lock
    /// so the poll sweep can fetch without holding it. Ids are the stable
    /// addresses; a session superseded by a refresh mid-sweep simply makes
    /// the later commit a no-op.
    #[must_use]
    pub fn poll_targets(&self) -> Vec<ChatId> {
        self.sessions.iter().map(|session| session.id).collect()
    }

    fn position_by_id(&self, chat_id: ChatId) -> Option<usize> {
        self.sessions.iter().position(|session| session.id == chat_id)
    }
}
