//! Deterministic mock implementation of the shared `chat_backend` contract.
//!
//! This crate contains no transport logic and is intended for local
//! development runs and contract-level integration testing. History is
//! scripted as per-chat batch queues: each `list_history` call pops the next
//! queued batch for that chat, so tests can stage overlapping poll responses
//! deliberately.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chat_backend::{ChatBackend, ChatId, ChatSummary, MessageRecord};

/// Stable backend identifier used for explicit startup selection.
pub const MOCK_BACKEND_ID: &str = "mock";

#[derive(Debug, Default)]
struct ScriptState {
    history: HashMap<ChatId, VecDeque<Vec<MessageRecord>>>,
    sent: Vec<(String, String)>,
    fail_queries: bool,
}

/// Scripted backend used by `imsg_tui` tests and local runs.
#[derive(Debug, Default)]
pub struct MockBackend {
    chats: Vec<ChatSummary>,
    state: Mutex<ScriptState>,
}

impl MockBackend {
    #[must_use]
    pub fn new(chats: Vec<ChatSummary>) -> Self {
        Self {
            chats,
            state: Mutex::new(ScriptState::default()),
        }
    }

    /// Creates a mock with a small demo roster for interactive runs.
    #[must_use]
    pub fn with_demo_roster() -> Self {
        let backend = Self::new(vec![
            summary(1, "+15551234567", Some("Mock Alice"), "iMessage"),
            summary(2, "bob@example.com", None, "iMessage"),
        ]);

        backend.queue_history(
            1,
            vec![
                record(3, "see you then", "2024-05-01T12:31:00Z", Some("+15551234567"), false),
                record(2, "lunch at noon?", "2024-05-01T12:30:00Z", None, true),
                record(1, "hello", "2024-05-01T12:29:00Z", Some("+15551234567"), false),
            ],
        );

        backend
    }

    /// Queues the batch returned by the next `list_history` call for `chat_id`.
    pub fn queue_history(&self, chat_id: ChatId, newest_first: Vec<MessageRecord>) {
        let mut state = self.lock_state();
        state
            .history
            .entry(chat_id)
            .or_default()
            .push_back(newest_first);
    }

    /// When set, every query returns an empty result set, mimicking a failed
    /// transport call. Sends are still recorded.
    pub fn set_fail_queries(&self, fail: bool) {
        self.lock_state().fail_queries = fail;
    }

    /// Returns `(to, text)` pairs for every dispatched send, in order.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.lock_state().sent.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, ScriptState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ChatBackend for MockBackend {
    fn list_chats(&self, limit: u32) -> Vec<ChatSummary> {
        if self.lock_state().fail_queries {
            return Vec::new();
        }

        self.chats.iter().take(limit as usize).cloned().collect()
    }

    fn list_history(&self, chat_id: ChatId, limit: u32) -> Vec<MessageRecord> {
        let mut state = self.lock_state();
        if state.fail_queries {
            return Vec::new();
        }

        let Some(batches) = state.history.get_mut(&chat_id) else {
            return Vec::new();
        };

        let Some(mut batch) = batches.pop_front() else {
            return Vec::new();
        };

        batch.truncate(limit as usize);
        batch
    }

    fn send_message(&self, to: &str, text: &str) {
        self.lock_state()
            .sent
            .push((to.to_string(), text.to_string()));
    }
}

/// Builds a `ChatSummary` literal for scripted rosters.
#[must_use]
pub fn summary(
    id: ChatId,
    identifier: &str,
    display_name: Option<&str>,
    service: &str,
) -> ChatSummary {
    ChatSummary {
        id,
        identifier: identifier.to_string(),
        display_name: display_name.map(str::to_string),
        service: service.to_string(),
    }
}

/// Builds a `MessageRecord` literal for scripted history batches.
#[must_use]
pub fn record(
    row_id: i64,
    text: &str,
    created_at: &str,
    sender: Option<&str>,
    is_from_me: bool,
) -> MessageRecord {
    MessageRecord {
        row_id,
        text: text.to_string(),
        created_at: created_at.to_string(),
        sender: sender.map(str::to_string),
        is_from_me,
    }
}
