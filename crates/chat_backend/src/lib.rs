//! Minimal transport-agnostic contract for a conversational message backend.
//!
//! This crate intentionally defines only the wire record shapes and the query
//! surface the client core depends on. It excludes transport details (process
//! invocation, timeouts) and all registry/merge semantics.
//!
//! Failure contract: implementations never surface transport errors. A call
//! that times out, exits non-zero, or produces a malformed payload yields an
//! empty result set, and the caller proceeds with whatever state it already
//! had. The next scheduled poll or user action retries naturally.

use serde::Deserialize;

/// Opaque backend conversation identifier.
pub type ChatId = i64;

/// Backend message row identifier; strictly increasing per conversation.
pub type RowId = i64;

/// One conversation as returned by a roster listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatSummary {
    #[serde(default)]
    pub id: ChatId,
    /// Raw routable handle (phone number or email address).
    #[serde(default)]
    pub identifier: String,
    /// Backend-provided display name, when the backend knows one.
    #[serde(default, rename = "name")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub service: String,
}

/// One message as returned by a history listing (newest-first order).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageRecord {
    #[serde(default, rename = "id")]
    pub row_id: RowId,
    /// May be empty for non-text rows (attachments, reactions); empty-text
    /// records still advance the caller's high-water mark.
    #[serde(default)]
    pub text: String,
    /// RFC 3339 timestamp string; may be absent or malformed.
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub is_from_me: bool,
}

/// Query surface for a conversational backend.
///
/// All methods are synchronous bounded-duration calls made from worker and
/// polling threads, never while holding the registry lock.
pub trait ChatBackend: Send + Sync + 'static {
    /// Returns up to `limit` conversations, or empty on any failure.
    fn list_chats(&self, limit: u32) -> Vec<ChatSummary>;

    /// Returns up to `limit` of the most recent messages for `chat_id` in
    /// newest-first order, or empty on any failure.
    fn list_history(&self, chat_id: ChatId, limit: u32) -> Vec<MessageRecord>;

    /// Dispatches an outgoing message to `to`. Fire-and-forget: neither
    /// success nor failure is surfaced to the caller.
    fn send_message(&self, to: &str, text: &str);
}
