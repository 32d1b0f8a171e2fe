//! Terminal iMessage client core.
//!
//! Mirrors a bounded roster of conversations from an external backend into a
//! shared chat registry, keeps it fresh with a background polling loop, and
//! resolves raw phone/email identifiers to display names through a vCard
//! contact directory.
//!
//! ## Backend bootstrap
//!
//! `imsg_tui` selects its backend explicitly at startup:
//!
//! - `IMSG_TUI_BACKEND=imsg` (default) shells out to the `imsg` CLI; set
//!   `IMSG_TUI_BIN` when the binary is not on `PATH`.
//! - `IMSG_TUI_BACKEND=mock` runs against a deterministic scripted backend
//!   for local development.
//!
//! Set `IMSG_TUI_VCF` to a vCard file to enable contact name resolution and
//! `IMSG_TUI_POLL_MS` to tune the poll interval.
//!
//! ## Concurrency contract
//!
//! One `Arc<Mutex<App>>` guards the whole registry. The input thread, the
//! polling loop, and the action worker pool all perform backend calls
//! without the lock and take it only to read or commit state; whichever
//! thread commits a mutation signals the render thread, which takes the same
//! lock to format a consistent snapshot.

use std::sync::{Mutex, MutexGuard};

pub mod app;
pub mod commands;
pub mod config;
pub mod contacts;
pub mod runtime;
pub mod sync;
pub mod tui;

/// Recovers the guard from a poisoned lock; registry state stays usable even
/// if a worker panicked mid-commit.
pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
