//! `chat_backend` transport over the `imsg` command-line tool.
//!
//! Every query spawns one short-lived `imsg` process with `--json` output and
//! decodes its stdout as newline-delimited JSON records. Calls are bounded by
//! a fixed timeout; a child that outlives it is killed and reaped.
//!
//! Failures (spawn error, timeout, non-zero exit, any malformed line) are
//! collapsed to an empty result set at the trait boundary, per the
//! `chat_backend` failure contract. The error enum below exists for the
//! internal fallible path and for tests; it never crosses the trait.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use wait_timeout::ChildExt;

use chat_backend::{ChatBackend, ChatId, ChatSummary, MessageRecord};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum CliCallError {
    #[error("failed to launch {binary}: {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary} timed out after {timeout_sec}s")]
    Timeout { binary: String, timeout_sec: u64 },

    #[error("failed waiting for {binary}: {source}")]
    Wait {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary} exited with status {status}")]
    NonZeroExit { binary: String, status: String },

    #[error("failed to parse JSON line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Transport configuration plus the `ChatBackend` implementation.
#[derive(Debug, Clone)]
pub struct ImsgCli {
    binary: PathBuf,
    timeout: Duration,
}

impl ImsgCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn binary_label(&self) -> String {
        self.binary.display().to_string()
    }

    /// Runs one `imsg` invocation and returns its raw stdout bytes.
    ///
    /// Stdout is drained on a helper thread while waiting, so a child whose
    /// output exceeds the OS pipe buffer cannot block on write and run into
    /// the timeout.
    fn invoke(&self, args: &[&str]) -> Result<Vec<u8>, CliCallError> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| CliCallError::Launch {
                binary: self.binary_label(),
                source,
            })?;

        let reader = child.stdout.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut bytes = Vec::new();
                let _ = pipe.read_to_end(&mut bytes);
                bytes
            })
        });

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                join_reader(reader);
                return Err(CliCallError::Timeout {
                    binary: self.binary_label(),
                    timeout_sec: self.timeout.as_secs(),
                });
            }
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                join_reader(reader);
                return Err(CliCallError::Wait {
                    binary: self.binary_label(),
                    source,
                });
            }
        };

        let stdout = join_reader(reader);

        if !status.success() {
            return Err(CliCallError::NonZeroExit {
                binary: self.binary_label(),
                status: match status.code() {
                    Some(code) => format!("exit_code={code}"),
                    None => "terminated_by_signal".to_string(),
                },
            });
        }

        Ok(stdout)
    }

    fn query<T: DeserializeOwned>(&self, args: &[&str]) -> Result<Vec<T>, CliCallError> {
        let stdout = self.invoke(args)?;
        decode_json_lines(&stdout)
    }
}

impl ChatBackend for ImsgCli {
    fn list_chats(&self, limit: u32) -> Vec<ChatSummary> {
        let limit = limit.to_string();
        self.query(&["chats", "--limit", &limit, "--json"])
            .unwrap_or_default()
    }

    fn list_history(&self, chat_id: ChatId, limit: u32) -> Vec<MessageRecord> {
        let chat_id = chat_id.to_string();
        let limit = limit.to_string();
        self.query(&["history", "--chat-id", &chat_id, "--limit", &limit, "--json"])
            .unwrap_or_default()
    }

    fn send_message(&self, to: &str, text: &str) {
        let _ = self.invoke(&["send", "--to", to, "--text", text]);
    }
}

/// Decodes newline-delimited JSON. One malformed line fails the whole
/// payload; the caller degrades it to an empty result set.
fn decode_json_lines<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>, CliCallError> {
    let text = String::from_utf8_lossy(bytes);
    let mut records = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let record = serde_json::from_str(line).map_err(|source| CliCallError::Parse {
            line: index + 1,
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Joins the stdout reader thread. The pipe closes once the child has exited
/// or been killed, so the join is bounded.
fn join_reader(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
