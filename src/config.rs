//! Environment configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chat_backend_mock::MOCK_BACKEND_ID;

/// Roster size requested on refresh.
pub const ROSTER_LIMIT: u32 = 7;
/// Batch size for a full history load when a session is opened.
pub const HISTORY_LIMIT: u32 = 10;
/// Batch size for one per-session poll fetch.
pub const POLL_LIMIT: u32 = 2;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Backend selection, mirroring explicit startup selection via
/// `IMSG_TUI_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The real `imsg` CLI transport.
    Imsg,
    /// Deterministic scripted backend for local runs.
    Mock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend: BackendKind,
    /// Path to the `imsg` binary.
    pub imsg_bin: PathBuf,
    /// Optional vCard file for contact name resolution.
    pub vcf_path: Option<PathBuf>,
    pub poll_interval: Duration,
    pub call_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Imsg,
            imsg_bin: PathBuf::from("imsg"),
            vcf_path: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            backend: match env_string_opt("IMSG_TUI_BACKEND").as_deref() {
                Some(MOCK_BACKEND_ID) => BackendKind::Mock,
                _ => BackendKind::Imsg,
            },
            imsg_bin: env_string_opt("IMSG_TUI_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.imsg_bin),
            vcf_path: env_string_opt("IMSG_TUI_VCF").map(PathBuf::from),
            poll_interval: env_duration_ms("IMSG_TUI_POLL_MS").unwrap_or(defaults.poll_interval),
            call_timeout: defaults.call_timeout,
        }
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_duration_ms(key: &str) -> Option<Duration> {
    env_string_opt(key)
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis)
}
