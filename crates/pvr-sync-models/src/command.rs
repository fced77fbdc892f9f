use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-side state of an asynchronous command, observed by polling.
/// Anything outside the known set parses to `Other` and is treated by the
/// poller as a protocol violation, never as a pending state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommandState {
    Queued,
    Started,
    Completed,
    Failed,
    Other(String),
}

impl CommandState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "queued" => CommandState::Queued,
            "started" => CommandState::Started,
            "completed" => CommandState::Completed,
            "failed" => CommandState::Failed,
            other => CommandState::Other(other.to_string()),
        }
    }

    /// Still waiting on the server; keep polling.
    pub fn is_pending(&self) -> bool {
        matches!(self, CommandState::Queued | CommandState::Started)
    }
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandState::Queued => f.write_str("queued"),
            CommandState::Started => f.write_str("started"),
            CommandState::Completed => f.write_str("completed"),
            CommandState::Failed => f.write_str("failed"),
            CommandState::Other(s) => f.write_str(s),
        }
    }
}
