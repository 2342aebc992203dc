// ── Core error types ──
//
// Probe errors never leave the discovery orchestrator; command errors never
// leave the executor.

use std::time::Duration;

use thiserror::Error;

use crate::command::Action;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("connection to {target} failed: {source}")]
    Connection {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {protocol} payload: {reason}")]
    Decode {
        protocol: &'static str,
        reason: String,
    },
}

impl ProbeError {
    pub(crate) fn connection(target: impl ToString, source: std::io::Error) -> Self {
        ProbeError::Connection {
            target: target.to_string(),
            source,
        }
    }

    pub(crate) fn decode(protocol: &'static str, reason: impl ToString) -> Self {
        ProbeError::Decode {
            protocol,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn from_http(target: impl ToString, after: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ProbeError::Timeout {
                operation: "http request",
                after,
            };
        }
        ProbeError::Connection {
            target: target.to_string(),
            source: std::io::Error::other(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command not understood: {phrase}")]
    CommandNotUnderstood { phrase: String },

    #[error("no device matches '{hint}'")]
    DeviceNotFound { hint: String },

    #[error("{device} does not support {action:?}")]
    UnsupportedAction { device: String, action: Action },

    #[error("control call to {device} failed: {source}")]
    Control {
        device: String,
        #[source]
        source: ProbeError,
    },
}
