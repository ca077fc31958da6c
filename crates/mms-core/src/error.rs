//! Top-level error taxonomy, aggregating the leaf
//! errors each subsystem produces into one enum callers can match on.

use std::path::PathBuf;

use thiserror::Error;

/// Recoverable vs. terminal is a property of the call site, not the
/// variant: a task decides whether a given [`Error`] drives a retry or
/// ends the task.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed push or MMS PDU: {0}")]
    Decode(#[from] mms_codec::DecodeError),
    #[error("could not produce a valid PDU: {0}")]
    Encode(#[from] mms_codec::EncodeError),
    #[error("encoded PDU of {actual} bytes exceeds the {limit}-byte size limit")]
    SizeLimit { actual: u64, limit: u64 },
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status} from MMSC")]
    PermanentHttp { status: u16 },
    #[error("MMSC refused the request: {details}")]
    Refused { details: String },
    #[error("task deadline or PDU expiry reached before success")]
    Expired,
    #[error("no SIM available for this request")]
    NoSim,
    #[error("handler rejected the operation: {0}")]
    Handler(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should drive a task retry rather than end it:
    /// recoverable errors stay inside a task and drive retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
