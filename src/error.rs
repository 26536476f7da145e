use std::fmt;

use thiserror::Error;

/// Which way bytes were meant to flow when a stream could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// The primary error type for all operations in the `filesave_bridge` crate.
///
/// A user cancelling the picker is *not* an error and has no variant here;
/// it is reported as [`crate::transfer::TransferOutcome::Cancelled`].
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The picker reported success but handed back no usable reference.
    #[error("no reference returned")]
    InvalidHandle,

    /// A required request field was absent (e.g. no data on save).
    #[error("no {0} provided")]
    MissingInput(&'static str),

    /// The OS refused to grant a byte stream for the handle.
    #[error("could not open {direction} stream")]
    StreamUnavailable {
        direction: Direction,
        #[source]
        source: Option<std::io::Error>,
    },

    /// An I/O error during the read or write itself. `context` names the
    /// step for logs; the boundary reason carries only the OS message.
    #[error("{source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The transport text was not valid base64.
    #[error("invalid base64 data: {0}")]
    Decode(#[from] base64::DecodeError),

    /// A file grew past the caller-imposed read limit.
    #[error("file exceeds {limit} byte limit")]
    TooLarge { limit: u64 },

    /// A picker result arrived for a token that is not pending.
    #[error("no pending operation for token {0}")]
    UnknownToken(u64),

    /// A store implementation panicked while moving bytes.
    #[error("store panicked: {0}")]
    Panicked(String),

    /// Bad configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    pub fn io(context: &'static str, source: std::io::Error) -> Self {
        BridgeError::Io { context, source }
    }

    pub fn stream_unavailable(direction: Direction, source: Option<std::io::Error>) -> Self {
        BridgeError::StreamUnavailable { direction, source }
    }

    /// Human-readable rejection reason for the boundary, given which
    /// workflow failed. Handle, input and stream errors are reported
    /// verbatim; everything raised while moving bytes is prefixed.
    pub fn reason(&self, direction: Direction) -> String {
        match self {
            BridgeError::InvalidHandle
            | BridgeError::MissingInput(_)
            | BridgeError::StreamUnavailable { .. }
            | BridgeError::UnknownToken(_)
            | BridgeError::Config(_) => self.to_string(),
            other => match direction {
                Direction::Output => format!("failed to write file: {}", other),
                Direction::Input => format!("failed to read file: {}", other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn reasons_match_boundary_table() {
        assert_eq!(BridgeError::InvalidHandle.reason(Direction::Output), "no reference returned");
        assert_eq!(BridgeError::MissingInput("data").reason(Direction::Output), "no data provided");
        assert_eq!(
            BridgeError::stream_unavailable(Direction::Output, None).reason(Direction::Output),
            "could not open output stream"
        );
        assert_eq!(
            BridgeError::stream_unavailable(Direction::Input, None).reason(Direction::Input),
            "could not open input stream"
        );
    }

    #[test]
    fn byte_errors_are_prefixed_by_workflow() {
        let err = BridgeError::io("write", io::Error::new(io::ErrorKind::Other, "disk full"));
        assert_eq!(err.reason(Direction::Output), "failed to write file: disk full");

        let err = BridgeError::TooLarge { limit: 10 };
        assert_eq!(err.reason(Direction::Input), "failed to read file: file exceeds 10 byte limit");
    }
}
