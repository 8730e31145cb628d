//! Errors raised by the wifi and tcp extensions

use wisp_sdk::NativeError;

/// Result type used by the extension operations
pub type NetResult<T> = Result<T, NetError>;

/// Synchronous failures of an extension call.
///
/// Terminal network outcomes (wrong password, unknown host, remote closed)
/// are not errors: they are returned to scripts as plain values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetError {
    /// The stack is not configured as a station
    #[error("WIFI not in Station mode.")]
    ModeInvalid,

    /// A connect or receive wait is already outstanding
    #[error("Another thread is currently executing WIFI commands.")]
    ThreadWaiting,

    /// The stack refused to scan while joining a network
    #[error("Currently connecting to network.")]
    Connecting,

    /// The stack ran out of memory internally
    #[error("ESP ran out of memory Internally.")]
    StackNoMemory,

    /// SSID length limit exceeded
    #[error("Too long ssid, max: {max} chars.")]
    SsidTooLong {
        /// Longest accepted SSID
        max: usize,
    },

    /// Password length limit exceeded
    #[error("Too long password, max: {max} chars.")]
    PasswordTooLong {
        /// Longest accepted password
        max: usize,
    },

    /// Argument value outside the accepted range
    #[error("{0}")]
    InvalidArgument(&'static str),

    /// `tcp-recv` asked for more than the receive limit
    #[error("Too large max-len, max: {max} bytes.")]
    RecvTooLarge {
        /// Largest accepted receive length
        max: usize,
    },

    /// Socket registry is full
    #[error("Too many sockets open.")]
    TooManySockets,

    /// The stack reported a failure with no better description
    #[error("network stack error: {0}")]
    Stack(String),

    /// Wrong number of arguments
    #[error("expected {expected} arguments, got {got}")]
    ArgumentCount {
        /// Accepted argument count
        expected: &'static str,
        /// Number passed
        got: usize,
    },

    /// Argument of the wrong type
    #[error("argument {index}: expected {expected}, got {got}")]
    ArgumentType {
        /// Zero-based argument index
        index: usize,
        /// Expected type
        expected: &'static str,
        /// Actual type
        got: &'static str,
    },

    /// The runtime heap could not hold the result
    #[error("out of memory")]
    OutOfMemory,

    /// Impossible state (stack not started, malformed runtime value)
    #[error("{0}")]
    Fatal(String),
}

impl From<NetError> for NativeError {
    fn from(err: NetError) -> Self {
        match err {
            NetError::ArgumentCount { expected, got } => NativeError::ArgumentCount {
                expected: expected.to_string(),
                got,
            },
            NetError::ArgumentType { expected, got, .. } => {
                NativeError::type_mismatch(expected, got)
            }
            NetError::OutOfMemory => NativeError::MemoryError,
            NetError::StackNoMemory => NativeError::Fatal(err.to_string()),
            NetError::Fatal(reason) => NativeError::Fatal(reason),
            other => NativeError::EvalError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_errors_become_eval_errors() {
        let err: NativeError = NetError::ModeInvalid.into();
        assert_eq!(err, NativeError::EvalError("WIFI not in Station mode.".into()));

        let err: NativeError = NetError::SsidTooLong { max: 31 }.into();
        assert_eq!(err, NativeError::EvalError("Too long ssid, max: 31 chars.".into()));
    }

    #[test]
    fn test_type_and_memory_errors_keep_their_kind() {
        let err: NativeError = NetError::ArgumentType {
            index: 0,
            expected: "number",
            got: "string",
        }
        .into();
        assert!(matches!(err, NativeError::TypeMismatch { .. }));

        let err: NativeError = NetError::OutOfMemory.into();
        assert_eq!(err, NativeError::MemoryError);
    }

    #[test]
    fn test_stack_out_of_memory_is_fatal() {
        let err: NativeError = NetError::StackNoMemory.into();
        assert_eq!(err, NativeError::Fatal("ESP ran out of memory Internally.".into()));
    }
}
