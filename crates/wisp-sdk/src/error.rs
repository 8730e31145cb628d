//! Error types for the Wisp extension ABI

/// Errors an extension reports back to the script runtime.
///
/// These map onto the runtime's error symbols (`eval_error`, `type_error`,
/// `merror`, `fatal_error`). The message of `EvalError` and `Fatal` becomes
/// the runtime's error reason.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NativeError {
    /// Precondition failed; the string is the user-facing reason
    #[error("{0}")]
    EvalError(String),

    /// Type mismatch during argument decoding
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Wrong number of arguments
    #[error("Expected {expected} arguments, got {got}")]
    ArgumentCount {
        /// Accepted argument count (e.g. "2" or "2..=4")
        expected: String,
        /// Number of arguments passed
        got: usize,
    },

    /// The runtime could not allocate the result
    #[error("Out of memory")]
    MemoryError,

    /// A state the runtime guarantees impossible was observed
    #[error("Fatal: {0}")]
    Fatal(String),
}

impl NativeError {
    /// Create a type mismatch error
    pub fn type_mismatch(expected: &str, got: &str) -> Self {
        NativeError::TypeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}

impl From<String> for NativeError {
    fn from(s: String) -> Self {
        NativeError::EvalError(s)
    }
}

impl From<&str> for NativeError {
    fn from(s: &str) -> Self {
        NativeError::EvalError(s.to_string())
    }
}
