//! NativeContext trait: the runtime operations extensions may use
//!
//! Defines the slice of the script runtime that extensions program against:
//! the identity of the calling context, heap reservation for results, and
//! the asynchronous event queue.

use crate::value::ScriptValue;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier of a cooperative script context
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

impl ContextId {
    /// Generate a new unique ContextId
    pub fn new() -> Self {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Create a ContextId from a u64 value
    pub fn from_u64(id: u64) -> Self {
        ContextId(id)
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Runtime view handed to every extension call.
///
/// Calls happen on the scheduler thread, one at a time.
pub trait NativeContext {
    /// Context executing the current extension call
    fn current_context(&self) -> ContextId;

    /// Reserve heap room for `values` values about to be returned.
    ///
    /// Returns false if the runtime heap cannot hold them; the extension then
    /// reports a memory error instead of building the result.
    fn reserve(&self, values: usize) -> bool {
        let _ = values;
        true
    }

    /// Reserve heap room for a byte array of `len` bytes.
    ///
    /// Defaults to reserving the single array value.
    fn reserve_bytes(&self, len: usize) -> bool {
        let _ = len;
        self.reserve(1)
    }
}

/// Asynchronous, non-blocking event queue of the runtime.
///
/// Posting never blocks and no context waits on the event; the runtime
/// delivers it to whichever handler scripts installed.
pub trait EventSink: Send + Sync {
    /// Enqueue an event. Returns false if the queue rejected it.
    fn post_event(&self, event: ScriptValue) -> bool;
}
