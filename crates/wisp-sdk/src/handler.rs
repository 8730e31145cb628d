//! Native call results and name-based extension dispatch

use crate::context::NativeContext;
use crate::error::NativeError;
use crate::value::ScriptValue;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// NativeCallResult
// ============================================================================

/// Result of an extension call
#[derive(Debug, PartialEq)]
pub enum NativeCallResult {
    /// Call finished and returned a value
    Value(ScriptValue),
    /// Call failed; the runtime raises the matching error symbol
    Error(NativeError),
    /// The calling context was parked. Its return value arrives later as a
    /// resumption that the scheduler drains.
    Suspend,
}

impl NativeCallResult {
    /// Successful result with the true value
    #[inline]
    pub fn t() -> Self {
        Self::Value(ScriptValue::t())
    }

    /// Returned value, if any
    pub fn value(&self) -> Option<&ScriptValue> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Check if the call suspended its context
    pub fn is_suspend(&self) -> bool {
        matches!(self, Self::Suspend)
    }
}

impl From<ScriptValue> for NativeCallResult {
    fn from(value: ScriptValue) -> Self {
        Self::Value(value)
    }
}

impl From<Result<ScriptValue, NativeError>> for NativeCallResult {
    fn from(result: Result<ScriptValue, NativeError>) -> Self {
        match result {
            Ok(v) => Self::Value(v),
            Err(e) => Self::Error(e),
        }
    }
}

// ============================================================================
// Native Function Registry (name-based dispatch)
// ============================================================================

/// A native extension function
pub type NativeHandlerFn =
    Arc<dyn Fn(&dyn NativeContext, &[ScriptValue]) -> NativeCallResult + Send + Sync>;

/// Registry of extension functions indexed by their script-visible name
/// (e.g. "wifi-connect", "tcp-recv").
pub struct NativeFunctionRegistry {
    handlers: HashMap<String, NativeHandlerFn>,
}

impl NativeFunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register an extension by name, replacing any previous one
    pub fn register(
        &mut self,
        name: &str,
        handler: impl Fn(&dyn NativeContext, &[ScriptValue]) -> NativeCallResult
            + Send
            + Sync
            + 'static,
    ) {
        self.handlers.insert(name.to_string(), Arc::new(handler));
    }

    /// Get a handler by name
    pub fn get(&self, name: &str) -> Option<NativeHandlerFn> {
        self.handlers.get(name).cloned()
    }

    /// Invoke a handler by name. Returns None if no such extension exists.
    pub fn call(
        &self,
        name: &str,
        ctx: &dyn NativeContext,
        args: &[ScriptValue],
    ) -> Option<NativeCallResult> {
        self.handlers.get(name).map(|h| h(ctx, args))
    }

    /// Check if a handler is registered
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Get the number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for NativeFunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextId;

    struct Ctx;

    impl NativeContext for Ctx {
        fn current_context(&self) -> ContextId {
            ContextId::from_u64(7)
        }
    }

    #[test]
    fn test_register_and_call() {
        let mut registry = NativeFunctionRegistry::new();
        registry.register("echo-ctx", |ctx, _args| {
            NativeCallResult::Value(ScriptValue::UInt(ctx.current_context().as_u64()))
        });

        assert!(registry.contains("echo-ctx"));
        assert_eq!(registry.len(), 1);
        let result = registry.call("echo-ctx", &Ctx, &[]).unwrap();
        assert_eq!(result.value(), Some(&ScriptValue::UInt(7)));
        assert!(registry.call("missing", &Ctx, &[]).is_none());
    }

    #[test]
    fn test_result_from_error() {
        let result: NativeCallResult = Err(NativeError::MemoryError).into();
        assert_eq!(result, NativeCallResult::Error(NativeError::MemoryError));
        assert!(!result.is_suspend());
    }
}
