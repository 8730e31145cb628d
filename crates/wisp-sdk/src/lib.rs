//! Wisp SDK - Lightweight SDK for writing script extensions
//!
//! This crate provides the minimal types and traits an extension needs to
//! talk to the Wisp script runtime without depending on the runtime itself:
//! values, context identity, call results, name-based registration and the
//! asynchronous event queue.
//!
//! # Example
//!
//! ```ignore
//! use wisp_sdk::{NativeCallResult, NativeFunctionRegistry, ScriptValue};
//!
//! let mut registry = NativeFunctionRegistry::new();
//! registry.register("answer", |_ctx, _args| {
//!     NativeCallResult::Value(ScriptValue::Int(42))
//! });
//! ```

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod handler;
pub mod value;

pub use context::{ContextId, EventSink, NativeContext};
pub use error::NativeError;
pub use handler::{NativeCallResult, NativeFunctionRegistry, NativeHandlerFn};
pub use value::{ScriptValue, Symbol};
