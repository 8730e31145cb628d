//! ScriptValue: owned values exchanged with the script runtime
//!
//! Extensions receive their arguments as `ScriptValue`s and hand results back
//! the same way. Values are plain owned Rust data, so a result produced on a
//! poller or callback thread can be moved to the scheduler thread without
//! touching the runtime heap. Whatever a value owns is released when it is
//! dropped, which is how an undeliverable resume result gets cleaned up.

use std::fmt;

/// Interned script symbol.
///
/// Symbols are compared by name. Extensions define the symbols they return
/// as constants (see `Symbol::new`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(&'static str);

impl Symbol {
    /// Create a symbol from its printed name
    pub const fn new(name: &'static str) -> Self {
        Symbol(name)
    }

    /// Printed name of the symbol
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A value passed between the runtime and native extensions.
#[derive(Clone, PartialEq)]
pub enum ScriptValue {
    /// The empty list / false value
    Nil,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Floating point number
    Float(f64),
    /// Symbol
    Symbol(Symbol),
    /// Text
    String(String),
    /// Raw byte array
    Bytes(Vec<u8>),
    /// Proper list
    List(Vec<ScriptValue>),
}

impl ScriptValue {
    /// The canonical true value
    #[inline]
    pub const fn t() -> Self {
        ScriptValue::Bool(true)
    }

    /// Check if this is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, ScriptValue::Nil)
    }

    /// Get as boolean. Nil reads as false, like in the runtime itself.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            ScriptValue::Nil => Some(false),
            _ => None,
        }
    }

    /// Get any number as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScriptValue::Int(i) => Some(*i as f64),
            ScriptValue::UInt(u) => Some(*u as f64),
            ScriptValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get any number as i32 (wrapping, like a C cast)
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ScriptValue::Int(i) => Some(*i as i32),
            ScriptValue::UInt(u) => Some(*u as i32),
            ScriptValue::Float(f) => Some(*f as i32),
            _ => None,
        }
    }

    /// Get any number as i64. Floats truncate toward zero; values that do
    /// not fit saturate.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScriptValue::Int(i) => Some(*i),
            ScriptValue::UInt(u) => Some(i64::try_from(*u).unwrap_or(i64::MAX)),
            ScriptValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Get text from a string or a (possibly NUL-terminated) byte array
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s.as_str()),
            ScriptValue::Bytes(b) => {
                let end = b.iter().position(|&c| c == 0).unwrap_or(b.len());
                std::str::from_utf8(&b[..end]).ok()
            }
            _ => None,
        }
    }

    /// Get the raw bytes of a byte array or string
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ScriptValue::Bytes(b) => Some(b.as_slice()),
            ScriptValue::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Get list elements
    pub fn as_list(&self) -> Option<&[ScriptValue]> {
        match self {
            ScriptValue::List(items) => Some(items.as_slice()),
            ScriptValue::Nil => Some(&[]),
            _ => None,
        }
    }

    /// Human-readable type name (for error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Bool(_) => "bool",
            ScriptValue::Int(_) => "int",
            ScriptValue::UInt(_) => "uint",
            ScriptValue::Float(_) => "float",
            ScriptValue::Symbol(_) => "symbol",
            ScriptValue::String(_) => "string",
            ScriptValue::Bytes(_) => "byte-array",
            ScriptValue::List(_) => "list",
        }
    }
}

impl Default for ScriptValue {
    fn default() -> Self {
        ScriptValue::Nil
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        ScriptValue::Bool(b)
    }
}

impl From<i64> for ScriptValue {
    fn from(i: i64) -> Self {
        ScriptValue::Int(i)
    }
}

impl From<Symbol> for ScriptValue {
    fn from(s: Symbol) -> Self {
        ScriptValue::Symbol(s)
    }
}

impl From<Vec<u8>> for ScriptValue {
    fn from(b: Vec<u8>) -> Self {
        ScriptValue::Bytes(b)
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Nil => write!(f, "nil"),
            ScriptValue::Bool(true) => write!(f, "t"),
            ScriptValue::Bool(false) => write!(f, "false"),
            ScriptValue::Int(i) => write!(f, "{}", i),
            ScriptValue::UInt(u) => write!(f, "{}u", u),
            ScriptValue::Float(x) => write!(f, "{}f", x),
            ScriptValue::Symbol(s) => write!(f, "{:?}", s),
            ScriptValue::String(s) => write!(f, "{:?}", s),
            ScriptValue::Bytes(b) => write!(f, "[{} bytes]", b.len()),
            ScriptValue::List(items) => f.debug_list().entries(items).finish(),
        }
    }
}
