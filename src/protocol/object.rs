//! Protocol object definitions
//!
//! One decoded or encoded wire value, scalar or composite.

use std::fmt;

use bytes::Bytes;

use super::token::TokenType;

/// A single MMP value
///
/// Equality is structural and follows `f64` for doubles, so a `Double(NAN)`
/// never equals itself even though it encodes and decodes bit for bit.
/// Compare `f64::to_bits` when that matters.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolObject {
    /// UTF-8 text, must not contain the separator byte
    String(String),

    /// Length-prefixed bytes
    Blob(Bytes),

    /// Error with an ASCII code of at most 8 bytes
    Error { code: String, message: String },

    Integer(i32),

    Long(i64),

    /// Carried bit for bit, NaN payloads included
    Double(f64),

    Null,

    Boolean(bool),

    /// Ordered items of any type
    Array(Vec<ProtocolObject>),

    /// Ordered key/value pairs. Keys may repeat; order is preserved.
    Map(Vec<(ProtocolObject, ProtocolObject)>),
}

impl ProtocolObject {
    /// Create a String object
    pub fn string(value: impl Into<String>) -> Self {
        ProtocolObject::String(value.into())
    }

    /// Create a Blob object
    pub fn blob(value: impl Into<Bytes>) -> Self {
        ProtocolObject::Blob(value.into())
    }

    /// Create an Error object
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ProtocolObject::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Tag byte this object is encoded with
    pub fn token_type(&self) -> TokenType {
        match self {
            ProtocolObject::String(_) => TokenType::String,
            ProtocolObject::Blob(_) => TokenType::Blob,
            ProtocolObject::Error { .. } => TokenType::Error,
            ProtocolObject::Integer(_) => TokenType::Integer,
            ProtocolObject::Long(_) => TokenType::Long,
            ProtocolObject::Double(_) => TokenType::Double,
            ProtocolObject::Null => TokenType::Null,
            ProtocolObject::Boolean(true) => TokenType::True,
            ProtocolObject::Boolean(false) => TokenType::False,
            ProtocolObject::Array(_) => TokenType::Array,
            ProtocolObject::Map(_) => TokenType::Map,
        }
    }

    /// Human readable type name, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            ProtocolObject::String(_) => "string",
            ProtocolObject::Blob(_) => "blob",
            ProtocolObject::Error { .. } => "error",
            ProtocolObject::Integer(_) => "integer",
            ProtocolObject::Long(_) => "long",
            ProtocolObject::Double(_) => "double",
            ProtocolObject::Null => "null",
            ProtocolObject::Boolean(_) => "boolean",
            ProtocolObject::Array(_) => "array",
            ProtocolObject::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ProtocolObject::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Bytes> {
        match self {
            ProtocolObject::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ProtocolObject]> {
        match self {
            ProtocolObject::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ProtocolObject::Error { .. })
    }
}

impl From<&str> for ProtocolObject {
    fn from(value: &str) -> Self {
        ProtocolObject::String(value.to_string())
    }
}

impl From<String> for ProtocolObject {
    fn from(value: String) -> Self {
        ProtocolObject::String(value)
    }
}

impl From<i32> for ProtocolObject {
    fn from(value: i32) -> Self {
        ProtocolObject::Integer(value)
    }
}

impl From<i64> for ProtocolObject {
    fn from(value: i64) -> Self {
        ProtocolObject::Long(value)
    }
}

impl From<f64> for ProtocolObject {
    fn from(value: f64) -> Self {
        ProtocolObject::Double(value)
    }
}

impl From<bool> for ProtocolObject {
    fn from(value: bool) -> Self {
        ProtocolObject::Boolean(value)
    }
}

impl From<Bytes> for ProtocolObject {
    fn from(value: Bytes) -> Self {
        ProtocolObject::Blob(value)
    }
}

impl From<Vec<ProtocolObject>> for ProtocolObject {
    fn from(items: Vec<ProtocolObject>) -> Self {
        ProtocolObject::Array(items)
    }
}

impl fmt::Display for ProtocolObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolObject::String(s) => write!(f, "{:?}", s),
            ProtocolObject::Blob(b) => {
                write!(f, "(blob) ")?;
                for byte in b.iter() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            ProtocolObject::Error { code, message } => write!(f, "(error {}) {}", code, message),
            ProtocolObject::Integer(v) => write!(f, "(integer) {}", v),
            ProtocolObject::Long(v) => write!(f, "(long) {}", v),
            ProtocolObject::Double(v) => write!(f, "(double) {}", v),
            ProtocolObject::Null => write!(f, "(null)"),
            ProtocolObject::Boolean(v) => write!(f, "(boolean) {}", v),
            ProtocolObject::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ProtocolObject::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}
