//! Token definitions
//!
//! Every protocol object starts with a unique tag byte identifying its type.

/// Separator byte terminating scalar payloads and structural headers
pub const SEPARATOR: u8 = b'\n';

/// Width of the error code field (bytes)
pub const ERROR_CODE_LEN: usize = 8;

/// Tag byte of each protocol object type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenType {
    /// UTF-8 text terminated by the separator
    String = b'$',
    Blob = b'B',
    Error = b'!',
    /// 32-bit signed integer
    Integer = b'I',
    /// 64-bit signed integer
    Long = b'L',
    Double = b'D',
    Null = b'N',
    False = b'0',
    True = b'1',
    Array = b'*',
    Map = b'%',
}

impl TokenType {
    /// Map a tag byte to its token, `None` for bytes that start no object
    pub fn from_byte(byte: u8) -> Option<Self> {
        let token = match byte {
            b'$' => TokenType::String,
            b'B' => TokenType::Blob,
            b'!' => TokenType::Error,
            b'I' => TokenType::Integer,
            b'L' => TokenType::Long,
            b'D' => TokenType::Double,
            b'N' => TokenType::Null,
            b'0' => TokenType::False,
            b'1' => TokenType::True,
            b'*' => TokenType::Array,
            b'%' => TokenType::Map,
            _ => return None,
        };
        Some(token)
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}
