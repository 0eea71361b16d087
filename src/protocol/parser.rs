//! Resumable MMP parser
//!
//! Turns a byte stream delivered in arbitrary chunks into protocol objects.
//!
//! ## End of buffer
//! When an object needs more bytes than are buffered, the parser rewinds to
//! that object's tag byte and stops. The unread bytes stay buffered and are
//! parsed again once the next chunk arrives. An incomplete array item or map
//! entry defers the whole enclosing array/map, so no partial object is ever
//! returned.
//!
//! ## Errors
//! Anything that can never become valid by reading more bytes (unknown tag,
//! wrong separator, negative length, bad UTF-8) is a [`SyntaxError`] carrying
//! the byte offset within the buffered input. Errors inside nested items are
//! wrapped once per enclosing array/map.
//!
//! ## Limits
//! Arrays and maps nest at most `max_depth` levels, and no declared length
//! or incomplete object may exceed `max_frame_size` bytes. Both are syntax
//! errors, so a hostile peer can neither exhaust the stack nor grow the
//! buffer without bound.

use bytes::{Buf, Bytes, BytesMut};

use super::object::ProtocolObject;
use super::token::{TokenType, ERROR_CODE_LEN, SEPARATOR};
use crate::error::SyntaxError;

/// Outcome of a sub-read. `Ok(None)` is end of buffer, not an error.
type Step<T> = std::result::Result<Option<T>, SyntaxError>;

/// Unwrap a sub-read or bail out of the current read with end of buffer
macro_rules! need {
    ($step:expr) => {
        match $step? {
            Some(value) => value,
            None => return Ok(None),
        }
    };
}

/// Deepest array/map nesting accepted by default
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 128;

/// Largest declared length or incomplete object accepted by default (bytes)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Parser session holding the bytes not yet consumed
#[derive(Debug)]
pub struct Parser {
    buffer: BytesMut,
    max_depth: usize,
    max_frame_size: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_NESTING_DEPTH, DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_depth: usize, max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_depth,
            max_frame_size,
        }
    }

    /// Start a session from bytes left over by an earlier one
    pub fn with_remainder(remainder: &[u8]) -> Self {
        let mut parser = Self::default();
        parser.buffer.extend_from_slice(remainder);
        parser
    }

    /// Append `chunk` and return every object it completes.
    ///
    /// On a syntax error the buffered bytes are left untouched; callers
    /// normally [`reset`](Self::reset) the session before feeding again.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<ProtocolObject>, SyntaxError> {
        let mut objects = Vec::new();
        self.feed_into(chunk, &mut objects)?;
        Ok(objects)
    }

    /// Like [`feed`](Self::feed) but appends to `out`, returning how many
    /// objects were added. `out` is left unchanged on error.
    pub fn feed_into(
        &mut self,
        chunk: &[u8],
        out: &mut Vec<ProtocolObject>,
    ) -> Result<usize, SyntaxError> {
        self.buffer.extend_from_slice(chunk);

        let before = out.len();
        let mut reader = Reader {
            buf: &self.buffer,
            pos: 0,
            depth: 0,
            max_depth: self.max_depth,
            max_len: self.max_frame_size,
        };
        let parsed = reader.read_all(out).and_then(|()| {
            let pending = reader.buf.len() - reader.pos;
            if pending > self.max_frame_size {
                return Err(SyntaxError::new(
                    format!(
                        "Incomplete object of {} bytes at {} exceeds the {} byte frame limit",
                        pending, reader.pos, self.max_frame_size
                    ),
                    reader.pos,
                ));
            }
            Ok(reader.pos)
        });

        match parsed {
            Ok(consumed) => {
                self.buffer.advance(consumed);
                Ok(out.len() - before)
            }
            Err(e) => {
                out.truncate(before);
                Err(e)
            }
        }
    }

    /// Bytes received but not yet part of a complete object
    pub fn remaining(&self) -> &[u8] {
        &self.buffer
    }

    pub fn has_remaining(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Drop all buffered bytes
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn into_remainder(self) -> Bytes {
        self.buffer.freeze()
    }
}

/// Parse `previous ++ chunk`, returning the complete objects and the
/// unconsumed remainder to pass in with the next chunk.
pub fn parse(
    previous: &[u8],
    chunk: &[u8],
) -> Result<(Vec<ProtocolObject>, Bytes), SyntaxError> {
    let mut parser = Parser::with_remainder(previous);
    let objects = parser.feed(chunk)?;
    Ok((objects, parser.into_remainder()))
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Arrays/maps currently open around `pos`
    depth: usize,
    max_depth: usize,
    max_len: usize,
}

impl<'a> Reader<'a> {
    /// Read as many whole objects as the buffer holds
    fn read_all(&mut self, out: &mut Vec<ProtocolObject>) -> Result<(), SyntaxError> {
        while let Some(object) = self.read_object()? {
            out.push(object);
        }
        Ok(())
    }

    /// Read one object, rewinding to its tag byte on end of buffer
    fn read_object(&mut self) -> Step<ProtocolObject> {
        let start = self.pos;
        let Some(tag) = self.next_byte() else {
            return Ok(None);
        };

        let step = self.read_body(tag, start);
        if matches!(step, Ok(None)) {
            self.pos = start;
        }
        step
    }

    fn read_body(&mut self, tag: u8, start: usize) -> Step<ProtocolObject> {
        let token = TokenType::from_byte(tag).ok_or_else(|| {
            SyntaxError::new(
                format!("Invalid start character 0x{:02x} at {}", tag, start),
                start,
            )
        })?;

        let object = match token {
            TokenType::String => ProtocolObject::String(need!(self.read_line())),
            TokenType::Blob => {
                let len = need!(self.read_length("blob length"));
                let bytes = need!(self.take(len));
                need!(self.expect_separator());
                ProtocolObject::Blob(Bytes::copy_from_slice(bytes))
            }
            TokenType::Error => {
                let len = need!(self.read_length("error message length"));
                let code_at = self.pos;
                let code = need!(self.take(ERROR_CODE_LEN));
                need!(self.expect_separator());
                let message_at = self.pos;
                let message = need!(self.take(len));
                need!(self.expect_separator());
                ProtocolObject::Error {
                    code: decode_error_code(code, code_at)?,
                    message: decode_utf8(message, message_at)?,
                }
            }
            TokenType::Integer => {
                ProtocolObject::Integer(i32::from_le_bytes(need!(self.read_fixed::<4>())))
            }
            TokenType::Long => {
                ProtocolObject::Long(i64::from_le_bytes(need!(self.read_fixed::<8>())))
            }
            TokenType::Double => {
                ProtocolObject::Double(f64::from_le_bytes(need!(self.read_fixed::<8>())))
            }
            TokenType::Null => {
                need!(self.expect_separator());
                ProtocolObject::Null
            }
            TokenType::True | TokenType::False => {
                need!(self.expect_separator());
                ProtocolObject::Boolean(token == TokenType::True)
            }
            TokenType::Array => {
                let count = need!(self.read_length("array count"));
                self.enter(start)?;
                let items = self.read_items(count, start);
                self.depth -= 1;
                ProtocolObject::Array(need!(items))
            }
            TokenType::Map => {
                let count = need!(self.read_length("map count"));
                self.enter(start)?;
                let entries = self.read_entries(count, start);
                self.depth -= 1;
                ProtocolObject::Map(need!(entries))
            }
        };

        Ok(Some(object))
    }

    /// Open one array/map level
    fn enter(&mut self, start: usize) -> Result<(), SyntaxError> {
        if self.depth >= self.max_depth {
            return Err(SyntaxError::new(
                format!("Nesting depth exceeds {} at {}", self.max_depth, start),
                start,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn read_items(&mut self, count: usize, start: usize) -> Step<Vec<ProtocolObject>> {
        let mut items = Vec::with_capacity(count.min(self.buf.len() - self.pos));
        for index in 0..count {
            let item = need!(self.read_nested(|| {
                format!("Invalid item {} of array at {}", index, start)
            }, start));
            items.push(item);
        }
        Ok(Some(items))
    }

    fn read_entries(
        &mut self,
        count: usize,
        start: usize,
    ) -> Step<Vec<(ProtocolObject, ProtocolObject)>> {
        let mut entries = Vec::with_capacity(count.min(self.buf.len() - self.pos));
        for index in 0..count {
            let key = need!(self.read_nested(|| {
                format!("Invalid key {} of map at {}", index, start)
            }, start));
            let value = need!(self.read_nested(|| {
                format!("Invalid value {} of map at {}", index, start)
            }, start));
            entries.push((key, value));
        }
        Ok(Some(entries))
    }

    /// Read a nested object, wrapping its error in a frame for the parent
    fn read_nested(
        &mut self,
        describe: impl FnOnce() -> String,
        parent_start: usize,
    ) -> Step<ProtocolObject> {
        self.read_object()
            .map_err(|cause| SyntaxError::wrap(describe(), parent_start, cause))
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn take(&mut self, len: usize) -> Step<&'a [u8]> {
        match self.pos.checked_add(len) {
            Some(end) if end <= self.buf.len() => {
                let buf = self.buf;
                let bytes = &buf[self.pos..end];
                self.pos = end;
                Ok(Some(bytes))
            }
            _ => Ok(None),
        }
    }

    fn expect_separator(&mut self) -> Step<()> {
        let at = self.pos;
        match self.next_byte() {
            None => Ok(None),
            Some(SEPARATOR) => Ok(Some(())),
            Some(other) => Err(SyntaxError::new(
                format!(
                    "Invalid character 0x{:02x} at {}. Expecting '\\n' separator",
                    other, at
                ),
                at,
            )),
        }
    }

    /// `N` little-endian payload bytes followed by the separator
    fn read_fixed<const N: usize>(&mut self) -> Step<[u8; N]> {
        let bytes = need!(self.take(N));
        let mut raw = [0u8; N];
        raw.copy_from_slice(bytes);
        need!(self.expect_separator());
        Ok(Some(raw))
    }

    /// 4-byte signed header followed by the separator. Negative values and
    /// values beyond the frame limit are invalid.
    fn read_length(&mut self, what: &str) -> Step<usize> {
        let at = self.pos;
        let value = i32::from_le_bytes(need!(self.read_fixed::<4>()));
        let len = usize::try_from(value).map_err(|_| {
            SyntaxError::new(format!("Negative {} {} at {}", what, value, at), at)
        })?;
        if len > self.max_len {
            return Err(SyntaxError::new(
                format!(
                    "Declared {} {} at {} exceeds the {} byte frame limit",
                    what, len, at, self.max_len
                ),
                at,
            ));
        }
        Ok(Some(len))
    }

    /// Separator-terminated UTF-8 text
    fn read_line(&mut self) -> Step<String> {
        let start = self.pos;
        let buf = self.buf;
        let rest = &buf[start..];
        let Some(end) = rest.iter().position(|&b| b == SEPARATOR) else {
            return Ok(None);
        };
        self.pos = start + end + 1;
        decode_utf8(&rest[..end], start).map(Some)
    }
}

fn decode_utf8(bytes: &[u8], at: usize) -> Result<String, SyntaxError> {
    std::str::from_utf8(bytes).map(str::to_owned).map_err(|e| {
        let offset = at + e.valid_up_to();
        SyntaxError::new(format!("Invalid UTF-8 text at {}", offset), offset)
    })
}

/// Error codes are blank padded to the fixed width; padding is stripped.
fn decode_error_code(bytes: &[u8], at: usize) -> Result<String, SyntaxError> {
    if !bytes.is_ascii() {
        return Err(SyntaxError::new(
            format!("Invalid error code at {}. Expecting ASCII", at),
            at,
        ));
    }
    let code = decode_utf8(bytes, at)?;
    Ok(code.trim_end_matches([' ', '\0']).to_string())
}
