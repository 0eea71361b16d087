//! Protocol writer
//!
//! Encodes protocol objects into the wire format, the inverse of the parser.
//!
//! - [`ObjectWriter`]: typed `write_*` helpers over a single `write_object`
//! - [`ArrayBuilder`] / [`MapBuilder`]: scoped builders for composites,
//!   closed by [`finish`](ArrayBuilder::finish) or by the closure passed to
//!   [`ObjectWriter::write_array`] / [`ObjectWriter::write_map`] returning
//! - [`MessageBuffer`]: encodes into memory as objects are written
//! - [`StreamWriter`]: a buffer plus a sink, emptied by `flush`

use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};

use super::object::ProtocolObject;
use super::parser::DEFAULT_MAX_NESTING_DEPTH;
use super::response::WireError;
use super::token::{ERROR_CODE_LEN, SEPARATOR};
use crate::error::{MmpError, Result};

// =============================================================================
// Encoding
// =============================================================================

/// Encode one object into a fresh buffer
pub fn encode(object: &ProtocolObject) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    encode_into(object, &mut dst)?;
    Ok(dst.freeze())
}

/// Append the encoding of `object` to `dst`.
///
/// Fails on values the wire format cannot carry: error codes longer than
/// 8 bytes or not ASCII, strings containing the separator, lengths beyond
/// `i32::MAX`, or arrays/maps nested deeper than a default parser accepts.
/// Nothing is appended on failure.
pub fn encode_into(object: &ProtocolObject, dst: &mut BytesMut) -> Result<()> {
    let mark = dst.len();
    put_object(object, dst, 0).map_err(|e| {
        dst.truncate(mark);
        e
    })
}

/// `depth` counts the arrays/maps enclosing `object`
fn put_object(object: &ProtocolObject, dst: &mut BytesMut, depth: usize) -> Result<()> {
    if matches!(object, ProtocolObject::Array(_) | ProtocolObject::Map(_))
        && depth >= DEFAULT_MAX_NESTING_DEPTH
    {
        return Err(MmpError::Encode(format!(
            "Nesting depth exceeds {}",
            DEFAULT_MAX_NESTING_DEPTH
        )));
    }

    dst.put_u8(object.token_type().as_byte());

    match object {
        ProtocolObject::String(value) => {
            if value.as_bytes().contains(&SEPARATOR) {
                return Err(MmpError::Encode(format!(
                    "String value contains the separator byte: {:?}",
                    value
                )));
            }
            dst.put_slice(value.as_bytes());
            dst.put_u8(SEPARATOR);
        }
        ProtocolObject::Blob(bytes) => {
            put_length(dst, bytes.len(), "blob")?;
            dst.put_slice(bytes);
            dst.put_u8(SEPARATOR);
        }
        ProtocolObject::Error { code, message } => {
            if !code.is_ascii() || code.len() > ERROR_CODE_LEN {
                return Err(MmpError::Encode(format!(
                    "Error code must be at most {} ASCII bytes: {:?}",
                    ERROR_CODE_LEN, code
                )));
            }
            put_length(dst, message.len(), "error message")?;
            dst.put_slice(code.as_bytes());
            dst.put_bytes(b' ', ERROR_CODE_LEN - code.len());
            dst.put_u8(SEPARATOR);
            dst.put_slice(message.as_bytes());
            dst.put_u8(SEPARATOR);
        }
        ProtocolObject::Integer(value) => {
            dst.put_i32_le(*value);
            dst.put_u8(SEPARATOR);
        }
        ProtocolObject::Long(value) => {
            dst.put_i64_le(*value);
            dst.put_u8(SEPARATOR);
        }
        ProtocolObject::Double(value) => {
            dst.put_f64_le(*value);
            dst.put_u8(SEPARATOR);
        }
        ProtocolObject::Null | ProtocolObject::Boolean(_) => {
            dst.put_u8(SEPARATOR);
        }
        ProtocolObject::Array(items) => {
            put_length(dst, items.len(), "array")?;
            for item in items {
                put_object(item, dst, depth + 1)?;
            }
        }
        ProtocolObject::Map(entries) => {
            put_length(dst, entries.len(), "map")?;
            for (key, value) in entries {
                put_object(key, dst, depth + 1)?;
                put_object(value, dst, depth + 1)?;
            }
        }
    }

    Ok(())
}

fn put_length(dst: &mut BytesMut, len: usize, what: &str) -> Result<()> {
    let len = i32::try_from(len)
        .map_err(|_| MmpError::Encode(format!("{} length {} does not fit in i32", what, len)))?;
    dst.put_i32_le(len);
    dst.put_u8(SEPARATOR);
    Ok(())
}

// =============================================================================
// Writer trait
// =============================================================================

/// Destination for protocol objects
pub trait ObjectWriter {
    fn write_object(&mut self, object: ProtocolObject) -> Result<()>;

    fn write_str(&mut self, value: &str) -> Result<()> {
        self.write_object(ProtocolObject::String(value.to_string()))
    }

    fn write_blob(&mut self, value: &[u8]) -> Result<()> {
        self.write_object(ProtocolObject::Blob(Bytes::copy_from_slice(value)))
    }

    fn write_int(&mut self, value: i32) -> Result<()> {
        self.write_object(ProtocolObject::Integer(value))
    }

    fn write_long(&mut self, value: i64) -> Result<()> {
        self.write_object(ProtocolObject::Long(value))
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.write_object(ProtocolObject::Double(value))
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_object(ProtocolObject::Boolean(value))
    }

    fn write_null(&mut self) -> Result<()> {
        self.write_object(ProtocolObject::Null)
    }

    fn write_error(&mut self, code: &str, message: &str) -> Result<()> {
        self.write_object(ProtocolObject::error(code, message))
    }

    fn write_wire_error(&mut self, error: WireError) -> Result<()> {
        self.write_object(error.into_object())
    }

    /// Start an array to be closed with [`end_array`](Self::end_array)
    fn begin_array(&self) -> ArrayBuilder
    where
        Self: Sized,
    {
        ArrayBuilder::new()
    }

    fn end_array(&mut self, array: ArrayBuilder) -> Result<()> {
        self.write_object(array.finish())
    }

    /// Start a map to be closed with [`end_map`](Self::end_map)
    fn begin_map(&self) -> MapBuilder
    where
        Self: Sized,
    {
        MapBuilder::new()
    }

    fn end_map(&mut self, map: MapBuilder) -> Result<()> {
        self.write_object(map.finish())
    }

    /// Build an array in a scope. The array is written once `build`
    /// returns `Ok`; on error nothing is written and the error is returned.
    fn write_array<F>(&mut self, build: F) -> Result<()>
    where
        Self: Sized,
        F: FnOnce(&mut ArrayBuilder) -> Result<()>,
    {
        let mut array = ArrayBuilder::new();
        build(&mut array)?;
        self.end_array(array)
    }

    /// Build a map in a scope, same rules as [`write_array`](Self::write_array)
    fn write_map<F>(&mut self, build: F) -> Result<()>
    where
        Self: Sized,
        F: FnOnce(&mut MapBuilder) -> Result<()>,
    {
        let mut map = MapBuilder::new();
        build(&mut map)?;
        self.end_map(map)
    }

    /// Write a request envelope: `[keyword, parameters...]`
    fn write_command(&mut self, keyword: &str, parameters: &[ProtocolObject]) -> Result<()> {
        let mut items = Vec::with_capacity(parameters.len() + 1);
        items.push(ProtocolObject::string(keyword));
        items.extend(parameters.iter().cloned());
        self.write_object(ProtocolObject::Array(items))
    }
}

// =============================================================================
// Composite builders
// =============================================================================

/// Collects array items in write order
#[derive(Debug, Default)]
pub struct ArrayBuilder {
    items: Vec<ProtocolObject>,
}

impl ArrayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Close the array
    pub fn finish(self) -> ProtocolObject {
        ProtocolObject::Array(self.items)
    }
}

impl ObjectWriter for ArrayBuilder {
    fn write_object(&mut self, object: ProtocolObject) -> Result<()> {
        self.items.push(object);
        Ok(())
    }
}

/// Collects map entries in insertion order. Duplicate keys are kept.
#[derive(Debug, Default)]
pub struct MapBuilder {
    entries: Vec<(ProtocolObject, ProtocolObject)>,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one entry; each closure must write exactly one object
    pub fn entry<K, V>(&mut self, key: K, value: V) -> Result<()>
    where
        K: FnOnce(&mut ItemWriter) -> Result<()>,
        V: FnOnce(&mut ItemWriter) -> Result<()>,
    {
        let key = ItemWriter::build("map key", key)?;
        let value = ItemWriter::build("map value", value)?;
        self.entries.push((key, value));
        Ok(())
    }

    pub fn insert(&mut self, key: impl Into<ProtocolObject>, value: impl Into<ProtocolObject>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Close the map
    pub fn finish(self) -> ProtocolObject {
        ProtocolObject::Map(self.entries)
    }
}

/// Writer that accepts exactly one object (a map key or value)
#[derive(Debug, Default)]
pub struct ItemWriter {
    slot: Option<ProtocolObject>,
    what: &'static str,
}

impl ItemWriter {
    fn build<F>(what: &'static str, build: F) -> Result<ProtocolObject>
    where
        F: FnOnce(&mut ItemWriter) -> Result<()>,
    {
        let mut writer = ItemWriter { slot: None, what };
        build(&mut writer)?;
        writer
            .slot
            .ok_or_else(|| MmpError::Encode(format!("{} was not written", what)))
    }
}

impl ObjectWriter for ItemWriter {
    fn write_object(&mut self, object: ProtocolObject) -> Result<()> {
        if self.slot.is_some() {
            return Err(MmpError::Encode(format!("{} written more than once", self.what)));
        }
        self.slot = Some(object);
        Ok(())
    }
}

// =============================================================================
// Buffers
// =============================================================================

/// Position in a [`MessageBuffer`] to roll back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    len: usize,
    objects: usize,
}

/// In-memory encoder; objects are encoded as soon as they are written
#[derive(Debug, Default)]
pub struct MessageBuffer {
    buf: BytesMut,
    objects: usize,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode without taking ownership of `object`
    pub fn encode(&mut self, object: &ProtocolObject) -> Result<()> {
        encode_into(object, &mut self.buf)?;
        self.objects += 1;
        Ok(())
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of top-level objects buffered
    pub fn object_count(&self) -> usize {
        self.objects
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn mark(&self) -> Mark {
        Mark {
            len: self.buf.len(),
            objects: self.objects,
        }
    }

    /// Drop everything written after `mark`
    pub fn rollback(&mut self, mark: Mark) {
        self.buf.truncate(mark.len);
        self.objects = mark.objects.min(self.objects);
    }

    /// Take the buffered bytes, leaving the buffer empty
    pub fn take(&mut self) -> Bytes {
        self.objects = 0;
        self.buf.split().freeze()
    }

    pub fn clear(&mut self) {
        self.objects = 0;
        self.buf.clear();
    }
}

impl ObjectWriter for MessageBuffer {
    fn write_object(&mut self, object: ProtocolObject) -> Result<()> {
        self.encode(&object)
    }
}

/// Buffers writes and copies them to `sink` on [`flush`](Self::flush)
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    buffer: MessageBuffer,
    sink: W,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            buffer: MessageBuffer::new(),
            sink,
        }
    }

    pub fn buffer(&self) -> &MessageBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut MessageBuffer {
        &mut self.buffer
    }

    /// Copy buffered bytes to the sink and reset the buffer.
    /// Returns the number of bytes written.
    pub fn flush(&mut self) -> Result<usize> {
        let bytes = self.buffer.take();
        if !bytes.is_empty() {
            self.sink.write_all(&bytes)?;
        }
        self.sink.flush()?;
        Ok(bytes.len())
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> ObjectWriter for StreamWriter<W> {
    fn write_object(&mut self, object: ProtocolObject) -> Result<()> {
        self.buffer.write_object(object)
    }
}
