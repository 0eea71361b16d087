//! Stream codec helpers
//!
//! Blocking read/write of protocol objects over `std::io` streams, built on
//! the resumable [`Parser`] and the [`MessageBuffer`] encoder.

use std::io::{ErrorKind, Read, Write};

use super::object::ProtocolObject;
use super::parser::Parser;
use super::writer::MessageBuffer;
use crate::error::{MmpError, Result};

/// Read chunks from `reader` until at least one complete object is parsed.
///
/// Returns every object completed by the last chunk; bytes of an object
/// still in flight stay in `parser` for the next call. Returns `Ok(None)`
/// once the stream is exhausted.
pub fn read_batch<R: Read>(
    reader: &mut R,
    parser: &mut Parser,
    chunk: &mut [u8],
) -> Result<Option<Vec<ProtocolObject>>> {
    let mut objects = Vec::new();
    loop {
        let n = match reader.read(chunk) {
            Ok(0) => return Ok(None),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        parser.feed_into(&chunk[..n], &mut objects)?;
        if !objects.is_empty() {
            return Ok(Some(objects));
        }
    }
}

/// Read exactly `count` objects. Extra objects parsed from the final chunk
/// are kept in `pending` and returned first by the next call.
pub fn read_objects<R: Read>(
    reader: &mut R,
    parser: &mut Parser,
    pending: &mut Vec<ProtocolObject>,
    chunk: &mut [u8],
    count: usize,
) -> Result<Vec<ProtocolObject>> {
    while pending.len() < count {
        match read_batch(reader, parser, chunk)? {
            Some(objects) => pending.extend(objects),
            None => {
                return Err(MmpError::Network(format!(
                    "Stream closed after {} of {} objects",
                    pending.len(),
                    count
                )))
            }
        }
    }
    let rest = pending.split_off(count);
    Ok(std::mem::replace(pending, rest))
}

/// Encode `object` and write it to `writer`
pub fn write_object<W: Write>(writer: &mut W, object: &ProtocolObject) -> Result<()> {
    let mut buffer = MessageBuffer::new();
    buffer.encode(object)?;
    writer.write_all(buffer.as_bytes())?;
    writer.flush()?;
    Ok(())
}
