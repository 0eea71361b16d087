//! Writer Tests
//!
//! Tests for object encoding, composite builders and stream flushing.

use bytes::Bytes;
use mmpkv::protocol::{
    encode, parse, ArrayBuilder, MapBuilder, MessageBuffer, ObjectWriter, ProtocolObject,
    StreamWriter, WireError, DEFAULT_MAX_NESTING_DEPTH,
};
use mmpkv::MmpError;

fn decode_one(bytes: &[u8]) -> ProtocolObject {
    let (mut objects, rest) = parse(&[], bytes).unwrap();
    assert!(rest.is_empty());
    assert_eq!(objects.len(), 1);
    objects.remove(0)
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_error_code_is_space_padded() {
    let bytes = encode(&ProtocolObject::error("ABC123", "boom")).unwrap();

    let mut expected = vec![b'!'];
    expected.extend_from_slice(&4i32.to_le_bytes());
    expected.extend_from_slice(b"\nABC123  \nboom\n");
    assert_eq!(&bytes[..], &expected[..]);

    assert_eq!(decode_one(&bytes), ProtocolObject::error("ABC123", "boom"));
}

#[test]
fn test_scalar_layouts() {
    assert_eq!(&encode(&ProtocolObject::Null).unwrap()[..], b"N\n");
    assert_eq!(&encode(&ProtocolObject::Boolean(true)).unwrap()[..], b"1\n");
    assert_eq!(&encode(&ProtocolObject::Boolean(false)).unwrap()[..], b"0\n");
    assert_eq!(&encode(&ProtocolObject::string("hi")).unwrap()[..], b"$hi\n");
    assert_eq!(
        &encode(&ProtocolObject::Integer(1)).unwrap()[..],
        b"I\x01\x00\x00\x00\n"
    );
}

#[test]
fn test_error_code_too_long_is_rejected() {
    let err = encode(&ProtocolObject::error("TOOLONGCODE", "x")).unwrap_err();
    assert!(matches!(err, MmpError::Encode(_)));
}

#[test]
fn test_string_with_separator_is_rejected() {
    let err = encode(&ProtocolObject::string("two\nlines")).unwrap_err();
    assert!(matches!(err, MmpError::Encode(_)));
}

#[test]
fn test_nesting_beyond_parser_limit_is_rejected() {
    let mut object = ProtocolObject::Null;
    for _ in 0..=DEFAULT_MAX_NESTING_DEPTH {
        object = ProtocolObject::Array(vec![object]);
    }

    let err = encode(&object).unwrap_err();
    assert!(matches!(err, MmpError::Encode(_)));
}

#[test]
fn test_failed_encode_appends_nothing() {
    let mut buffer = MessageBuffer::new();
    buffer.write_str("ok").unwrap();
    let before = buffer.as_bytes().to_vec();

    let nested = ProtocolObject::Array(vec![
        ProtocolObject::Integer(1),
        ProtocolObject::string("bad\n"),
    ]);
    assert!(buffer.write_object(nested).is_err());

    assert_eq!(buffer.as_bytes(), &before[..]);
    assert_eq!(buffer.object_count(), 1);
}

#[test]
fn test_wire_error_codes() {
    assert_eq!(WireError::internal("NCD0001").code, "INCD0001");
    assert_eq!(WireError::internal("X1").code, "IX1     ");
    assert_eq!(WireError::unknown_command("FOO").message, "Unknown Command FOO");
}

// =============================================================================
// Builder Tests
// =============================================================================

#[test]
fn test_scoped_array() {
    let mut buffer = MessageBuffer::new();
    buffer
        .write_array(|array| {
            array.write_str("a")?;
            array.write_int(2)?;
            array.write_array(|inner| inner.write_null())
        })
        .unwrap();

    assert_eq!(
        decode_one(buffer.as_bytes()),
        ProtocolObject::Array(vec![
            ProtocolObject::string("a"),
            ProtocolObject::Integer(2),
            ProtocolObject::Array(vec![ProtocolObject::Null]),
        ])
    );
}

#[test]
fn test_scoped_array_error_writes_nothing() {
    let mut buffer = MessageBuffer::new();
    let result = buffer.write_array(|array| {
        array.write_str("partial")?;
        Err(MmpError::Invoke("stop".into()))
    });

    assert!(result.is_err());
    assert!(buffer.is_empty());
}

#[test]
fn test_explicit_begin_end() {
    let mut buffer = MessageBuffer::new();
    let mut array = buffer.begin_array();
    array.write_long(7).unwrap();
    array.write_bool(true).unwrap();
    assert_eq!(array.len(), 2);
    buffer.end_array(array).unwrap();

    let mut map = buffer.begin_map();
    map.insert("k", 1i32);
    buffer.end_map(map).unwrap();

    let (objects, _) = parse(&[], buffer.as_bytes()).unwrap();
    assert_eq!(
        objects,
        vec![
            ProtocolObject::Array(vec![ProtocolObject::Long(7), ProtocolObject::Boolean(true)]),
            ProtocolObject::Map(vec![(ProtocolObject::string("k"), ProtocolObject::Integer(1))]),
        ]
    );
}

#[test]
fn test_map_entries_with_composite_values() {
    let mut buffer = MessageBuffer::new();
    buffer
        .write_map(|map| {
            map.entry(|k| k.write_str("list"), |v| {
                v.write_array(|array| {
                    array.write_int(1)?;
                    array.write_int(2)
                })
            })?;
            map.entry(|k| k.write_int(5), |v| v.write_blob(b"raw"))
        })
        .unwrap();

    assert_eq!(
        decode_one(buffer.as_bytes()),
        ProtocolObject::Map(vec![
            (
                ProtocolObject::string("list"),
                ProtocolObject::Array(vec![ProtocolObject::Integer(1), ProtocolObject::Integer(2)]),
            ),
            (ProtocolObject::Integer(5), ProtocolObject::blob(Bytes::from_static(b"raw"))),
        ])
    );
}

#[test]
fn test_map_entry_must_write_exactly_one_object() {
    let mut map = MapBuilder::new();
    assert!(map.entry(|_| Ok(()), |v| v.write_null()).is_err());
    assert!(map
        .entry(|k| k.write_str("k"), |v| {
            v.write_null()?;
            v.write_null()
        })
        .is_err());
    assert!(map.is_empty());
}

#[test]
fn test_array_builder_finish() {
    let mut array = ArrayBuilder::new();
    assert!(array.is_empty());
    array.write_double(0.5).unwrap();
    assert_eq!(array.finish(), ProtocolObject::Array(vec![ProtocolObject::Double(0.5)]));
}

// =============================================================================
// Buffer Tests
// =============================================================================

#[test]
fn test_mark_and_rollback() {
    let mut buffer = MessageBuffer::new();
    buffer.write_str("keep").unwrap();
    let mark = buffer.mark();
    buffer.write_str("drop").unwrap();
    buffer.write_int(3).unwrap();

    buffer.rollback(mark);
    assert_eq!(buffer.object_count(), 1);
    assert_eq!(buffer.as_bytes(), b"$keep\n");
}

#[test]
fn test_stream_writer_flush() {
    let mut writer = StreamWriter::new(Vec::new());
    writer.write_command("SET", &["key".into(), 5i32.into()]).unwrap();
    assert!(writer.get_ref().is_empty());

    let flushed = writer.flush().unwrap();
    assert_eq!(flushed, writer.get_ref().len());
    assert!(writer.buffer().is_empty());

    assert_eq!(writer.flush().unwrap(), 0);

    let sink = writer.into_inner();
    assert_eq!(
        decode_one(&sink),
        ProtocolObject::Array(vec![
            ProtocolObject::string("SET"),
            ProtocolObject::string("key"),
            ProtocolObject::Integer(5),
        ])
    );
}
