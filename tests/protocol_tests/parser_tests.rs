//! Parser Tests
//!
//! Tests for resumable parsing across chunk boundaries and syntax errors.

use bytes::Bytes;
use mmpkv::protocol::{encode, parse, Parser, ProtocolObject, DEFAULT_MAX_NESTING_DEPTH};

fn sample_objects() -> Vec<ProtocolObject> {
    vec![
        ProtocolObject::string("hello"),
        ProtocolObject::blob(Bytes::from_static(b"bin\n\x00ary")),
        ProtocolObject::error("E42", "something broke"),
        ProtocolObject::Integer(-17),
        ProtocolObject::Long(1 << 40),
        ProtocolObject::Double(2.5),
        ProtocolObject::Null,
        ProtocolObject::Boolean(true),
        ProtocolObject::Boolean(false),
        ProtocolObject::Array(vec![
            ProtocolObject::string("nested"),
            ProtocolObject::Array(vec![ProtocolObject::Integer(1), ProtocolObject::Null]),
        ]),
        ProtocolObject::Map(vec![
            (ProtocolObject::string("k"), ProtocolObject::Integer(1)),
            (ProtocolObject::string("k"), ProtocolObject::Integer(2)),
        ]),
    ]
}

fn encode_all(objects: &[ProtocolObject]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for object in objects {
        bytes.extend_from_slice(&encode(object).unwrap());
    }
    bytes
}

/// `depth` single-item arrays wrapped around a Null
fn nested_arrays(depth: usize) -> ProtocolObject {
    let mut object = ProtocolObject::Null;
    for _ in 0..depth {
        object = ProtocolObject::Array(vec![object]);
    }
    object
}

/// Raw headers of `depth` single-item arrays around a Null
fn nested_array_bytes(depth: usize) -> Vec<u8> {
    let mut bytes = b"*\x01\x00\x00\x00\n".repeat(depth);
    bytes.extend_from_slice(b"N\n");
    bytes
}

/// `SET key <blob "value">` as it appears on the wire
fn set_request() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.push(b'*');
    bytes.extend_from_slice(&3i32.to_le_bytes());
    bytes.push(b'\n');
    bytes.extend_from_slice(b"$SET\n$key\n");
    bytes.push(b'B');
    bytes.extend_from_slice(&5i32.to_le_bytes());
    bytes.push(b'\n');
    bytes.extend_from_slice(b"value\n");
    bytes
}

// =============================================================================
// Complete Input Tests
// =============================================================================

#[test]
fn test_parse_every_type() {
    let objects = sample_objects();
    let bytes = encode_all(&objects);

    let (parsed, rest) = parse(&[], &bytes).unwrap();
    assert_eq!(parsed, objects);
    assert!(rest.is_empty());
}

#[test]
fn test_parse_set_request() {
    let (parsed, rest) = parse(&[], &set_request()).unwrap();

    assert!(rest.is_empty());
    assert_eq!(
        parsed,
        vec![ProtocolObject::Array(vec![
            ProtocolObject::string("SET"),
            ProtocolObject::string("key"),
            ProtocolObject::blob(Bytes::from_static(b"value")),
        ])]
    );
}

#[test]
fn test_parse_empty_composites() {
    let bytes = encode_all(&[ProtocolObject::Array(vec![]), ProtocolObject::Map(vec![])]);

    let (parsed, rest) = parse(&[], &bytes).unwrap();
    assert_eq!(parsed, vec![ProtocolObject::Array(vec![]), ProtocolObject::Map(vec![])]);
    assert!(rest.is_empty());
}

#[test]
fn test_parse_empty_string_and_blob() {
    let (parsed, _) = parse(&[], b"$\nB\x00\x00\x00\x00\n\n").unwrap();
    assert_eq!(
        parsed,
        vec![ProtocolObject::string(""), ProtocolObject::blob(Bytes::new())]
    );
}

#[test]
fn test_map_keeps_duplicate_keys_in_order() {
    let map = ProtocolObject::Map(vec![
        (ProtocolObject::string("a"), ProtocolObject::Integer(1)),
        (ProtocolObject::string("a"), ProtocolObject::Integer(2)),
    ]);
    let (parsed, _) = parse(&[], &encode(&map).unwrap()).unwrap();
    assert_eq!(parsed, vec![map]);
}

// =============================================================================
// Resumability Tests
// =============================================================================

#[test]
fn test_split_at_every_offset() {
    let objects = sample_objects();
    let bytes = encode_all(&objects);

    for split in 0..=bytes.len() {
        let (first, rest) = parse(&[], &bytes[..split]).unwrap();
        let (second, tail) = parse(&rest, &bytes[split..]).unwrap();

        let mut all = first;
        all.extend(second);
        assert_eq!(all, objects, "split at {}", split);
        assert!(tail.is_empty(), "split at {}", split);
    }
}

#[test]
fn test_byte_at_a_time_session() {
    let objects = sample_objects();
    let bytes = encode_all(&objects);

    let mut parser = Parser::new();
    let mut parsed = Vec::new();
    for byte in &bytes {
        parsed.extend(parser.feed(std::slice::from_ref(byte)).unwrap());
    }

    assert_eq!(parsed, objects);
    assert!(!parser.has_remaining());
}

#[test]
fn test_incomplete_object_rewinds_to_tag() {
    let request = set_request();
    let complete = encode(&ProtocolObject::Integer(9)).unwrap();

    let mut input = complete.to_vec();
    input.extend_from_slice(&request[..request.len() - 3]);

    let (parsed, rest) = parse(&[], &input).unwrap();
    assert_eq!(parsed, vec![ProtocolObject::Integer(9)]);
    assert_eq!(&rest[..], &request[..request.len() - 3]);
    assert_eq!(rest[0], b'*');
}

#[test]
fn test_incomplete_nested_item_defers_whole_array() {
    // Array of two items where the second item's string has no separator yet
    let input = b"*\x02\x00\x00\x00\n$first\n$sec";

    let (parsed, rest) = parse(&[], input).unwrap();
    assert!(parsed.is_empty());
    assert_eq!(&rest[..], &input[..]);

    let (parsed, rest) = parse(&rest, b"ond\n").unwrap();
    assert_eq!(
        parsed,
        vec![ProtocolObject::Array(vec![
            ProtocolObject::string("first"),
            ProtocolObject::string("second"),
        ])]
    );
    assert!(rest.is_empty());
}

#[test]
fn test_blob_length_exactly_at_buffer_end() {
    // Payload fully present but the trailing separator missing
    let input = b"B\x03\x00\x00\x00\nabc";

    let (parsed, rest) = parse(&[], input).unwrap();
    assert!(parsed.is_empty());
    assert_eq!(rest.len(), input.len());

    let (parsed, _) = parse(&rest, b"\n").unwrap();
    assert_eq!(parsed, vec![ProtocolObject::blob(Bytes::from_static(b"abc"))]);
}

#[test]
fn test_remainder_survives_session() {
    let mut parser = Parser::new();
    assert!(parser.feed(b"$hal").unwrap().is_empty());
    assert_eq!(parser.remaining(), b"$hal");

    let objects = parser.feed(b"f\n$two").unwrap();
    assert_eq!(objects, vec![ProtocolObject::string("half")]);
    assert_eq!(parser.remaining(), b"$two");

    let resumed = Parser::with_remainder(parser.remaining());
    assert_eq!(resumed.into_remainder(), Bytes::from_static(b"$two"));
}

// =============================================================================
// Syntax Error Tests
// =============================================================================

#[test]
fn test_unknown_tag() {
    let err = parse(&[], b"$ok\nX").unwrap_err();
    assert_eq!(err.position(), 4);
    assert!(err.message().contains("0x58"));
}

#[test]
fn test_bad_separator() {
    let err = parse(&[], b"I\x01\x00\x00\x00X").unwrap_err();
    assert_eq!(err.position(), 5);
    assert!(err.message().contains("Expecting '\\n' separator"));
}

#[test]
fn test_negative_length() {
    let mut input = vec![b'B'];
    input.extend_from_slice(&(-1i32).to_le_bytes());
    input.push(b'\n');

    let err = parse(&[], &input).unwrap_err();
    assert!(err.message().contains("Negative blob length -1"));
}

#[test]
fn test_invalid_utf8() {
    let err = parse(&[], b"$ab\xff\n").unwrap_err();
    assert_eq!(err.position(), 3);
}

#[test]
fn test_nested_error_is_wrapped_per_level() {
    // [[ <bad tag> ]]
    let input = b"*\x01\x00\x00\x00\n*\x01\x00\x00\x00\n?";

    let err = parse(&[], input).unwrap_err();
    let frames: Vec<_> = err.chain().collect();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].message(), "Invalid item 0 of array at 0");
    assert_eq!(frames[1].message(), "Invalid item 0 of array at 6");
    assert_eq!(err.root_cause().position(), 12);

    let rendered = err.render();
    assert!(rendered.contains("\n\t\tInvalid item 0 of array at 6"));
    assert!(rendered.contains("\n\t\t\t\tInvalid start character"));
}

#[test]
fn test_map_value_error_names_entry() {
    let input = b"%\x01\x00\x00\x00\n$k\n?";

    let err = parse(&[], input).unwrap_err();
    assert_eq!(err.message(), "Invalid value 0 of map at 0");
}

#[test]
fn test_error_leaves_session_untouched() {
    let mut parser = Parser::new();
    let mut out = vec![ProtocolObject::Null];

    assert!(parser.feed_into(b"$a\n?", &mut out).is_err());
    assert_eq!(out, vec![ProtocolObject::Null]);
    assert_eq!(parser.remaining(), b"$a\n?");

    parser.reset();
    assert!(!parser.has_remaining());
    assert_eq!(parser.feed(b"N\n").unwrap(), vec![ProtocolObject::Null]);
}

#[test]
fn test_nan_double_is_carried_bit_for_bit() {
    let bytes = encode(&ProtocolObject::Double(f64::NAN)).unwrap();

    let (parsed, _) = parse(&[], &bytes).unwrap();
    match parsed.as_slice() {
        [ProtocolObject::Double(value)] => assert_eq!(value.to_bits(), f64::NAN.to_bits()),
        other => panic!("expected one double, got {:?}", other),
    }
}

// =============================================================================
// Limit Tests
// =============================================================================

#[test]
fn test_nesting_at_limit_round_trips() {
    let object = nested_arrays(DEFAULT_MAX_NESTING_DEPTH);
    let bytes = encode(&object).unwrap();
    assert_eq!(bytes[..], nested_array_bytes(DEFAULT_MAX_NESTING_DEPTH)[..]);

    let (parsed, rest) = parse(&[], &bytes).unwrap();
    assert_eq!(parsed, vec![object]);
    assert!(rest.is_empty());
}

#[test]
fn test_nesting_beyond_limit_is_syntax_error() {
    let input = nested_array_bytes(DEFAULT_MAX_NESTING_DEPTH + 1);

    let err = parse(&[], &input).unwrap_err();
    let root = err.root_cause();
    assert_eq!(
        root.message(),
        format!(
            "Nesting depth exceeds {} at {}",
            DEFAULT_MAX_NESTING_DEPTH,
            DEFAULT_MAX_NESTING_DEPTH * 6
        )
    );
    assert_eq!(root.position(), DEFAULT_MAX_NESTING_DEPTH * 6);
    assert_eq!(err.chain().count(), DEFAULT_MAX_NESTING_DEPTH + 1);
}

#[test]
fn test_hostile_nesting_does_not_exhaust_stack() {
    // Rejection stops at the depth limit instead of recursing 100k levels
    let handle = std::thread::Builder::new()
        .stack_size(4 * 1024 * 1024)
        .spawn(|| {
            let input = nested_array_bytes(100_000);
            parse(&[], &input).is_err()
        })
        .unwrap();

    assert!(handle.join().unwrap());
}

#[test]
fn test_custom_nesting_limit() {
    let mut parser = Parser::with_limits(2, 1024);
    assert_eq!(
        parser.feed(&nested_array_bytes(2)).unwrap(),
        vec![nested_arrays(2)]
    );

    let err = parser.feed(&nested_array_bytes(3)).unwrap_err();
    assert!(err.root_cause().message().starts_with("Nesting depth exceeds 2"));
}

#[test]
fn test_declared_length_beyond_frame_limit() {
    let mut input = vec![b'B'];
    input.extend_from_slice(&17i32.to_le_bytes());
    input.push(b'\n');

    let mut parser = Parser::with_limits(8, 16);
    let err = parser.feed(&input).unwrap_err();
    assert_eq!(
        err.message(),
        "Declared blob length 17 at 1 exceeds the 16 byte frame limit"
    );
}

#[test]
fn test_incomplete_object_beyond_frame_limit() {
    let mut parser = Parser::with_limits(8, 16);
    assert!(parser.feed(b"$0123456789").unwrap().is_empty());

    let err = parser.feed(b"0123456789").unwrap_err();
    assert_eq!(err.position(), 0);
    assert!(err.message().starts_with("Incomplete object of 21 bytes"));

    parser.reset();
    assert_eq!(parser.feed(b"$ok\n").unwrap(), vec![ProtocolObject::string("ok")]);
}
