use crate::{
    codec::{CodecError, KeyLayout, RowLayout, decode_generation},
    model::{Direction, KeyPart, PropertyKind, RecordModel},
    store::RawSupport,
    test_support::{MemoryStore, SAMPLE, prop, nullable_prop},
    value::{LobId, Value},
};
use proptest::prelude::*;
use std::cmp::Ordering;

static POINT: RecordModel = RecordModel {
    name: "Point",
    properties: &[prop("x", PropertyKind::I32)],
    primary_key: &[KeyPart { property: "x", direction: Direction::Ascending }],
};

static WORD: RecordModel = RecordModel {
    name: "Word",
    properties: &[prop("text", PropertyKind::Text)],
    primary_key: &[KeyPart { property: "text", direction: Direction::Ascending }],
};

static WORD_DESC: RecordModel = RecordModel {
    name: "WordDesc",
    properties: &[prop("text", PropertyKind::Text)],
    primary_key: &[KeyPart { property: "text", direction: Direction::Descending }],
};

static CHUNK: RecordModel = RecordModel {
    name: "Chunk",
    properties: &[prop("bytes", PropertyKind::Blob)],
    primary_key: &[KeyPart { property: "bytes", direction: Direction::Ascending }],
};

static GAUGE: RecordModel = RecordModel {
    name: "Gauge",
    properties: &[prop("level", PropertyKind::F64)],
    primary_key: &[KeyPart { property: "level", direction: Direction::Ascending }],
};

static MARK: RecordModel = RecordModel {
    name: "Mark",
    properties: &[nullable_prop("grade", PropertyKind::I16)],
    primary_key: &[KeyPart { property: "grade", direction: Direction::Ascending }],
};

fn encode_one(record: &'static RecordModel, value: Value) -> Vec<u8> {
    KeyLayout::for_record(record)
        .expect("layout")
        .encode(&[value])
        .expect("single-column key should encode")
}

fn round_trip_one(record: &'static RecordModel, value: Value) {
    let layout = KeyLayout::for_record(record).expect("layout");
    let encoded = layout.encode(std::slice::from_ref(&value)).expect("encode");
    let decoded = layout.decode(&encoded).expect("decode");
    assert_eq!(decoded, vec![value]);
}

#[test]
fn key_golden_vectors_freeze_primitive_bytes() {
    let cases: Vec<(&str, &'static RecordModel, Value, Vec<u8>)> = vec![
        ("I32(-1)", &POINT, Value::I32(-1), vec![0x7F, 0xFF, 0xFF, 0xFF]),
        ("I32(0)", &POINT, Value::I32(0), vec![0x80, 0x00, 0x00, 0x00]),
        ("I32(1)", &POINT, Value::I32(1), vec![0x80, 0x00, 0x00, 0x01]),
        (
            "F64(0.0)",
            &GAUGE,
            Value::F64(0.0),
            vec![0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        ),
        (
            "F64(-1.0)",
            &GAUGE,
            Value::F64(-1.0),
            vec![0x40, 0x0F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
        ),
        ("Text(\"\")", &WORD, Value::Text(String::new()), vec![0x01]),
        (
            "Text(\"a\")",
            &WORD,
            Value::Text("a".to_string()),
            // 'a' = 0x61 -> two digits: (0x61 - 0x60) split over base 192.
            vec![0x62, 0x03, 0x01],
        ),
        ("Blob([])", &CHUNK, Value::Blob(vec![]), vec![0x00]),
        (
            "Blob([0x00])",
            &CHUNK,
            Value::Blob(vec![0x00]),
            vec![0x20, 0x20, 0x08],
        ),
        (
            "Null grade",
            &MARK,
            Value::Null,
            vec![0xFF],
        ),
        (
            "I16(3) grade",
            &MARK,
            Value::I16(3),
            vec![0x80, 0x80, 0x03],
        ),
    ];

    for (name, record, value, expected) in cases {
        let actual = encode_one(record, value);
        assert_eq!(actual, expected, "golden vector drift for {name}");
    }
}

#[test]
fn adjacent_i32_keys_collate_numerically() {
    let minus = encode_one(&POINT, Value::I32(-1));
    let zero = encode_one(&POINT, Value::I32(0));
    let one = encode_one(&POINT, Value::I32(1));

    assert!(minus < zero);
    assert!(zero < one);
}

#[test]
fn key_round_trips_cover_every_primitive_family() {
    round_trip_one(&POINT, Value::I32(-40));
    round_trip_one(&GAUGE, Value::F64(-2.75));
    round_trip_one(&WORD, Value::Text("naïve ascii and beyond 𝄞".to_string()));
    round_trip_one(&WORD_DESC, Value::Text("descending".to_string()));
    round_trip_one(&CHUNK, Value::Blob(vec![0x00, 0xFF, 0x10, 0x7F]));
    round_trip_one(&MARK, Value::Null);
    round_trip_one(&MARK, Value::I16(-300));
}

#[test]
fn null_collates_above_every_non_null_value() {
    let null = encode_one(&MARK, Value::Null);
    let max = encode_one(&MARK, Value::I16(i16::MAX));
    let min = encode_one(&MARK, Value::I16(i16::MIN));

    assert!(min < max);
    assert!(max < null);
}

#[test]
fn descending_text_reverses_collation_and_still_decodes() {
    let hello = encode_one(&WORD_DESC, Value::Text("hello".to_string()));
    let help = encode_one(&WORD_DESC, Value::Text("help".to_string()));
    assert!(hello > help, "descending bytes must reverse the ascending order");

    let layout = KeyLayout::for_record(&WORD_DESC).expect("layout");
    let decoded = layout.decode(&hello).expect("decode");
    assert_eq!(decoded, vec![Value::Text("hello".to_string())]);
}

#[test]
fn composite_keys_follow_declared_directions() {
    // Sample keys are (device ascending, offset descending).
    let layout = KeyLayout::for_record(&SAMPLE).expect("layout");

    let low_device = layout.encode(&[Value::U32(1), Value::I64(10)]).expect("encode");
    let high_device = layout.encode(&[Value::U32(2), Value::I64(10)]).expect("encode");
    assert!(low_device < high_device);

    let late_offset = layout.encode(&[Value::U32(1), Value::I64(20)]).expect("encode");
    assert!(late_offset < low_device, "larger offset must sort first on a descending column");
}

#[test]
fn key_padding_wraps_the_encoded_columns() {
    let layout = KeyLayout::for_record(&POINT).expect("layout").with_padding(2, 1);
    let encoded = layout.encode(&[Value::I32(1)]).expect("encode");

    assert_eq!(encoded, vec![0x00, 0x00, 0x80, 0x00, 0x00, 0x01, 0x00]);
    assert_eq!(layout.decode(&encoded).expect("decode"), vec![Value::I32(1)]);
}

#[test]
fn key_codec_rejects_mismatched_input() {
    let layout = KeyLayout::for_record(&POINT).expect("layout");

    assert!(matches!(
        layout.encode(&[Value::Text("x".into())]),
        Err(CodecError::ColumnMismatch { .. })
    ));
    assert!(matches!(layout.encode(&[]), Err(CodecError::ColumnCount { .. })));
    assert!(matches!(layout.encode(&[Value::Null]), Err(CodecError::NullColumn { .. })));
}

#[test]
fn key_decode_flags_truncated_and_trailing_bytes() {
    let layout = KeyLayout::for_record(&POINT).expect("layout");
    let encoded = layout.encode(&[Value::I32(7)]).expect("encode");

    assert!(matches!(
        layout.decode(&encoded[..3]),
        Err(CodecError::Truncated { .. })
    ));

    let mut padded = encoded;
    padded.push(0x00);
    assert!(matches!(layout.decode(&padded), Err(CodecError::Corrupt { .. })));
}

#[test]
fn blob_decode_flags_corrupt_terminators() {
    let layout = KeyLayout::for_record(&CHUNK).expect("layout");

    // Terminator with used-bit count that is not byte aligned.
    assert!(matches!(
        layout.decode(&[0x20, 0x20, 0x03]),
        Err(CodecError::Corrupt { .. })
    ));
    // Digits without any terminator.
    assert!(matches!(
        layout.decode(&[0x20, 0x20]),
        Err(CodecError::Truncated { .. })
    ));
    // Terminator claiming bits that carry no digits.
    assert!(matches!(
        layout.decode(&[0x08]),
        Err(CodecError::Corrupt { .. })
    ));
}

#[test]
fn row_codec_round_trips_with_null_map_and_generation() {
    // Sample data columns: factor, flag, note, payload, tag, attachment.
    let layout = RowLayout::for_record(&SAMPLE).with_generation(9);

    let values = vec![
        Value::F64(0.5),
        Value::Null,
        Value::Text("calibrated".to_string()),
        Value::Blob(vec![1, 2, 3]),
        Value::Char('q'),
        Value::Lob(LobId(77)),
    ];

    let encoded = layout.encode(&values).expect("encode");
    assert_eq!(encoded[0], 9, "small generations are a single byte");

    let decoded = layout.decode(&encoded).expect("decode");
    assert_eq!(decoded, values);
}

#[test]
fn row_generation_widens_past_127() {
    let layout = RowLayout::for_record(&SAMPLE).with_generation(300);
    let values = vec![
        Value::F64(1.0),
        Value::Bool(true),
        Value::Null,
        Value::Blob(vec![]),
        Value::Char('z'),
        Value::Lob(LobId(1)),
    ];

    let encoded = layout.encode(&values).expect("encode");
    let (generation, rest) = decode_generation(&encoded).expect("generation");
    assert_eq!(generation, 300);
    assert_eq!(encoded.len() - rest.len(), 4, "wide generations take four bytes");

    assert_eq!(layout.decode(&encoded).expect("decode"), values);
}

#[test]
fn row_decode_rejects_foreign_generations() {
    let current = RowLayout::for_record(&SAMPLE).with_generation(2);
    let old = RowLayout::for_record(&SAMPLE).with_generation(1);

    let values = vec![
        Value::F64(1.5),
        Value::Bool(false),
        Value::Text("t".to_string()),
        Value::Blob(vec![9]),
        Value::Char('a'),
        Value::Lob(LobId(0)),
    ];
    let encoded = old.encode(&values).expect("encode");

    assert!(matches!(
        current.decode(&encoded),
        Err(CodecError::GenerationMismatch { expected: 2, found: 1 })
    ));
}

#[test]
fn raw_support_decodes_evolved_rows_by_generation() {
    let store = MemoryStore::new()
        .with_layout(1, RowLayout::for_record(&SAMPLE).with_generation(1))
        .with_layout(2, RowLayout::for_record(&SAMPLE).with_generation(2));

    let values = vec![
        Value::F64(2.5),
        Value::Null,
        Value::Null,
        Value::Blob(vec![4, 5]),
        Value::Char('k'),
        Value::Lob(LobId(12)),
    ];
    let encoded = RowLayout::for_record(&SAMPLE)
        .with_generation(1)
        .encode(&values)
        .expect("encode");

    let (generation, _) = decode_generation(&encoded).expect("generation");
    let mut dest = Vec::new();
    store.decode(&mut dest, generation, &encoded).expect("decode");
    assert_eq!(dest, values);
}

#[test]
fn raw_support_calls_map_to_store_operations() {
    let mut store = MemoryStore::new();

    assert!(store.try_insert(b"k1", b"v1").expect("insert"));
    assert!(!store.try_insert(b"k1", b"v2").expect("insert"));
    assert_eq!(store.try_load(b"k1").expect("load"), Some(b"v1".to_vec()));

    store.store(b"k1", b"v3").expect("store");
    assert_eq!(store.try_load(b"k1").expect("load"), Some(b"v3".to_vec()));

    assert!(store.try_delete(b"k1").expect("delete"));
    assert!(!store.try_delete(b"k1").expect("delete"));
    assert_eq!(store.len(), 0);
}

fn direction_aware_cmp(a: &[Value], b: &[Value]) -> Ordering {
    // Sample key: device ascending, offset descending.
    a[0].canonical_cmp(&b[0]).then_with(|| b[1].canonical_cmp(&a[1]))
}

proptest! {
    #[test]
    fn i32_key_order_matches_numeric_order(a in any::<i32>(), b in any::<i32>()) {
        let ka = encode_one(&POINT, Value::I32(a));
        let kb = encode_one(&POINT, Value::I32(b));
        prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
    }

    #[test]
    fn f64_key_order_matches_numeric_order(a in proptest::num::f64::NORMAL, b in proptest::num::f64::NORMAL) {
        let ka = encode_one(&GAUGE, Value::F64(a));
        let kb = encode_one(&GAUGE, Value::F64(b));
        prop_assert_eq!(ka.cmp(&kb), a.partial_cmp(&b).expect("normal floats compare"));
    }

    #[test]
    fn text_key_order_matches_utf16_order(a in ".{0,12}", b in ".{0,12}") {
        let ka = encode_one(&WORD, Value::Text(a.clone()));
        let kb = encode_one(&WORD, Value::Text(b.clone()));

        let ua: Vec<u16> = a.encode_utf16().collect();
        let ub: Vec<u16> = b.encode_utf16().collect();
        prop_assert_eq!(ka.cmp(&kb), ua.cmp(&ub));
    }

    #[test]
    fn text_key_round_trips(a in ".{0,24}") {
        round_trip_one(&WORD, Value::Text(a.clone()));
        round_trip_one(&WORD_DESC, Value::Text(a));
    }

    #[test]
    fn blob_key_order_matches_byte_order(
        a in proptest::collection::vec(any::<u8>(), 0..24),
        b in proptest::collection::vec(any::<u8>(), 0..24),
    ) {
        let ka = encode_one(&CHUNK, Value::Blob(a.clone()));
        let kb = encode_one(&CHUNK, Value::Blob(b.clone()));
        prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
    }

    #[test]
    fn blob_key_round_trips(a in proptest::collection::vec(any::<u8>(), 0..48)) {
        round_trip_one(&CHUNK, Value::Blob(a));
    }

    #[test]
    fn composite_key_order_matches_directed_tuple_order(
        da in any::<u32>(), oa in any::<i64>(),
        db in any::<u32>(), ob in any::<i64>(),
    ) {
        let layout = KeyLayout::for_record(&SAMPLE).expect("layout");
        let ta = vec![Value::U32(da), Value::I64(oa)];
        let tb = vec![Value::U32(db), Value::I64(ob)];

        let ka = layout.encode(&ta).expect("encode");
        let kb = layout.encode(&tb).expect("encode");
        prop_assert_eq!(ka.cmp(&kb), direction_aware_cmp(&ta, &tb));
    }

    #[test]
    fn composite_key_round_trips(device in any::<u32>(), offset in any::<i64>()) {
        let layout = KeyLayout::for_record(&SAMPLE).expect("layout");
        let tuple = vec![Value::U32(device), Value::I64(offset)];
        let encoded = layout.encode(&tuple).expect("encode");
        prop_assert_eq!(layout.decode(&encoded).expect("decode"), tuple);
    }
}
