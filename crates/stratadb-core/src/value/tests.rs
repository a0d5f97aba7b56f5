use crate::{
    test_support::{ALBUM, TRACK},
    value::{Value, ValueError},
};
use std::cmp::Ordering;

fn property(name: &str) -> &'static crate::model::PropertyModel {
    TRACK.property(name).expect("fixture property exists")
}

#[test]
fn widening_follows_the_fixed_table() {
    // seconds is i32, rating is nullable i32.
    let seconds = property("seconds");

    assert_eq!(Value::I8(7).adapt_to(seconds).expect("i8 widens"), Value::I32(7));
    assert_eq!(Value::I16(-3).adapt_to(seconds).expect("i16 widens"), Value::I32(-3));
    assert_eq!(Value::I32(9).adapt_to(seconds).expect("identity"), Value::I32(9));

    let rating64 = ALBUM.property("rating").expect("album rating");
    assert_eq!(Value::F32(1.5).adapt_to(rating64).expect("f32 widens"), Value::F64(1.5));

    let title = property("title");
    assert_eq!(
        Value::Char('x').adapt_to(title).expect("char becomes text"),
        Value::Text("x".to_string())
    );
}

#[test]
fn unlisted_conversions_are_type_mismatches() {
    let seconds = property("seconds");

    // Narrowing is never implicit.
    assert!(matches!(
        Value::I64(1).adapt_to(seconds),
        Err(ValueError::TypeMismatch { .. })
    ));
    // Signed and unsigned never cross.
    assert!(matches!(
        Value::U8(1).adapt_to(seconds),
        Err(ValueError::TypeMismatch { .. })
    ));
    assert!(matches!(
        Value::Text("1".into()).adapt_to(seconds),
        Err(ValueError::TypeMismatch { .. })
    ));
}

#[test]
fn null_needs_a_nullable_property() {
    let seconds = property("seconds");
    let rating = property("rating");

    assert!(matches!(
        Value::Null.adapt_to(seconds),
        Err(ValueError::NullNotAllowed { .. })
    ));
    assert_eq!(Value::Null.adapt_to(rating).expect("nullable accepts null"), Value::Null);
}

#[test]
fn canonical_order_totals_floats() {
    assert_eq!(Value::F64(-1.0).canonical_cmp(&Value::F64(1.0)), Ordering::Less);
    assert_eq!(Value::F64(f64::NEG_INFINITY).canonical_cmp(&Value::F64(-1.0)), Ordering::Less);
    assert_eq!(Value::F64(f64::INFINITY).canonical_cmp(&Value::F64(f64::NAN)), Ordering::Less);
    assert_eq!(Value::F64(f64::NAN).canonical_cmp(&Value::F64(f64::NAN)), Ordering::Equal);
}

#[test]
fn values_serialize_for_snapshot_transport() {
    let values = vec![
        Value::Null,
        Value::Bool(true),
        Value::I32(-7),
        Value::F64(0.25),
        Value::Text("strata".to_string()),
        Value::Blob(vec![1, 2, 3]),
    ];

    let json = serde_json::to_string(&values).expect("serialize");
    let back: Vec<Value> = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, values);
}
