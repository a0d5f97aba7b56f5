use crate::{
    cursor::{CursorError, RawCursor, ScanBounds},
    test_support::MemoryCursor,
};

fn keys_of(records: Vec<(Vec<u8>, Vec<u8>)>) -> Vec<String> {
    records
        .into_iter()
        .map(|(key, _)| String::from_utf8(key).expect("fixture keys are utf8"))
        .collect()
}

fn scan(keys: &[&str], bounds: ScanBounds) -> Vec<String> {
    let mut cursor =
        RawCursor::new(MemoryCursor::from_keys(keys), bounds).expect("bounds validate");
    let mut out = Vec::new();
    while cursor.has_next().expect("has_next") {
        out.push(cursor.next().expect("next"));
    }
    keys_of(out)
}

#[test]
fn unbounded_scan_yields_every_key_in_order() {
    let keys = ["aa", "ab", "ac", "b"];
    assert_eq!(scan(&keys, ScanBounds::full()), vec!["aa", "ab", "ac", "b"]);
}

#[test]
fn exclusive_start_inclusive_end_window() {
    let keys = ["aa", "ab", "ac", "b"];
    let bounds = ScanBounds::full().with_start("aa", false).with_end("ac", true);
    assert_eq!(scan(&keys, bounds), vec!["ab", "ac"]);
}

#[test]
fn inclusive_start_exclusive_end_window() {
    let keys = ["aa", "ab", "ac", "b"];
    let bounds = ScanBounds::full().with_start("aa", true).with_end("ac", false);
    assert_eq!(scan(&keys, bounds), vec!["aa", "ab"]);
}

#[test]
fn start_bound_between_keys_snaps_forward() {
    let keys = ["aa", "ab", "ac", "b"];
    let bounds = ScanBounds::full().with_start("abc", true).with_end("b", true);
    assert_eq!(scan(&keys, bounds), vec!["ac", "b"]);
}

#[test]
fn reverse_scan_mirrors_forward_scan() {
    let keys = ["aa", "ab", "ac", "b", "c"];
    let bounds = ScanBounds::full().with_start("aa", false).with_end("b", true);

    let forward = scan(&keys, bounds.clone());
    let mut backward = scan(&keys, bounds.reversed());
    backward.reverse();

    assert_eq!(forward, backward);
    assert_eq!(forward, vec!["ab", "ac", "b"]);
}

#[test]
fn reverse_scan_honors_exclusive_end() {
    let keys = ["aa", "ab", "ac"];
    let bounds = ScanBounds::full().with_end("ac", false).reversed();
    assert_eq!(scan(&keys, bounds), vec!["ab", "aa"]);
}

#[test]
fn every_yielded_key_shares_the_bound_prefix() {
    let keys = ["aa", "ab", "ac", "b", "ba"];
    let bounds = ScanBounds::full().with_start("aa", true).with_end("az", true);

    let yielded = scan(&keys, bounds);
    assert_eq!(yielded, vec!["aa", "ab", "ac"]);
    assert!(yielded.iter().all(|key| key.starts_with('a')));
}

#[test]
fn max_prefix_caps_the_cached_prefix() {
    let keys = ["aaa", "aab", "aba"];
    let bounds = ScanBounds::full()
        .with_start("aaa", true)
        .with_end("aab", true)
        .with_max_prefix(1);
    assert_eq!(scan(&keys, bounds), vec!["aaa", "aab"]);
}

#[test]
fn exclusive_unbounded_side_is_rejected() {
    // The builder has no spelling for an absent exclusive bound; force one.
    let mut bounds = ScanBounds::full().with_start("x", false);
    bounds.start = None;

    assert!(matches!(
        RawCursor::new(MemoryCursor::from_keys(&["a"]), bounds),
        Err(CursorError::ExclusiveUnbounded)
    ));
}

#[test]
fn empty_window_closes_immediately() {
    let keys = ["aa", "ab"];
    let bounds = ScanBounds::full().with_start("ab", false).with_end("ab", true);

    let mut cursor =
        RawCursor::new(MemoryCursor::from_keys(&keys), bounds).expect("bounds validate");
    assert!(!cursor.has_next().expect("has_next"));
    assert!(cursor.is_closed());
    assert!(matches!(cursor.next(), Err(CursorError::NoCurrent)));
}

#[test]
fn exhaustion_closes_and_close_is_idempotent() {
    let mut cursor = RawCursor::new(MemoryCursor::from_keys(&["a"]), ScanBounds::full())
        .expect("bounds validate");

    assert!(cursor.has_next().expect("has_next"));
    cursor.next().expect("next");
    assert!(!cursor.has_next().expect("has_next"));
    assert!(cursor.is_closed());

    cursor.close();
    cursor.close();
    assert!(!cursor.has_next().expect("has_next after close"));
}

#[test]
fn fetch_failures_close_the_cursor_and_surface() {
    let mut ops = MemoryCursor::from_keys(&["a", "b", "c"]);
    ops.fail_moves_after = Some(2);

    let mut cursor = RawCursor::new(ops, ScanBounds::full()).expect("bounds validate");
    assert!(cursor.has_next().expect("first position"));
    cursor.next().expect("first record");
    cursor.next().expect("second record");

    assert!(matches!(cursor.next(), Err(CursorError::Fetch(_))));
    assert!(cursor.is_closed());
    assert!(!cursor.has_next().expect("closed cursor has nothing"));
}

#[test]
fn skip_consumes_without_materializing() {
    let mut cursor = RawCursor::new(
        MemoryCursor::from_keys(&["a", "b", "c", "d"]),
        ScanBounds::full(),
    )
    .expect("bounds validate");

    assert_eq!(cursor.skip(2).expect("skip"), 2);
    let rest = keys_of(cursor.fetch_next(10).expect("fetch"));
    assert_eq!(rest, vec!["c", "d"]);
}

#[test]
fn unchecked_skip_hints_off_key_materialization() {
    // The double fails key fetches while materialization is hinted off, so
    // an unbounded skip only passes if the hint was sent and restored.
    let mut ops = MemoryCursor::from_keys(&["a", "b", "c"]);
    ops.fail_key_fetch_while_disabled = true;

    let mut cursor = RawCursor::new(ops, ScanBounds::full()).expect("bounds validate");
    assert_eq!(cursor.skip(2).expect("skip"), 2);

    let rest = keys_of(cursor.fetch_next(10).expect("fetch after skip"));
    assert_eq!(rest, vec!["c"]);
}

#[test]
fn bounded_skip_still_honors_the_window() {
    let keys = ["aa", "ab", "ac", "b"];
    let bounds = ScanBounds::full().with_start("aa", true).with_end("ac", true);
    let mut cursor =
        RawCursor::new(MemoryCursor::from_keys(&keys), bounds).expect("bounds validate");

    assert_eq!(cursor.skip(10).expect("skip"), 3);
    assert!(cursor.is_closed());
}

#[test]
fn current_key_and_value_expose_the_position() {
    let mut cursor = RawCursor::new(MemoryCursor::from_keys(&["k"]), ScanBounds::full())
        .expect("bounds validate");

    assert!(cursor.has_next().expect("has_next"));
    assert_eq!(cursor.current_key().expect("key"), b"k".to_vec());
    assert_eq!(cursor.current_value().expect("value"), b"value-k".to_vec());
}
