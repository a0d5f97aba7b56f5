use crate::{
    filter::{Filter, FilterError, FilterRef, RelOp},
    model::ChainedProperty,
    test_support::{ALBUM, TRACK},
    value::Value,
};

fn track(expr: &str) -> Filter {
    Filter::filter_for(&TRACK, expr).expect("fixture filter should parse")
}

fn album(expr: &str) -> Filter {
    Filter::filter_for(&ALBUM, expr).expect("fixture filter should parse")
}

#[test]
fn canonical_interning_deduplicates_equal_filters() {
    let first = track("seconds = ? & title = ?");
    let second = track("seconds = ? & title = ?");
    assert_eq!(first, second);

    let built = Filter::property(&TRACK, "seconds", RelOp::Eq)
        .and_then(|f| f.and_property("title", RelOp::Eq))
        .expect("builder filter");
    assert_eq!(first, built);
}

#[test]
fn open_and_closed_are_boolean_identities() {
    let open = Filter::open(&TRACK);
    let closed = Filter::closed(&TRACK);
    let leaf = track("seconds = ?");

    assert_eq!(open.and(&leaf).expect("and"), leaf);
    assert_eq!(closed.and(&leaf).expect("and"), closed);
    assert_eq!(open.or(&leaf).expect("or"), open);
    assert_eq!(closed.or(&leaf).expect("or"), leaf);
}

#[test]
fn combining_across_record_types_is_rejected() {
    let left = track("seconds = ?");
    let right = album("year = ?");

    assert!(matches!(left.and(&right), Err(FilterError::MixedRecordTypes { .. })));
    assert!(matches!(left.or(&right), Err(FilterError::MixedRecordTypes { .. })));
}

#[test]
fn negation_pushes_into_leaves() {
    let filter = track("seconds < ? & title = ?");
    let negated = filter.not();

    assert_eq!(negated, track("seconds >= ? | title != ?"));
}

#[test]
fn double_negation_restores_the_original() {
    let cases = [
        track("seconds = ?"),
        track("seconds < ? & title = ?"),
        track("seconds <= ? | rating != ?"),
        album("tracks(seconds > ?)"),
        Filter::open(&TRACK),
        Filter::closed(&TRACK),
    ];

    for filter in cases {
        let back = filter.not().not();
        assert_eq!(back, filter, "double negation drifted for {filter}");
    }
}

#[test]
fn de_morgan_holds_for_both_operators() {
    let x = track("seconds = ?");
    let y = track("title = ?");

    let and_not = x.and(&y).expect("and").not();
    let or_of_nots = x.not().or(&y.not()).expect("or");
    assert_eq!(and_not, or_of_nots);

    let or_not = x.or(&y).expect("or").not();
    let and_of_nots = x.not().and(&y.not()).expect("and");
    assert_eq!(or_not, and_of_nots);
}

#[test]
fn negating_a_joined_property_toggles_outer_markers() {
    let filter = track("album.year = ?");
    let negated = filter.not();

    let FilterRef::Property(test) = negated.shape() else {
        panic!("negation of a property test stays a property test");
    };
    assert_eq!(test.op, RelOp::Ne);
    assert!(test.chain.segments()[0].outer, "inner join should flip to outer");
    assert!(!test.chain.segments()[1].outer, "last segment never flips");

    assert_eq!(negated.not(), filter);
}

#[test]
fn reduction_removes_absorbed_members() {
    // (x & y) | y  =>  y
    let or_case = track("(seconds = ? & title = ?) | title = ?");
    assert_eq!(or_case.reduce(), track("title = ?"));

    // (x | y) & y  =>  y
    let and_case = track("(seconds = ? | title = ?) & title = ?");
    assert_eq!(and_case.reduce(), track("title = ?"));

    // Duplicate members collapse.
    let duplicate = track("seconds = ? & seconds = ?");
    assert_eq!(duplicate.reduce(), track("seconds = ?"));
}

#[test]
fn reduction_is_idempotent_and_left_leaning() {
    let filter = track("seconds = ? & (title = ? & rating = ?)");
    let reduced = filter.reduce();

    assert_eq!(reduced, track("seconds = ? & title = ? & rating = ?"));
    assert_eq!(reduced.reduce(), reduced);
    assert!(reduced.is_reduced());
}

#[test]
fn dnf_leaves_conjunctions_alone() {
    let filter = track("seconds = ? & title = ?");
    let dnf = filter.dnf();

    assert_eq!(dnf, filter);
    assert!(dnf.is_reduced());
    assert!(dnf.is_dnf());
}

#[test]
fn dnf_distributes_and_over_or() {
    let filter = album("(title = ? | year = ?) & (rating = ? | album_id = ?)");
    let dnf = filter.dnf();

    assert!(dnf.is_dnf());
    let expected = album(
        "title = ? & rating = ? | title = ? & album_id = ? \
         | year = ? & rating = ? | year = ? & album_id = ?",
    );
    assert_eq!(dnf, expected);
    assert_eq!(dnf.dnf(), dnf);
}

#[test]
fn cnf_distributes_or_over_and() {
    let filter = album("title = ? & year = ? | rating = ?");
    let cnf = filter.cnf();

    assert!(cnf.is_cnf());
    assert_eq!(cnf, album("(title = ? | rating = ?) & (year = ? | rating = ?)"));
    assert_eq!(cnf.cnf(), cnf);
}

#[test]
fn binding_numbers_pair_occurrences_left_to_right() {
    let filter = track("title = ? & (seconds = ? | seconds = ?)");
    let bound = filter.bind().expect("bind");

    assert_eq!(bound.to_string(), "title = ?[1] & (seconds = ?[1] | seconds = ?[2])");
    assert!(bound.is_bound());
    assert!(!filter.is_bound());
}

#[test]
fn binding_is_stable_and_unbind_restores_the_zero_form() {
    let filter = track("seconds = ? | seconds = ? | seconds = ?[2]");
    let bound = filter.bind().expect("bind");

    assert_eq!(bound.bind().expect("rebind"), bound);
    assert_eq!(bound.unbind(), filter.unbind());
}

#[test]
fn binding_rebinds_clashing_ids() {
    let filter = track("seconds = ?[1] | seconds = ?[1]");
    let bound = filter.bind().expect("bind");

    assert_eq!(bound.to_string(), "seconds = ?[1] | seconds = ?[2]");
}

#[test]
fn textual_round_trip_is_exact() {
    let cases = [
        "open",
        "closed",
        "seconds = ?",
        "seconds != ?[3]",
        "title = 'hello world'",
        "title = 'it\\'s'",
        "seconds = ? & title = ? | rating = ?",
        "seconds = ? & (title = ? | rating = ?)",
        "!album.year = ?",
        "album.year = 1999",
        "rating = null",
        "seconds >= -10",
    ];

    for expr in cases {
        let filter = track(expr);
        let printed = filter.to_string();
        let reparsed = track(&printed);
        assert_eq!(reparsed, filter, "round trip drifted for {expr:?} -> {printed:?}");
    }
}

#[test]
fn parse_errors_carry_offset_and_excerpt() {
    let err = Filter::filter_for(&TRACK, "seconds = ? & bogus = ?")
        .expect_err("unknown property must fail");

    let FilterError::Parse(parse) = err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert_eq!(parse.offset, 14);
    assert!(parse.message.contains("bogus"), "message: {}", parse.message);
    assert!(parse.excerpt.len() <= 20);
    assert!(parse.excerpt.contains("bogus"));
}

#[test]
fn parser_rejects_malformed_input() {
    for expr in ["seconds = ? &", "= ?", "seconds ? ?", "(seconds = ?", "seconds = ? extra"] {
        assert!(
            matches!(Filter::filter_for(&TRACK, expr), Err(FilterError::Parse(_))),
            "expected parse failure for {expr:?}"
        );
    }
}

#[test]
fn exists_parses_prints_and_round_trips() {
    let filter = album("tracks(seconds > ?)");
    let FilterRef::Exists { negated, sub, .. } = filter.shape() else {
        panic!("expected an exists node");
    };
    assert!(!negated);
    assert_eq!(*sub, track("seconds > ?"));

    assert_eq!(filter.to_string(), "tracks(seconds > ?)");
    assert_eq!(album(&filter.to_string()), filter);

    let negated = filter.not();
    assert_eq!(negated.to_string(), "!tracks(seconds > ?)");
    assert_eq!(album(&negated.to_string()), negated);
}

#[test]
fn exists_collapses_closed_sub_filters() {
    let chain = ChainedProperty::resolve(&ALBUM, "tracks").expect("chain");

    let closed = Filter::exists(&ALBUM, chain.clone(), &Filter::closed(&TRACK), false)
        .expect("exists");
    assert_eq!(closed, Filter::closed(&ALBUM));

    let not_closed =
        Filter::exists(&ALBUM, chain, &Filter::closed(&TRACK), true).expect("exists");
    assert_eq!(not_closed, Filter::open(&ALBUM));
}

#[test]
fn exists_over_many_to_one_flattens_to_a_joined_property() {
    let flattened = track("album(year = ?)");
    assert_eq!(flattened, track("album.year = ?"));
}

#[test]
fn chains_crossing_to_many_joins_become_exists() {
    let filter = album("tracks.seconds = ?");
    assert_eq!(filter, album("tracks(seconds = ?)"));
}

#[test]
fn as_joined_from_prefixes_every_chain() {
    let join = ChainedProperty::resolve(&TRACK, "album").expect("chain");
    let filter = album("year = ? & title = ?");

    let joined = filter.as_joined_from(&join).expect("join");
    assert_eq!(joined, track("album.year = ? & album.title = ?"));
}

#[test]
fn not_joined_from_splits_and_reconstructs() {
    let join = ChainedProperty::resolve(&TRACK, "album").expect("chain");
    let filter = track("album.year = ? & seconds = ?");

    let (not_joined, remainder) = filter.not_joined_from(&join).expect("split");
    assert_eq!(not_joined, album("year = ?"));
    assert_eq!(remainder, track("seconds = ?"));

    let reconstructed = not_joined
        .as_joined_from(&join)
        .expect("rejoin")
        .and(&remainder)
        .expect("and");
    assert_eq!(reconstructed, filter);
}

#[test]
fn filter_values_fill_in_property_order() {
    let bound = track("seconds = ? | seconds = ?").bind().expect("bind");
    let values = bound
        .initial_values()
        .expect("initial values")
        .with(Value::I32(5))
        .expect("first value")
        .with(Value::I32(7))
        .expect("second value");

    assert_eq!(values.get_values().expect("values"), vec![Value::I32(5), Value::I32(7)]);
    assert_eq!(values.supplied_count(), 2);
}

#[test]
fn filter_values_snapshots_branch_from_a_common_prefix() {
    let bound = track("seconds = ? & title = ?").bind().expect("bind");
    let base = bound
        .initial_values()
        .expect("initial values")
        .with(Value::I32(60))
        .expect("first");

    let left = base.with(Value::Text("a".into())).expect("branch a");
    let right = base.with(Value::Text("b".into())).expect("branch b");

    assert_eq!(
        left.get_values().expect("left"),
        vec![Value::I32(60), Value::Text("a".into())]
    );
    assert_eq!(
        right.get_values().expect("right"),
        vec![Value::I32(60), Value::Text("b".into())]
    );
    assert_eq!(base.get_supplied_values(), vec![Value::I32(60)]);
}

#[test]
fn filter_values_skip_constants_and_report_blanks() {
    let bound = track("album.year = 1999 & seconds = ?").bind().expect("bind");
    let values = bound.initial_values().expect("initial values");

    assert!(matches!(values.get_values(), Err(FilterError::MissingValue { .. })));

    let supplied = values.with(Value::I32(61)).expect("value");
    assert_eq!(supplied.get_values().expect("values"), vec![Value::I32(61)]);
    assert!(matches!(supplied.with(Value::I32(1)), Err(FilterError::NoBlankParameter)));
}

#[test]
fn filter_values_adapt_through_the_widening_table() {
    let bound = track("seconds = ?").bind().expect("bind");
    let values = bound
        .initial_values()
        .expect("initial values")
        .with(Value::I8(7))
        .expect("widening i8 to i32");
    assert_eq!(values.get_values().expect("values"), vec![Value::I32(7)]);

    let mismatch = bound.initial_values().expect("initial values").with(Value::Text("x".into()));
    assert!(matches!(mismatch, Err(FilterError::Value(_))));
}

#[test]
fn filter_values_round_trip_through_parts() {
    let bound = track("seconds = ? & title = ?").bind().expect("bind");
    let values = bound
        .initial_values()
        .expect("initial values")
        .with(Value::I32(61))
        .expect("first")
        .with(Value::Text("intro".into()))
        .expect("second");

    let (expr, supplied) = values.to_parts();
    let restored = crate::filter::FilterValues::from_parts(&TRACK, &expr, supplied)
        .expect("rehydrate");
    assert_eq!(restored, values);
}

#[test]
fn filter_values_display_substitutes_supplied_constants() {
    let bound = track("seconds = ? & title = ?").bind().expect("bind");
    let values = bound
        .initial_values()
        .expect("initial values")
        .with(Value::I32(61))
        .expect("value");

    assert_eq!(values.to_string(), "seconds = 61 & title = ?[1]");
}

#[test]
fn parameter_count_matches_non_constant_leaves() {
    let bound = track("album.year = 1999 & seconds = ? & title = ?").bind().expect("bind");
    let list = bound.property_list();

    assert_eq!(list.len(), 3);
    assert_eq!(list.parameter_count(), 2);

    let exists = album("tracks(seconds = ? | rating = ?)").bind().expect("bind");
    assert_eq!(exists.property_list().parameter_count(), 2);
}

#[test]
fn property_list_is_cached_on_the_root() {
    let filter = track("seconds = ? & title = ?");
    let first = filter.property_list();
    let second = filter.property_list();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn unbound_filters_reject_value_snapshots() {
    let filter = track("seconds = ?");
    assert!(matches!(filter.initial_values(), Err(FilterError::NotBound)));
}

#[test]
fn memo_flags_survive_repeated_queries() {
    let filter = album("(title = ? | year = ?) & rating = ?");

    assert!(!filter.is_dnf());
    assert!(!filter.is_dnf());
    let dnf = filter.dnf();
    assert!(dnf.is_dnf());
    assert!(dnf.is_reduced());
    assert!(filter.is_reduced());
}

#[test]
fn relational_operators_reverse_and_parse() {
    for op in [RelOp::Eq, RelOp::Ne, RelOp::Lt, RelOp::Le, RelOp::Gt, RelOp::Ge] {
        assert_eq!(op.reverse().reverse(), op);
        assert_eq!(op.symbol().parse::<RelOp>().expect("symbol parses"), op);
    }
    assert!("~".parse::<RelOp>().is_err());
}
