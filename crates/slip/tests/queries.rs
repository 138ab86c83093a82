//! The lazy query engine: plucks, filters, slices, and writable views.

use pretty_assertions::assert_eq;
use slip::{Interpreter, Value};

const PLAYERS: &str = "players: #[ #{ hp: 40 }, #{ hp: 60 }, #{ hp: 80 } ]";

fn with_players(rest: &str) -> Interpreter {
    let interp = Interpreter::new();
    let setup = interp.execute(PLAYERS);
    assert!(setup.is_success(), "{:?}", setup.error_message);
    let result = interp.execute(rest);
    assert!(result.is_success(), "{:?} for {rest:?}", result.error_message);
    interp
}

fn eval(source: &str) -> Value {
    let interp = Interpreter::new();
    let result = interp.execute(source);
    assert!(
        result.is_success(),
        "unexpected failure: {:?} for {source:?}",
        result.error_message
    );
    result.value
}

fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().copied().map(Value::Int).collect())
}

// === Pluck ===

#[test]
fn name_on_a_list_plucks_every_element() {
    let interp = with_players("hps: players.hp");
    assert_eq!(interp.get_global("hps"), Some(ints(&[40, 60, 80])));
}

// === Filters ===

#[test]
fn shorthand_filter_compares_the_item() {
    let interp = with_players("low: players.hp[< 50]");
    assert_eq!(interp.get_global("low"), Some(ints(&[40])));
}

#[test]
fn predicate_filters_use_item_properties() {
    let interp = with_players("strong: players[.hp > 50]");
    let Some(Value::List(items)) = interp.get_global("strong") else {
        panic!("expected a list");
    };
    assert_eq!(items.borrow().len(), 2);
}

#[test]
fn predicate_bare_names_resolve_lexically() {
    let interp = with_players("threshold: 50\nstrong: players[.hp > threshold]");
    let Some(Value::List(items)) = interp.get_global("strong") else {
        panic!("expected a list");
    };
    assert_eq!(items.borrow().len(), 2);
}

#[test]
fn predicates_combine_with_and() {
    // grouped comparisons: left-to-right evaluation makes the groups the
    // natural way to combine conditions
    let interp = with_players("mid: players[(.hp > 50) and (.hp < 70)]");
    let Some(Value::List(items)) = interp.get_global("mid") else {
        panic!("expected a list");
    };
    assert_eq!(items.borrow().len(), 1);
}

#[test]
fn filter_over_an_empty_collection_is_empty() {
    assert_eq!(eval("empty: #[]\nempty[> 5]"), Value::list(vec![]));
}

// === Simple queries and slices ===

#[test]
fn chained_queries_apply_left_to_right() {
    let interp = with_players("first-strong: players[.hp > 50][0]");
    let Some(Value::Dict(d)) = interp.get_global("first-strong") else {
        panic!("expected a dict");
    };
    assert_eq!(d.borrow().get("hp"), Some(&Value::Int(60)));
}

#[test]
fn slices_default_and_clamp() {
    assert_eq!(eval("xs: #[1, 2, 3, 4]\nxs[1:3]"), ints(&[2, 3]));
    assert_eq!(eval("xs: #[1, 2, 3, 4]\nxs[:2]"), ints(&[1, 2]));
    assert_eq!(eval("xs: #[1, 2, 3, 4]\nxs[2:]"), ints(&[3, 4]));
    assert_eq!(eval("xs: #[1, 2, 3, 4]\nxs[3:1]"), Value::list(vec![]));
    assert_eq!(eval("xs: #[1, 2, 3, 4]\nxs[0:99]"), ints(&[1, 2, 3, 4]));
}

#[test]
fn string_slicing() {
    assert_eq!(eval("s: 'hello'\ns[1:3]"), Value::str("el"));
}

#[test]
fn out_of_range_index_is_a_runtime_error() {
    let interp = Interpreter::new();
    interp.execute("xs: #[1]");
    let result = interp.execute("xs[5]");
    assert_eq!(result.error_status, Some(500));
    assert!(result.error_message.unwrap().contains("out of range"));
}

// === Writable views ===

#[test]
fn vectorized_update_rewrites_matching_locations() {
    let interp = with_players("players.hp[< 50]: + 20");
    assert_eq!(
        interp.execute("players.hp").value,
        ints(&[60, 60, 80]),
        "only the low column entry is bumped"
    );
}

#[test]
fn broadcast_assignment_hits_every_location() {
    let interp = with_players("players.hp[< 100]: 1");
    assert_eq!(interp.execute("players.hp").value, ints(&[1, 1, 1]));
}

#[test]
fn pairwise_assignment_requires_matching_length() {
    let interp = with_players("players.hp[< 100]: #[5, 6, 7]");
    assert_eq!(interp.execute("players.hp").value, ints(&[5, 6, 7]));
}

#[test]
fn mismatched_pairwise_assignment_writes_nothing() {
    let interp = Interpreter::new();
    interp.execute(PLAYERS);
    let result = interp.execute("players.hp[< 100]: #[1, 2]");
    assert_eq!(result.error_status, Some(500));
    assert!(result.error_message.unwrap().contains("length mismatch"));
    assert_eq!(
        interp.execute("players.hp").value,
        ints(&[40, 60, 80]),
        "failed assignment must not write"
    );
}

#[test]
fn filtered_column_after_query_then_name() {
    // query first, then the column write
    let interp = with_players("players[.hp < 50].hp: 99");
    assert_eq!(interp.execute("players.hp").value, ints(&[99, 60, 80]));
}

// === Live views ===

#[test]
fn views_read_fresh_data_at_resolve_time() {
    // the filter runs against the list as it is when materialized
    let source = "
        xs: #[1, 60, 2]
        xs[0]: 70
        xs[> 50]
    ";
    assert_eq!(eval(source), ints(&[70, 60]));
}
