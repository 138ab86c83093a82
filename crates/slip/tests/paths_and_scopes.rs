//! Path resolution, assignment strategies, deletion and the object model
//! as seen from scripts.

use slip::{ErrorKind, Interpreter, Value};

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

// === Set / get round trips ===

#[test]
fn simple_binding_round_trips() {
    let interp = Interpreter::new();
    interp.execute("x: 41");
    assert_eq!(interp.execute("x").value, Value::Int(41));
}

#[test]
fn assignment_value_is_the_written_value() {
    assert_eq!(eval("x: 5\ny: (x: + 1)\ny"), Value::Int(6));
    assert_eq!(eval("x: 5\nx: + 1\nx"), Value::Int(6));
}

#[test]
fn nested_dict_writes() {
    assert_eq!(eval("d: #{ a: #{ b: 1 } }\nd.a.b: 2\nd.a.b"), Value::Int(2));
}

#[test]
fn list_index_writes_and_reads() {
    assert_eq!(eval("xs: #[1, 2, 3]\nxs[0]: 9\nxs[0]"), Value::Int(9));
    assert_eq!(eval("xs: #[1, 2, 3]\nxs[-1]"), Value::Int(3));
}

#[test]
fn slice_replacement() {
    assert_eq!(
        eval("xs: #[1, 2, 3, 4]\nxs[1:3]: #[9]\nxs"),
        Value::list(vec![Value::Int(1), Value::Int(9), Value::Int(4)])
    );
}

#[test]
fn group_segment_computes_the_key() {
    assert_eq!(eval("key: 'hp'\nplayer: #{ hp: 5 }\nplayer.(key)"), Value::Int(5));
}

#[test]
fn dynamic_assignment_through_a_computed_path() {
    assert_eq!(eval("(parse-path 'slot'): 7\nslot"), Value::Int(7));
}

#[test]
fn root_paths_resolve_from_the_root_scope() {
    assert_eq!(eval("x: 1\n/x"), Value::Int(1));
}

#[test]
fn parent_binding_walks_the_lexical_chain() {
    let source = "
        counter: 0
        bump: fn {} [ ../counter: + 1 ]
        call bump
        call bump
        counter
    ";
    assert_eq!(eval(source), Value::Int(2));
}

#[test]
fn unresolved_names_are_path_errors() {
    let interp = Interpreter::new();
    let result = interp.execute("does-not-exist");
    assert_eq!(result.error_status, Some(404));
}

// === Destructuring ===

#[test]
fn multi_set_binds_positionally() {
    let interp = Interpreter::new();
    let result = interp.execute("a, b: #[1, 2]\na + b");
    assert_eq!(result.value, Value::Int(3));
}

#[test]
fn multi_set_length_mismatch_is_a_type_error() {
    let interp = Interpreter::new();
    let result = interp.execute("a, b: #[1]");
    assert_eq!(result.error_status, Some(500));
    assert!(result.error_message.unwrap().contains("length mismatch"));
}

#[test]
fn multi_set_requires_a_list() {
    let interp = Interpreter::new();
    let result = interp.execute("a, b: 5");
    assert_eq!(result.error_status, Some(500));
}

// === Deletion ===

#[test]
fn delete_unbinds_and_later_reads_fail() {
    let interp = Interpreter::new();
    interp.execute("x: 5");
    assert!(interp.execute("~x").is_success());
    assert_eq!(interp.execute("x").error_status, Some(404));
}

#[test]
fn delete_prunes_cascading_empty_scopes() {
    let interp = Interpreter::new();
    let setup = interp.execute("cfg: scope\ncfg.db: scope\ncfg.db.host: 'h'");
    assert!(setup.is_success(), "{:?}", setup.error_message);
    assert!(interp.execute("~cfg.db.host").is_success());
    assert_eq!(interp.get_global("cfg"), None, "empty chain is pruned");
}

#[test]
fn delete_inside_a_dict() {
    let interp = Interpreter::new();
    interp.execute("d: #{ a: 1, b: 2 }");
    assert!(interp.execute("~d.a").is_success());
    assert_eq!(interp.execute("len d").value, Value::Int(1));
}

// === Object model ===

#[test]
fn christening_fixes_the_canonical_name() {
    assert_eq!(eval("Player: scope\ntype-of Player"), Value::str("Player"));
}

#[test]
fn instances_see_prototype_properties() {
    let source = "
        Being: scope #{ hp: 10 }
        b: create Being
        b.hp
    ";
    assert_eq!(eval(source), Value::Int(10));
}

#[test]
fn own_data_shadows_the_prototype() {
    let source = "
        Being: scope #{ hp: 10 }
        b: create Being #{ hp: 3 }
        b.hp
    ";
    assert_eq!(eval(source), Value::Int(3));
}

#[test]
fn mixins_resolve_before_the_parent() {
    let source = "
        Base: scope #{ speed: 1 }
        Fast: scope #{ speed: 9 }
        thing: create Base
        mixin thing Fast
        thing.speed
    ";
    assert_eq!(eval(source), Value::Int(9));
}

#[test]
fn inherit_is_once_only() {
    let interp = Interpreter::new();
    interp.execute("A: scope\nB: scope\nC: scope");
    assert!(interp.execute("inherit A B").is_success());
    let result = interp.execute("inherit A C");
    assert_eq!(result.error_status, Some(500));
    assert!(result.error_message.unwrap().contains("inherit-once"));
}

#[test]
fn mixin_rejects_non_scopes() {
    let interp = Interpreter::new();
    interp.execute("A: scope");
    let result = interp.execute("mixin A 5");
    assert_eq!(result.error_status, Some(500));
}

#[test]
fn clone_is_a_deep_copy() {
    let source = "
        original: scope #{ items: #[1] }
        copy2: clone original
        push copy2.items 99
        len original.items
    ";
    assert_eq!(eval(source), Value::Int(1));
}

#[test]
fn copy_is_shallow_but_distinct() {
    let source = "
        xs: #[1, 2]
        ys: copy xs
        push ys 3
        len xs
    ";
    assert_eq!(eval(source), Value::Int(2));
}

// === Error taxonomy ===

#[test]
fn parse_errors_carry_location_and_400() {
    let interp = Interpreter::new();
    let result = interp.execute("run [ 1 +");
    assert_eq!(result.error_status, Some(400));
    assert!(result.error_location.is_some());
}

#[test]
fn error_kind_statuses() {
    assert_eq!(ErrorKind::SyntaxError.status(), 400);
    assert_eq!(ErrorKind::PathNotFound.status(), 404);
    assert_eq!(ErrorKind::RuntimeError.status(), 500);
    assert_eq!(ErrorKind::Unimplemented.status(), 501);
}
