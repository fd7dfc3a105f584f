//! Integration tests for liljs.
//!
//! These exercise the complete pipeline end to end -- lexing, hoisting,
//! evaluating -- through the public `Engine` API, covering the universal
//! properties and concrete scenarios from spec.md section 8.

use liljs::value;
use liljs::{Engine, EngineConfig};
use pretty_assertions::assert_eq;

fn result_bool(engine: &mut Engine, src: &str) -> bool {
    engine.execute(src, "<test>").unwrap_or_else(|e| panic!("execute failed: {e}\nsource: {src}"));
    let result = engine
        .get_variable("result")
        .unwrap_or_else(|| panic!("script never set `result`\nsource: {src}"));
    value::to_bool(&engine.heap, result)
}

// ============================================================
// 1. Concrete scenarios (spec.md section 8)
// ============================================================

#[test]
fn scenario_function_call_and_return() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        "function f(x,y){return x+y} result = f(1,2) === 3"
    ));
}

#[test]
fn scenario_for_loop_accumulation() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        "var a=0; for (var i=0;i<10;i++) a+=i; result = a === 45"
    ));
}

#[test]
fn scenario_delete_removes_own_property() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"var o = {x:1}; o.self = o; delete o.self; result = Object.prototype.hasOwnProperty.call(o, "self") === false"#
    ));
}

#[test]
fn scenario_try_catch_finally_runs_both() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"var s=""; try { throw "boom" } catch(e) { s=e } finally { s+="/fin" } result = s === "boom/fin""#
    ));
}

#[test]
fn scenario_typeof_covers_function_null_undefined() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"result = (typeof (function(){}) === "function") && (typeof null === "object") && (typeof undefined === "undefined")"#
    ));
}

#[test]
fn scenario_array_literal_length_and_indexing() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        "var a=[3,1,2]; result = a.length===3 && a[0]+a[1]+a[2]===6"
    ));
}

// ============================================================
// 2. Universal properties (spec.md section 8)
// ============================================================

#[test]
fn coercion_number_round_trips_through_string() {
    let mut engine = Engine::new();
    let v = engine.evaluate_complex("42", "<test>").expect("eval failed");
    let s = value::to_js_string(&engine.heap, v);
    let s_v = engine.heap.alloc(liljs::value::ValueData::Str(s));
    assert_eq!(value::to_number(&engine.heap, s_v), 42.0);
}

#[test]
fn coercion_nan_is_not_equal_to_itself() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, "result = NaN !== NaN"));
}

#[test]
fn coercion_bool_round_trips_through_string() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"result = (("" + true) === "true") && (("" + false) === "false")"#
    ));
}

#[test]
fn coercion_null_plus_zero_is_zero() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, "result = (null + 0) === 0"));
}

#[test]
fn coercion_undefined_plus_zero_is_nan() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, "result = isNaN(undefined + 0)"));
}

#[test]
fn coercion_empty_string_plus_zero_is_string_zero() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, r#"result = ("" + 0) === "0""#));
}

#[test]
fn refcount_soundness_after_execute_returns() {
    let mut engine = Engine::new();
    let before = engine.heap.live_count();
    engine
        .execute("var a = {x: 1, y: [1,2,3]}; var b = a.x;", "<test>")
        .expect("execute failed");
    let after = engine.heap.live_count();
    // `a` and its nested array stay reachable from the global scope; the
    // live count only grows by what's still rooted, never by garbage.
    assert!(after >= before, "live count should not go negative: {before} -> {after}");
}

#[test]
fn cycle_freedom_self_reference_is_collected() {
    let mut engine = Engine::new();
    engine.execute("var a = {}; a.self = a;", "<test>").expect("execute failed");
    let with_cycle = engine.heap.live_count();
    engine.execute("a = null;", "<test>").expect("execute failed");
    let after_break = engine.heap.live_count();
    assert!(
        after_break < with_cycle,
        "breaking the only root edge into a self-referential object should free it: {with_cycle} -> {after_break}"
    );
}

#[test]
fn prototype_lookup_array_join_is_inherited() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"result = [1,2,3].join("-") === "1-2-3""#
    ));
}

#[test]
fn prototype_override_changes_every_array() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"
        Array.prototype.join = function() { return "overridden"; };
        var a = [1,2,3];
        var b = [4,5,6];
        result = a.join() === "overridden" && b.join() === "overridden";
        "#
    ));
}

#[test]
fn accessor_getter_runs_on_read() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"
        var hits = 0;
        var o = { get x() { hits += 1; return 42; } };
        var first = o.x;
        var second = o.x;
        result = first === 42 && second === 42 && hits === 2;
        "#
    ));
}

#[test]
fn accessor_setter_runs_on_write() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"
        var captured = 0;
        var o = { set x(v) { captured = v; } };
        o.x = 7;
        result = captured === 7;
        "#
    ));
}

#[test]
fn accessor_delete_removes_the_pair() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"
        var o = { get x() { return 1; } };
        delete o.x;
        result = o.x === undefined;
        "#
    ));
}

#[test]
fn loop_cap_invariant_aborts_runaway_loop() {
    let mut engine = Engine::with_config(EngineConfig {
        max_loop_iterations: 1_000,
        ..EngineConfig::default()
    });
    let err = engine
        .execute("while (true) {}", "<test>")
        .expect_err("an infinite loop must be aborted");
    assert!(
        err.to_string().contains("LOOP_ERROR"),
        "expected a LOOP_ERROR, got: {err}"
    );
}

// ============================================================
// 3. Broader language coverage
// ============================================================

#[test]
fn closures_capture_their_defining_scope() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"
        function counter() {
            var n = 0;
            return function() { n += 1; return n; };
        }
        var c = counter();
        result = c() === 1 && c() === 2 && c() === 3;
        "#
    ));
}

#[test]
fn this_binding_follows_the_receiver() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"
        var o = { name: "liljs", greet: function() { return this.name; } };
        result = o.greet() === "liljs";
        "#
    ));
}

#[test]
fn string_concatenation_with_plus() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, r#"result = "foo" + "bar" === "foobar""#));
}

#[test]
fn switch_statement_falls_through_without_break() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"
        var out = "";
        switch (1) {
            case 1: out += "a";
            case 2: out += "b"; break;
            case 3: out += "c";
        }
        result = out === "ab";
        "#
    ));
}

#[test]
fn uncaught_throw_is_reported_as_an_engine_error() {
    let mut engine = Engine::new();
    let err = engine.execute(r#"throw "kaboom";"#, "<test>").expect_err("should not be caught");
    assert!(err.to_string().contains("kaboom"), "error should carry the thrown message: {err}");
}

#[test]
fn syntax_error_is_reported_before_evaluation() {
    let mut engine = Engine::new();
    let err = engine.execute("var x = ;", "<test>").expect_err("malformed source must fail to parse");
    match err {
        liljs::EngineError::Syntax(_) => {}
        other => panic!("expected a syntax error, got: {other}"),
    }
}

// ============================================================
// 4. Relational `in`/`instanceof`, hex coercion, delete-on-value
// ============================================================

#[test]
fn instanceof_walks_the_constructor_prototype_chain() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"
        function Foo() {}
        var f = new Foo();
        result = (f instanceof Foo) === true;
        "#
    ));
}

#[test]
fn instanceof_rejects_an_unrelated_constructor() {
    let mut engine = Engine::new();
    assert!(result_bool(
        &mut engine,
        r#"
        function Foo() {}
        function Bar() {}
        var f = new Foo();
        result = (f instanceof Bar) === false;
        "#
    ));
}

#[test]
fn instanceof_falls_back_to_the_builtin_prototype_for_literals() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, "result = ([] instanceof Array) === true"));
}

#[test]
fn in_operator_finds_an_own_property() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, r#"result = ("x" in {x: 1}) === true"#));
}

#[test]
fn in_operator_finds_an_inherited_property() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, r#"result = ("join" in []) === true"#));
}

#[test]
fn in_operator_reports_a_missing_key() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, r#"result = ("nope" in {x: 1}) === false"#));
}

#[test]
fn hex_string_coerces_through_number_constructor() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, r#"result = Number("0xFF") === 255"#));
}

#[test]
fn hex_string_coerces_through_unary_plus() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, r#"result = (+"0x10") === 16"#));
}

#[test]
fn hex_string_coerces_in_arithmetic() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, r#"result = ("0x10" - 0) === 16"#));
}

#[test]
fn delete_on_a_transient_value_returns_false() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, "result = (delete (1 + 1)) === false"));
}

#[test]
fn delete_on_a_variable_binding_still_returns_true() {
    let mut engine = Engine::new();
    assert!(result_bool(&mut engine, "var x = 1; result = (delete x) === true"));
}
