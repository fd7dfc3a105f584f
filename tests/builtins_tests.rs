//! Coverage of the `builtins/` global surface (String/Array/Number/Object/
//! Math/JSON/Function.call/apply/bind) -- SPEC_FULL.md section 6.2.

use liljs::value;
use liljs::Engine;

fn eval_bool(engine: &mut Engine, src: &str) -> bool {
    let v = engine
        .evaluate_complex(src, "<test>")
        .unwrap_or_else(|e| panic!("eval failed: {e}\nsource: {src}"));
    value::to_bool(&engine.heap, v)
}

// ============================================================
// Array.prototype
// ============================================================

#[test]
fn array_push_pop_shift_unshift() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#"
        var a = [1,2];
        a.push(3);
        a.unshift(0);
        var popped = a.pop();
        var shifted = a.shift();
        popped === 3 && shifted === 0 && a.length === 2 && a[0] === 1 && a[1] === 2;
        "#
    ));
}

#[test]
fn array_map_filter_reduce() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#"
        var doubled = [1,2,3].map(function(x) { return x * 2; });
        var evens = [1,2,3,4].filter(function(x) { return x % 2 === 0; });
        var sum = [1,2,3,4].reduce(function(acc, x) { return acc + x; }, 0);
        doubled.join(",") === "2,4,6" && evens.join(",") === "2,4" && sum === 10;
        "#
    ));
}

#[test]
fn array_slice_splice_concat_reverse_sort() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#"
        var a = [5,3,1,4,2];
        var sliced = a.slice(1, 3);
        var joined = a.concat([6,7]).join(",");
        var reversed = [1,2,3].reverse().join(",");
        var sorted = [3,1,2].sort().join(",");
        sliced.join(",") === "3,1" && joined === "5,3,1,4,2,6,7" && reversed === "3,2,1" && sorted === "1,2,3";
        "#
    ));
}

#[test]
fn array_foreach_visits_every_item_in_order() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#"
        var seen = [];
        [10,20,30].forEach(function(x) { seen.push(x); });
        seen.join(",") === "10,20,30";
        "#
    ));
}

#[test]
fn array_index_of_missing_is_negative_one() {
    let mut engine = Engine::new();
    assert!(eval_bool(&mut engine, "[1,2,3].indexOf(9) === -1"));
}

// ============================================================
// String.prototype
// ============================================================

#[test]
fn string_case_and_trim() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#""  Hi  ".trim().toUpperCase() === "HI" && "Hi".toLowerCase() === "hi""#
    ));
}

#[test]
fn string_char_at_and_char_code_at() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#""abc".charAt(1) === "b" && "abc".charCodeAt(0) === 97"#
    ));
}

#[test]
fn string_split_and_substring_and_slice() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#""a,b,c".split(",").join("-") === "a-b-c" && "hello".substring(1, 3) === "el" && "hello".slice(-3) === "llo""#
    ));
}

#[test]
fn string_starts_ends_with_and_replace() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#""hello world".startsWith("hello") && "hello world".endsWith("world") && "hello".replace("l", "L") === "heLlo""#
    ));
}

// ============================================================
// Number / Math
// ============================================================

#[test]
fn number_to_fixed() {
    let mut engine = Engine::new();
    assert!(eval_bool(&mut engine, r#"(3.14159).toFixed(2) === "3.14""#));
}

#[test]
fn number_to_string_honors_radix() {
    let mut engine = Engine::new();
    assert!(eval_bool(&mut engine, r#"(255).toString(16) === "ff""#));
}

#[test]
fn math_floor_abs_sqrt_pow() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        "Math.floor(4.9) === 4 && Math.abs(-5) === 5 && Math.sqrt(9) === 3 && Math.pow(2, 10) === 1024"
    ));
}

#[test]
fn math_max_min_and_pi() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        "Math.max(1, 7) === 7 && Math.min(1, 7) === 1 && Math.PI > 3.14 && Math.PI < 3.15"
    ));
}

// ============================================================
// Object.prototype
// ============================================================

#[test]
fn object_has_own_property_is_own_only() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#"var o = {x: 1}; o.hasOwnProperty("x") && !o.hasOwnProperty("toString")"#
    ));
}

#[test]
fn object_keys_lists_enumerable_own_names() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#"Object.keys({a: 1, b: 2}).join(",") === "a,b""#
    ));
}

#[test]
fn object_create_sets_the_prototype_link() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#"
        var base = {greeting: "hi"};
        var child = Object.create(base);
        Object.getPrototypeOf(child) === base && child.greeting === "hi";
        "#
    ));
}

#[test]
fn object_to_string_tags() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#"({}).toString() === "[object Object]" && [].toString() === "" "#
    ));
}

// ============================================================
// Function.prototype
// ============================================================

#[test]
fn function_call_binds_this_and_forwards_args() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#"
        function greet(greeting) { return greeting + " " + this.name; }
        greet.call({name: "liljs"}, "hello") === "hello liljs";
        "#
    ));
}

#[test]
fn function_apply_spreads_an_array_of_args() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#"
        function add(a, b) { return a + b; }
        add.apply(null, [3, 4]) === 7;
        "#
    ));
}

#[test]
fn function_bind_presets_this_and_leading_args() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#"
        function add(a, b) { return a + b; }
        var addFive = add.bind(null, 5);
        addFive(10) === 15;
        "#
    ));
}

// ============================================================
// JSON
// ============================================================

#[test]
fn json_stringify_then_parse_round_trips() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#"
        var original = {a: 1, b: [1,2,3]};
        var parsed = JSON.parse(JSON.stringify(original));
        parsed.a === 1 && parsed.b.length === 3 && parsed.b[2] === 3;
        "#
    ));
}

// ============================================================
// Globals
// ============================================================

#[test]
fn parse_int_and_parse_float() {
    let mut engine = Engine::new();
    assert!(eval_bool(
        &mut engine,
        r#"parseInt("42px") === 42 && parseFloat("3.14abc") === 3.14 && parseInt("ff", 16) === 255"#
    ));
}

#[test]
fn console_log_does_not_throw() {
    let mut engine = Engine::new();
    engine
        .execute(r#"console.log("hello", 1, true);"#, "<test>")
        .expect("console.log should not throw");
}
