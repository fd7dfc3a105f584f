//! `RegExp` coverage (SPEC_FULL.md section 6.2). Only compiled when the
//! `regex` feature is enabled, since `liljs::ext` doesn't exist otherwise.

#![cfg(feature = "regex")]

use liljs::value;
use liljs::Engine;

fn eval_bool(engine: &mut Engine, src: &str) -> bool {
    let v = engine
        .evaluate_complex(src, "<test>")
        .unwrap_or_else(|e| panic!("eval failed: {e}\nsource: {src}"));
    value::to_bool(&engine.heap, v)
}

fn regex_engine() -> Engine {
    let mut engine = Engine::new();
    liljs::ext::regexp::install(&mut engine);
    engine
}

#[test]
fn regexp_test_matches_a_pattern() {
    let mut engine = regex_engine();
    assert!(eval_bool(&mut engine, r#"new RegExp("[0-9]+").test("abc123") === true"#));
}

#[test]
fn regexp_test_rejects_a_non_match() {
    let mut engine = regex_engine();
    assert!(eval_bool(&mut engine, r#"new RegExp("^[0-9]+$").test("abc") === false"#));
}

#[test]
fn regexp_exec_returns_the_whole_match() {
    let mut engine = regex_engine();
    assert!(eval_bool(
        &mut engine,
        r#"new RegExp("[a-z]+").exec("123abc456")[0] === "abc""#
    ));
}

#[test]
fn regexp_is_case_insensitive_with_i_flag() {
    let mut engine = regex_engine();
    assert!(eval_bool(&mut engine, r#"new RegExp("abc", "i").test("ABC") === true"#));
}

#[test]
fn regexp_to_string_renders_slash_delimited_source() {
    let mut engine = regex_engine();
    assert!(eval_bool(&mut engine, r#"new RegExp("a+b").toString() === "/a+b/""#));
}

#[test]
fn string_match_accepts_a_regexp_argument() {
    let mut engine = regex_engine();
    assert!(eval_bool(
        &mut engine,
        r#""order 42 placed".match(new RegExp("[0-9]+"))[0] === "42""#
    ));
}

#[test]
fn string_match_falls_back_to_substring_search_without_a_regexp() {
    let mut engine = regex_engine();
    assert!(eval_bool(&mut engine, r#""hello world".match("world")[0] === "world""#));
}

#[test]
fn string_replace_accepts_a_regexp_argument() {
    let mut engine = regex_engine();
    assert!(eval_bool(
        &mut engine,
        r#""cost: 42 dollars".replace(new RegExp("[0-9]+"), "N") === "cost: N dollars""#
    ));
}
