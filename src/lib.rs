//! # liljs
//!
//! `liljs` is an embeddable, tree-walking interpreter for a small
//! JS-family scripting language, built to be dropped into a host
//! application the way TinyJS or Duktape are: one `Engine`, a handful of
//! entry points (`execute`, `evaluate`, `evaluateComplex`), and a
//! `registerNative` hook for exposing host functions to scripts.
//!
//! ## Quick start
//!
//! ```rust
//! use liljs::Engine;
//!
//! let mut engine = Engine::new();
//! engine.execute("var x = 1 + 2; result = x * 10;", "<inline>").unwrap();
//! let result = engine.get_variable("result").unwrap();
//! assert_eq!(liljs::value::to_number(&engine.heap, result), 30.0);
//! ```
//!
//! ## Design
//!
//! There is no separate AST: `tokenizer.rs` hoists `var`/`function`
//! declarations into a flat, skip-annotated token buffer, and `eval/expr.rs`
//! / `eval/stmt.rs` walk that buffer directly with a `Cursor`. Values live in
//! an arena (`heap.rs`) addressed by small `ValueId`s; reference cycles are
//! torn down by the trial-deletion collector in `gc.rs` rather than relying
//! on `Rc` cycles or a tracing GC. See `DESIGN.md` in the repository root for
//! the full rationale behind each module.
//!
//! ## Modules
//!
//! - [`engine`]: the embedding API (`Engine`, `EngineConfig`)
//! - [`eval`]: the statement/expression walker
//! - [`heap`], [`value`], [`gc`]: the value arena and its cycle-aware
//!   refcounting
//! - [`scope`], [`function`]: the scope chain and callable values
//! - [`lexer`], [`tokenizer`]: source text to a hoisted token buffer
//! - [`builtins`]: the built-in global surface (`Object`, `Array`,
//!   `String`, `Number`, `Function`, `JSON`, `Math`, `console`)
//! - [`error`]: the three-way error-kind partition (spec.md §7)

#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod builtins;
pub mod engine;
pub mod error;
pub mod eval;
pub mod function;
pub mod gc;
pub mod heap;
pub mod lexer;
pub mod scope;
pub mod span;
pub mod tokenizer;
pub mod value;

#[cfg(feature = "regex")]
pub mod ext;

pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, LexError, SyntaxError};
pub use heap::ValueId;
pub use span::Span;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executes_a_small_program() {
        let mut engine = Engine::new();
        engine
            .execute(
                "function fib(n) { if (n < 2) return n; return fib(n-1) + fib(n-2); } result = fib(10);",
                "<test>",
            )
            .unwrap();
        let result = engine.get_variable("result").unwrap();
        assert_eq!(value::to_number(&engine.heap, result), 55.0);
    }

    #[test]
    fn uncaught_throw_becomes_engine_error() {
        let mut engine = Engine::new();
        let err = engine.execute("throw \"boom\";", "<test>").unwrap_err();
        assert!(matches!(err, EngineError::Thrown { .. }));
    }

    #[test]
    fn array_and_string_builtins_are_wired_up() {
        let mut engine = Engine::new();
        engine
            .execute(
                "var a = [3,1,2]; a.sort(); result = a.join('-') + ':' + 'Hi'.toLowerCase();",
                "<test>",
            )
            .unwrap();
        let result = engine.get_variable("result").unwrap();
        assert_eq!(value::to_js_string(&engine.heap, result).as_ref(), "1-2-3:hi");
    }
}
