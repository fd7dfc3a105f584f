//! Callable values: script-defined functions and native (host) callbacks,
//! per spec.md §4.5 (function call protocol) and §6 (embedding surface).

use std::fmt;
use std::rc::Rc;

use crate::heap::ValueId;
use crate::tokenizer::TokenBuffer;

/// A script-defined function. Its body isn't a separate AST: it's a
/// `(start, end)` range into the *same* shared, hoisted token buffer the
/// whole program was parsed into, exactly as spec.md §2 describes the
/// evaluator walking "a flat token vector" rather than a tree.
#[derive(Debug)]
pub struct FunctionDescriptor {
    /// `None` for an anonymous function expression.
    pub name: Option<Rc<str>>,
    pub params: Vec<Rc<str>>,
    /// Index of the function body's opening `{`.
    pub body_start: usize,
    /// Index just past the function body's closing `}`.
    pub body_end: usize,
    /// The token buffer the body range indexes into. Shared (via `Rc`)
    /// across every function literal parsed from the same `execute` call.
    pub tokens: Rc<TokenBuffer>,
    /// The scope this function closes over, i.e. the scope chain link a
    /// fresh call activation's `parent` points at (spec.md §4.4: "a
    /// function's closure is simply 'the scope chain in effect when the
    /// function literal was evaluated'").
    pub closure: Option<ValueId>,
}

/// The signature a native (Rust-side) function registered through
/// `Engine::register_native` must satisfy: given the bound `this` and the
/// call arguments, produce a value id or a thrown value.
pub type NativeCallback =
    dyn Fn(&mut crate::engine::Engine, ValueId, &[ValueId]) -> Result<ValueId, ValueId>;

/// A host-provided function, wrapped so it can live inside a [`ValueData`]
/// and be called through the same protocol as a script function.
pub struct NativeFunction {
    pub name: Rc<str>,
    pub arity: usize,
    pub callback: Box<NativeCallback>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}
