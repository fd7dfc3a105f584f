//! The evaluator: a recursive-descent walk directly over the hoisted,
//! skip-annotated token buffer produced by `tokenizer.rs` (spec.md §2, §4).
//!
//! There is no separate AST pass. `Cursor` is the position the walk is
//! currently at; `expr.rs` and `stmt.rs` recurse on it directly, using
//! `TokenBuffer::skips` to jump over a bracketed construct in O(1) instead
//! of re-deriving its extent.

pub mod call;
pub mod expr;
pub mod stmt;

use std::rc::Rc;

use crate::engine::Engine;
use crate::error::{EngineError, SyntaxError};
use crate::heap::{Heap, LinkAttrs, ValueId};
use crate::lexer::{Token, TokenKind};
use crate::scope::{self, ScopeChain};
use crate::span::Span;
use crate::tokenizer::TokenBuffer;

/// A cursor over one token buffer. Cheap to copy conceptually but kept as a
/// plain struct (not `Copy`, since `Rc<TokenBuffer>` clones aren't free
/// enough to hand out casually) — callers that need to try-then-backtrack
/// just snapshot `pos` and restore it.
#[derive(Debug, Clone)]
pub struct Cursor {
    pub tokens: Rc<TokenBuffer>,
    pub pos: usize,
}

impl Cursor {
    pub fn new(tokens: Rc<TokenBuffer>) -> Self {
        Cursor { tokens, pos: 0 }
    }

    pub fn at(tokens: Rc<TokenBuffer>, pos: usize) -> Self {
        Cursor { tokens, pos }
    }

    pub fn current(&self) -> &Token {
        &self.tokens.tokens[self.pos]
    }

    pub fn kind(&self) -> TokenKind {
        self.current().kind
    }

    pub fn span(&self) -> Span {
        self.current().span
    }

    pub fn at_end(&self) -> bool {
        self.kind() == TokenKind::Eof
    }

    pub fn advance(&mut self) -> Token {
        let t = self.current().clone();
        if !self.at_end() {
            self.pos += 1;
        }
        t
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(SyntaxError::Unexpected {
                expected: kind.describe().to_string(),
                found: self.kind().describe().to_string(),
                span: self.span(),
            })
        }
    }

    /// Jumps from an open bracket to just past its matching close bracket,
    /// using the precomputed `skips` table. Panics if called when not
    /// positioned on a bracket — every call site in `stmt.rs`/`expr.rs`
    /// only reaches this after an `expect`, so a mismatch there is already
    /// an evaluator bug, not a user-facing error.
    pub fn skip_bracket(&mut self) {
        let close = self.tokens.skips[self.pos] as usize;
        self.pos = close + 1;
    }

    /// Index of the token matching the bracket at `self.pos`, without
    /// moving the cursor.
    pub fn matching(&self) -> usize {
        self.tokens.skips[self.pos] as usize
    }
}

/// How a statement (or a sequence of them) finished normally: fell
/// through, or is carrying a `break`/`continue`/`return` signal upward —
/// spec.md §4.4's "runtime flags word", represented here as an ordinary
/// Rust enum instead of host exceptions so every signal's propagation
/// through nested loops/blocks/`try` is explicit at every call site.
/// `throw` is *not* a `Flow` variant: it unwinds through `Result::Err`
/// (see [`Signal`]) so `?` does the propagation for free everywhere except
/// the handful of sites (`try`/`catch`, `execute`) that must intercept it.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Break(Option<Rc<str>>),
    Continue(Option<Rc<str>>),
    Return(ValueId),
}

impl Flow {
    pub fn is_normal(&self) -> bool {
        matches!(self, Flow::Normal)
    }
}

/// The `Err` side of every evaluation step. `Throw` carries a script-level
/// exception that a `try`/`catch` up the call stack may intercept;
/// `Fatal` is an engine-level condition (a loop/call-depth cap, a
/// malformed native signature) that no script-level `catch` can see.
#[derive(Debug)]
pub enum Signal {
    Throw(ValueId, Span),
    Fatal(EngineError),
}

impl From<EngineError> for Signal {
    fn from(e: EngineError) -> Self {
        Signal::Fatal(e)
    }
}

impl From<SyntaxError> for Signal {
    fn from(e: SyntaxError) -> Self {
        Signal::Fatal(EngineError::Syntax(e))
    }
}

pub type EvalResult<T> = Result<T, Signal>;

/// An assignable (or merely readable) expression result. Every precedence
/// level in `expr.rs` threads this type upward unresolved for as long as no
/// operator at that level actually fires, so a bare identifier or member
/// access reaching all the way up to `=` is still assignable.
#[derive(Debug, Clone)]
pub enum Link {
    /// A variable reference, resolved against a scope chain (which may
    /// fall through `with` targets) rather than a single fixed owner.
    Var { scope: ScopeChain, name: Rc<str> },
    /// A property on a concrete owner object (`obj.prop`, `arr[i]`).
    Prop { owner: ValueId, name: Rc<str> },
    /// A plain value with no assignable location (the result of any
    /// operator, a literal, a function's return value, ...).
    Value(ValueId),
}

impl Link {
    pub fn value(self) -> Option<ValueId> {
        match self {
            Link::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Reads through the reference, producing `undefined` for a missing
    /// property but a `ReferenceError`-style throw for an unbound
    /// variable, per spec.md §4.4.
    pub fn get(&self, engine: &mut Engine, span: Span) -> EvalResult<ValueId> {
        match self {
            Link::Var { scope, name } => match scope.get(&engine.heap, name) {
                Some(v) => Ok(v),
                None => {
                    let msg = format!("'{}' is not defined", name);
                    Err(Signal::Throw(engine.make_error_value(&msg, span), span))
                }
            },
            Link::Prop { owner, name } => resolve_prop(engine, *owner, name, span).map(|v| v.unwrap_or(engine.undefined)),
            Link::Value(v) => Ok(*v),
        }
    }

    /// Like `get`, but an unbound variable silently reads as `undefined`
    /// instead of throwing — `typeof x` on an undeclared `x` must not
    /// raise a `ReferenceError` in JS-family semantics. A too-deep
    /// prototype chain, or an exception thrown by a getter, is likewise
    /// swallowed to `undefined` here, since callers of this path have no
    /// way to propagate a `Signal`.
    pub fn get_or_undefined(&self, engine: &mut Engine) -> ValueId {
        match self {
            Link::Var { scope, name } => scope.get(&engine.heap, name).unwrap_or(engine.undefined),
            Link::Prop { owner, name } => resolve_prop(engine, *owner, name, Span::default())
                .ok()
                .flatten()
                .unwrap_or(engine.undefined),
            Link::Value(v) => *v,
        }
    }

    /// Writes through the reference. Assigning to a non-reference
    /// (`Link::Value`) is a no-op, matching evaluating e.g. `5 = 6` as a
    /// syntax error the grammar already rejects before reaching here in
    /// every real call site. A property backed by a `set` accessor invokes
    /// the setter once (spec.md §8 property 7) instead of overwriting the
    /// accessor pair.
    pub fn set(&self, engine: &mut Engine, value: ValueId) -> EvalResult<()> {
        match self {
            Link::Var { scope, name } => {
                if !scope.assign(&mut engine.heap, name, value) {
                    scope.declare_global(&mut engine.heap, name.clone(), value);
                }
                Ok(())
            }
            Link::Prop { owner, name } => {
                let accessor = engine
                    .heap
                    .slot(*owner)
                    .props
                    .find(name)
                    .filter(|e| e.attrs.is_accessor)
                    .map(|e| e.target);
                match accessor {
                    Some(pair) => {
                        if let Some(setter) = engine.heap.slot(pair).props.find("set").map(|e| e.target) {
                            call::call(engine, setter, *owner, &[value], Span::default())?;
                        }
                        Ok(())
                    }
                    None => {
                        scope::set_prop(&mut engine.heap, *owner, name, value, LinkAttrs::data());
                        Ok(())
                    }
                }
            }
            Link::Value(_) => Ok(()),
        }
    }

    /// `delete`'s target-specific behavior: removing a property succeeds
    /// or fails per its `deletable` attribute; deleting a variable binding
    /// is reported as `true`, matching non-strict JS's `delete` on a
    /// non-configurable reference; deleting a bare value (no assignable
    /// location to remove) reports `false` (spec.md §9).
    pub fn delete(&self, heap: &mut Heap) -> bool {
        match self {
            Link::Prop { owner, name } => heap.slot_mut(*owner).props.remove(name),
            Link::Var { .. } => true,
            Link::Value(_) => false,
        }
    }
}

/// `.length` on a string or array is computed, not stored (see `value.rs`'s
/// module doc comment), so it's intercepted here rather than ever landing in
/// a `PropertyTable`.
fn computed_length(engine: &mut Engine, owner: ValueId) -> Option<ValueId> {
    match &engine.heap.slot(owner).data {
        crate::value::ValueData::Str(s) => Some(s.chars().count() as i32),
        crate::value::ValueData::Array => Some(crate::value::array_length(&engine.heap, owner)),
        _ => None,
    }
    .map(|n| engine.heap.alloc(crate::value::ValueData::Int(n)))
}

/// Walks `owner`'s own property table, then its `.proto` chain, per spec.md
/// §3 invariant 4 ("`__proto__` lookup walks up to a configured depth cap").
/// A value with no explicit `.proto` link (every string/number/array/object
/// literal, which never stores one directly) falls back exactly once to its
/// type's built-in prototype (`engine.string_proto` and friends) before
/// continuing the walk — those prototypes *do* carry real `.proto` links
/// (set up once in `Engine::new`), so the depth cap only ever bites on a
/// genuinely long `Object.create`-style chain.
fn resolve_prop(engine: &mut Engine, owner: ValueId, name: &str, span: Span) -> EvalResult<Option<ValueId>> {
    if name == "length" {
        if let Some(len) = computed_length(engine, owner) {
            return Ok(Some(len));
        }
    }

    let mut current = Some(owner);
    let mut used_fallback = false;
    let mut depth = 0usize;
    while let Some(id) = current {
        if depth > engine.config.max_prototype_depth {
            return Err(EngineError::PrototypeChainTooDeep {
                limit: engine.config.max_prototype_depth,
                property: name.to_string(),
            }
            .into());
        }
        if let Some(entry) = engine.heap.slot(id).props.find(name) {
            if entry.attrs.is_accessor {
                let getter = engine.heap.slot(entry.target).props.find("get").map(|e| e.target);
                return match getter {
                    Some(getter) => Ok(Some(call::call(engine, getter, owner, &[], span)?)),
                    None => Ok(Some(engine.undefined)),
                };
            }
            return Ok(Some(entry.target));
        }
        depth += 1;
        current = engine.heap.slot(id).proto.or_else(|| {
            if used_fallback {
                None
            } else {
                used_fallback = true;
                default_prototype(engine, id)
            }
        });
    }
    Ok(None)
}

/// The implicit prototype a bare value of this type reads through when it
/// carries no explicit `.proto` link of its own.
fn default_prototype(engine: &Engine, id: ValueId) -> Option<ValueId> {
    match &engine.heap.slot(id).data {
        crate::value::ValueData::Str(_) => Some(engine.string_proto),
        crate::value::ValueData::Int(_) | crate::value::ValueData::Double(_) => {
            Some(engine.number_proto)
        }
        crate::value::ValueData::Array => Some(engine.array_proto),
        crate::value::ValueData::Object => Some(engine.object_proto),
        crate::value::ValueData::Function(_) | crate::value::ValueData::Native(_) => {
            Some(engine.function_proto)
        }
        _ => None,
    }
}
