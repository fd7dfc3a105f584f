//! The embedding API (spec.md §6): `Engine` owns one heap, one scope chain,
//! and the handful of singleton values every script sees (`undefined`,
//! `null`, `true`, `false`), and exposes `execute`/`evaluate`/
//! `evaluate_complex`/`get_variable`/`register_native`/`trace` the way a
//! host embeds the interpreter.

use std::rc::Rc;

use crate::error::EngineError;
use crate::eval::call;
use crate::eval::stmt;
use crate::eval::Cursor;
use crate::function::NativeFunction;
use crate::gc;
use crate::heap::{Heap, LinkAttrs, ValueId};
use crate::scope::{ScopeChain, ScopeKind};
use crate::span::Span;
use crate::tokenizer::TokenBuffer;
use crate::value::{self, ValueData};

/// The three tunables spec.md calls out by name: spec.md §4.5's
/// `TINYJS_LOOP_MAX_ITERATIONS`, §4.6's call-depth safety cap, and §3
/// invariant 4's prototype-chain traversal cap.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub max_loop_iterations: u64,
    pub max_call_depth: usize,
    pub max_prototype_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: 1_000_000,
            max_call_depth: 512,
            max_prototype_depth: 256,
        }
    }
}

/// One interpreter instance (spec.md §5: `Engine: Send`, never `Sync` —
/// nothing here is behind an `Arc`/lock, so two engines may run on separate
/// threads but a single one is never shared concurrently).
pub struct Engine {
    pub heap: Heap,
    /// The program-level scope; never moves once built.
    pub global: ScopeChain,
    /// The current lexical scope (what identifier lookup walks from).
    pub scope: ScopeChain,
    /// The nearest enclosing function-activation-or-root scope — where a
    /// hoisted `var`/`let` pre-declaration actually lands, which may differ
    /// from `scope` inside a `with`/`catch` block (spec.md §4.4).
    pub var_scope: ScopeChain,
    pub config: EngineConfig,
    pub call_depth: usize,
    /// The value of the last expression statement executed, read back by
    /// `evaluate`/`evaluate_complex` (spec.md §6).
    pub completion: ValueId,

    pub undefined: ValueId,
    pub null_v: ValueId,
    pub true_v: ValueId,
    pub false_v: ValueId,

    pub object_proto: ValueId,
    pub array_proto: ValueId,
    pub function_proto: ValueId,
    pub string_proto: ValueId,
    pub number_proto: ValueId,
    pub error_proto: ValueId,

    /// Where `console.log`/`print` writes (spec.md §6's output hook).
    /// Defaults to stdout; a host embedder can redirect it with
    /// [`Engine::set_output`] to capture script output instead.
    pub output: Box<dyn std::io::Write>,
}

impl Engine {
    /// Builds a fresh interpreter: allocates the singleton values, the
    /// prototype objects, the root scope, and installs the built-in global
    /// surface (spec.md §6's "Built-in global surface").
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut heap = Heap::new();

        let undefined = heap.alloc(ValueData::Undefined);
        let null = heap.alloc(ValueData::Null);
        let true_v = heap.alloc(ValueData::Bool(true));
        let false_v = heap.alloc(ValueData::Bool(false));
        for v in [undefined, null, true_v, false_v] {
            gc::ref_value(&mut heap, v);
        }

        let object_proto = heap.alloc(ValueData::Object);
        let array_proto = heap.alloc(ValueData::Object);
        let function_proto = heap.alloc(ValueData::Object);
        let string_proto = heap.alloc(ValueData::Object);
        let number_proto = heap.alloc(ValueData::Object);
        let error_proto = heap.alloc(ValueData::Object);
        for v in [
            object_proto,
            array_proto,
            function_proto,
            string_proto,
            number_proto,
            error_proto,
        ] {
            gc::ref_value(&mut heap, v);
        }
        // Every built-in prototype chains up to `Object.prototype`, just as
        // in real JS — only `object_proto` itself is the root.
        for v in [array_proto, function_proto, string_proto, number_proto, error_proto] {
            heap.slot_mut(v).proto = Some(object_proto);
            gc::ref_value(&mut heap, object_proto);
        }

        let global = ScopeChain::new_root(&mut heap);

        let mut engine = Engine {
            heap,
            global,
            scope: global,
            var_scope: global,
            config,
            call_depth: 0,
            completion: undefined,
            undefined,
            null_v: null,
            true_v,
            false_v,
            object_proto,
            array_proto,
            function_proto,
            string_proto,
            number_proto,
            error_proto,
            output: Box::new(std::io::stdout()),
        };

        crate::builtins::install(&mut engine);
        engine
    }

    /// Redirects `console.log`/`print` output, e.g. to an in-memory buffer
    /// for test assertions or a host UI's own log pane.
    pub fn set_output(&mut self, sink: Box<dyn std::io::Write>) {
        self.output = sink;
    }

    /// Allocates `data` into the heap without giving it an owned reference
    /// yet — mirrors [`Heap::alloc`]'s "caller refs it once stored"
    /// contract.
    pub fn alloc(&mut self, data: ValueData) -> ValueId {
        self.heap.alloc(data)
    }

    /// The shared `true`/`false` singleton for a Rust `bool`.
    pub fn bool_value(&self, b: bool) -> ValueId {
        if b {
            self.true_v
        } else {
            self.false_v
        }
    }

    /// Builds an Error-like object (`message`, `__proto__` set to
    /// `error_proto`) for engine-raised conditions ("X is not a function",
    /// unbound identifiers, ...), matching what a script-level `throw new
    /// Error(...)` would produce.
    pub fn make_error_value(&mut self, message: &str, span: Span) -> ValueId {
        let _ = span;
        let err = self.heap.alloc(ValueData::Object);
        let msg = self.heap.alloc(ValueData::Str(Rc::from(message)));
        crate::scope::set_prop(&mut self.heap, err, "message", msg, LinkAttrs::data());
        self.heap.slot_mut(err).proto = Some(self.error_proto);
        gc::ref_value(&mut self.heap, self.error_proto);
        err
    }

    fn parse(&self, source: &str, file: &str) -> Result<Rc<TokenBuffer>, EngineError> {
        let buf = TokenBuffer::build(source, file).map_err(|e| EngineError::Syntax(e.into()))?;
        Ok(Rc::new(buf))
    }

    /// Parses and evaluates `source` purely for side effects (spec.md §6).
    pub fn execute(&mut self, source: &str, file: &str) -> Result<(), EngineError> {
        let tokens = self.parse(source, file)?;
        let mut cursor = Cursor::new(tokens);
        log::debug!("liljs: executing {} bytes from '{}'", source.len(), file);
        stmt::exec_program(self, &mut cursor).map_err(|signal| self.into_engine_error(signal))
    }

    /// Parses, evaluates, and returns the last expression statement's value
    /// coerced to a string (spec.md §6).
    pub fn evaluate(&mut self, source: &str, file: &str) -> Result<Rc<str>, EngineError> {
        let v = self.evaluate_complex(source, file)?;
        Ok(value::to_js_string(&self.heap, v))
    }

    /// Same as [`Engine::evaluate`] but returns the value itself.
    pub fn evaluate_complex(&mut self, source: &str, file: &str) -> Result<ValueId, EngineError> {
        self.completion = self.undefined;
        self.execute(source, file)?;
        Ok(self.completion)
    }

    /// Dotted-path lookup from the root scope (`"Math.PI"`-style), per
    /// spec.md §6's `getVariable`.
    pub fn get_variable(&self, dotted_path: &str) -> Option<ValueId> {
        let mut segments = dotted_path.split('.');
        let first = segments.next()?;
        let mut current = self.global.get(&self.heap, first)?;
        for seg in segments {
            current = self.heap.slot(current).props.find(seg)?.target;
        }
        Some(current)
    }

    /// Installs a native callback at `signature`'s named path inside the
    /// root, creating intermediate Object nodes as needed — spec.md §6's
    /// `registerNative(signature, callback, userData)`, minus the C-side
    /// `userData` pointer (closures capture their own state in Rust).
    ///
    /// `signature` has the shape `function [Receiver.prototype.]name(p1, p2,
    /// ...)`; only the name and arity are read out of it; the parameter
    /// names are documentation for the embedder, since natives receive their
    /// arguments positionally.
    pub fn register_native<F>(&mut self, signature: &str, callback: F) -> Result<(), EngineError>
    where
        F: Fn(&mut Engine, ValueId, &[ValueId]) -> Result<ValueId, ValueId> + 'static,
    {
        let (path, arity) = parse_native_signature(signature)?;
        let name: Rc<str> = Rc::from(path.last().cloned().unwrap_or_default());

        let native = NativeFunction {
            name: name.clone(),
            arity,
            callback: Box::new(callback),
        };
        let func_val = self.heap.alloc(ValueData::Native(Rc::new(native)));

        let mut owner = self.global.top;
        for seg in &path[..path.len() - 1] {
            owner = match self.heap.slot(owner).props.find(seg).map(|e| e.target) {
                Some(existing) => existing,
                None => {
                    let child = self.heap.alloc(ValueData::Object);
                    crate::scope::set_prop(&mut self.heap, owner, seg, child, LinkAttrs::data());
                    child
                }
            };
        }
        crate::scope::set_prop(&mut self.heap, owner, &name, func_val, LinkAttrs::data());
        Ok(())
    }

    /// Dumps the entire reachable value graph (from root) for debugging —
    /// spec.md §6's `trace()`.
    pub fn trace(&self) -> String {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        let mut out = String::new();
        trace_walk(&self.heap, self.global.top, &mut seen, &mut out, 0);
        out
    }

    fn into_engine_error(&self, signal: crate::eval::Signal) -> EngineError {
        match signal {
            crate::eval::Signal::Fatal(e) => e,
            crate::eval::Signal::Throw(v, span) => {
                EngineError::thrown(value::get_parsable_string(&self.heap, v, 0), span)
            }
        }
    }

    /// Invokes a callable value directly (used by `Function.prototype.call`
    /// / `.apply` and by `eval`'s host-side glue).
    pub fn call(
        &mut self,
        callee: ValueId,
        this: ValueId,
        args: &[ValueId],
        span: Span,
    ) -> Result<ValueId, EngineError> {
        call::call(self, callee, this, args, span).map_err(|s| self.into_engine_error(s))
    }

    /// Opens a brand-new child function-activation scope closed over
    /// `closure`, used by `builtins` when it needs to construct a
    /// [`FunctionDescriptor`] without going through `expr::function_literal`
    /// (e.g. `Function` constructor glue).
    pub fn push_activation(&mut self, closure: ScopeChain) -> ScopeChain {
        closure.push(&mut self.heap, ScopeKind::FunctionActivation)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn trace_walk(
    heap: &Heap,
    id: ValueId,
    seen: &mut std::collections::HashSet<ValueId>,
    out: &mut String,
    depth: usize,
) {
    if !seen.insert(id) || !heap.is_live(id) {
        return;
    }
    out.push_str(&"  ".repeat(depth));
    out.push_str(&format!(
        "{:?}: {} (refs={})\n",
        id,
        heap.slot(id).data.type_name(),
        heap.slot(id).refs
    ));
    for (name, entry) in heap.slot(id).props.iter() {
        out.push_str(&"  ".repeat(depth + 1));
        out.push_str(&format!("{}:\n", name));
        trace_walk(heap, entry.target, seen, out, depth + 2);
    }
}

/// Parses `function [Receiver.prototype.]name(p1, p2, ...)` into a dotted
/// install path (e.g. `["String", "prototype", "trim"]`) and the parameter
/// count.
fn parse_native_signature(signature: &str) -> Result<(Vec<String>, usize), EngineError> {
    let sig = signature.trim();
    let sig = sig
        .strip_prefix("function ")
        .or_else(|| sig.strip_prefix("function"))
        .ok_or_else(|| EngineError::InvalidNativeSignature {
            signature: signature.to_string(),
            reason: "expected a leading 'function' keyword".into(),
        })?
        .trim();

    let open = sig.find('(').ok_or_else(|| EngineError::InvalidNativeSignature {
        signature: signature.to_string(),
        reason: "missing '('".into(),
    })?;
    let close = sig.find(')').ok_or_else(|| EngineError::InvalidNativeSignature {
        signature: signature.to_string(),
        reason: "missing ')'".into(),
    })?;

    let name_part = sig[..open].trim();
    if name_part.is_empty() {
        return Err(EngineError::InvalidNativeSignature {
            signature: signature.to_string(),
            reason: "missing a name before '('".into(),
        });
    }
    let path: Vec<String> = name_part.split('.').map(|s| s.to_string()).collect();

    let params = sig[open + 1..close].trim();
    let arity = if params.is_empty() {
        0
    } else {
        params.split(',').count()
    };

    Ok((path, arity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executes_arithmetic_and_sets_result() {
        let mut engine = Engine::new();
        engine
            .execute("function f(x,y){return x+y;} result = f(1,2);", "t")
            .unwrap();
        let result = engine.get_variable("result").unwrap();
        assert_eq!(value::to_number(&engine.heap, result), 3.0);
    }

    #[test]
    fn evaluate_returns_last_expression_value() {
        let mut engine = Engine::new();
        let v = engine.evaluate_complex("1 + 2;", "t").unwrap();
        assert_eq!(value::to_number(&engine.heap, v), 3.0);
    }

    #[test]
    fn for_loop_accumulates() {
        let mut engine = Engine::new();
        engine
            .execute("var a=0; for (var i=0;i<10;i++) a+=i; result = a;", "t")
            .unwrap();
        let result = engine.get_variable("result").unwrap();
        assert_eq!(value::to_number(&engine.heap, result), 45.0);
    }

    #[test]
    fn try_catch_finally_runs_once() {
        let mut engine = Engine::new();
        engine
            .execute(
                "var s=\"\"; try { throw \"boom\"; } catch(e) { s=e; } finally { s+=\"/fin\"; } result = s;",
                "t",
            )
            .unwrap();
        let result = engine.get_variable("result").unwrap();
        assert_eq!(value::to_js_string(&engine.heap, result).as_ref(), "boom/fin");
    }

    #[test]
    fn loop_cap_aborts_infinite_loop() {
        let mut engine = Engine::with_config(EngineConfig {
            max_loop_iterations: 1_000,
            ..EngineConfig::default()
        });
        let err = engine.execute("while (true) {}", "t").unwrap_err();
        assert!(matches!(err, EngineError::LoopLimit { .. }));
    }

    #[test]
    fn register_native_is_callable_from_script() {
        let mut engine = Engine::new();
        engine
            .register_native("function double(x)", |engine, _this, args| {
                let x = value::to_number(&engine.heap, args[0]);
                Ok(engine.heap.alloc(ValueData::Double(x * 2.0)))
            })
            .unwrap();
        engine.execute("result = double(21);", "t").unwrap();
        let result = engine.get_variable("result").unwrap();
        assert_eq!(value::to_number(&engine.heap, result), 42.0);
    }
}
