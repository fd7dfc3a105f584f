//! The function call protocol (spec.md §4.5): binding `this`, building an
//! `arguments` array, opening a fresh activation scope closed over the
//! function's captured scope, and enforcing the call-depth safety cap.

use std::rc::Rc;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::eval::stmt;
use crate::eval::{Cursor, EvalResult, Flow, Signal};
use crate::gc;
use crate::heap::ValueId;
use crate::scope::ScopeKind;
use crate::value::ValueData;

/// Invokes `callee` (a script function or a native callback) with the given
/// `this` binding and arguments, returning its result value.
///
/// `span` is only used to attribute a `StackOverflow` error to a call site;
/// it is not the function body's own location.
pub fn call(
    engine: &mut Engine,
    callee: ValueId,
    this: ValueId,
    args: &[ValueId],
    span: crate::span::Span,
) -> EvalResult<ValueId> {
    if engine.call_depth >= engine.config.max_call_depth {
        return Err(Signal::from(EngineError::StackOverflow {
            limit: engine.config.max_call_depth,
            span,
        }));
    }

    if let Some(native) = engine.heap.slot(callee).data.as_native().cloned() {
        engine.call_depth += 1;
        let result = (native.callback)(engine, this, args);
        engine.call_depth -= 1;
        return result.map_err(|v| Signal::Throw(v, span));
    }

    let Some(desc) = engine.heap.slot(callee).data.as_function().cloned() else {
        let msg = format!("{} is not a function", describe(engine, callee));
        let err = engine.make_error_value(&msg, span);
        return Err(Signal::Throw(err, span));
    };

    engine.call_depth += 1;
    let outer = engine.scope;
    let outer_var_scope = engine.var_scope;

    let closure = desc
        .closure
        .map(|top| crate::scope::ScopeChain {
            top,
            kind: ScopeKind::Root,
        })
        .unwrap_or(engine.global);
    let activation = closure.push(&mut engine.heap, ScopeKind::FunctionActivation);
    gc::ref_value(&mut engine.heap, activation.top);

    for (i, param) in desc.params.iter().enumerate() {
        let value = args.get(i).copied().unwrap_or(engine.undefined);
        activation.declare(&mut engine.heap, param.clone(), value);
    }

    let arguments_obj = build_arguments(engine, args);
    activation.declare(&mut engine.heap, Rc::from("arguments"), arguments_obj);
    activation.declare(&mut engine.heap, Rc::from("this"), this);

    engine.scope = activation;
    engine.var_scope = activation;

    let mut body_cursor = Cursor::at(desc.tokens.clone(), desc.body_start);
    let flow = stmt::exec_block(engine, &mut body_cursor, true, stmt::ExecContext::function());

    engine.scope = outer;
    engine.var_scope = outer_var_scope;
    gc::unref_value(&mut engine.heap, activation.top);
    engine.call_depth -= 1;

    let flow = flow?;
    Ok(match flow {
        Flow::Return(v) => v,
        _ => engine.undefined,
    })
}

/// Builds the per-call `arguments` array-like object.
fn build_arguments(engine: &mut Engine, args: &[ValueId]) -> ValueId {
    let arr = engine.heap.alloc(ValueData::Array);
    for (i, &a) in args.iter().enumerate() {
        crate::scope::set_prop(
            &mut engine.heap,
            arr,
            &i.to_string(),
            a,
            crate::heap::LinkAttrs::data(),
        );
    }
    arr
}

fn describe(engine: &Engine, id: ValueId) -> String {
    crate::value::to_js_string(&engine.heap, id).to_string()
}
