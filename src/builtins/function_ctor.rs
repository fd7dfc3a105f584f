//! `Function.prototype.call`/`.apply`/`.bind` (SPEC_FULL.md §6.2). The
//! `Function` constructor itself is built on top of `Engine::evaluate`,
//! since a function built from a string has no token-buffer home of its
//! own until it's synthesized as source and parsed like anything else.

use std::rc::Rc;

use super::{arg, array_items, invoke, native_method};
use crate::engine::Engine;
use crate::heap::{LinkAttrs, ValueId};
use crate::scope::set_prop;
use crate::value::{self, ValueData};

pub fn install(engine: &mut Engine) {
    let proto = engine.function_proto;

    native_method(engine, proto, "call", 1, |engine, this, args| {
        let bound_this = arg(args, 0, engine);
        invoke(engine, this, bound_this, &args[1.min(args.len())..])
    });

    native_method(engine, proto, "apply", 2, |engine, this, args| {
        let bound_this = arg(args, 0, engine);
        let call_args = if args.len() > 1 && matches!(engine.heap.slot(args[1]).data, ValueData::Array) {
            array_items(engine, args[1])
        } else {
            Vec::new()
        };
        invoke(engine, this, bound_this, &call_args)
    });

    native_method(engine, proto, "bind", 1, |engine, this, args| {
        let bound_this = arg(args, 0, engine);
        let preset: Vec<ValueId> = args.iter().skip(1).copied().collect();
        let desc = BoundFunction {
            target: this,
            this: bound_this,
            preset,
        };
        let native = crate::function::NativeFunction {
            name: Rc::from("bound"),
            arity: 0,
            callback: Box::new(move |engine, _this, call_args| {
                let mut all = desc.preset.clone();
                all.extend_from_slice(call_args);
                invoke(engine, desc.target, desc.this, &all)
            }),
        };
        Ok(engine.heap.alloc(ValueData::Native(Rc::new(native))))
    });

    native_method(engine, proto, "toString", 0, |engine, this, _args| {
        Ok(engine.heap.alloc(ValueData::Str(value::to_js_string(&engine.heap, this))))
    });

    let ctor = engine.heap.alloc(ValueData::Native(Rc::new(crate::function::NativeFunction {
        name: Rc::from("Function"),
        arity: 0,
        callback: Box::new(|engine, _this, args| {
            let (params, body) = match args.split_last() {
                Some((body, params)) => (
                    params.iter().map(|&p| value::to_js_string(&engine.heap, p).to_string()).collect::<Vec<_>>(),
                    value::to_js_string(&engine.heap, *body),
                ),
                None => (Vec::new(), "".into()),
            };
            let src = format!("(function({}) {{ {} }});", params.join(","), body);
            engine
                .evaluate_complex(&src, "<Function>")
                .map_err(|e| super::error_value(engine, e))
        }),
    })));
    set_prop(&mut engine.heap, ctor, "prototype", proto, LinkAttrs::internal());

    let top = engine.global.top;
    set_prop(&mut engine.heap, top, "Function", ctor, LinkAttrs::data());
}

struct BoundFunction {
    target: ValueId,
    this: ValueId,
    preset: Vec<ValueId>,
}
