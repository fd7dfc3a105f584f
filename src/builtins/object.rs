//! `Object` constructor and `Object.prototype` (SPEC_FULL.md §6.2).

use std::rc::Rc;

use super::{arg, bool_value, native_method, new_array, str_value};
use crate::engine::Engine;
use crate::heap::{LinkAttrs, ValueId};
use crate::scope::set_prop;
use crate::value::ValueData;

pub fn install(engine: &mut Engine) {
    let proto = engine.object_proto;

    native_method(engine, proto, "hasOwnProperty", 1, |engine, this, args| {
        let name = super::arg_str(engine, args, 0);
        Ok(bool_value(
            engine,
            engine.heap.slot(this).props.find(&name).is_some(),
        ))
    });

    native_method(engine, proto, "toString", 0, |engine, this, _args| {
        let tag = match &engine.heap.slot(this).data {
            ValueData::Array => "[object Array]",
            ValueData::Function(_) | ValueData::Native(_) => "[object Function]",
            _ => "[object Object]",
        };
        Ok(str_value(engine, tag))
    });

    native_method(engine, proto, "isPrototypeOf", 1, |engine, this, args| {
        let mut cur = engine.heap.slot(arg(args, 0, engine)).proto;
        while let Some(id) = cur {
            if id == this {
                return Ok(bool_value(engine, true));
            }
            cur = engine.heap.slot(id).proto;
        }
        Ok(bool_value(engine, false))
    });

    let ctor = engine.heap.alloc(ValueData::Native(Rc::new(crate::function::NativeFunction {
        name: Rc::from("Object"),
        arity: 1,
        callback: Box::new(|engine, _this, args| {
            Ok(args.first().copied().unwrap_or_else(|| engine.heap.alloc(ValueData::Object)))
        }),
    })));
    set_prop(&mut engine.heap, ctor, "prototype", proto, LinkAttrs::internal());

    native_method(engine, ctor, "keys", 1, |engine, _this, args| {
        let obj = arg(args, 0, engine);
        let names: Vec<ValueId> = engine
            .heap
            .slot(obj)
            .props
            .iter()
            .filter(|(_, e)| e.attrs.enumerable)
            .map(|(n, _)| n.clone())
            .collect::<Vec<_>>()
            .into_iter()
            .map(|n| str_value(engine, n))
            .collect();
        Ok(new_array(engine, names))
    });

    native_method(engine, ctor, "getPrototypeOf", 1, |engine, _this, args| {
        let obj = arg(args, 0, engine);
        Ok(engine.heap.slot(obj).proto.unwrap_or(engine.null_v))
    });

    native_method(engine, ctor, "create", 1, |engine, _this, args| {
        let proto_arg = arg(args, 0, engine);
        let obj = engine.heap.alloc(ValueData::Object);
        if !matches!(engine.heap.slot(proto_arg).data, ValueData::Null) {
            engine.heap.slot_mut(obj).proto = Some(proto_arg);
            crate::gc::ref_value(&mut engine.heap, proto_arg);
        }
        Ok(obj)
    });

    let top = engine.global.top;
    set_prop(&mut engine.heap, top, "Object", ctor, LinkAttrs::data());
}
