//! `Array` constructor and `Array.prototype` (SPEC_FULL.md §6.2). Arrays
//! are ordinary objects whose elements live as decimal-string properties
//! (spec.md §3), so every method here reads/writes through
//! `super::array_items`/`super::replace_array_contents` rather than any
//! dedicated storage.

use std::rc::Rc;

use super::{arg, arg_num, bool_value, invoke, native_method, new_array, num_value, replace_array_contents, str_value};
use crate::engine::Engine;
use crate::heap::{LinkAttrs, ValueId};
use crate::scope::set_prop;
use crate::value::{self, ValueData};

pub fn install(engine: &mut Engine) {
    let proto = engine.array_proto;

    native_method(engine, proto, "push", 1, |engine, this, args| {
        let mut items = super::array_items(engine, this);
        items.extend_from_slice(args);
        let len = items.len();
        replace_array_contents(engine, this, &items);
        Ok(num_value(engine, len as f64))
    });

    native_method(engine, proto, "pop", 0, |engine, this, _args| {
        let mut items = super::array_items(engine, this);
        let last = items.pop().unwrap_or(engine.undefined);
        replace_array_contents(engine, this, &items);
        Ok(last)
    });

    native_method(engine, proto, "shift", 0, |engine, this, _args| {
        let mut items = super::array_items(engine, this);
        if items.is_empty() {
            return Ok(engine.undefined);
        }
        let first = items.remove(0);
        replace_array_contents(engine, this, &items);
        Ok(first)
    });

    native_method(engine, proto, "unshift", 1, |engine, this, args| {
        let mut items = super::array_items(engine, this);
        for (i, &a) in args.iter().enumerate() {
            items.insert(i, a);
        }
        let len = items.len();
        replace_array_contents(engine, this, &items);
        Ok(num_value(engine, len as f64))
    });

    native_method(engine, proto, "indexOf", 1, |engine, this, args| {
        let needle = arg(args, 0, engine);
        let items = super::array_items(engine, this);
        let idx = items
            .iter()
            .position(|&v| value::strict_equals(&engine.heap, v, needle));
        Ok(num_value(engine, idx.map(|i| i as f64).unwrap_or(-1.0)))
    });

    native_method(engine, proto, "join", 1, |engine, this, args| {
        let sep = if args.is_empty() {
            ",".to_string()
        } else {
            super::arg_str(engine, args, 0).to_string()
        };
        let items = super::array_items(engine, this);
        let parts: Vec<String> = items
            .iter()
            .map(|&v| value::to_js_string(&engine.heap, v).to_string())
            .collect();
        Ok(str_value(engine, parts.join(&sep)))
    });

    native_method(engine, proto, "slice", 2, |engine, this, args| {
        let items = super::array_items(engine, this);
        let (start, end) = slice_bounds(items.len(), engine, args);
        Ok(new_array(engine, items[start..end].iter().copied()))
    });

    native_method(engine, proto, "splice", 2, |engine, this, args| {
        let mut items = super::array_items(engine, this);
        let start = normalize_index(arg_num(engine, args, 0) as i64, items.len());
        let delete_count = if args.len() > 1 {
            (arg_num(engine, args, 1) as i64).max(0) as usize
        } else {
            items.len() - start
        }
        .min(items.len() - start);
        let removed: Vec<ValueId> = items.splice(start..start + delete_count, args.iter().skip(2).copied()).collect();
        replace_array_contents(engine, this, &items);
        Ok(new_array(engine, removed))
    });

    native_method(engine, proto, "concat", 1, |engine, this, args| {
        let mut items = super::array_items(engine, this);
        for &a in args {
            if matches!(engine.heap.slot(a).data, ValueData::Array) {
                items.extend(super::array_items(engine, a));
            } else {
                items.push(a);
            }
        }
        Ok(new_array(engine, items))
    });

    native_method(engine, proto, "reverse", 0, |engine, this, _args| {
        let mut items = super::array_items(engine, this);
        items.reverse();
        replace_array_contents(engine, this, &items);
        Ok(this)
    });

    native_method(engine, proto, "sort", 1, |engine, this, args| {
        let mut items = super::array_items(engine, this);
        let cmp = args.first().copied();
        match cmp {
            Some(f) => {
                let mut err = None;
                items.sort_by(|&a, &b| {
                    if err.is_some() {
                        return std::cmp::Ordering::Equal;
                    }
                    match invoke(engine, f, engine.undefined, &[a, b]) {
                        Ok(r) => value::to_number(&engine.heap, r)
                            .partial_cmp(&0.0)
                            .unwrap_or(std::cmp::Ordering::Equal),
                        Err(e) => {
                            err = Some(e);
                            std::cmp::Ordering::Equal
                        }
                    }
                });
                if let Some(e) = err {
                    return Err(e);
                }
            }
            None => items.sort_by(|&a, &b| {
                value::to_js_string(&engine.heap, a).cmp(&value::to_js_string(&engine.heap, b))
            }),
        }
        replace_array_contents(engine, this, &items);
        Ok(this)
    });

    native_method(engine, proto, "forEach", 1, |engine, this, args| {
        let f = arg(args, 0, engine);
        let items = super::array_items(engine, this);
        for (i, item) in items.into_iter().enumerate() {
            let idx = num_value(engine, i as f64);
            invoke(engine, f, engine.undefined, &[item, idx, this])?;
        }
        Ok(engine.undefined)
    });

    native_method(engine, proto, "map", 1, |engine, this, args| {
        let f = arg(args, 0, engine);
        let items = super::array_items(engine, this);
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let idx = num_value(engine, i as f64);
            out.push(invoke(engine, f, engine.undefined, &[item, idx, this])?);
        }
        Ok(new_array(engine, out))
    });

    native_method(engine, proto, "filter", 1, |engine, this, args| {
        let f = arg(args, 0, engine);
        let items = super::array_items(engine, this);
        let mut out = Vec::new();
        for (i, item) in items.into_iter().enumerate() {
            let idx = num_value(engine, i as f64);
            let keep = invoke(engine, f, engine.undefined, &[item, idx, this])?;
            if value::to_bool(&engine.heap, keep) {
                out.push(item);
            }
        }
        Ok(new_array(engine, out))
    });

    native_method(engine, proto, "reduce", 2, |engine, this, args| {
        let f = arg(args, 0, engine);
        let items = super::array_items(engine, this);
        let mut iter = items.into_iter().enumerate();
        let mut acc = if args.len() > 1 {
            arg(args, 1, engine)
        } else {
            match iter.next() {
                Some((_, v)) => v,
                None => return Err(super::throw_str(engine, "Reduce of empty array with no initial value")),
            }
        };
        for (i, item) in iter {
            let idx = num_value(engine, i as f64);
            acc = invoke(engine, f, engine.undefined, &[acc, item, idx, this])?;
        }
        Ok(acc)
    });

    native_method(engine, proto, "toString", 0, |engine, this, _args| {
        let items = super::array_items(engine, this);
        let parts: Vec<String> = items
            .iter()
            .map(|&v| value::to_js_string(&engine.heap, v).to_string())
            .collect();
        Ok(str_value(engine, parts.join(",")))
    });

    let ctor = engine.heap.alloc(ValueData::Native(Rc::new(crate::function::NativeFunction {
        name: Rc::from("Array"),
        arity: 0,
        callback: Box::new(|engine, _this, args| {
            if args.len() == 1 && value::to_number(&engine.heap, args[0]).fract() == 0.0 {
                let n = value::to_number(&engine.heap, args[0]) as usize;
                Ok(new_array(engine, std::iter::repeat(engine.undefined).take(n)))
            } else {
                Ok(new_array(engine, args.iter().copied()))
            }
        }),
    })));
    set_prop(&mut engine.heap, ctor, "prototype", proto, LinkAttrs::internal());
    native_method(engine, ctor, "isArray", 1, |engine, _this, args| {
        Ok(bool_value(engine, matches!(engine.heap.slot(arg(args, 0, engine)).data, ValueData::Array)))
    });

    let top = engine.global.top;
    set_prop(&mut engine.heap, top, "Array", ctor, LinkAttrs::data());
}

fn normalize_index(i: i64, len: usize) -> usize {
    if i < 0 {
        (len as i64 + i).max(0) as usize
    } else {
        (i as usize).min(len)
    }
}

fn slice_bounds(len: usize, engine: &mut Engine, args: &[ValueId]) -> (usize, usize) {
    let start = if args.is_empty() {
        0
    } else {
        normalize_index(arg_num(engine, args, 0) as i64, len)
    };
    let end = if args.len() < 2 {
        len
    } else {
        normalize_index(arg_num(engine, args, 1) as i64, len)
    };
    (start, end.max(start))
}
