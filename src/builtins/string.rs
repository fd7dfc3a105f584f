//! `String` constructor and `String.prototype` (SPEC_FULL.md §6.2).

use std::rc::Rc;

use super::{arg_num, arg_str, bool_value, native_method, new_array, num_value, str_value};
use crate::engine::Engine;
use crate::heap::LinkAttrs;
use crate::scope::set_prop;
use crate::value::{self, ValueData};

pub fn install(engine: &mut Engine) {
    let proto = engine.string_proto;

    native_method(engine, proto, "charAt", 1, |engine, this, args| {
        let s = value::to_js_string(&engine.heap, this);
        let i = arg_num(engine, args, 0) as i64;
        let ch = if i < 0 { None } else { s.chars().nth(i as usize) };
        Ok(str_value(engine, ch.map(|c| c.to_string()).unwrap_or_default()))
    });

    native_method(engine, proto, "charCodeAt", 1, |engine, this, args| {
        let s = value::to_js_string(&engine.heap, this);
        let i = arg_num(engine, args, 0) as i64;
        let code = if i < 0 {
            None
        } else {
            s.chars().nth(i as usize).map(|c| c as u32 as f64)
        };
        Ok(num_value(engine, code.unwrap_or(f64::NAN)))
    });

    native_method(engine, proto, "indexOf", 1, |engine, this, args| {
        let s = value::to_js_string(&engine.heap, this);
        let needle = arg_str(engine, args, 0);
        let idx = if needle.is_empty() {
            Some(0)
        } else {
            s.char_indices().position(|(i, _)| s[i..].starts_with(needle.as_ref()))
        };
        Ok(num_value(engine, idx.map(|i| i as f64).unwrap_or(-1.0)))
    });

    native_method(engine, proto, "substring", 2, |engine, this, args| {
        let s = value::to_js_string(&engine.heap, this);
        let chars: Vec<char> = s.chars().collect();
        let len = chars.len();
        let mut start = (arg_num(engine, args, 0) as i64).clamp(0, len as i64) as usize;
        let mut end = if args.len() > 1 {
            (arg_num(engine, args, 1) as i64).clamp(0, len as i64) as usize
        } else {
            len
        };
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        Ok(str_value(engine, chars[start..end].iter().collect::<String>()))
    });

    native_method(engine, proto, "slice", 2, |engine, this, args| {
        let s = value::to_js_string(&engine.heap, this);
        let chars: Vec<char> = s.chars().collect();
        let len = chars.len() as i64;
        let norm = |n: i64| -> usize { (if n < 0 { (len + n).max(0) } else { n.min(len) }) as usize };
        let start = norm(arg_num(engine, args, 0) as i64);
        let end = if args.len() > 1 {
            norm(arg_num(engine, args, 1) as i64)
        } else {
            len as usize
        };
        let end = end.max(start);
        Ok(str_value(engine, chars[start..end].iter().collect::<String>()))
    });

    native_method(engine, proto, "split", 1, |engine, this, args| {
        let s = value::to_js_string(&engine.heap, this);
        if args.is_empty() {
            return Ok(new_array(engine, [str_value(engine, s)]));
        }
        let sep = arg_str(engine, args, 0);
        let parts: Vec<_> = if sep.is_empty() {
            s.chars().map(|c| str_value(engine, c.to_string())).collect()
        } else {
            s.split(sep.as_ref()).map(|p| str_value(engine, p.to_string())).collect()
        };
        Ok(new_array(engine, parts))
    });

    native_method(engine, proto, "toUpperCase", 0, |engine, this, _args| {
        let s = value::to_js_string(&engine.heap, this);
        Ok(str_value(engine, s.to_uppercase()))
    });

    native_method(engine, proto, "toLowerCase", 0, |engine, this, _args| {
        let s = value::to_js_string(&engine.heap, this);
        Ok(str_value(engine, s.to_lowercase()))
    });

    native_method(engine, proto, "trim", 0, |engine, this, _args| {
        let s = value::to_js_string(&engine.heap, this);
        Ok(str_value(engine, s.trim().to_string()))
    });

    native_method(engine, proto, "concat", 1, |engine, this, args| {
        let mut s = value::to_js_string(&engine.heap, this).to_string();
        for &a in args {
            s.push_str(&value::to_js_string(&engine.heap, a));
        }
        Ok(str_value(engine, s))
    });

    native_method(engine, proto, "replace", 2, |engine, this, args| {
        let s = value::to_js_string(&engine.heap, this);
        let from = arg_str(engine, args, 0);
        let to = arg_str(engine, args, 1);
        Ok(str_value(engine, s.replacen(from.as_ref(), &to, 1)))
    });

    native_method(engine, proto, "toString", 0, |engine, this, _args| {
        Ok(str_value(engine, value::to_js_string(&engine.heap, this)))
    });

    native_method(engine, proto, "startsWith", 1, |engine, this, args| {
        let s = value::to_js_string(&engine.heap, this);
        let needle = arg_str(engine, args, 0);
        Ok(bool_value(engine, s.starts_with(needle.as_ref())))
    });

    native_method(engine, proto, "endsWith", 1, |engine, this, args| {
        let s = value::to_js_string(&engine.heap, this);
        let needle = arg_str(engine, args, 0);
        Ok(bool_value(engine, s.ends_with(needle.as_ref())))
    });

    let ctor = engine.heap.alloc(ValueData::Native(Rc::new(crate::function::NativeFunction {
        name: Rc::from("String"),
        arity: 1,
        callback: Box::new(|engine, _this, args| {
            let s = if args.is_empty() {
                "".into()
            } else {
                value::to_js_string(&engine.heap, args[0])
            };
            Ok(str_value(engine, s))
        }),
    })));
    set_prop(&mut engine.heap, ctor, "prototype", proto, LinkAttrs::internal());
    native_method(engine, ctor, "fromCharCode", 1, |engine, _this, args| {
        let s: String = args
            .iter()
            .filter_map(|&a| char::from_u32(value::to_number(&engine.heap, a) as u32))
            .collect();
        Ok(str_value(engine, s))
    });

    let top = engine.global.top;
    set_prop(&mut engine.heap, top, "String", ctor, LinkAttrs::data());
}

