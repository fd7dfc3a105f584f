//! `Number` constructor and `Number.prototype.toString(radix)`
//! (SPEC_FULL.md §6.2).

use std::rc::Rc;

use super::{arg_num, native_method, num_value, str_value};
use crate::engine::Engine;
use crate::heap::LinkAttrs;
use crate::scope::set_prop;
use crate::value::{self, ValueData};

pub fn install(engine: &mut Engine) {
    let proto = engine.number_proto;

    native_method(engine, proto, "toString", 1, |engine, this, args| {
        let n = value::to_number(&engine.heap, this);
        let radix = if args.is_empty() { 10 } else { arg_num(engine, args, 0) as u32 };
        if radix == 10 {
            return Ok(str_value(engine, value::format_double(n)));
        }
        Ok(str_value(engine, to_radix_string(n, radix)))
    });

    native_method(engine, proto, "valueOf", 0, |engine, this, _args| {
        Ok(num_value(engine, value::to_number(&engine.heap, this)))
    });

    native_method(engine, proto, "toFixed", 1, |engine, this, args| {
        let n = value::to_number(&engine.heap, this);
        let digits = if args.is_empty() { 0 } else { arg_num(engine, args, 0) as usize };
        Ok(str_value(engine, format!("{:.*}", digits, n)))
    });

    let ctor = engine.heap.alloc(ValueData::Native(Rc::new(crate::function::NativeFunction {
        name: Rc::from("Number"),
        arity: 1,
        callback: Box::new(|engine, _this, args| {
            let n = if args.is_empty() { 0.0 } else { value::to_number(&engine.heap, args[0]) };
            Ok(num_value(engine, n))
        }),
    })));
    set_prop(&mut engine.heap, ctor, "prototype", proto, LinkAttrs::internal());

    for (name, value) in [
        ("MAX_SAFE_INTEGER", 2f64.powi(53) - 1.0),
        ("MIN_SAFE_INTEGER", -(2f64.powi(53) - 1.0)),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ("NaN", f64::NAN),
    ] {
        let v = num_value(engine, value);
        set_prop(&mut engine.heap, ctor, name, v, LinkAttrs::internal());
    }

    let top = engine.global.top;
    set_prop(&mut engine.heap, top, "Number", ctor, LinkAttrs::data());

    let nan = num_value(engine, f64::NAN);
    set_prop(&mut engine.heap, top, "NaN", nan, LinkAttrs::data());
    let infinity = num_value(engine, f64::INFINITY);
    set_prop(&mut engine.heap, top, "Infinity", infinity, LinkAttrs::data());

    install_math(engine);
}

fn to_radix_string(n: f64, radix: u32) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if !(2..=36).contains(&radix) {
        return value::format_double(n);
    }
    let neg = n < 0.0;
    let mut int_part = n.abs().trunc() as u64;
    let mut digits = Vec::new();
    if int_part == 0 {
        digits.push('0');
    }
    while int_part > 0 {
        let d = (int_part % radix as u64) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap());
        int_part /= radix as u64;
    }
    digits.reverse();
    let mut out: String = digits.into_iter().collect();
    if neg {
        out.insert(0, '-');
    }
    out
}

fn install_math(engine: &mut Engine) {
    let math = engine.heap.alloc(ValueData::Object);

    native_method(engine, math, "floor", 1, |engine, _this, args| {
        Ok(num_value(engine, arg_num(engine, args, 0).floor()))
    });
    native_method(engine, math, "ceil", 1, |engine, _this, args| {
        Ok(num_value(engine, arg_num(engine, args, 0).ceil()))
    });
    native_method(engine, math, "round", 1, |engine, _this, args| {
        Ok(num_value(engine, arg_num(engine, args, 0).round()))
    });
    native_method(engine, math, "abs", 1, |engine, _this, args| {
        Ok(num_value(engine, arg_num(engine, args, 0).abs()))
    });
    native_method(engine, math, "sqrt", 1, |engine, _this, args| {
        Ok(num_value(engine, arg_num(engine, args, 0).sqrt()))
    });
    native_method(engine, math, "pow", 2, |engine, _this, args| {
        Ok(num_value(engine, arg_num(engine, args, 0).powf(arg_num(engine, args, 1))))
    });
    native_method(engine, math, "max", 2, |engine, _this, args| {
        let m = args.iter().map(|&a| value::to_number(&engine.heap, a)).fold(f64::NEG_INFINITY, f64::max);
        Ok(num_value(engine, m))
    });
    native_method(engine, math, "min", 2, |engine, _this, args| {
        let m = args.iter().map(|&a| value::to_number(&engine.heap, a)).fold(f64::INFINITY, f64::min);
        Ok(num_value(engine, m))
    });
    native_method(engine, math, "random", 0, |engine, _this, _args| {
        Ok(num_value(engine, next_random()))
    });

    let consts = [("PI", std::f64::consts::PI), ("E", std::f64::consts::E)];
    for (name, value) in consts {
        let v = num_value(engine, value);
        set_prop(&mut engine.heap, math, name, v, LinkAttrs::internal());
    }

    let top = engine.global.top;
    set_prop(&mut engine.heap, top, "Math", math, LinkAttrs::data());
}

/// A self-contained xorshift64* generator for `Math.random()`. Not
/// cryptographic, just enough to avoid a constant return — the crate takes
/// no dependency on `rand` since nothing else in the teacher's stack needs
/// one.
fn next_random() -> f64 {
    use std::cell::Cell;
    thread_local! {
        static STATE: Cell<u64> = Cell::new(0x9e3779b97f4a7c15);
    }
    STATE.with(|s| {
        let mut x = s.get();
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        s.set(x);
        (x >> 11) as f64 / (1u64 << 53) as f64
    })
}
