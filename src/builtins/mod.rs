//! The built-in global surface (spec.md §6, SPEC_FULL.md §6.2): the handful
//! of constructors/prototypes/free functions every script can see without a
//! host registering anything itself. Each sub-module owns one constructor
//! family and installs it onto the engine's already-allocated prototype
//! object (`engine.string_proto` and friends, built in `Engine::new`)
//! exactly the way a host's own `register_native` calls would.

mod array;
mod function_ctor;
mod json;
mod number;
mod object;
mod string;

use std::io::Write as _;
use std::rc::Rc;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::heap::{LinkAttrs, ValueId};
use crate::scope::set_prop;
use crate::span::Span;
use crate::value::{self, ValueData};

pub fn install(engine: &mut Engine) {
    object::install(engine);
    array::install(engine);
    string::install(engine);
    number::install(engine);
    function_ctor::install(engine);
    json::install(engine);
    install_console(engine);
    install_globals(engine);
}

/// Declares a native method directly onto `owner` (a prototype object or the
/// global scope's own object), bypassing `register_native`'s signature
/// parser since every call site here already knows its name/arity
/// statically.
pub(crate) fn native_method<F>(engine: &mut Engine, owner: ValueId, name: &str, arity: usize, f: F)
where
    F: Fn(&mut Engine, ValueId, &[ValueId]) -> Result<ValueId, ValueId> + 'static,
{
    let native = crate::function::NativeFunction {
        name: Rc::from(name),
        arity,
        callback: Box::new(f),
    };
    let id = engine.heap.alloc(ValueData::Native(Rc::new(native)));
    set_prop(&mut engine.heap, owner, name, id, LinkAttrs::internal());
}

pub(crate) fn global_function<F>(engine: &mut Engine, name: &str, arity: usize, f: F)
where
    F: Fn(&mut Engine, ValueId, &[ValueId]) -> Result<ValueId, ValueId> + 'static,
{
    let top = engine.global.top;
    native_method(engine, top, name, arity, f);
}

/// Invokes a callable value the way `expr.rs`'s call-expression handling
/// does, translating an engine-level failure (a stack-depth cap, e.g.) into
/// the thrown-value shape every native callback communicates errors with.
pub(crate) fn invoke(engine: &mut Engine, callee: ValueId, this: ValueId, args: &[ValueId]) -> Result<ValueId, ValueId> {
    engine.call(callee, this, args, Span::default()).map_err(|e| error_value(engine, e))
}

pub(crate) fn error_value(engine: &mut Engine, e: EngineError) -> ValueId {
    let msg = e.to_string();
    engine.make_error_value(&msg, Span::default())
}

pub(crate) fn throw_str(engine: &mut Engine, message: impl AsRef<str>) -> ValueId {
    engine.make_error_value(message.as_ref(), Span::default())
}

pub(crate) fn arg(args: &[ValueId], i: usize, engine: &Engine) -> ValueId {
    args.get(i).copied().unwrap_or(engine.undefined)
}

pub(crate) fn arg_str(engine: &mut Engine, args: &[ValueId], i: usize) -> Rc<str> {
    value::to_js_string(&engine.heap, arg(args, i, engine))
}

pub(crate) fn arg_num(engine: &mut Engine, args: &[ValueId], i: usize) -> f64 {
    value::to_number(&engine.heap, arg(args, i, engine))
}

pub(crate) fn str_value(engine: &mut Engine, s: impl Into<Rc<str>>) -> ValueId {
    engine.heap.alloc(ValueData::Str(s.into()))
}

pub(crate) fn num_value(engine: &mut Engine, n: f64) -> ValueId {
    if n.is_finite() && n == n.trunc() && (i32::MIN as f64..=i32::MAX as f64).contains(&n) {
        engine.heap.alloc(ValueData::Int(n as i32))
    } else {
        engine.heap.alloc(ValueData::Double(n))
    }
}

pub(crate) fn bool_value(engine: &Engine, b: bool) -> ValueId {
    engine.bool_value(b)
}

pub(crate) fn new_array(engine: &mut Engine, items: impl IntoIterator<Item = ValueId>) -> ValueId {
    let arr = engine.heap.alloc(ValueData::Array);
    for (i, item) in items.into_iter().enumerate() {
        set_prop(&mut engine.heap, arr, &i.to_string(), item, LinkAttrs::data());
    }
    arr
}

/// Overwrites an array's index properties (`0`, `1`, ...) with `items`,
/// clearing any stale trailing indices from a previous, longer length —
/// used by every mutating `Array.prototype` method since `length` itself is
/// never stored (see `value.rs`).
pub(crate) fn replace_array_contents(engine: &mut Engine, arr: ValueId, items: &[ValueId]) {
    let old_len = value::array_length(&engine.heap, arr);
    for i in 0..old_len {
        let key = i.to_string();
        if let Some(old) = engine.heap.slot(arr).props.find(&key).map(|e| e.target) {
            engine.heap.slot_mut(arr).props.remove(&key);
            crate::gc::unref_value(&mut engine.heap, old);
        }
    }
    for (i, &item) in items.iter().enumerate() {
        set_prop(&mut engine.heap, arr, &i.to_string(), item, LinkAttrs::data());
    }
}

pub(crate) fn array_items(engine: &Engine, arr: ValueId) -> Vec<ValueId> {
    let len = value::array_length(&engine.heap, arr);
    (0..len)
        .map(|i| {
            engine
                .heap
                .slot(arr)
                .props
                .find(&i.to_string())
                .map(|e| e.target)
                .unwrap_or(engine.undefined)
        })
        .collect()
}

fn install_console(engine: &mut Engine) {
    let console = engine.heap.alloc(ValueData::Object);
    native_method(engine, console, "log", 0, |engine, _this, args| {
        let line = args
            .iter()
            .map(|&a| value::to_js_string(&engine.heap, a).to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(engine.output, "{line}");
        Ok(engine.undefined)
    });
    let top = engine.global.top;
    set_prop(&mut engine.heap, top, "console", console, LinkAttrs::data());
}

/// `parseInt`/`parseFloat`/`isNaN`/`isFinite`/`print` — the free functions
/// spec.md §6 lists alongside the constructors, not hung off any prototype.
fn install_globals(engine: &mut Engine) {
    global_function(engine, "parseInt", 2, |engine, _this, args| {
        let s = arg_str(engine, args, 0);
        let radix = if args.len() > 1 {
            arg_num(engine, args, 1) as u32
        } else {
            10
        };
        let trimmed = s.trim();
        let (neg, rest) = match trimmed.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (radix, rest) = if radix == 16 || rest.starts_with("0x") || rest.starts_with("0X") {
            (16, rest.trim_start_matches("0x").trim_start_matches("0X"))
        } else {
            (if radix == 0 { 10 } else { radix }, rest)
        };
        let digits: String = rest
            .chars()
            .take_while(|c| c.is_digit(radix))
            .collect();
        if digits.is_empty() {
            return Ok(num_value(engine, f64::NAN));
        }
        let n = i64::from_str_radix(&digits, radix).unwrap_or(0) as f64;
        Ok(num_value(engine, if neg { -n } else { n }))
    });

    global_function(engine, "parseFloat", 1, |engine, _this, args| {
        let s = arg_str(engine, args, 0);
        let trimmed = s.trim();
        let end = trimmed
            .char_indices()
            .take_while(|&(i, c)| {
                c.is_ascii_digit()
                    || c == '.'
                    || ((c == '-' || c == '+') && i == 0)
                    || c == 'e'
                    || c == 'E'
                    || ((c == '-' || c == '+') && i > 0 && matches!(trimmed.as_bytes()[i - 1], b'e' | b'E'))
            })
            .map(|(i, c)| i + c.len_utf8())
            .last()
            .unwrap_or(0);
        let n = trimmed[..end].parse::<f64>().unwrap_or(f64::NAN);
        Ok(num_value(engine, n))
    });

    global_function(engine, "isNaN", 1, |engine, _this, args| {
        let n = arg_num(engine, args, 0);
        Ok(bool_value(engine, n.is_nan()))
    });

    global_function(engine, "isFinite", 1, |engine, _this, args| {
        let n = arg_num(engine, args, 0);
        Ok(bool_value(engine, n.is_finite()))
    });

    global_function(engine, "print", 0, |engine, _this, args| {
        let line = args
            .iter()
            .map(|&a| value::to_js_string(&engine.heap, a).to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(engine.output, "{line}");
        Ok(engine.undefined)
    });

    global_function(engine, "eval", 1, |engine, _this, args| {
        let src = arg_str(engine, args, 0);
        engine
            .evaluate_complex(&src, "<eval>")
            .map_err(|e| error_value(engine, e))
    });
}
