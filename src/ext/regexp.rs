//! `RegExp` and the regex-aware overloads of `String.prototype.match` /
//! `.replace` (SPEC_FULL.md §6.2). Kept entirely behind the `regex` feature
//! and installed from its own entry point rather than `builtins::install`,
//! matching spec.md's framing of regex as an optional collaborator rather
//! than a core-language dependency.

use std::cell::RefCell;
use std::rc::Rc;

use regex::Regex;

use crate::builtins::{arg_str, bool_value, native_method, new_array, str_value, throw_str};
use crate::engine::Engine;
use crate::heap::LinkAttrs;
use crate::scope::set_prop;
use crate::value::{self, ValueData};

/// Installs `RegExp` and upgrades `String.prototype.match`/`.replace` to
/// understand a `RegExp` argument. Call this in addition to
/// `builtins::install` (it is not on by default, since the `regex` feature
/// is optional).
pub fn install(engine: &mut Engine) {
    let proto = engine.heap.alloc(ValueData::Object);

    native_method(engine, proto, "test", 1, |engine, this, args| {
        let re = compiled(engine, this)?;
        let s = arg_str(engine, args, 0);
        Ok(bool_value(engine, re.is_match(&s)))
    });

    native_method(engine, proto, "exec", 1, |engine, this, args| {
        let re = compiled(engine, this)?;
        let s = arg_str(engine, args, 0);
        match re.find(&s) {
            Some(m) => {
                let whole = str_value(engine, m.as_str().to_string());
                Ok(new_array(engine, [whole]))
            }
            None => Ok(engine.null_v),
        }
    });

    native_method(engine, proto, "toString", 0, |engine, this, _args| {
        let source = source_of(engine, this);
        Ok(str_value(engine, format!("/{source}/")))
    });

    let ctor = engine.heap.alloc(ValueData::Native(Rc::new(crate::function::NativeFunction {
        name: Rc::from("RegExp"),
        arity: 1,
        callback: Box::new(move |engine, _this, args| {
            let pattern = arg_str(engine, args, 0);
            let flags = if args.len() > 1 { arg_str(engine, args, 1) } else { Rc::from("") };
            new_regexp(engine, &pattern, &flags)
        }),
    })));
    set_prop(&mut engine.heap, ctor, "prototype", proto, LinkAttrs::internal());

    let top = engine.global.top;
    set_prop(&mut engine.heap, top, "RegExp", ctor, LinkAttrs::data());

    install_string_overloads(engine);
}

/// Builds a `RegExp` instance: a plain object carrying the pattern source as
/// a `source` property and an index into a thread-local cache of compiled
/// `Regex` values, since `ValueData` has no variant for holding a compiled
/// pattern directly.
fn new_regexp(engine: &mut Engine, pattern: &str, flags: &str) -> Result<crate::heap::ValueId, crate::heap::ValueId> {
    let case_insensitive = flags.contains('i');
    let built = if case_insensitive {
        Regex::new(&format!("(?i){pattern}"))
    } else {
        Regex::new(pattern)
    }
    .map_err(|e| throw_str(engine, format!("invalid regular expression: {e}")))?;

    CACHE.with(|c| c.borrow_mut().push(built));

    let obj = engine.heap.alloc(ValueData::Object);
    let src = str_value(engine, pattern.to_string());
    set_prop(&mut engine.heap, obj, "source", src, LinkAttrs::internal());
    let idx = CACHE.with(|c| c.borrow().len() - 1);
    let idx_v = engine.heap.alloc(ValueData::Int(idx as i32));
    set_prop(&mut engine.heap, obj, "__cache_index__", idx_v, LinkAttrs::internal());
    let proto = engine.get_variable("RegExp.prototype");
    if let Some(proto) = proto {
        engine.heap.slot_mut(obj).proto = Some(proto);
        crate::gc::ref_value(&mut engine.heap, proto);
    }
    Ok(obj)
}

thread_local! {
    static CACHE: RefCell<Vec<Regex>> = RefCell::new(Vec::new());
}

fn compiled(engine: &mut Engine, this: crate::heap::ValueId) -> Result<Regex, crate::heap::ValueId> {
    let idx = engine
        .heap
        .slot(this)
        .props
        .find("__cache_index__")
        .map(|e| e.target)
        .ok_or_else(|| throw_str(engine, "not a RegExp"))?;
    let i = value::to_number(&engine.heap, idx) as usize;
    CACHE.with(|c| c.borrow().get(i).cloned()).ok_or_else(|| throw_str(engine, "stale RegExp"))
}

fn source_of(engine: &Engine, this: crate::heap::ValueId) -> Rc<str> {
    engine
        .heap
        .slot(this)
        .props
        .find("source")
        .map(|e| value::to_js_string(&engine.heap, e.target))
        .unwrap_or_else(|| Rc::from(""))
}

/// Re-registers `String.prototype.match`/`.replace` to accept a `RegExp`
/// instance (in addition to the plain-substring behavior `builtins::string`
/// already installs), the way a host feature upgrade would layer on top.
fn install_string_overloads(engine: &mut Engine) {
    let proto = engine.string_proto;

    native_method(engine, proto, "match", 1, |engine, this, args| {
        let s = value::to_js_string(&engine.heap, this);
        let needle = args.first().copied().unwrap_or(engine.undefined);
        if engine.heap.slot(needle).props.find("__cache_index__").is_some() {
            let re = compiled(engine, needle)?;
            return Ok(match re.find(&s) {
                Some(m) => new_array(engine, [str_value(engine, m.as_str().to_string())]),
                None => engine.null_v,
            });
        }
        let needle_str = value::to_js_string(&engine.heap, needle);
        Ok(if s.contains(needle_str.as_ref()) {
            new_array(engine, [str_value(engine, needle_str.to_string())])
        } else {
            engine.null_v
        })
    });

    native_method(engine, proto, "replace", 2, |engine, this, args| {
        let s = value::to_js_string(&engine.heap, this);
        let pattern = args.first().copied().unwrap_or(engine.undefined);
        let replacement = arg_str(engine, args, 1);
        if engine.heap.slot(pattern).props.find("__cache_index__").is_some() {
            let re = compiled(engine, pattern)?;
            return Ok(str_value(engine, re.replacen(&s, 1, replacement.as_ref()).to_string()));
        }
        let needle = value::to_js_string(&engine.heap, pattern);
        Ok(str_value(engine, s.replacen(needle.as_ref(), &replacement, 1)))
    });
}
