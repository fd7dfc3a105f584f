//! `JSON.parse`/`JSON.stringify` (SPEC_FULL.md §6.2). JSON syntax is a
//! strict subset of this language's object/array/literal grammar, so
//! `parse` just re-enters the evaluator on a parenthesized copy of the
//! text rather than carrying a second, bespoke parser.

use std::rc::Rc;

use super::{arg, arg_str, error_value};
use crate::engine::Engine;
use crate::heap::LinkAttrs;
use crate::scope::set_prop;
use crate::value::{self, ValueData};

pub fn install(engine: &mut Engine) {
    let json = engine.heap.alloc(ValueData::Object);

    super::native_method(engine, json, "parse", 1, |engine, _this, args| {
        let text = arg_str(engine, args, 0);
        let src = format!("({text});");
        engine.evaluate_complex(&src, "<JSON>").map_err(|e| error_value(engine, e))
    });

    super::native_method(engine, json, "stringify", 1, |engine, _this, args| {
        let v = arg(args, 0, engine);
        Ok(engine.heap.alloc(ValueData::Str(Rc::from(value::get_parsable_string(&engine.heap, v, 0)))))
    });

    let top = engine.global.top;
    set_prop(&mut engine.heap, top, "JSON", json, LinkAttrs::data());
}
