//! Expression evaluation (spec.md §4.3), walking the token buffer directly
//! with a standard precedence-climbing recursive descent.
//!
//! Every level takes an `exec: bool` flag threaded down from the nearest
//! enclosing statement. When `exec` is `false` the walk still parses every
//! token exactly as it would otherwise — so the cursor always ends up in
//! the right place — but suppresses every side effect (assignment, scope
//! declaration, function invocation, heap mutation). This is what lets
//! `&&`/`||` short-circuit and `?:` skip its untaken branch without a
//! separate AST to prune: the untaken side is still *walked*, just not
//! *run*. `if`/`while`/`for` branches that a bracket-matching jump can skip
//! outright don't need this (see `stmt.rs`); `exec` only carries the
//! load where no such jump exists.
//!
//! Every level returns a [`Link`] rather than a resolved value, unresolved
//! for as long as no operator at that level actually fired — this is what
//! lets a bare identifier or `obj.prop`/`arr[i]` expression reaching all
//! the way up to `=` still be assignable.

use std::rc::Rc;

use crate::engine::Engine;
use crate::eval::call;
use crate::eval::{Cursor, EvalResult, Link, Signal};
use crate::function::FunctionDescriptor;
use crate::gc;
use crate::heap::LinkAttrs;
use crate::lexer::{Literal, TokenKind};
use crate::value::{self, ValueData};

/// Evaluates one expression starting at the cursor, resolving it to a
/// concrete value. The entry point every statement form uses.
pub fn eval_expr(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<crate::heap::ValueId> {
    let span = cur.span();
    let link = assignment_expr(engine, cur, exec)?;
    if !exec {
        return Ok(engine.undefined);
    }
    link.get(engine, span)
}

fn assignment_expr(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Link> {
    let span = cur.span();
    let left = conditional_expr(engine, cur, exec)?;

    let compound = compound_op(cur.kind());
    if cur.kind() != TokenKind::Assign && compound.is_none() {
        return Ok(left);
    }
    cur.advance();

    let rhs_link = assignment_expr(engine, cur, exec)?;
    if !exec {
        return Ok(Link::Value(engine.undefined));
    }
    let rhs_value = rhs_link.get(engine, span)?;

    let result = match compound {
        None => rhs_value,
        Some(op) => {
            let lv = left.get(engine, span)?;
            apply_binary(engine, op, lv, rhs_value, span)?
        }
    };
    left.set(engine, result)?;
    Ok(Link::Value(result))
}

/// Maps a compound-assignment token to the binary operator it implies.
fn compound_op(kind: TokenKind) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match kind {
        PlusEq => Plus,
        MinusEq => Minus,
        StarEq => Star,
        SlashEq => Slash,
        PercentEq => Percent,
        AmpEq => Amp,
        PipeEq => Pipe,
        CaretEq => Caret,
        ShlEq => Shl,
        ShrEq => Shr,
        UShrEq => UShr,
        _ => return None,
    })
}

fn conditional_expr(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Link> {
    let span = cur.span();
    let cond = logical_or_expr(engine, cur, exec)?;
    if !cur.eat(TokenKind::Question) {
        return Ok(cond);
    }
    let taken = exec && value::to_bool(&engine.heap, cond.get(engine, span)?);
    let then_val = assignment_expr(engine, cur, taken)?;
    cur.expect(TokenKind::Colon).map_err(Signal::from)?;
    let else_val = assignment_expr(engine, cur, exec && !taken)?;
    Ok(if taken { then_val } else { else_val })
}

macro_rules! left_assoc_level {
    ($name:ident, $next:ident, [$($kind:ident),+ $(,)?], short_circuit = $sc:expr) => {
        fn $name(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Link> {
            let span = cur.span();
            let mut left = $next(engine, cur, exec)?;
            loop {
                let op = cur.kind();
                if !matches!(op, $(TokenKind::$kind)|+) {
                    return Ok(left);
                }
                cur.advance();
                if !exec {
                    // Still walk the right side so the cursor lands in the
                    // right place, without resolving anything that could throw.
                    $next(engine, cur, false)?;
                    left = Link::Value(engine.undefined);
                    continue;
                }
                let lv = left.get(engine, span)?;
                let next_exec = if $sc {
                    short_circuit_continue(op, &engine.heap, lv)
                } else {
                    true
                };
                let right = $next(engine, cur, next_exec)?;
                if $sc {
                    // `&&`/`||` never reach `mathsOp`: the result is
                    // whichever side's truthiness decided the outcome.
                    left = if next_exec { right } else { Link::Value(lv) };
                    continue;
                }
                let rv = right.get(engine, span)?;
                let result = apply_binary(engine, op, lv, rv, span)?;
                left = Link::Value(result);
            }
        }
    };
}

fn short_circuit_continue(op: TokenKind, heap: &crate::heap::Heap, lv: crate::heap::ValueId) -> bool {
    match op {
        TokenKind::AndAnd => value::to_bool(heap, lv),
        TokenKind::OrOr => !value::to_bool(heap, lv),
        _ => true,
    }
}

left_assoc_level!(logical_or_expr, logical_and_expr, [OrOr], short_circuit = true);
left_assoc_level!(logical_and_expr, bitor_expr, [AndAnd], short_circuit = true);
left_assoc_level!(bitor_expr, bitxor_expr, [Pipe], short_circuit = false);
left_assoc_level!(bitxor_expr, bitand_expr, [Caret], short_circuit = false);
left_assoc_level!(bitand_expr, equality_expr, [Amp], short_circuit = false);
left_assoc_level!(
    equality_expr,
    relational_expr,
    [Eq, NotEq, StrictEq, StrictNotEq],
    short_circuit = false
);
/// The relational level (spec.md §4.5: "relational/`in`/`instanceof`").
/// Not generated by `left_assoc_level!` since `in`/`instanceof` don't route
/// through `mathsOp` like the four comparison operators do.
fn relational_expr(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Link> {
    let span = cur.span();
    let mut left = shift_expr(engine, cur, exec)?;
    loop {
        let op = cur.kind();
        if !matches!(
            op,
            TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq | TokenKind::In | TokenKind::Instanceof
        ) {
            return Ok(left);
        }
        cur.advance();
        if !exec {
            shift_expr(engine, cur, false)?;
            left = Link::Value(engine.undefined);
            continue;
        }
        let lv = left.get(engine, span)?;
        let right = shift_expr(engine, cur, true)?;
        let rv = right.get(engine, span)?;
        let result = match op {
            TokenKind::In => in_operator(engine, lv, rv),
            TokenKind::Instanceof => instanceof_operator(engine, lv, rv),
            _ => apply_binary(engine, op, lv, rv, span)?,
        };
        left = Link::Value(result);
    }
}

/// `key in obj` (spec.md §1/§4.5): true if `key`'s stringified form names a
/// property reachable from `obj`'s own table or its prototype chain. Unlike
/// an ordinary property read, this never invokes a `get` accessor — it only
/// asks whether a binding exists.
fn in_operator(engine: &Engine, key: crate::heap::ValueId, obj: crate::heap::ValueId) -> crate::heap::ValueId {
    let name = value::to_js_string(&engine.heap, key);
    let mut current = Some(obj);
    let mut used_fallback = false;
    let mut depth = 0usize;
    while let Some(id) = current {
        if depth > engine.config.max_prototype_depth {
            break;
        }
        if engine.heap.slot(id).props.find(&name).is_some() {
            return engine.bool_value(true);
        }
        depth += 1;
        current = engine.heap.slot(id).proto.or_else(|| {
            if used_fallback {
                None
            } else {
                used_fallback = true;
                super::default_prototype(engine, id)
            }
        });
    }
    engine.bool_value(false)
}

/// `x instanceof F` (spec.md §9): consults `x`'s `__proto__` chain for
/// `F.prototype`.
fn instanceof_operator(engine: &Engine, x: crate::heap::ValueId, f: crate::heap::ValueId) -> crate::heap::ValueId {
    let Some(target_proto) = engine.heap.slot(f).props.find("prototype").map(|e| e.target) else {
        return engine.bool_value(false);
    };
    let mut current = engine.heap.slot(x).proto.or_else(|| super::default_prototype(engine, x));
    let mut hit = false;
    while let Some(id) = current {
        if id == target_proto {
            hit = true;
            break;
        }
        current = engine.heap.slot(id).proto;
    }
    engine.bool_value(hit)
}

left_assoc_level!(shift_expr, additive_expr, [Shl, Shr, UShr], short_circuit = false);
left_assoc_level!(additive_expr, multiplicative_expr, [Plus, Minus], short_circuit = false);
left_assoc_level!(
    multiplicative_expr,
    unary_expr,
    [Star, Slash, Percent],
    short_circuit = false
);

fn apply_binary(
    engine: &mut Engine,
    op: TokenKind,
    a: crate::heap::ValueId,
    b: crate::heap::ValueId,
    span: crate::span::Span,
) -> EvalResult<crate::heap::ValueId> {
    match value::maths_op(&engine.heap, op, a, b) {
        Ok(value::OpResult::Bool(v)) => Ok(engine.bool_value(v)),
        Ok(value::OpResult::Int(v)) => Ok(engine.heap.alloc(ValueData::Int(v))),
        Ok(value::OpResult::Double(v)) => Ok(engine.heap.alloc(ValueData::Double(v))),
        Ok(value::OpResult::Str(v)) => Ok(engine.heap.alloc(ValueData::Str(v))),
        Err(msg) => Err(Signal::Throw(engine.make_error_value(&msg, span), span)),
    }
}

fn unary_expr(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Link> {
    let span = cur.span();
    match cur.kind() {
        TokenKind::Typeof => {
            cur.advance();
            let operand = unary_expr(engine, cur, exec)?;
            if !exec {
                return Ok(Link::Value(engine.undefined));
            }
            let v = operand.get_or_undefined(engine);
            let name = engine.heap.slot(v).data.type_name();
            Ok(Link::Value(engine.heap.alloc(ValueData::Str(name.into()))))
        }
        TokenKind::Delete => {
            cur.advance();
            let operand = unary_expr(engine, cur, exec)?;
            if !exec {
                return Ok(Link::Value(engine.undefined));
            }
            let ok = operand.delete(&mut engine.heap);
            Ok(Link::Value(engine.bool_value(ok)))
        }
        TokenKind::Void => {
            cur.advance();
            unary_expr(engine, cur, exec)?;
            Ok(Link::Value(engine.undefined))
        }
        TokenKind::Bang => {
            cur.advance();
            let operand = unary_expr(engine, cur, exec)?;
            if !exec {
                return Ok(Link::Value(engine.undefined));
            }
            let v = operand.get(engine, span)?;
            Ok(Link::Value(engine.bool_value(!value::to_bool(&engine.heap, v))))
        }
        TokenKind::Tilde => {
            cur.advance();
            let operand = unary_expr(engine, cur, exec)?;
            if !exec {
                return Ok(Link::Value(engine.undefined));
            }
            let v = operand.get(engine, span)?;
            let n = value::to_number(&engine.heap, v) as i64 as i32;
            Ok(Link::Value(engine.heap.alloc(ValueData::Int(!n))))
        }
        TokenKind::Minus => {
            cur.advance();
            let operand = unary_expr(engine, cur, exec)?;
            if !exec {
                return Ok(Link::Value(engine.undefined));
            }
            let v = operand.get(engine, span)?;
            let out = match &engine.heap.slot(v).data {
                ValueData::Int(i) => i
                    .checked_neg()
                    .map(ValueData::Int)
                    .unwrap_or(ValueData::Double(-(*i as f64))),
                _ => ValueData::Double(-value::to_number(&engine.heap, v)),
            };
            Ok(Link::Value(engine.heap.alloc(out)))
        }
        TokenKind::Plus => {
            cur.advance();
            let operand = unary_expr(engine, cur, exec)?;
            if !exec {
                return Ok(Link::Value(engine.undefined));
            }
            let v = operand.get(engine, span)?;
            Ok(Link::Value(
                engine.heap.alloc(ValueData::Double(value::to_number(&engine.heap, v))),
            ))
        }
        TokenKind::PlusPlus | TokenKind::MinusMinus => {
            let op = cur.advance().kind;
            let target = unary_expr(engine, cur, exec)?;
            if !exec {
                return Ok(Link::Value(engine.undefined));
            }
            let old = target.get(engine, span)?;
            let n = value::to_number(&engine.heap, old);
            let n = if op == TokenKind::PlusPlus { n + 1.0 } else { n - 1.0 };
            let new_val = engine.heap.alloc(ValueData::Double(n));
            target.set(engine, new_val)?;
            Ok(Link::Value(new_val))
        }
        TokenKind::New => {
            cur.advance();
            new_expr(engine, cur, exec, span)
        }
        _ => postfix_expr(engine, cur, exec),
    }
}

fn new_expr(engine: &mut Engine, cur: &mut Cursor, exec: bool, span: crate::span::Span) -> EvalResult<Link> {
    let callee_link = member_chain(engine, cur, exec, primary_expr(engine, cur, exec)?)?;
    let args = if cur.check(TokenKind::LParen) {
        parse_args(engine, cur, exec)?
    } else {
        Vec::new()
    };
    if !exec {
        return Ok(Link::Value(engine.undefined));
    }
    let callee = callee_link.get(engine, span)?;

    let proto = engine
        .heap
        .slot(callee)
        .props
        .find("prototype")
        .map(|e| e.target);
    let instance = engine.heap.alloc(ValueData::Object);
    if let Some(proto) = proto {
        gc::ref_value(&mut engine.heap, proto);
        engine.heap.slot_mut(instance).proto = Some(proto);
        gc::note_edge_written(&mut engine.heap, instance);
    }

    let result = call::call(engine, callee, instance, &args, span)?;
    let is_object = matches!(engine.heap.slot(result).data, ValueData::Object | ValueData::Array);
    Ok(Link::Value(if is_object { result } else { instance }))
}

fn postfix_expr(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Link> {
    let span = cur.span();
    let primary = primary_expr(engine, cur, exec)?;
    let chained = member_chain(engine, cur, exec, primary)?;

    if matches!(cur.kind(), TokenKind::PlusPlus | TokenKind::MinusMinus) {
        let op = cur.advance().kind;
        if !exec {
            return Ok(Link::Value(engine.undefined));
        }
        let old = chained.get(engine, span)?;
        let n = value::to_number(&engine.heap, old);
        let n = if op == TokenKind::PlusPlus { n + 1.0 } else { n - 1.0 };
        let new_val = engine.heap.alloc(ValueData::Double(n));
        chained.set(engine, new_val)?;
        return Ok(Link::Value(old));
    }
    Ok(chained)
}

/// Parses any run of `.name`, `[expr]`, and `(args)` suffixes following a
/// primary expression.
fn member_chain(engine: &mut Engine, cur: &mut Cursor, exec: bool, mut base: Link) -> EvalResult<Link> {
    loop {
        let span = cur.span();
        match cur.kind() {
            TokenKind::Dot => {
                cur.advance();
                let name_tok = cur.expect(TokenKind::Identifier).map_err(Signal::from)?;
                if !exec {
                    continue;
                }
                let owner = base.get(engine, span)?;
                base = Link::Prop {
                    owner,
                    name: name_tok.lexeme,
                };
            }
            TokenKind::LBracket => {
                cur.advance();
                let key_val = eval_expr(engine, cur, exec)?;
                cur.expect(TokenKind::RBracket).map_err(Signal::from)?;
                if !exec {
                    continue;
                }
                let owner = base.get(engine, span)?;
                let name: Rc<str> = value::to_js_string(&engine.heap, key_val);
                base = Link::Prop { owner, name };
            }
            TokenKind::LParen => {
                let args = parse_args(engine, cur, exec)?;
                if !exec {
                    continue;
                }
                let this = match &base {
                    Link::Prop { owner, .. } => *owner,
                    _ => engine.undefined,
                };
                let callee = base.get(engine, span)?;
                let result = call::call(engine, callee, this, &args, span)?;
                base = Link::Value(result);
            }
            _ => return Ok(base),
        }
    }
}

fn parse_args(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Vec<crate::heap::ValueId>> {
    cur.expect(TokenKind::LParen).map_err(Signal::from)?;
    let mut args = Vec::new();
    if !cur.check(TokenKind::RParen) {
        loop {
            args.push(eval_expr(engine, cur, exec)?);
            if !cur.eat(TokenKind::Comma) {
                break;
            }
        }
    }
    cur.expect(TokenKind::RParen).map_err(Signal::from)?;
    Ok(args)
}

fn primary_expr(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Link> {
    let span = cur.span();
    match cur.kind() {
        TokenKind::Int => {
            let t = cur.advance();
            let n = match t.literal {
                Literal::Int(n) => n,
                _ => 0,
            };
            let v = if let Ok(i) = i32::try_from(n) {
                ValueData::Int(i)
            } else {
                ValueData::Double(n as f64)
            };
            Ok(Link::Value(engine.heap.alloc(v)))
        }
        TokenKind::Float => {
            let t = cur.advance();
            let n = match t.literal {
                Literal::Float(n) => n,
                _ => f64::NAN,
            };
            Ok(Link::Value(engine.heap.alloc(ValueData::Double(n))))
        }
        TokenKind::Str => {
            let t = cur.advance();
            let s = match t.literal {
                Literal::Str(s) => s,
                _ => "".into(),
            };
            Ok(Link::Value(engine.heap.alloc(ValueData::Str(s))))
        }
        TokenKind::True => {
            cur.advance();
            Ok(Link::Value(engine.true_v))
        }
        TokenKind::False => {
            cur.advance();
            Ok(Link::Value(engine.false_v))
        }
        TokenKind::Null => {
            cur.advance();
            Ok(Link::Value(engine.null_v))
        }
        TokenKind::Undefined => {
            cur.advance();
            Ok(Link::Value(engine.undefined))
        }
        TokenKind::InfinityKw => {
            cur.advance();
            Ok(Link::Value(engine.heap.alloc(ValueData::Double(f64::INFINITY))))
        }
        TokenKind::NaNKw => {
            cur.advance();
            Ok(Link::Value(engine.heap.alloc(ValueData::Double(f64::NAN))))
        }
        TokenKind::Identifier => {
            let t = cur.advance();
            Ok(Link::Var {
                scope: engine.scope,
                name: t.lexeme,
            })
        }
        TokenKind::LParen => {
            cur.advance();
            let inner = assignment_expr(engine, cur, exec)?;
            cur.expect(TokenKind::RParen).map_err(Signal::from)?;
            Ok(inner)
        }
        TokenKind::LBracket => array_literal(engine, cur, exec),
        TokenKind::LBrace => object_literal(engine, cur, exec),
        TokenKind::Function => function_literal(engine, cur),
        other => Err(crate::error::SyntaxError::Unexpected {
            expected: "an expression".into(),
            found: other.describe().to_string(),
            span,
        }
        .into()),
    }
}

fn array_literal(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Link> {
    cur.expect(TokenKind::LBracket).map_err(Signal::from)?;
    let arr = if exec {
        engine.heap.alloc(ValueData::Array)
    } else {
        engine.undefined
    };
    let mut index = 0usize;
    if !cur.check(TokenKind::RBracket) {
        loop {
            let v = eval_expr(engine, cur, exec)?;
            if exec {
                crate::scope::set_prop(&mut engine.heap, arr, &index.to_string(), v, LinkAttrs::data());
            }
            index += 1;
            if !cur.eat(TokenKind::Comma) {
                break;
            }
            if cur.check(TokenKind::RBracket) {
                break;
            }
        }
    }
    cur.expect(TokenKind::RBracket).map_err(Signal::from)?;
    Ok(Link::Value(arr))
}

fn object_literal(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Link> {
    cur.expect(TokenKind::LBrace).map_err(Signal::from)?;
    let obj = if exec {
        engine.heap.alloc(ValueData::Object)
    } else {
        engine.undefined
    };
    if !cur.check(TokenKind::RBrace) {
        loop {
            if let Some(which) = accessor_keyword(cur) {
                object_literal_accessor(engine, cur, exec, obj, which)?;
            } else {
                let name = property_name(cur)?;
                cur.expect(TokenKind::Colon).map_err(Signal::from)?;
                let v = eval_expr(engine, cur, exec)?;
                if exec {
                    crate::scope::set_prop(&mut engine.heap, obj, &name, v, LinkAttrs::data());
                }
            }
            if !cur.eat(TokenKind::Comma) {
                break;
            }
            if cur.check(TokenKind::RBrace) {
                break;
            }
        }
    }
    cur.expect(TokenKind::RBrace).map_err(Signal::from)?;
    Ok(Link::Value(obj))
}

fn property_name(cur: &mut Cursor) -> EvalResult<Rc<str>> {
    Ok(match cur.kind() {
        TokenKind::Identifier => cur.advance().lexeme,
        TokenKind::Str => {
            let t = cur.advance();
            match t.literal {
                Literal::Str(s) => s,
                _ => "".into(),
            }
        }
        TokenKind::Int => cur.advance().lexeme,
        other => {
            return Err(crate::error::SyntaxError::Unexpected {
                expected: "a property name".into(),
                found: other.describe().to_string(),
                span: cur.span(),
            }
            .into())
        }
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum AccessorKind {
    Get,
    Set,
}

/// Recognizes a `get`/`set` accessor introducer without consuming it: the
/// keyword only counts as one when it's followed by a property name and
/// then `(`, so that `{get: 1}` still parses as a plain data property
/// named `get`.
fn accessor_keyword(cur: &Cursor) -> Option<AccessorKind> {
    if cur.kind() != TokenKind::Identifier {
        return None;
    }
    let which = match cur.current().lexeme.as_ref() {
        "get" => AccessorKind::Get,
        "set" => AccessorKind::Set,
        _ => return None,
    };
    let name_tok = cur.tokens.tokens.get(cur.pos + 1)?;
    if !matches!(name_tok.kind, TokenKind::Identifier | TokenKind::Str | TokenKind::Int) {
        return None;
    }
    let paren_tok = cur.tokens.tokens.get(cur.pos + 2)?;
    (paren_tok.kind == TokenKind::LParen).then_some(which)
}

/// Parses one `get name() { ... }` / `set name(v) { ... }` clause and
/// installs (or extends) the named property's accessor pair (spec.md §3
/// invariant 5).
fn object_literal_accessor(
    engine: &mut Engine,
    cur: &mut Cursor,
    exec: bool,
    obj: crate::heap::ValueId,
    which: AccessorKind,
) -> EvalResult<()> {
    cur.advance();
    let name = property_name(cur)?;
    let params = parse_param_list(cur)?;
    let func_link = finish_function_literal(engine, cur, None, params)?;

    if exec {
        let func = func_link.value().expect("function literal always yields a value");
        let pair = match engine.heap.slot(obj).props.find(&name) {
            Some(entry) if entry.attrs.is_accessor => entry.target,
            _ => {
                let pair = engine.heap.alloc(ValueData::Object);
                crate::scope::set_prop(&mut engine.heap, obj, &name, pair, LinkAttrs::accessor());
                pair
            }
        };
        let key = match which {
            AccessorKind::Get => "get",
            AccessorKind::Set => "set",
        };
        crate::scope::set_prop(&mut engine.heap, pair, key, func, LinkAttrs::internal());
    }
    Ok(())
}

/// Parses `function [name] ( params ) { body }` as an expression, closing
/// over the scope in effect right now. Evaluated unconditionally even when
/// `exec` is false: building the descriptor has no observable side effect
/// besides the allocation itself, and skipping it would require duplicating
/// the parameter-list/body-skip logic here for no benefit.
pub(crate) fn function_literal(engine: &mut Engine, cur: &mut Cursor) -> EvalResult<Link> {
    cur.expect(TokenKind::Function).map_err(Signal::from)?;
    let name = if cur.check(TokenKind::Identifier) {
        Some(cur.advance().lexeme)
    } else {
        None
    };
    let params = parse_param_list(cur)?;
    finish_function_literal(engine, cur, name, params)
}

/// Parses a parenthesized, comma-separated identifier list — the parameter
/// list shared by `function` expressions/declarations and `get`/`set`
/// accessor bodies.
fn parse_param_list(cur: &mut Cursor) -> EvalResult<Vec<Rc<str>>> {
    cur.expect(TokenKind::LParen).map_err(Signal::from)?;
    let mut params = Vec::new();
    if !cur.check(TokenKind::RParen) {
        loop {
            let p = cur.expect(TokenKind::Identifier).map_err(Signal::from)?;
            params.push(p.lexeme);
            if !cur.eat(TokenKind::Comma) {
                break;
            }
        }
    }
    cur.expect(TokenKind::RParen).map_err(Signal::from)?;
    Ok(params)
}

/// Parses the `{ body }` block of a function-shaped construct and builds
/// its `FunctionDescriptor`, closing over the scope in effect right now.
/// Shared by `function` literals and `get`/`set` accessor bodies, which
/// differ only in what precedes the parameter list.
fn finish_function_literal(
    engine: &mut Engine,
    cur: &mut Cursor,
    name: Option<Rc<str>>,
    params: Vec<Rc<str>>,
) -> EvalResult<Link> {
    let close = cur.matching();
    cur.expect(TokenKind::LBrace).map_err(Signal::from)?;
    let body_start = cur.pos;
    cur.pos = close + 1;
    let body_end = close;

    let closure = engine.scope.top;
    gc::ref_value(&mut engine.heap, closure);

    let desc = FunctionDescriptor {
        name,
        params,
        body_start,
        body_end,
        tokens: cur.tokens.clone(),
        closure: Some(closure),
    };
    let fn_proto = engine.heap.alloc(ValueData::Object);
    let func = engine.heap.alloc(ValueData::Function(Rc::new(desc)));
    gc::ref_value(&mut engine.heap, fn_proto);
    engine.heap.slot_mut(func).props.set(
        "prototype".into(),
        fn_proto,
        LinkAttrs::internal(),
    );
    gc::note_edge_written(&mut engine.heap, func);
    Ok(Link::Value(func))
}
