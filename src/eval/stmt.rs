//! Statement execution (spec.md §4.5): walks the same flat, hoisted token
//! buffer `expr.rs` walks, advancing `Cursor` one statement at a time and
//! threading `exec: bool` through exactly like expressions do — a statement
//! reached while `exec` is `false` still has to be fully parsed (so the
//! cursor lands in the right place afterward) but must never run, declare,
//! throw, or otherwise take effect.
//!
//! `var`/`let`/`function` declarations are *not* handled here the way a
//! textbook interpreter would: `tokenizer.rs`'s `hoist()` pass has already
//! relocated every `var` pre-declaration and every `function` statement to
//! the head of its enclosing function (or the program root), and rewritten
//! initialized `var x = e;` down to a bare `x = e;` at its original site.
//! By the time this module sees a `Var` token it is always the bare,
//! bracketless `var name;` form the hoist pass produces; a `let` found in
//! place is always an assignment to an already-hoisted binding, never a
//! fresh declaration.

use std::rc::Rc;

use crate::engine::Engine;
use crate::error::{EngineError, SyntaxError};
use crate::eval::expr;
use crate::eval::{Cursor, EvalResult, Flow, Signal};
use crate::gc;
use crate::lexer::TokenKind;
use crate::scope::ScopeKind;
use crate::value::{self, ValueData};

/// Which constructs currently enclose the statement being executed —
/// governs whether `break`/`continue`/`return` are legal here (spec.md §7:
/// "recognized syntactically but flagged at evaluation time").
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecContext {
    in_function: bool,
    in_loop: bool,
    in_switch: bool,
}

impl ExecContext {
    /// Context for the program's top-level statements.
    pub fn program() -> Self {
        Self::default()
    }

    /// Context for a freshly entered function body.
    pub fn function() -> Self {
        Self {
            in_function: true,
            in_loop: false,
            in_switch: false,
        }
    }

    fn with_loop(self) -> Self {
        Self {
            in_loop: true,
            ..self
        }
    }

    fn with_switch(self) -> Self {
        Self {
            in_switch: true,
            ..self
        }
    }
}

/// What a loop should do with a `Flow` its body just produced.
enum LoopStep {
    /// Ran to completion (or matched a `continue` targeting this loop).
    Keep,
    /// Matched a `break` targeting this loop.
    Stop,
    /// Neither — a labeled break/continue for an outer construct, or a
    /// `return`; the loop must stop and hand this back to its caller.
    Propagate(Flow),
}

fn loop_step(flow: Flow, label: &Option<Rc<str>>) -> LoopStep {
    match flow {
        Flow::Normal => LoopStep::Keep,
        Flow::Break(l) if l.is_none() || &l == label => LoopStep::Stop,
        Flow::Continue(l) if l.is_none() || &l == label => LoopStep::Keep,
        other => LoopStep::Propagate(other),
    }
}

/// Runs statements until `}` or end-of-input, *without* consuming the
/// closing brace itself — every caller already knows where the block ends
/// (it captured `Cursor::matching()` before entering), so it repositions
/// the cursor there itself rather than relying on this loop to find it.
pub fn exec_block(engine: &mut Engine, cur: &mut Cursor, exec: bool, ctx: ExecContext) -> EvalResult<Flow> {
    loop {
        if cur.check(TokenKind::RBrace) || cur.at_end() {
            return Ok(Flow::Normal);
        }
        let flow = exec_stmt(engine, cur, exec, ctx)?;
        if !flow.is_normal() {
            return Ok(flow);
        }
    }
}

/// Runs a whole program: every top-level statement, in order, until EOF.
pub fn exec_program(engine: &mut Engine, cur: &mut Cursor) -> EvalResult<()> {
    let ctx = ExecContext::program();
    while !cur.at_end() {
        exec_stmt(engine, cur, true, ctx)?;
    }
    Ok(())
}

/// Enters a `{ ... }` block already known to start at `cur.pos`, running it
/// with `exec`, and unconditionally leaving the cursor just past the `}`
/// regardless of how the block's `Flow` came out.
fn exec_braced_block(engine: &mut Engine, cur: &mut Cursor, exec: bool, ctx: ExecContext) -> EvalResult<Flow> {
    let close = cur.matching();
    cur.expect(TokenKind::LBrace).map_err(Signal::from)?;
    let flow = exec_block(engine, cur, exec, ctx);
    cur.pos = close + 1;
    flow
}

pub fn exec_stmt(engine: &mut Engine, cur: &mut Cursor, exec: bool, ctx: ExecContext) -> EvalResult<Flow> {
    exec_stmt_labeled(engine, cur, exec, ctx, None)
}

fn exec_stmt_labeled(
    engine: &mut Engine,
    cur: &mut Cursor,
    exec: bool,
    ctx: ExecContext,
    label: Option<Rc<str>>,
) -> EvalResult<Flow> {
    let flow = match cur.kind() {
        TokenKind::Semicolon => {
            cur.advance();
            Ok(Flow::Normal)
        }
        TokenKind::LBrace => exec_braced_block(engine, cur, exec, ctx),
        TokenKind::If => exec_if(engine, cur, exec, ctx),
        TokenKind::While => exec_while(engine, cur, exec, ctx, label),
        TokenKind::Do => exec_do_while(engine, cur, exec, ctx, label),
        TokenKind::For => exec_for(engine, cur, exec, ctx, label),
        TokenKind::Break => exec_break(cur, ctx),
        TokenKind::Continue => exec_continue(cur, ctx),
        TokenKind::Return => exec_return(engine, cur, exec, ctx),
        TokenKind::Try => exec_try(engine, cur, exec, ctx),
        TokenKind::Switch => exec_switch(engine, cur, exec, ctx, label),
        TokenKind::Throw => exec_throw(engine, cur, exec),
        TokenKind::With => exec_with(engine, cur, exec, ctx),
        TokenKind::Var => exec_var_decl(engine, cur, exec),
        TokenKind::Let => exec_let_decl(engine, cur, exec),
        TokenKind::Function => exec_function_decl(engine, cur, exec),
        TokenKind::Identifier => exec_maybe_labeled(engine, cur, exec, ctx),
        _ => exec_expr_stmt(engine, cur, exec),
    }?;

    // A statement walked purely to keep the cursor in sync (exec == false)
    // never actually takes effect, no matter what its handler computed.
    Ok(if exec { flow } else { Flow::Normal })
}

/// `identifier:` is a label; anything else starting with an identifier is a
/// plain expression statement. Backtracks if the colon isn't there.
fn exec_maybe_labeled(engine: &mut Engine, cur: &mut Cursor, exec: bool, ctx: ExecContext) -> EvalResult<Flow> {
    let save = cur.pos;
    let name = cur.advance().lexeme;
    if cur.eat(TokenKind::Colon) {
        let flow = exec_stmt_labeled(engine, cur, exec, ctx, Some(name.clone()))?;
        return Ok(match flow {
            Flow::Break(ref l) if l.as_ref() == Some(&name) => Flow::Normal,
            other => other,
        });
    }
    cur.pos = save;
    exec_expr_stmt(engine, cur, exec)
}

fn exec_expr_stmt(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Flow> {
    let v = expr::eval_expr(engine, cur, exec)?;
    cur.expect(TokenKind::Semicolon).map_err(Signal::from)?;
    if exec {
        engine.completion = v;
    }
    Ok(Flow::Normal)
}

fn exec_if(engine: &mut Engine, cur: &mut Cursor, exec: bool, ctx: ExecContext) -> EvalResult<Flow> {
    cur.expect(TokenKind::If).map_err(Signal::from)?;
    cur.expect(TokenKind::LParen).map_err(Signal::from)?;
    let cond = expr::eval_expr(engine, cur, exec)?;
    cur.expect(TokenKind::RParen).map_err(Signal::from)?;

    let taken = exec && value::to_bool(&engine.heap, cond);
    let mut flow = exec_braced_block(engine, cur, taken, ctx)?;

    if cur.check(TokenKind::Else) {
        cur.advance();
        let else_exec = exec && !taken;
        let else_flow = if cur.check(TokenKind::If) {
            exec_if(engine, cur, else_exec, ctx)?
        } else {
            exec_braced_block(engine, cur, else_exec, ctx)?
        };
        if !taken {
            flow = else_flow;
        }
    }
    Ok(flow)
}

fn exec_while(
    engine: &mut Engine,
    cur: &mut Cursor,
    exec: bool,
    ctx: ExecContext,
    label: Option<Rc<str>>,
) -> EvalResult<Flow> {
    let span = cur.span();
    cur.expect(TokenKind::While).map_err(Signal::from)?;
    let close_paren = cur.matching();
    cur.expect(TokenKind::LParen).map_err(Signal::from)?;
    let cond_start = cur.pos;
    cur.pos = close_paren;
    cur.expect(TokenKind::RParen).map_err(Signal::from)?;
    let body_open = cur.pos;
    let body_close = cur.matching();
    cur.expect(TokenKind::LBrace).map_err(Signal::from)?;

    let loop_ctx = ctx.with_loop();
    let mut iterations: u64 = 0;
    loop {
        let mut cond_cur = Cursor::at(cur.tokens.clone(), cond_start);
        let v = expr::eval_expr(engine, &mut cond_cur, exec)?;
        if !exec || !value::to_bool(&engine.heap, v) {
            break;
        }
        iterations += 1;
        if iterations > engine.config.max_loop_iterations {
            return Err(Signal::from(EngineError::LoopLimit {
                limit: engine.config.max_loop_iterations,
                span,
            }));
        }

        let mut body_cur = Cursor::at(cur.tokens.clone(), body_open + 1);
        let flow = exec_block(engine, &mut body_cur, exec, loop_ctx)?;
        match loop_step(flow, &label) {
            LoopStep::Keep => {}
            LoopStep::Stop => break,
            LoopStep::Propagate(f) => {
                cur.pos = body_close + 1;
                return Ok(f);
            }
        }
    }
    cur.pos = body_close + 1;
    Ok(Flow::Normal)
}

fn exec_do_while(
    engine: &mut Engine,
    cur: &mut Cursor,
    exec: bool,
    ctx: ExecContext,
    label: Option<Rc<str>>,
) -> EvalResult<Flow> {
    let span = cur.span();
    cur.expect(TokenKind::Do).map_err(Signal::from)?;
    let body_open = cur.pos;
    let body_close = cur.matching();
    cur.expect(TokenKind::LBrace).map_err(Signal::from)?;
    cur.pos = body_close;
    cur.expect(TokenKind::RBrace).map_err(Signal::from)?;
    cur.expect(TokenKind::While).map_err(Signal::from)?;
    let close_paren = cur.matching();
    cur.expect(TokenKind::LParen).map_err(Signal::from)?;
    let cond_start = cur.pos;
    cur.pos = close_paren;
    cur.expect(TokenKind::RParen).map_err(Signal::from)?;
    cur.expect(TokenKind::Semicolon).map_err(Signal::from)?;

    let loop_ctx = ctx.with_loop();
    let mut iterations: u64 = 0;
    loop {
        let mut body_cur = Cursor::at(cur.tokens.clone(), body_open + 1);
        let flow = exec_block(engine, &mut body_cur, exec, loop_ctx)?;
        match loop_step(flow, &label) {
            LoopStep::Keep => {}
            LoopStep::Stop => break,
            LoopStep::Propagate(f) => return Ok(f),
        }
        if !exec {
            break;
        }
        let mut cond_cur = Cursor::at(cur.tokens.clone(), cond_start);
        let v = expr::eval_expr(engine, &mut cond_cur, exec)?;
        if !value::to_bool(&engine.heap, v) {
            break;
        }
        iterations += 1;
        if iterations > engine.config.max_loop_iterations {
            return Err(Signal::from(EngineError::LoopLimit {
                limit: engine.config.max_loop_iterations,
                span,
            }));
        }
    }
    Ok(Flow::Normal)
}

/// `for (init; cond; iter) { ... }`, and `for (x in o)` / `for each (x in o)
/// { ... }` once the `in`-form lookahead in [`exec_for`] routes here.
fn exec_for(
    engine: &mut Engine,
    cur: &mut Cursor,
    exec: bool,
    ctx: ExecContext,
    label: Option<Rc<str>>,
) -> EvalResult<Flow> {
    let span = cur.span();
    cur.expect(TokenKind::For).map_err(Signal::from)?;
    let each = if cur.check(TokenKind::Identifier) && cur.current().lexeme.as_ref() == "each" {
        cur.advance();
        true
    } else {
        false
    };
    cur.expect(TokenKind::LParen).map_err(Signal::from)?;

    if cur.check(TokenKind::Identifier) {
        let save = cur.pos;
        let name = cur.advance().lexeme;
        if cur.eat(TokenKind::In) {
            return exec_for_in(engine, cur, exec, ctx, label, name, each);
        }
        cur.pos = save;
    }

    // Classic `for (init; cond; iter)`. `init`/`cond`/`iter` never contain a
    // bare top-level `;` of their own (string literals aside, which the
    // lexer already consumed), so a single exec=false pass through each is
    // enough to discover where the next one starts.
    if !cur.check(TokenKind::Semicolon) {
        expr::eval_expr(engine, cur, exec)?;
    }
    cur.expect(TokenKind::Semicolon).map_err(Signal::from)?;

    let cond_start = cur.pos;
    if !cur.check(TokenKind::Semicolon) {
        expr::eval_expr(engine, cur, false)?;
    }
    let cond_end = cur.pos;
    cur.expect(TokenKind::Semicolon).map_err(Signal::from)?;

    let iter_start = cur.pos;
    if !cur.check(TokenKind::RParen) {
        expr::eval_expr(engine, cur, false)?;
    }
    let iter_end = cur.pos;
    cur.expect(TokenKind::RParen).map_err(Signal::from)?;

    let body_open = cur.pos;
    let body_close = cur.matching();
    cur.expect(TokenKind::LBrace).map_err(Signal::from)?;

    let loop_ctx = ctx.with_loop();
    let mut iterations: u64 = 0;
    loop {
        if cond_start != cond_end {
            let mut cond_cur = Cursor::at(cur.tokens.clone(), cond_start);
            let v = expr::eval_expr(engine, &mut cond_cur, exec)?;
            if !exec || !value::to_bool(&engine.heap, v) {
                break;
            }
        } else if !exec {
            break;
        }

        iterations += 1;
        if iterations > engine.config.max_loop_iterations {
            return Err(Signal::from(EngineError::LoopLimit {
                limit: engine.config.max_loop_iterations,
                span,
            }));
        }

        let mut body_cur = Cursor::at(cur.tokens.clone(), body_open + 1);
        let flow = exec_block(engine, &mut body_cur, exec, loop_ctx)?;
        match loop_step(flow, &label) {
            LoopStep::Keep => {}
            LoopStep::Stop => break,
            LoopStep::Propagate(f) => {
                cur.pos = body_close + 1;
                return Ok(f);
            }
        }

        if iter_start != iter_end {
            let mut iter_cur = Cursor::at(cur.tokens.clone(), iter_start);
            expr::eval_expr(engine, &mut iter_cur, exec)?;
        }
    }
    cur.pos = body_close + 1;
    Ok(Flow::Normal)
}

/// `for (name in obj) { ... }` / `for each (name in obj) { ... }` — `cur`
/// is positioned right after the consumed `in` keyword.
fn exec_for_in(
    engine: &mut Engine,
    cur: &mut Cursor,
    exec: bool,
    ctx: ExecContext,
    label: Option<Rc<str>>,
    name: Rc<str>,
    each: bool,
) -> EvalResult<Flow> {
    let obj = expr::eval_expr(engine, cur, exec)?;
    cur.expect(TokenKind::RParen).map_err(Signal::from)?;
    let body_open = cur.pos;
    let body_close = cur.matching();
    cur.expect(TokenKind::LBrace).map_err(Signal::from)?;

    if !exec {
        cur.pos = body_close + 1;
        return Ok(Flow::Normal);
    }

    let names: Vec<Rc<str>> = engine
        .heap
        .slot(obj)
        .props
        .iter()
        .filter(|(_, e)| e.attrs.enumerable)
        .map(|(n, _)| n.clone())
        .collect();

    let loop_ctx = ctx.with_loop();
    for prop_name in names {
        let item = if each {
            engine
                .heap
                .slot(obj)
                .props
                .find(&prop_name)
                .map(|e| e.target)
                .unwrap_or(engine.undefined)
        } else {
            engine.heap.alloc(ValueData::Str(prop_name.clone()))
        };
        if !engine.scope.assign(&mut engine.heap, &name, item) {
            engine.var_scope.declare(&mut engine.heap, name.clone(), item);
        }

        let mut body_cur = Cursor::at(cur.tokens.clone(), body_open + 1);
        let flow = exec_block(engine, &mut body_cur, true, loop_ctx)?;
        match loop_step(flow, &label) {
            LoopStep::Keep => {}
            LoopStep::Stop => break,
            LoopStep::Propagate(f) => {
                cur.pos = body_close + 1;
                return Ok(f);
            }
        }
    }
    cur.pos = body_close + 1;
    Ok(Flow::Normal)
}

fn exec_break(cur: &mut Cursor, ctx: ExecContext) -> EvalResult<Flow> {
    let span = cur.span();
    cur.expect(TokenKind::Break).map_err(Signal::from)?;
    let label = if cur.check(TokenKind::Identifier) {
        Some(cur.advance().lexeme)
    } else {
        None
    };
    cur.expect(TokenKind::Semicolon).map_err(Signal::from)?;
    if !(ctx.in_loop || ctx.in_switch) {
        return Err(Signal::from(SyntaxError::IllegalBreak { span }));
    }
    Ok(Flow::Break(label))
}

fn exec_continue(cur: &mut Cursor, ctx: ExecContext) -> EvalResult<Flow> {
    let span = cur.span();
    cur.expect(TokenKind::Continue).map_err(Signal::from)?;
    let label = if cur.check(TokenKind::Identifier) {
        Some(cur.advance().lexeme)
    } else {
        None
    };
    cur.expect(TokenKind::Semicolon).map_err(Signal::from)?;
    if !ctx.in_loop {
        return Err(Signal::from(SyntaxError::IllegalContinue { span }));
    }
    Ok(Flow::Continue(label))
}

fn exec_return(engine: &mut Engine, cur: &mut Cursor, exec: bool, ctx: ExecContext) -> EvalResult<Flow> {
    let span = cur.span();
    cur.expect(TokenKind::Return).map_err(Signal::from)?;
    let value = if cur.check(TokenKind::Semicolon) {
        engine.undefined
    } else {
        expr::eval_expr(engine, cur, exec)?
    };
    cur.expect(TokenKind::Semicolon).map_err(Signal::from)?;
    if !ctx.in_function {
        return Err(Signal::from(SyntaxError::IllegalReturn { span }));
    }
    Ok(Flow::Return(value))
}

fn exec_throw(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Flow> {
    let span = cur.span();
    cur.expect(TokenKind::Throw).map_err(Signal::from)?;
    let v = expr::eval_expr(engine, cur, exec)?;
    cur.expect(TokenKind::Semicolon).map_err(Signal::from)?;
    if !exec {
        return Ok(Flow::Normal);
    }
    Err(Signal::Throw(v, span))
}

fn exec_switch(
    engine: &mut Engine,
    cur: &mut Cursor,
    exec: bool,
    ctx: ExecContext,
    label: Option<Rc<str>>,
) -> EvalResult<Flow> {
    cur.expect(TokenKind::Switch).map_err(Signal::from)?;
    let close_paren = cur.matching();
    cur.expect(TokenKind::LParen).map_err(Signal::from)?;
    let disc = expr::eval_expr(engine, cur, exec)?;
    cur.pos = close_paren;
    cur.expect(TokenKind::RParen).map_err(Signal::from)?;

    let body_open = cur.pos;
    let body_close = cur.matching();
    cur.expect(TokenKind::LBrace).map_err(Signal::from)?;

    if !exec {
        cur.pos = body_close + 1;
        return Ok(Flow::Normal);
    }

    // Linear scan for the first matching `case` label (`===` against the
    // discriminant), remembering `default`'s position along the way —
    // spec.md's "linear scan of case labels ... falling through until
    // `break`; an optional `default`".
    let mut scan = Cursor::at(cur.tokens.clone(), body_open + 1);
    let mut default_pos: Option<usize> = None;
    let mut matched_pos: Option<usize> = None;
    while scan.pos < body_close && matched_pos.is_none() {
        match scan.kind() {
            TokenKind::Case => {
                scan.advance();
                let v = expr::eval_expr(engine, &mut scan, true)?;
                scan.expect(TokenKind::Colon).map_err(Signal::from)?;
                if value::strict_equals(&engine.heap, v, disc) {
                    matched_pos = Some(scan.pos);
                }
            }
            TokenKind::Default => {
                scan.advance();
                scan.expect(TokenKind::Colon).map_err(Signal::from)?;
                default_pos = Some(scan.pos);
            }
            TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => {
                scan.skip_bracket();
            }
            _ => {
                scan.advance();
            }
        }
    }

    let start = matched_pos.or(default_pos);
    let mut result = Flow::Normal;
    if let Some(start) = start {
        let switch_ctx = ctx.with_switch();
        let mut body_cur = Cursor::at(cur.tokens.clone(), start);
        while body_cur.pos < body_close {
            match body_cur.kind() {
                TokenKind::Case => {
                    body_cur.advance();
                    expr::eval_expr(engine, &mut body_cur, false)?;
                    body_cur.expect(TokenKind::Colon).map_err(Signal::from)?;
                    continue;
                }
                TokenKind::Default => {
                    body_cur.advance();
                    body_cur.expect(TokenKind::Colon).map_err(Signal::from)?;
                    continue;
                }
                _ => {}
            }
            let flow = exec_stmt(engine, &mut body_cur, true, switch_ctx)?;
            match flow {
                Flow::Normal => {}
                Flow::Break(ref l) if l.is_none() || *l == label => break,
                other => {
                    cur.pos = body_close + 1;
                    return Ok(other);
                }
            }
        }
        result = Flow::Normal;
    }

    cur.pos = body_close + 1;
    Ok(result)
}

fn exec_with(engine: &mut Engine, cur: &mut Cursor, exec: bool, ctx: ExecContext) -> EvalResult<Flow> {
    cur.expect(TokenKind::With).map_err(Signal::from)?;
    let close_paren = cur.matching();
    cur.expect(TokenKind::LParen).map_err(Signal::from)?;
    let target = expr::eval_expr(engine, cur, exec)?;
    cur.pos = close_paren;
    cur.expect(TokenKind::RParen).map_err(Signal::from)?;

    let outer_scope = engine.scope;
    if exec {
        engine.scope = outer_scope.push_with(&mut engine.heap, target);
        gc::ref_value(&mut engine.heap, engine.scope.top);
    }
    let flow = exec_braced_block(engine, cur, exec, ctx);
    if exec {
        gc::unref_value(&mut engine.heap, engine.scope.top);
        engine.scope = outer_scope;
    }
    flow
}

fn exec_try(engine: &mut Engine, cur: &mut Cursor, exec: bool, ctx: ExecContext) -> EvalResult<Flow> {
    cur.expect(TokenKind::Try).map_err(Signal::from)?;
    let mut pending = exec_braced_block(engine, cur, exec, ctx);

    if cur.check(TokenKind::Catch) {
        cur.advance();
        cur.expect(TokenKind::LParen).map_err(Signal::from)?;
        let catch_name = cur.expect(TokenKind::Identifier).map_err(Signal::from)?.lexeme;
        cur.expect(TokenKind::RParen).map_err(Signal::from)?;

        let is_throw = matches!(pending, Err(Signal::Throw(_, _)));
        if is_throw {
            let thrown = match pending {
                Err(Signal::Throw(v, _)) => v,
                _ => unreachable!(),
            };
            let outer_scope = engine.scope;
            engine.scope = outer_scope.push(&mut engine.heap, ScopeKind::Let);
            gc::ref_value(&mut engine.heap, engine.scope.top);
            engine.scope.declare(&mut engine.heap, catch_name, thrown);

            pending = exec_braced_block(engine, cur, exec, ctx);

            gc::unref_value(&mut engine.heap, engine.scope.top);
            engine.scope = outer_scope;
        } else {
            // Not caught: walk the catch block passively, just to consume
            // its tokens, and leave `pending` as it was.
            exec_braced_block(engine, cur, false, ctx)?;
        }
    }

    if cur.check(TokenKind::Finally) {
        cur.advance();
        let finally_flow = exec_braced_block(engine, cur, exec, ctx);
        match finally_flow {
            Ok(Flow::Normal) => {}
            other => pending = other,
        }
    }

    pending
}

fn exec_var_decl(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Flow> {
    cur.expect(TokenKind::Var).map_err(Signal::from)?;
    let name = cur.expect(TokenKind::Identifier).map_err(Signal::from)?.lexeme;
    cur.expect(TokenKind::Semicolon).map_err(Signal::from)?;
    if exec {
        let undefined = engine.undefined;
        engine.var_scope.declare(&mut engine.heap, name, undefined);
    }
    Ok(Flow::Normal)
}

/// `let name = expr;` found in place. The binding itself was already
/// hoisted (as a bare `var`) to the enclosing function/root scope by the
/// tokenizer, so this is an assignment, never a fresh declaration.
fn exec_let_decl(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Flow> {
    cur.expect(TokenKind::Let).map_err(Signal::from)?;
    let name = cur.expect(TokenKind::Identifier).map_err(Signal::from)?.lexeme;
    let value = if cur.eat(TokenKind::Assign) {
        expr::eval_expr(engine, cur, exec)?
    } else {
        engine.undefined
    };
    cur.expect(TokenKind::Semicolon).map_err(Signal::from)?;
    if exec && !engine.scope.assign(&mut engine.heap, &name, value) {
        engine.var_scope.declare(&mut engine.heap, name, value);
    }
    Ok(Flow::Normal)
}

/// A `function name(...) { ... }` declaration, always relocated to its
/// enclosing scope's head by the hoist pass. No trailing semicolon.
fn exec_function_decl(engine: &mut Engine, cur: &mut Cursor, exec: bool) -> EvalResult<Flow> {
    let link = expr::function_literal(engine, cur)?;
    if exec {
        if let Some(func) = link.value() {
            let name = match &engine.heap.slot(func).data {
                ValueData::Function(desc) => desc.name.clone(),
                _ => None,
            };
            if let Some(name) = name {
                engine.scope.declare(&mut engine.heap, name, func);
            }
        }
    }
    Ok(Flow::Normal)
}
