//! Tokenizer pre-pass (spec.md §4.2).
//!
//! Buffers the lexer's output into a random-access [`TokenBuffer`], computes
//! bracket-matching jump distances so the evaluator can skip over
//! non-executing branches in O(1), and hoists `var`/`let`/`function`
//! declarations to the head of their enclosing function (or the program
//! root), the way `spec.md` §4.2 describes.
//!
//! Skip annotations are realized here as one generic matching table over
//! `(` `)`, `{` `}`, and `[` `]`, computed in a single pass over the
//! *post-hoisting* token vector, rather than per-construct annotations
//! written during the hoisting walk itself. The evaluator derives
//! `if`/`while`/`for`/`try`/`switch` boundaries from that same bracket
//! structure the grammar already requires, which is behaviorally equivalent
//! to annotating each construct individually and is far simpler to keep
//! correct while token positions are still moving around during hoisting.
//! See `DESIGN.md` for the corresponding Open Question resolution.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::LexError;
use crate::lexer::{Lexer, Token, TokenKind};

/// A fully buffered, hoisted, skip-annotated token stream, ready for the
/// evaluator to walk by index.
#[derive(Debug)]
pub struct TokenBuffer {
    pub tokens: Vec<Token>,
    /// `skips[i]` is the index of the token matching the bracket opened at
    /// `i` (for `(`/`{`/`[`) or the one it closes (for `)`/`}`/`]`); `0`
    /// everywhere else. Using the open/close index directly (rather than a
    /// signed distance) is the same information and avoids a sign bit.
    pub skips: Vec<u32>,
    pub file: Rc<str>,
}

impl TokenBuffer {
    /// Lexes, hoists, and skip-annotates `src` in one call.
    pub fn build(src: &str, file: impl Into<Rc<str>>) -> Result<TokenBuffer, LexError> {
        let file = file.into();
        let mut lexer = Lexer::new(src, file.clone());
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }

        let tokens = hoist(tokens);
        let skips = match_brackets(&tokens);

        Ok(TokenBuffer {
            tokens,
            skips,
            file,
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Computes, for every bracket token, the index of its matching partner.
/// Mismatched/unclosed brackets simply get no entry (0, meaning "not a jump
/// point") rather than erroring here; the evaluator's own expectation checks
/// surface a `SyntaxError` when it tries to consume a bracket that was never
/// matched.
fn match_brackets(tokens: &[Token]) -> Vec<u32> {
    let mut skips = vec![0u32; tokens.len()];
    let mut stack: Vec<usize> = Vec::new();
    for (i, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => stack.push(i),
            TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                if let Some(open) = stack.pop() {
                    skips[open] = i as u32;
                    skips[i] = open as u32;
                }
            }
            _ => {}
        }
    }
    skips
}

/// One token range queued for relocation to a scope's head.
struct Hoisted {
    tokens: Vec<Token>,
}

/// Per-scope hoisting state. `insert_at` is recomputed as a *relative*
/// marker (we always insert right after the scope's opening brace, or at
/// index 0 for the program root) rather than a frozen absolute index, since
/// absolute positions shift as earlier scopes are rewritten.
struct ScopeAccum {
    /// Index, in the *original* token vector, of this scope's own opening
    /// `{` (or `None` for the root, which has no enclosing brace).
    open_brace: Option<usize>,
    functions: Vec<Hoisted>,
    bare_decls: Vec<Hoisted>,
    declared_names: std::collections::HashSet<Rc<str>>,
}

impl ScopeAccum {
    fn new(open_brace: Option<usize>) -> Self {
        Self {
            open_brace,
            functions: Vec::new(),
            bare_decls: Vec::new(),
            declared_names: std::collections::HashSet::new(),
        }
    }
}

fn bidirectional_matches(tokens: &[Token]) -> HashMap<usize, usize> {
    let mut map = HashMap::new();
    let mut stack = Vec::new();
    for (i, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => stack.push(i),
            TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                if let Some(open) = stack.pop() {
                    map.insert(open, i);
                    map.insert(i, open);
                }
            }
            _ => {}
        }
    }
    map
}

fn is_decl_position(tokens: &[Token], i: usize) -> bool {
    if i == 0 {
        return true;
    }
    matches!(
        tokens[i - 1].kind,
        TokenKind::LBrace | TokenKind::RBrace | TokenKind::Semicolon
    )
}

/// Implements spec.md §4.2's hoisting pass: relocates `function` statement
/// declarations and bare `var`/`let` pre-declarations to the head of their
/// enclosing function (or the program root).
fn hoist(tokens: Vec<Token>) -> Vec<Token> {
    let matches = bidirectional_matches(&tokens);

    // `scopes[0]` is always the program root. Every time we enter a
    // function body we push a new scope and pop it at the matching `}`;
    // plain blocks (`if`/`while`/`for`/`try`/bare `{}`) do *not* push a new
    // hoisting scope, since `var`/`function` hoist past them.
    let mut scopes: Vec<ScopeAccum> = vec![ScopeAccum::new(None)];
    let mut scope_stack: Vec<usize> = vec![0];
    // Indices (in the original vector) to drop entirely from the final
    // output: relocated function bodies, and the `var`/`function` keyword
    // tokens rewritten away.
    let mut dropped: Vec<bool> = vec![false; tokens.len()];
    // Token-for-token replacement for positions that survive but change
    // (e.g. `var x = e ;` losing its `var`).
    let mut i = 0usize;
    while i < tokens.len() {
        match tokens[i].kind {
            TokenKind::Function => {
                // Only a statement-position `function name(...) { ... }`
                // counts as a declaration; `function(){}` expressions and
                // ones used as e.g. a call argument are left untouched.
                let has_name = tokens.get(i + 1).map(|t| t.kind) == Some(TokenKind::Identifier);
                let decl = has_name && is_decl_position(&tokens, i);

                // Find this function's own parameter list and body so we
                // know its full extent regardless of whether it hoists.
                let paren_open = if has_name { i + 2 } else { i + 1 };
                if tokens.get(paren_open).map(|t| t.kind) != Some(TokenKind::LParen) {
                    i += 1;
                    continue;
                }
                let paren_close = *matches.get(&paren_open).unwrap_or(&paren_open);
                let body_open = paren_close + 1;
                if tokens.get(body_open).map(|t| t.kind) != Some(TokenKind::LBrace) {
                    i += 1;
                    continue;
                }
                let body_close = *matches.get(&body_open).unwrap_or(&body_open);
                let full_end = body_close + 1; // exclusive

                if decl {
                    let enclosing = *scope_stack.last().unwrap();
                    scopes[enclosing]
                        .functions
                        .push(Hoisted {
                            tokens: tokens[i..full_end].to_vec(),
                        });
                    for idx in i..full_end {
                        dropped[idx] = true;
                    }
                }

                // Descend into the function body as its own hoisting scope
                // regardless of whether it was itself hoisted, so nested
                // declarations inside it resolve to *its* head, not the
                // enclosing one's.
                scopes.push(ScopeAccum::new(Some(body_open)));
                scope_stack.push(scopes.len() - 1);
                i = body_open + 1;
                continue;
            }
            TokenKind::RBrace => {
                // Closing a function body pops its hoisting scope. Plain
                // blocks don't have a matching push, so only pop when this
                // brace is exactly the one a pushed scope is waiting on.
                if scope_stack.len() > 1 {
                    let top = *scope_stack.last().unwrap();
                    if scopes[top].open_brace.map(|o| matches.get(&o).copied()) == Some(Some(i)) {
                        scope_stack.pop();
                    }
                }
                i += 1;
                continue;
            }
            TokenKind::Var => {
                let Some(name_tok) = tokens.get(i + 1) else {
                    i += 1;
                    continue;
                };
                if name_tok.kind != TokenKind::Identifier {
                    i += 1;
                    continue;
                }
                let name: Rc<str> = name_tok.lexeme.clone();
                let name_idx = i + 1;
                let enclosing = *scope_stack.last().unwrap();

                if tokens.get(name_idx + 1).map(|t| t.kind) == Some(TokenKind::In) {
                    // `for (var x in o)`: not terminated by a `;` at all, so
                    // `find_statement_end`'s semicolon scan doesn't apply
                    // here. Rewrite to a bare `x in o`, same as dropping
                    // `var` from `var x = e;` leaves `x = e;` behind.
                    if scopes[enclosing].declared_names.insert(name.clone()) {
                        scopes[enclosing]
                            .bare_decls
                            .push(Hoisted {
                                tokens: bare_var_decl(&name, &tokens[i]),
                            });
                    }
                    dropped[i] = true; // drop just the `var` keyword
                    i = name_idx;
                    continue;
                }

                if tokens.get(name_idx + 1).map(|t| t.kind) == Some(TokenKind::Assign) {
                    // `var x = expr ;` -> pre-declare `x`, keep `x = expr ;`
                    // in place (drop only the `var` keyword token).
                    let stmt_end = find_statement_end(&tokens, &matches, name_idx + 2);
                    if scopes[enclosing].declared_names.insert(name.clone()) {
                        scopes[enclosing].bare_decls.push(Hoisted {
                            tokens: bare_var_decl(&name, &tokens[i]),
                        });
                    }
                    dropped[i] = true; // drop just the `var` keyword
                    i = stmt_end;
                    continue;
                } else {
                    // `var x ;` with no initializer: fully replaced by the
                    // hoisted pre-declaration, nothing left behind.
                    let stmt_end = find_statement_end(&tokens, &matches, name_idx + 1);
                    if scopes[enclosing].declared_names.insert(name.clone()) {
                        scopes[enclosing].bare_decls.push(Hoisted {
                            tokens: bare_var_decl(&name, &tokens[i]),
                        });
                    }
                    for idx in i..stmt_end {
                        dropped[idx] = true;
                    }
                    i = stmt_end;
                    continue;
                }
            }
            TokenKind::Let => {
                if let Some(name_tok) = tokens.get(i + 1) {
                    if name_tok.kind == TokenKind::Identifier {
                        let name = name_tok.lexeme.clone();
                        let enclosing = *scope_stack.last().unwrap();
                        if scopes[enclosing].declared_names.insert(name.clone()) {
                            scopes[enclosing]
                                .bare_decls
                                .push(Hoisted {
                                    tokens: bare_var_decl(&name, &tokens[i]),
                                });
                        }
                    }
                }
                i += 1;
                continue;
            }
            _ => {
                i += 1;
                continue;
            }
        }
    }

    // Assemble the output: walk the original vector once more, skipping
    // dropped tokens, and splice each scope's hoisted material right after
    // its opening brace (or at index 0 for the root).
    let mut inserts: HashMap<Option<usize>, Vec<Token>> = HashMap::new();
    for scope in &scopes {
        let mut prelude = Vec::new();
        for f in &scope.functions {
            prelude.extend(f.tokens.iter().cloned());
        }
        for d in &scope.bare_decls {
            prelude.extend(d.tokens.iter().cloned());
        }
        if !prelude.is_empty() {
            inserts.insert(scope.open_brace, prelude);
        }
    }

    let mut out = Vec::with_capacity(tokens.len());
    if let Some(prelude) = inserts.get(&None) {
        out.extend(prelude.iter().cloned());
    }
    for (idx, tok) in tokens.into_iter().enumerate() {
        if dropped[idx] {
            continue;
        }
        let is_open_brace = tok.kind == TokenKind::LBrace;
        out.push(tok);
        if is_open_brace {
            if let Some(prelude) = inserts.get(&Some(idx)) {
                out.extend(prelude.iter().cloned());
            }
        }
    }
    out
}

/// Builds the synthetic `var name ;` token run inserted at a scope head,
/// reusing `template`'s span so error messages still point somewhere
/// sensible.
fn bare_var_decl(name: &Rc<str>, template: &Token) -> Vec<Token> {
    vec![
        Token {
            kind: TokenKind::Var,
            lexeme: "var".into(),
            span: template.span,
            literal: crate::lexer::Literal::None,
        },
        Token {
            kind: TokenKind::Identifier,
            lexeme: name.clone(),
            span: template.span,
            literal: crate::lexer::Literal::None,
        },
        Token {
            kind: TokenKind::Semicolon,
            lexeme: ";".into(),
            span: template.span,
            literal: crate::lexer::Literal::None,
        },
    ]
}

/// Scans forward from `expr_start` (the token right after `=`, or right
/// after the bare identifier) to the index just past the declaration's
/// terminating `;`, treating brackets as opaque via `matches`.
fn find_statement_end(tokens: &[Token], matches: &HashMap<usize, usize>, expr_start: usize) -> usize {
    let mut i = expr_start;
    while i < tokens.len() {
        match tokens[i].kind {
            TokenKind::Semicolon => return i + 1,
            TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => {
                i = *matches.get(&i).unwrap_or(&i) + 1;
                continue;
            }
            TokenKind::RBrace | TokenKind::Eof => return i,
            _ => i += 1,
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tb: &TokenBuffer) -> Vec<(TokenKind, &str)> {
        tb.tokens.iter().map(|t| (t.kind, t.lexeme.as_ref())).collect()
    }

    #[test]
    fn bracket_matching_round_trips() {
        let tb = TokenBuffer::build("if (x) { y; }", "t").unwrap();
        // index of '(' -> index of ')'
        let open = tb.tokens.iter().position(|t| t.kind == TokenKind::LParen).unwrap();
        let close = tb.skips[open] as usize;
        assert_eq!(tb.tokens[close].kind, TokenKind::RParen);
        assert_eq!(tb.skips[close] as usize, open);
    }

    #[test]
    fn nested_var_hoists_to_function_head() {
        let tb = TokenBuffer::build("function f(){ if (true) { var x = 1; } return x; }", "t").unwrap();
        let kinds = names(&tb);
        // Immediately after the function body's '{' we expect the hoisted
        // `var x ;` before anything else.
        let body_open = kinds.iter().position(|(k, _)| *k == TokenKind::LBrace).unwrap();
        assert_eq!(kinds[body_open + 1].0, TokenKind::Var);
        assert_eq!(kinds[body_open + 2].0, TokenKind::Identifier);
        assert_eq!(kinds[body_open + 2].1, "x");
        assert_eq!(kinds[body_open + 3].0, TokenKind::Semicolon);
        // and the original site now just assigns.
        assert!(kinds
            .windows(2)
            .any(|w| w[0].0 == TokenKind::Identifier && w[0].1 == "x" && w[1].0 == TokenKind::Assign));
    }

    #[test]
    fn nested_function_declaration_hoists_whole() {
        let tb = TokenBuffer::build("if (true) { function g(){ return 1; } } g();", "t").unwrap();
        assert_eq!(tb.tokens[0].kind, TokenKind::Function);
    }

    #[test]
    fn var_in_for_in_header_hoists_and_rewrites() {
        let tb = TokenBuffer::build("function f(){ for (var k in o) { } }", "t").unwrap();
        let kinds = names(&tb);
        let body_open = kinds.iter().position(|(k, _)| *k == TokenKind::LBrace).unwrap();
        assert_eq!(kinds[body_open + 1].0, TokenKind::Var);
        assert_eq!(kinds[body_open + 2].1, "k");
        assert_eq!(kinds[body_open + 3].0, TokenKind::Semicolon);
        // original header now reads `for (k in o)`, no leftover `var`.
        let for_idx = kinds.iter().position(|(k, _)| *k == TokenKind::For).unwrap();
        assert_eq!(kinds[for_idx + 2].1, "k");
        assert_eq!(kinds[for_idx + 3].0, TokenKind::In);
    }

    #[test]
    fn let_injects_var_without_disturbing_original() {
        let tb = TokenBuffer::build("{ let y = 2; }", "t").unwrap();
        let kinds = names(&tb);
        assert_eq!(kinds[0].0, TokenKind::Var);
        assert_eq!(kinds[1].1, "y");
        // original `let y = 2;` still present later, untouched.
        assert!(kinds.iter().any(|(k, _)| *k == TokenKind::Let));
    }
}
