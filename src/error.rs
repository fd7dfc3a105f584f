//! Error types for the liljs interpreter.
//!
//! Errors partition into the three kinds spec'd for the engine: lexical
//! errors from tokenization, syntax errors from the evaluator's own token
//! cursor (including `break`/`continue`/`return` used outside their legal
//! context), and engine-level failures (uncaught script exceptions, loop or
//! call-depth limits). All three carry a [`Span`] so hosts can report a
//! precise source location.

use thiserror::Error;

use crate::span::Span;

/// Errors raised while turning source bytes into tokens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    /// A string literal's closing quote was never found.
    #[error("unterminated string literal starting at {span}")]
    UnterminatedString {
        /// Location of the opening quote.
        span: Span,
    },

    /// A block comment (`/* ... */`) was never closed.
    #[error("unterminated comment starting at {span}")]
    UnterminatedComment {
        /// Location of the opening `/*`.
        span: Span,
    },

    /// A character doesn't start any recognized token.
    #[error("unexpected character '{ch}' at {span}")]
    UnexpectedChar {
        /// The offending character.
        ch: char,
        /// Location of the character.
        span: Span,
    },

    /// An escape sequence inside a string literal was malformed.
    #[error("invalid escape sequence '\\{ch}' at {span}")]
    InvalidEscape {
        /// The character following the backslash.
        ch: char,
        /// Location of the escape sequence.
        span: Span,
    },
}

/// Errors raised by the evaluator when the token stream doesn't match what's
/// expected, or when control-flow keywords appear outside their legal
/// context (spec.md §7: "recognized syntactically but flagged at evaluation
/// time").
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    /// The evaluator expected one token kind and found another.
    #[error("Got {found} expected {expected} at {span}")]
    Unexpected {
        /// Description of what was expected.
        expected: String,
        /// Description of what was actually found.
        found: String,
        /// Location of the mismatch.
        span: Span,
    },

    /// `break` (optionally labelled) used outside a loop or `switch`.
    #[error("illegal break statement at {span}")]
    IllegalBreak {
        /// Location of the `break`.
        span: Span,
    },

    /// `continue` used outside a loop.
    #[error("illegal continue statement at {span}")]
    IllegalContinue {
        /// Location of the `continue`.
        span: Span,
    },

    /// `return` used outside a function body.
    #[error("illegal return statement at {span}")]
    IllegalReturn {
        /// Location of the `return`.
        span: Span,
    },

    /// Source ended before a construct was closed.
    #[error("unexpected end of input while parsing {context} at {span}")]
    UnexpectedEof {
        /// What the evaluator was in the middle of parsing.
        context: String,
        /// Location at end of input.
        span: Span,
    },

    /// A lexical error surfaced while the evaluator was pulling tokens.
    #[error(transparent)]
    Lex(#[from] LexError),
}

impl SyntaxError {
    /// The span at which this error occurred.
    pub fn span(&self) -> Span {
        match self {
            SyntaxError::Unexpected { span, .. } => *span,
            SyntaxError::IllegalBreak { span } => *span,
            SyntaxError::IllegalContinue { span } => *span,
            SyntaxError::IllegalReturn { span } => *span,
            SyntaxError::UnexpectedEof { span, .. } => *span,
            SyntaxError::Lex(LexError::UnterminatedString { span }) => *span,
            SyntaxError::Lex(LexError::UnterminatedComment { span }) => *span,
            SyntaxError::Lex(LexError::UnexpectedChar { span, .. }) => *span,
            SyntaxError::Lex(LexError::InvalidEscape { span, .. }) => *span,
        }
    }
}

/// Top-level error returned by [`crate::engine::Engine::execute`] and
/// friends. Every kind named in spec.md §7 has a variant here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A lexical or evaluator-side syntax error; always fatal for the
    /// current `execute`/`evaluate` call.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A script `throw` (or an engine-raised condition such as "X is not a
    /// function") escaped every enclosing `try`, so it was repackaged with a
    /// source position and propagated out of the top-level call.
    #[error("uncaught exception at {span}: {message}")]
    Thrown {
        /// The thrown value, rendered via `getParsableString`.
        message: String,
        /// Location of the `throw` (or the operation that raised it).
        span: Span,
    },

    /// A loop ran for more than `EngineConfig::max_loop_iterations`
    /// iterations without its condition going false.
    #[error("LOOP_ERROR: loop exceeded {limit} iterations at {span}")]
    LoopLimit {
        /// The configured cap that was exceeded.
        limit: u64,
        /// Location of the offending loop.
        span: Span,
    },

    /// Recursive evaluation exceeded `EngineConfig::max_call_depth`.
    #[error("stack overflow: call depth exceeded {limit} at {span}")]
    StackOverflow {
        /// The configured cap that was exceeded.
        limit: usize,
        /// Location of the call that tipped over the limit.
        span: Span,
    },

    /// The prototype chain exceeded `EngineConfig::max_prototype_depth`
    /// while being walked (spec.md §3 invariant 4's safety cap).
    #[error("prototype chain too deep (> {limit}) while resolving '{property}'")]
    PrototypeChainTooDeep {
        /// The configured cap that was exceeded.
        limit: usize,
        /// The property name being resolved when the cap tripped.
        property: String,
    },

    /// `registerNative` was given a signature it couldn't parse (spec.md §6).
    #[error("invalid native signature '{signature}': {reason}")]
    InvalidNativeSignature {
        /// The signature string that failed to parse.
        signature: String,
        /// Why it failed.
        reason: String,
    },
}

impl EngineError {
    /// Builds the `EngineError::Thrown` variant from a rendered value and a
    /// span, for use by the evaluator when a `throw` survives past the
    /// outermost `try`.
    pub fn thrown(message: impl Into<String>, span: Span) -> Self {
        EngineError::Thrown {
            message: message.into(),
            span,
        }
    }
}
