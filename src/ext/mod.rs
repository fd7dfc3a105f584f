//! Optional collaborators that aren't part of the core interpreter
//! (spec.md: "regex is an optional collaborator, never core"). Gated behind
//! their own Cargo features so a host that doesn't need them pays nothing
//! for them.

#[cfg(feature = "regex")]
pub mod regexp;
