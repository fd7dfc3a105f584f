//! The scope chain (spec.md §4.4).
//!
//! A scope is just an ordinary heap object: variables are its properties,
//! and the link to the enclosing scope is a hidden `__parent__` property
//! (spec.md §9: "the `parent`, `closure`, and `with` links are ordinary
//! properties with the `hidden` attribute"). `ScopeChain` is the thin,
//! non-owning cursor the evaluator carries around; it never allocates a
//! scope itself — `engine.rs` does that when entering a function call,
//! a `let` block, or a `with` statement.

use std::rc::Rc;

use crate::gc;
use crate::heap::{Heap, LinkAttrs, ValueId};
use crate::value::ValueData;

const PARENT_SLOT: &str = "__parent__";

/// What kind of scope a given scope object represents. Only used for
/// diagnostics and for `with`'s fallthrough-to-prototype-chain lookup
/// semantics; storage is identical across all four kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The program-level scope a script executes in.
    Root,
    /// Opened on every function call; holds parameters, `arguments`, and
    /// every `var` hoisted into the function body.
    FunctionActivation,
    /// Opened for a block that declares `let` bindings.
    Let,
    /// Opened by a `with (obj) { ... }` statement; lookups fall through to
    /// `obj`'s own properties before continuing up the chain.
    With,
}

/// A non-owning cursor over the live scope chain. Cloning a `ScopeChain` is
/// cheap (it's just a `ValueId` plus a tag) and does not itself ref/unref
/// anything; ownership of scope objects is established purely through the
/// `__parent__` heap edges.
#[derive(Debug, Clone, Copy)]
pub struct ScopeChain {
    pub top: ValueId,
    pub kind: ScopeKind,
}

impl ScopeChain {
    /// Allocates a brand new, parentless scope object (used once, for the
    /// engine's root scope).
    pub fn new_root(heap: &mut Heap) -> Self {
        let top = heap.alloc(ValueData::Object);
        gc::ref_value(heap, top);
        ScopeChain {
            top,
            kind: ScopeKind::Root,
        }
    }

    /// Opens a child scope of `kind` whose parent is `self`.
    ///
    /// The returned scope object starts with `refs == 0`: it's owned only
    /// by its `__parent__` edge being pointed *at* from nowhere yet. The
    /// caller is responsible for giving it a stack-frame reference (one
    /// `gc::ref_value`) for as long as it stays the current scope, and
    /// unreffing it on the way back out — exactly like any other value a
    /// caller temporarily owns. A function literal that closes over this
    /// scope adds its own, longer-lived reference on top.
    pub fn push(&self, heap: &mut Heap, kind: ScopeKind) -> ScopeChain {
        let child = heap.alloc(ValueData::Object);
        gc::ref_value(heap, self.top);
        heap.slot_mut(child)
            .props
            .set(PARENT_SLOT.into(), self.top, LinkAttrs::internal());
        gc::note_edge_written(heap, child);
        ScopeChain { top: child, kind }
    }

    /// Opens a `with` scope whose lookups fall through to `target`'s own
    /// properties (and its prototype chain) before the enclosing scope.
    /// Same stack-frame-reference contract as [`ScopeChain::push`].
    pub fn push_with(&self, heap: &mut Heap, target: ValueId) -> ScopeChain {
        let child = heap.alloc(ValueData::Object);
        gc::ref_value(heap, self.top);
        gc::ref_value(heap, target);
        heap.slot_mut(child)
            .props
            .set(PARENT_SLOT.into(), self.top, LinkAttrs::internal());
        heap.slot_mut(child)
            .props
            .set("__with__".into(), target, LinkAttrs::internal());
        gc::note_edge_written(heap, child);
        ScopeChain {
            top: child,
            kind: ScopeKind::With,
        }
    }

    pub fn parent(&self, heap: &Heap) -> Option<ScopeChain> {
        heap.slot(self.top).props.find(PARENT_SLOT).map(|e| {
            let kind = if heap.slot(e.target).props.find("__with__").is_some() {
                ScopeKind::With
            } else {
                ScopeKind::Root
            };
            ScopeChain { top: e.target, kind }
        })
    }

    /// Whether this scope object itself carries a `with` target, regardless
    /// of the `kind` tag it was constructed with — used while walking so an
    /// ancestor `with` scope is never silently skipped.
    fn with_target(&self, heap: &Heap) -> Option<ValueId> {
        heap.slot(self.top).props.find("__with__").map(|e| e.target)
    }

    /// Looks up `name` by walking outward from `self` through `with`
    /// targets, then parent scopes, per spec.md §4.4. Returns the scope
    /// object that actually owns the binding, or `None` if unbound.
    pub fn resolve(&self, heap: &Heap, name: &str) -> Option<ValueId> {
        let mut cur = *self;
        loop {
            if let Some(target) = cur.with_target(heap) {
                if heap.slot(target).props.find(name).is_some() {
                    return Some(target);
                }
            }
            if heap.slot(cur.top).props.find(name).is_some() {
                return Some(cur.top);
            }
            cur = cur.parent(heap)?;
        }
    }

    /// Reads a bound variable's value, or `None` if `name` is unbound
    /// anywhere in the chain.
    pub fn get(&self, heap: &Heap, name: &str) -> Option<ValueId> {
        let owner = self.resolve(heap, name)?;
        heap.slot(owner).props.find(name).map(|e| e.target)
    }

    /// Assigns to an already-bound variable. Returns `false` if `name`
    /// isn't bound anywhere in the chain (the caller decides whether that's
    /// an implicit global declaration or a `ReferenceError`).
    pub fn assign(&self, heap: &mut Heap, name: &str, value: ValueId) -> bool {
        let Some(owner) = self.resolve(heap, name) else {
            return false;
        };
        set_prop(heap, owner, name, value, LinkAttrs::data());
        true
    }

    /// Declares `name` directly in *this* scope (used for function
    /// parameters, `var`/`function`/`let` hoisting targets, and `catch`
    /// bindings), overwriting any existing binding of the same name in this
    /// scope only.
    pub fn declare(&self, heap: &mut Heap, name: Rc<str>, value: ValueId) {
        set_prop(heap, self.top, &name, value, LinkAttrs::data());
    }

    /// Declares `name` in the root scope (used when an unresolved plain
    /// assignment implicitly creates a global per non-strict JS semantics).
    pub fn declare_global(&self, heap: &mut Heap, name: Rc<str>, value: ValueId) {
        let mut root = *self;
        while let Some(p) = root.parent(heap) {
            root = p;
        }
        root.declare(heap, name, value);
    }
}

/// Sets a property, correctly ref-counting the replaced and new targets and
/// running the cycle check on the owner.
pub fn set_prop(heap: &mut Heap, owner: ValueId, name: &str, value: ValueId, attrs: LinkAttrs) {
    let old = heap.slot(owner).props.find(name).map(|e| e.target);
    gc::ref_value(heap, value);
    heap.slot_mut(owner).props.set(name.into(), value, attrs);
    if let Some(old) = old {
        gc::unref_value(heap, old);
    }
    gc::note_edge_written(heap, owner);
}
