//! The runtime value arena (spec.md §3, §9 design note on polymorphic
//! values).
//!
//! Every [`Value`](crate::value::Value) lives in a slot of this arena,
//! addressed by a small [`ValueId`] index rather than a pointer. Choosing an
//! arena over `Rc`/`Gc` pointers is the "arena + indices" option spec.md §9
//! calls out explicitly: cycles such as `a.self = a` exist only as logical
//! edges inside a slot's property table, never as an actual Rust ownership
//! cycle, so the cycle-aware refcounting in `gc.rs` can tear them down
//! without `unsafe`.

use std::collections::HashMap;
use std::rc::Rc;

use crate::value::ValueData;

/// An index into a [`Heap`]. Cheap to copy, cheap to hash, never dereferenced
/// directly — always resolved through a `Heap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub(crate) u32);

impl ValueId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Attribute bits carried by a [`PropertyEntry`], mirroring the `Link`
/// attributes in spec.md's GLOSSARY. `owned` itself isn't stored here: a
/// property is owned precisely by virtue of living in a value's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkAttrs {
    pub writable: bool,
    pub deletable: bool,
    pub enumerable: bool,
    pub hidden: bool,
    /// True for a `get`/`set` property literal: `target` points not at the
    /// value itself but at an accessor-pair object carrying `get`/`set`
    /// function properties (spec.md §3 invariant 5).
    pub is_accessor: bool,
}

impl LinkAttrs {
    /// Attributes for an ordinary script-visible data property.
    pub fn data() -> Self {
        Self {
            writable: true,
            deletable: true,
            enumerable: true,
            hidden: false,
            is_accessor: false,
        }
    }

    /// Attributes for engine-internal bookkeeping slots (`__proto__`,
    /// scope-chain parent/closure/with links — spec.md §9: "the `parent`,
    /// `closure`, and `with` links are ordinary properties with the
    /// `hidden` attribute").
    pub fn internal() -> Self {
        Self {
            writable: true,
            deletable: false,
            enumerable: false,
            hidden: true,
            is_accessor: false,
        }
    }

    /// Attributes for a `get`/`set` accessor pair installed by an object
    /// literal (spec.md §3 invariant 5).
    pub fn accessor() -> Self {
        Self {
            writable: false,
            deletable: true,
            enumerable: true,
            hidden: false,
            is_accessor: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PropertyEntry {
    pub target: ValueId,
    pub attrs: LinkAttrs,
}

/// A value's property table. Implemented as an insertion-ordered `Vec`
/// rather than a `HashMap` keyed purely by name: property counts per object
/// are small in practice, insertion order is directly observable through
/// `for..in` and array iteration, and spec.md §4.3 explicitly leaves the
/// storage strategy open ("sorted or hashed by name").
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    entries: Vec<(Rc<str>, PropertyEntry)>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<&PropertyEntry> {
        self.entries.iter().find(|(n, _)| n.as_ref() == name).map(|(_, e)| e)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut PropertyEntry> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, e)| e)
    }

    /// Installs or overwrites a property, preserving its original position
    /// on overwrite.
    pub fn set(&mut self, name: Rc<str>, target: ValueId, attrs: LinkAttrs) {
        if let Some(entry) = self.find_mut(&name) {
            entry.target = target;
            entry.attrs = attrs;
        } else {
            self.entries.push((name, PropertyEntry { target, attrs }));
        }
    }

    /// Removes a property if it exists and is deletable. Returns whether a
    /// property was actually removed.
    pub fn remove(&mut self, name: &str) -> bool {
        if let Some(pos) = self.entries.iter().position(|(n, _)| n.as_ref() == name) {
            if self.entries[pos].1.attrs.deletable {
                self.entries.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &PropertyEntry)> {
        self.entries.iter().map(|(n, e)| (n, e))
    }

    pub fn names(&self) -> impl Iterator<Item = &Rc<str>> {
        self.entries.iter().map(|(n, _)| n)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Opaque handle into `Heap::cycle_sets` (spec.md GLOSSARY: "recursion
/// set").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CycleSetId(pub(crate) u32);

#[derive(Debug, Default)]
pub struct CycleSet {
    pub members: std::collections::HashSet<ValueId>,
}

/// One value slot: its data, its property table, its prototype link, and
/// the refcounting bookkeeping from spec.md §3/§4.6.
#[derive(Debug)]
pub struct ValueSlot {
    pub data: ValueData,
    pub props: PropertyTable,
    pub proto: Option<ValueId>,
    pub refs: u32,
    pub internal_refs: u32,
    pub cycle_set: Option<CycleSetId>,
}

impl ValueSlot {
    fn new(data: ValueData) -> Self {
        Self {
            data,
            props: PropertyTable::new(),
            proto: None,
            refs: 0,
            internal_refs: 0,
            cycle_set: None,
        }
    }

    /// Every outgoing edge from this value: its prototype, every property
    /// target, and — for a script function — the scope it closes over.
    /// Used by the cycle collector's graph walk and by teardown, so a
    /// closure's captured scope is refcounted exactly like any other edge.
    pub fn outgoing_edges(&self) -> Vec<ValueId> {
        let mut out: Vec<ValueId> = self.props.iter().map(|(_, e)| e.target).collect();
        if let Some(p) = self.proto {
            out.push(p);
        }
        if let ValueData::Function(f) = &self.data {
            if let Some(closure) = f.closure {
                out.push(closure);
            }
        }
        out
    }
}

enum Slot {
    Occupied(ValueSlot),
    Free,
}

/// The arena backing every runtime value for one [`crate::engine::Engine`]
/// instance. Never shared across engines (spec.md §5: "two distinct
/// interpreter instances may run in parallel provided they share no
/// values").
pub struct Heap {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    pub(crate) cycle_sets: HashMap<CycleSetId, CycleSet>,
    next_cycle_set: u32,
    pub(crate) collecting: std::collections::HashSet<CycleSetId>,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            cycle_sets: HashMap::new(),
            next_cycle_set: 0,
            collecting: std::collections::HashSet::new(),
        }
    }

    /// Allocates a fresh value with zero references; the caller is
    /// responsible for calling [`Heap::ref_value`] once it stores the id
    /// somewhere owned (a scope slot, a property, etc.) — values with
    /// `refs == 0` that nobody ever refs are simply never freed explicitly,
    /// they're reclaimed the next time the engine is torn down, matching a
    /// transient `Link`'s "unowned" result per spec.md's GLOSSARY.
    pub fn alloc(&mut self, data: ValueData) -> ValueId {
        if let Some(idx) = self.free_list.pop() {
            self.slots[idx as usize] = Slot::Occupied(ValueSlot::new(data));
            ValueId(idx)
        } else {
            self.slots.push(Slot::Occupied(ValueSlot::new(data)));
            ValueId((self.slots.len() - 1) as u32)
        }
    }

    pub fn slot(&self, id: ValueId) -> &ValueSlot {
        match &self.slots[id.index()] {
            Slot::Occupied(s) => s,
            Slot::Free => panic!("liljs: use of a freed ValueId {:?}", id),
        }
    }

    pub fn slot_mut(&mut self, id: ValueId) -> &mut ValueSlot {
        match &mut self.slots[id.index()] {
            Slot::Occupied(s) => s,
            Slot::Free => panic!("liljs: use of a freed ValueId {:?}", id),
        }
    }

    pub fn is_live(&self, id: ValueId) -> bool {
        id.index() < self.slots.len() && matches!(self.slots[id.index()], Slot::Occupied(_))
    }

    pub(crate) fn deallocate(&mut self, id: ValueId) {
        log::trace!("liljs: freeing value {:?}", id);
        self.slots[id.index()] = Slot::Free;
        self.free_list.push(id.0);
    }

    pub fn ref_value(&mut self, id: ValueId) {
        self.slot_mut(id).refs += 1;
    }

    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Occupied(_)))
            .count()
    }

    pub(crate) fn fresh_cycle_set(&mut self) -> CycleSetId {
        let id = CycleSetId(self.next_cycle_set);
        self.next_cycle_set += 1;
        id
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
