//! Cycle-aware reference counting (spec.md §4.6).
//!
//! Plain refcounting frees a value the instant its `refs` hits zero. That
//! breaks on a cycle (`a.self = a`): each member always has at least one
//! incoming edge from another member, so `refs` never reaches zero even
//! after every *external* reference is gone. This module adds the minimum
//! needed to reclaim those cycles without a full tracing collector:
//!
//! - After every property write that could introduce a back-edge, walk
//!   outward from the written-to value. If the walk revisits a node already
//!   on its own path (or lands on a node that's already part of a known
//!   cycle), every node from the revisited one onward is fused into one
//!   [`crate::heap::CycleSet`].
//! - A cycle set's members each track `internal_refs`: how many of their
//!   incoming edges originate from another member of the *same* set. A
//!   member (and, transitively, the whole set) is garbage exactly when
//!   every member's `refs == internal_refs` — i.e. nothing outside the set
//!   points in anymore.
//!
//! Ordinary (acyclic) values never pay for any of this: `unref` only
//! consults `cycle_set` bookkeeping for values that have actually been
//! fused into one.

use std::collections::HashSet;

use crate::heap::{CycleSet, CycleSetId, Heap, ValueId};

/// Defensive recursion cap for the cycle-detection walk, mirroring the
/// prototype-chain safety cap spec.md §3 invariant 4 calls for elsewhere in
/// the engine. A legitimate object graph built by script code is never
/// anywhere close to this deep.
const MAX_WALK_DEPTH: usize = 10_000;

/// Increments `id`'s reference count. Call this whenever a `ValueId` is
/// stored somewhere that owns it (a scope slot, a property, an argument
/// binding).
pub fn ref_value(heap: &mut Heap, id: ValueId) {
    heap.ref_value(id);
}

/// Decrements `id`'s reference count, freeing it (and cascading to its own
/// referents) if that was the last reference, or re-checking its cycle set
/// for collectability if it belongs to one.
pub fn unref_value(heap: &mut Heap, id: ValueId) {
    if !heap.is_live(id) {
        return;
    }
    let slot = heap.slot_mut(id);
    if slot.refs == 0 {
        return;
    }
    slot.refs -= 1;
    let refs = slot.refs;
    let cycle_set = slot.cycle_set;

    match cycle_set {
        Some(set_id) => maybe_collect_set(heap, set_id),
        None if refs == 0 => free_value(heap, id),
        None => {}
    }
}

fn free_value(heap: &mut Heap, id: ValueId) {
    let children = heap.slot(id).outgoing_edges();
    heap.slot_mut(id).props.clear();
    heap.slot_mut(id).proto = None;
    heap.deallocate(id);
    for child in children {
        unref_value(heap, child);
    }
}

/// Call after writing a new property (or `__proto__`) edge whose target is
/// `from`'s owner, i.e. after `owner.prop = value`, pass `owner`. Detects
/// any newly-formed cycle reachable from `owner` and fuses it into a
/// [`CycleSet`], then checks whether any affected set is now fully garbage.
pub fn note_edge_written(heap: &mut Heap, owner: ValueId) {
    let mut path: Vec<ValueId> = Vec::new();
    let mut on_path: HashSet<ValueId> = HashSet::new();
    let mut to_fuse: HashSet<ValueId> = HashSet::new();
    let mut touched_sets: HashSet<CycleSetId> = HashSet::new();

    walk(
        heap,
        owner,
        &mut path,
        &mut on_path,
        &mut to_fuse,
        &mut touched_sets,
        0,
    );

    if to_fuse.is_empty() && touched_sets.is_empty() {
        return;
    }

    let merged = merge_sets(heap, to_fuse, touched_sets);
    recompute_internal_refs(heap, merged);
    maybe_collect_set(heap, merged);
}

fn walk(
    heap: &Heap,
    node: ValueId,
    path: &mut Vec<ValueId>,
    on_path: &mut HashSet<ValueId>,
    to_fuse: &mut HashSet<ValueId>,
    touched_sets: &mut HashSet<CycleSetId>,
    depth: usize,
) {
    if depth > MAX_WALK_DEPTH {
        return;
    }
    if on_path.contains(&node) {
        let pos = path.iter().position(|&n| n == node).unwrap();
        for &n in &path[pos..] {
            to_fuse.insert(n);
        }
        return;
    }
    if !heap.is_live(node) {
        return;
    }
    if let Some(set_id) = heap.slot(node).cycle_set {
        touched_sets.insert(set_id);
        for &n in path.iter() {
            to_fuse.insert(n);
        }
        return;
    }

    path.push(node);
    on_path.insert(node);
    for child in heap.slot(node).outgoing_edges() {
        walk(heap, child, path, on_path, to_fuse, touched_sets, depth + 1);
    }
    on_path.remove(&node);
    path.pop();
}

/// Merges every node in `to_fuse` plus the members of every set in
/// `touched_sets` into one [`CycleSet`], returning its id.
fn merge_sets(
    heap: &mut Heap,
    to_fuse: HashSet<ValueId>,
    touched_sets: HashSet<CycleSetId>,
) -> CycleSetId {
    let new_id = heap.fresh_cycle_set();
    let mut members: HashSet<ValueId> = to_fuse;

    for set_id in touched_sets {
        if let Some(set) = heap.cycle_sets.remove(&set_id) {
            members.extend(set.members);
        }
    }

    for &m in &members {
        heap.slot_mut(m).cycle_set = Some(new_id);
    }
    heap.cycle_sets.insert(new_id, CycleSet { members });
    new_id
}

/// Recomputes every member's `internal_refs`: the count of edges it
/// receives from other members of the same set.
fn recompute_internal_refs(heap: &mut Heap, set_id: CycleSetId) {
    let Some(set) = heap.cycle_sets.get(&set_id) else {
        return;
    };
    let members: Vec<ValueId> = set.members.iter().copied().collect();

    for &m in &members {
        heap.slot_mut(m).internal_refs = 0;
    }
    for &m in &members {
        for child in heap.slot(m).outgoing_edges() {
            if heap.slot(child).cycle_set == Some(set_id) {
                heap.slot_mut(child).internal_refs += 1;
            }
        }
    }
}

/// Frees an entire cycle set in one atomic step if every member's
/// remaining references come only from inside the set.
fn maybe_collect_set(heap: &mut Heap, set_id: CycleSetId) {
    if heap.collecting.contains(&set_id) {
        return;
    }
    let Some(set) = heap.cycle_sets.get(&set_id) else {
        return;
    };
    let members: Vec<ValueId> = set.members.iter().copied().collect();

    let all_garbage = members
        .iter()
        .all(|&m| heap.is_live(m) && heap.slot(m).refs <= heap.slot(m).internal_refs);
    if !all_garbage {
        return;
    }

    heap.collecting.insert(set_id);

    // Snapshot every outgoing edge before tearing any member down, then
    // dissolve membership and clear each member's table so the teardown
    // below can't re-trigger this same set's collection.
    let mut all_edges: Vec<ValueId> = Vec::new();
    for &m in &members {
        all_edges.extend(heap.slot(m).outgoing_edges());
        heap.slot_mut(m).props.clear();
        heap.slot_mut(m).proto = None;
        heap.slot_mut(m).cycle_set = None;
        heap.slot_mut(m).internal_refs = 0;
    }

    heap.cycle_sets.remove(&set_id);

    for edge in all_edges {
        unref_value(heap, edge);
    }

    for &m in &members {
        if heap.is_live(m) && heap.slot(m).refs == 0 {
            heap.deallocate(m);
        }
    }

    heap.collecting.remove(&set_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueData;

    fn obj(heap: &mut Heap) -> ValueId {
        heap.alloc(ValueData::Object)
    }

    #[test]
    fn acyclic_chain_frees_immediately_on_last_unref() {
        let mut heap = Heap::new();
        let a = obj(&mut heap);
        let b = obj(&mut heap);
        ref_value(&mut heap, a);
        heap.slot_mut(a).props.set(
            "child".into(),
            b,
            crate::heap::LinkAttrs::data(),
        );
        ref_value(&mut heap, b);

        unref_value(&mut heap, a);
        assert!(!heap.is_live(a));
        assert!(!heap.is_live(b));
    }

    #[test]
    fn self_cycle_is_collected_once_unreferenced() {
        let mut heap = Heap::new();
        let a = obj(&mut heap);
        ref_value(&mut heap, a); // external owner

        heap.slot_mut(a).props.set("self".into(), a, crate::heap::LinkAttrs::data());
        ref_value(&mut heap, a);
        note_edge_written(&mut heap, a);

        assert!(heap.is_live(a));
        unref_value(&mut heap, a); // drop external owner
        assert!(!heap.is_live(a), "self cycle should be collected once unreachable");
    }

    #[test]
    fn two_node_cycle_is_collected() {
        let mut heap = Heap::new();
        let a = obj(&mut heap);
        let b = obj(&mut heap);
        ref_value(&mut heap, a); // external owner of a

        ref_value(&mut heap, b);
        heap.slot_mut(a).props.set("b".into(), b, crate::heap::LinkAttrs::data());
        note_edge_written(&mut heap, a);

        ref_value(&mut heap, a);
        heap.slot_mut(b).props.set("a".into(), a, crate::heap::LinkAttrs::data());
        note_edge_written(&mut heap, b);

        unref_value(&mut heap, a); // drop external owner
        assert!(!heap.is_live(a));
        assert!(!heap.is_live(b));
    }

    #[test]
    fn cycle_with_live_external_reference_is_kept() {
        let mut heap = Heap::new();
        let a = obj(&mut heap);
        let b = obj(&mut heap);
        ref_value(&mut heap, a);
        ref_value(&mut heap, b); // external owner keeps b alive directly

        heap.slot_mut(a).props.set("b".into(), b, crate::heap::LinkAttrs::data());
        ref_value(&mut heap, b);
        note_edge_written(&mut heap, a);

        ref_value(&mut heap, a);
        heap.slot_mut(b).props.set("a".into(), a, crate::heap::LinkAttrs::data());
        note_edge_written(&mut heap, b);

        unref_value(&mut heap, a);
        assert!(heap.is_live(b), "b still has an external owner");
    }
}
