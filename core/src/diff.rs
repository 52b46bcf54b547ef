//! Tree reconciliation.
//!
//! [`Differ`] compares the previously committed tree with a freshly built one
//! and emits the ordered [`PatchList`] that turns the first into the second.
//!
//! Per node pair:
//!
//! 1. Different tags, or a malformed node (a text leaf with children), or a
//!    text payload that disappears: `Replace` the whole subtree, no recursion.
//! 2. Different props: `UpdateProps`.
//! 3. Different text: `UpdateText`.
//! 4. Children are reconciled, then each matched child pair is diffed in new
//!    order.
//!
//! When no child on either side has a key, children are matched by position:
//! surplus old children are removed from the end, surplus new children are
//! appended. Otherwise keyed children are matched by key and unkeyed children
//! are matched in order of appearance among the unkeyed ones. Unmatched old
//! children are removed (highest index first); the matched children that form
//! a longest increasing subsequence of new positions stay where they are, and
//! every other child is moved or inserted directly after its new predecessor,
//! left to right. Duplicate keys match first-come-first-served; a duplicate
//! with nothing left to match is treated as new.
//!
//! Diffing never fails. If the old tree turns out to be unreadable halfway
//! through, the partial result is discarded and the root is replaced.

use alloc::vec::Vec;
use core::mem;

use crate::{
    arena::{Arena, NodeId, Span},
    patch::{Patch, PatchList},
    vnode::NodeRef,
};

const NONE: u32 = u32::MAX;

/// The old tree could not be read; give up on incremental patches.
#[derive(Debug)]
struct Fallback;

/// Scratch buffers for reconciling the children of one parent.
#[derive(Debug, Default)]
struct Level {
    /// Keyed old children as `(key, old index)`, sorted.
    keyed: Vec<(Span, u32)>,
    /// Unkeyed old children in order.
    unkeyed: Vec<u32>,
    /// For each old child, the new index it matched.
    old_to_new: Vec<u32>,
    /// For each new child, the old index it matched.
    new_to_old: Vec<u32>,
    /// New indices of the kept old children, in old order.
    work: Vec<u32>,
    /// New children that keep their relative order.
    stable: Vec<bool>,
    tails: Vec<u32>,
    prev: Vec<u32>,
    /// For each new child, the slot it occupies before being placed.
    old_slot: Vec<u32>,
    /// For each new child, the slot it occupies once placed.
    final_slot: Vec<u32>,
    /// Occupied slots of the simulated child list.
    live: Fenwick,
}

impl Level {
    fn reset(&mut self, old_len: usize, new_len: usize) {
        self.keyed.clear();
        self.unkeyed.clear();
        self.old_to_new.clear();
        self.old_to_new.resize(old_len, NONE);
        self.new_to_old.clear();
        self.new_to_old.resize(new_len, NONE);
        self.work.clear();
        self.stable.clear();
        self.stable.resize(new_len, false);
        self.old_slot.clear();
        self.old_slot.resize(new_len, NONE);
        self.final_slot.clear();
        self.final_slot.resize(new_len, NONE);
    }

    /// Lays out the slots of the simulated child list.
    ///
    /// Every child is placed directly after its new predecessor, so the
    /// unstable children following a stable one (or the front of the list)
    /// form a run that sits right after it. Slots are ordered as: the front
    /// run, then for each kept old child its own slot, followed by the run
    /// hanging off it when it is stable. Kept children start out in their old
    /// slot; stable ones never leave it.
    fn assign_slots(&mut self) {
        let work = mem::take(&mut self.work);
        let mut next = self.run_after(0, 0);
        for new_index in work.iter().map(|index| *index as usize) {
            self.old_slot[new_index] = next;
            next += 1;
            if self.stable[new_index] {
                self.final_slot[new_index] = self.old_slot[new_index];
                next = self.run_after(new_index + 1, next);
            }
        }
        self.live.reset(next as usize);
        for new_index in work.iter().map(|index| *index as usize) {
            self.live.insert(self.old_slot[new_index] as usize);
        }
        self.work = work;
    }

    fn run_after(&mut self, start: usize, mut next: u32) -> u32 {
        let mut new_index = start;
        while new_index < self.stable.len() && !self.stable[new_index] {
            self.final_slot[new_index] = next;
            next += 1;
            new_index += 1;
        }
        next
    }
}

/// Binary indexed tree counting occupied slots.
#[derive(Debug, Default)]
struct Fenwick {
    tree: Vec<u32>,
}

impl Fenwick {
    fn reset(&mut self, slots: usize) {
        self.tree.clear();
        self.tree.resize(slots + 1, 0);
    }

    fn insert(&mut self, slot: usize) {
        let mut at = slot + 1;
        while at < self.tree.len() {
            self.tree[at] += 1;
            at += at & at.wrapping_neg();
        }
    }

    fn remove(&mut self, slot: usize) {
        let mut at = slot + 1;
        while at < self.tree.len() {
            self.tree[at] -= 1;
            at += at & at.wrapping_neg();
        }
    }

    /// Occupied slots before `slot`, i.e. the list position of `slot`.
    fn before(&self, slot: usize) -> usize {
        let mut at = slot.min(self.tree.len().saturating_sub(1));
        let mut count = 0;
        while at > 0 {
            count += self.tree[at] as usize;
            at &= at - 1;
        }
        count
    }

    fn len(&self) -> usize {
        self.before(self.tree.len().saturating_sub(1))
    }
}

/// Reusable reconciler.
///
/// Keeping one `Differ` alive across render cycles lets its scratch buffers
/// be reused instead of reallocated.
#[derive(Debug, Default)]
pub struct Differ {
    path: Vec<u32>,
    levels: Vec<Level>,
    depth: usize,
}

/// Diffs two trees with a throwaway [`Differ`].
#[must_use]
pub fn diff(old_arena: &Arena, old: NodeId, new_arena: &Arena, new: NodeId) -> PatchList {
    let mut out = PatchList::new();
    Differ::new().diff(old_arena, old, new_arena, new, &mut out);
    out
}

impl Differ {
    /// Creates a reconciler with empty scratch buffers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            path: Vec::new(),
            levels: Vec::new(),
            depth: 0,
        }
    }

    /// Replaces the contents of `out` with the patches turning the tree at
    /// `old` into the tree at `new`.
    pub fn diff(
        &mut self,
        old_arena: &Arena,
        old: NodeId,
        new_arena: &Arena,
        new: NodeId,
        out: &mut PatchList,
    ) {
        out.clear();
        self.path.clear();
        self.depth = 0;

        let (old_root, new_root) = match (old_arena.get(old), new_arena.get(new)) {
            (Ok(old_root), Ok(new_root)) => (old_root, new_root),
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(%err, "tree unavailable, replacing root");
                out.push(&[], Patch::Replace(new));
                return;
            }
        };

        if self.node(old_root, new_root, out).is_err() {
            tracing::warn!("old tree unreadable mid-diff, replacing root");
            out.clear();
            out.push(&[], Patch::Replace(new));
        }
    }

    fn node(
        &mut self,
        old: NodeRef<'_>,
        new: NodeRef<'_>,
        out: &mut PatchList,
    ) -> Result<(), Fallback> {
        if old.tag() != new.tag() || old.is_malformed() || new.is_malformed() {
            out.push(&self.path, Patch::Replace(new.id()));
            return Ok(());
        }

        let text = if old.text() == new.text() {
            None
        } else if let Some(text) = new.text() {
            Some(text)
        } else {
            out.push(&self.path, Patch::Replace(new.id()));
            return Ok(());
        };

        if old.props() != new.props() {
            out.push(&self.path, Patch::UpdateProps(*new.props()));
        }
        if let Some(text) = text {
            out.push(&self.path, Patch::UpdateText(text));
        }

        if old.child_count() == 0 && new.child_count() == 0 {
            return Ok(());
        }
        let keyed = old.children().chain(new.children()).any(|child| child.key().is_some());
        if keyed {
            self.with_level(|differ, level| differ.keyed(level, old, new, out))
        } else {
            self.positional(old, new, out)
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn positional(
        &mut self,
        old: NodeRef<'_>,
        new: NodeRef<'_>,
        out: &mut PatchList,
    ) -> Result<(), Fallback> {
        let old_ids = old.child_ids();
        let new_ids = new.child_ids();

        for index in (new_ids.len()..old_ids.len()).rev() {
            out.push(&self.path, Patch::RemoveChild { index: index as u32 });
        }
        for (index, node) in new_ids.iter().enumerate().skip(old_ids.len()) {
            out.push(
                &self.path,
                Patch::InsertChild {
                    index: index as u32,
                    node: *node,
                },
            );
        }
        for (index, (old_id, new_id)) in old_ids.iter().zip(new_ids).enumerate() {
            let old_child = old.arena().get(*old_id).map_err(|_| Fallback)?;
            let new_child = new.arena().get(*new_id).map_err(|_| Fallback)?;
            self.descend(index as u32, old_child, new_child, out)?;
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn keyed(
        &mut self,
        level: &mut Level,
        old: NodeRef<'_>,
        new: NodeRef<'_>,
        out: &mut PatchList,
    ) -> Result<(), Fallback> {
        let old_arena = old.arena();
        let new_arena = new.arena();
        let old_ids = old.child_ids();
        let new_ids = new.child_ids();
        level.reset(old_ids.len(), new_ids.len());

        for (index, id) in old_ids.iter().enumerate() {
            let child = old_arena.get(*id).map_err(|_| Fallback)?;
            match child.record().key {
                Some(key) => level.keyed.push((key, index as u32)),
                None => level.unkeyed.push(index as u32),
            }
        }
        level.keyed.sort_unstable_by(|a, b| {
            old_arena
                .str(a.0)
                .cmp(old_arena.str(b.0))
                .then(a.1.cmp(&b.1))
        });

        let mut next_unkeyed = level.unkeyed.iter();
        for (new_index, id) in new_ids.iter().enumerate() {
            let child = new_arena.get(*id).map_err(|_| Fallback)?;
            let matched = match child.key() {
                Some(key) => {
                    let start = level
                        .keyed
                        .partition_point(|(span, _)| old_arena.str(*span) < key);
                    level.keyed[start..]
                        .iter()
                        .take_while(|(span, _)| old_arena.str(*span) == key)
                        .map(|(_, old_index)| *old_index)
                        .find(|old_index| level.old_to_new[*old_index as usize] == NONE)
                }
                None => next_unkeyed.next().copied(),
            };
            if let Some(old_index) = matched {
                level.old_to_new[old_index as usize] = new_index as u32;
                level.new_to_old[new_index] = old_index;
            }
        }

        let mut removed = 0_usize;
        for (index, new_index) in level.old_to_new.iter().enumerate().rev() {
            if *new_index == NONE {
                out.push(&self.path, Patch::RemoveChild { index: index as u32 });
                removed += 1;
            }
        }

        level
            .work
            .extend(level.old_to_new.iter().copied().filter(|index| *index != NONE));
        mark_longest_increasing(&level.work, &mut level.tails, &mut level.prev, &mut level.stable);
        level.assign_slots();

        let mut moved = 0_usize;
        let mut inserted = 0_usize;
        for new_index in 0..new_ids.len() {
            if level.stable[new_index] {
                continue;
            }
            let predecessor = if new_index == 0 {
                None
            } else {
                Some(level.live.before(level.final_slot[new_index - 1] as usize))
            };
            let slot = level.final_slot[new_index] as usize;
            if level.new_to_old[new_index] == NONE {
                let to = predecessor.map_or(0, |at| at + 1);
                level.live.insert(slot);
                out.push(
                    &self.path,
                    Patch::InsertChild {
                        index: to as u32,
                        node: new_ids[new_index],
                    },
                );
                inserted += 1;
            } else {
                let old_slot = level.old_slot[new_index] as usize;
                let from = level.live.before(old_slot);
                let to = match predecessor {
                    None => 0,
                    Some(at) if from < at => at,
                    Some(at) => at + 1,
                };
                level.live.remove(old_slot);
                level.live.insert(slot);
                if from != to {
                    out.push(
                        &self.path,
                        Patch::MoveChild {
                            from: from as u32,
                            to: to as u32,
                        },
                    );
                    moved += 1;
                }
            }
        }

        if level.live.len() != new_ids.len() {
            return Err(Fallback);
        }
        tracing::trace!(
            depth = self.depth,
            removed,
            moved,
            inserted,
            "keyed children reconciled"
        );

        for (new_index, old_index) in level.new_to_old.iter().enumerate() {
            if *old_index == NONE {
                continue;
            }
            let old_child = old_arena
                .get(old_ids[*old_index as usize])
                .map_err(|_| Fallback)?;
            let new_child = new_arena.get(new_ids[new_index]).map_err(|_| Fallback)?;
            self.descend(new_index as u32, old_child, new_child, out)?;
        }
        Ok(())
    }

    fn descend(
        &mut self,
        index: u32,
        old: NodeRef<'_>,
        new: NodeRef<'_>,
        out: &mut PatchList,
    ) -> Result<(), Fallback> {
        self.path.push(index);
        self.depth += 1;
        let result = self.node(old, new, out);
        self.depth -= 1;
        self.path.pop();
        result
    }

    /// Lends out the scratch level for the current depth; deeper levels stay
    /// available to the recursion.
    fn with_level<R>(&mut self, f: impl FnOnce(&mut Self, &mut Level) -> R) -> R {
        let depth = self.depth;
        if self.levels.len() <= depth {
            self.levels.resize_with(depth + 1, Level::default);
        }
        let mut level = mem::take(&mut self.levels[depth]);
        let result = f(self, &mut level);
        self.levels[depth] = level;
        result
    }
}

/// Marks the entries of `work` forming a longest strictly increasing
/// subsequence as stable, in O(n log n).
#[allow(clippy::cast_possible_truncation)]
fn mark_longest_increasing(
    work: &[u32],
    tails: &mut Vec<u32>,
    prev: &mut Vec<u32>,
    stable: &mut [bool],
) {
    tails.clear();
    prev.clear();
    prev.resize(work.len(), NONE);

    for (index, value) in work.iter().enumerate() {
        let at = tails.partition_point(|tail| work[*tail as usize] < *value);
        if at > 0 {
            prev[index] = tails[at - 1];
        }
        if at == tails.len() {
            tails.push(index as u32);
        } else {
            tails[at] = index as u32;
        }
    }

    let mut cursor = tails.last().copied().unwrap_or(NONE);
    while cursor != NONE {
        stable[work[cursor as usize] as usize] = true;
        cursor = prev[cursor as usize];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn stable_set(work: &[u32], len: usize) -> Vec<bool> {
        let mut stable = vec![false; len];
        mark_longest_increasing(work, &mut Vec::new(), &mut Vec::new(), &mut stable);
        stable
    }

    #[test]
    fn lis_keeps_ordered_entries() {
        assert_eq!(stable_set(&[0, 1, 2], 3), [true, true, true]);
        assert_eq!(stable_set(&[2, 0, 1], 3), [true, true, false]);
        assert_eq!(stable_set(&[3, 2, 1, 0], 4).iter().filter(|s| **s).count(), 1);
        assert_eq!(stable_set(&[], 0), Vec::<bool>::new());
    }

    #[test]
    fn fenwick_tracks_positions() {
        let mut live = Fenwick::default();
        live.reset(6);
        for slot in [0, 2, 3, 5] {
            live.insert(slot);
        }
        assert_eq!(live.len(), 4);
        assert_eq!(live.before(3), 2);
        assert_eq!(live.before(5), 3);
        live.remove(2);
        live.insert(4);
        assert_eq!(live.before(3), 1);
        assert_eq!(live.before(5), 3);
        assert_eq!(live.len(), 4);
    }

    #[test]
    fn lis_handles_interleaved_runs() {
        let stable = stable_set(&[4, 0, 5, 1, 2, 3], 6);
        assert_eq!(stable, [true, true, true, true, false, false]);
    }
}
