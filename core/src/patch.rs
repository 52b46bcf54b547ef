//! Patch instructions emitted by the diff engine.
//!
//! A [`PatchList`] is an ordered sequence of mutations that turns the
//! previously committed native tree into the newly built one. Every entry
//! carries the path (child indices from the root) of the node it applies to,
//! valid at the moment the entry is applied, after all previous entries.
//!
//! Paths and text payloads are copied into buffers owned by the list; node
//! payloads ([`Patch::Replace`], [`Patch::InsertChild`]) are handles into the
//! arena holding the new tree. The list keeps its buffers across cycles, so
//! steady-state diffing does not allocate.

use alloc::{string::String, vec::Vec};

use crate::{arena::NodeId, arena::Span, vnode::Props};

/// Discriminant of a [`Patch`], shared with the C boundary.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchKind {
    /// Replace the node at the path with a new subtree.
    Replace = 0,
    /// Overwrite the props of the node at the path.
    UpdateProps = 1,
    /// Overwrite the text of the node at the path.
    UpdateText = 2,
    /// Insert a new child under the node at the path.
    InsertChild = 3,
    /// Remove a child of the node at the path.
    RemoveChild = 4,
    /// Move a child of the node at the path.
    MoveChild = 5,
}

/// One mutation of the native tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch<'a> {
    /// Discard the node and its subtree and build this one in its place.
    Replace(NodeId),
    /// Set every prop of the node to these values.
    UpdateProps(Props),
    /// Set the node's text.
    UpdateText(&'a str),
    /// Build `node` and insert it so that it ends up at `index`.
    InsertChild {
        /// Final position of the new child.
        index: u32,
        /// Subtree to build.
        node: NodeId,
    },
    /// Remove and discard the child at `index`.
    RemoveChild {
        /// Position of the child to remove.
        index: u32,
    },
    /// Take the child at `from` out and reinsert it at `to`; `to` counts
    /// positions after the removal.
    MoveChild {
        /// Current position.
        from: u32,
        /// Position after the move.
        to: u32,
    },
}

impl Patch<'_> {
    /// Discriminant of the patch.
    #[must_use]
    pub const fn kind(&self) -> PatchKind {
        match self {
            Self::Replace(_) => PatchKind::Replace,
            Self::UpdateProps(_) => PatchKind::UpdateProps,
            Self::UpdateText(_) => PatchKind::UpdateText,
            Self::InsertChild { .. } => PatchKind::InsertChild,
            Self::RemoveChild { .. } => PatchKind::RemoveChild,
            Self::MoveChild { .. } => PatchKind::MoveChild,
        }
    }
}

/// A patch together with the path of the node it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchEntry<'a> {
    /// Child indices from the root to the target node.
    pub path: &'a [u32],
    /// The mutation.
    pub patch: Patch<'a>,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Replace(NodeId),
    UpdateProps(Props),
    UpdateText(Span),
    InsertChild { index: u32, node: NodeId },
    RemoveChild { index: u32 },
    MoveChild { from: u32, to: u32 },
}

#[derive(Debug, Clone, Copy)]
struct Stored {
    path: Span,
    op: Op,
}

/// Ordered patches produced by one diff.
#[derive(Debug, Default, Clone)]
pub struct PatchList {
    entries: Vec<Stored>,
    paths: Vec<u32>,
    text: String,
}

impl PatchList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            paths: Vec::new(),
            text: String::new(),
        }
    }

    /// Number of patches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the trees were identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every patch, keeping the buffers.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.paths.clear();
        self.text.clear();
    }

    /// Appends a patch targeting `path`.
    pub fn push(&mut self, path: &[u32], patch: Patch<'_>) {
        let path_span = Span::new(self.paths.len(), path.len());
        self.paths.extend_from_slice(path);
        let op = match patch {
            Patch::Replace(node) => Op::Replace(node),
            Patch::UpdateProps(props) => Op::UpdateProps(props),
            Patch::UpdateText(text) => {
                let span = Span::new(self.text.len(), text.len());
                self.text.push_str(text);
                Op::UpdateText(span)
            }
            Patch::InsertChild { index, node } => Op::InsertChild { index, node },
            Patch::RemoveChild { index } => Op::RemoveChild { index },
            Patch::MoveChild { from, to } => Op::MoveChild { from, to },
        };
        self.entries.push(Stored {
            path: path_span,
            op,
        });
    }

    /// Patch at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<PatchEntry<'_>> {
        self.entries.get(index).map(|stored| self.resolve(*stored))
    }

    /// Iterates over the patches in application order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = PatchEntry<'_>> + '_ {
        self.entries.iter().map(|stored| self.resolve(*stored))
    }

    /// Number of patches of the given kind.
    #[must_use]
    pub fn count(&self, kind: PatchKind) -> usize {
        self.iter().filter(|entry| entry.patch.kind() == kind).count()
    }

    fn resolve(&self, stored: Stored) -> PatchEntry<'_> {
        let path = self.paths.get(stored.path.range()).unwrap_or_default();
        let patch = match stored.op {
            Op::Replace(node) => Patch::Replace(node),
            Op::UpdateProps(props) => Patch::UpdateProps(props),
            Op::UpdateText(span) => {
                Patch::UpdateText(self.text.get(span.range()).unwrap_or_default())
            }
            Op::InsertChild { index, node } => Patch::InsertChild { index, node },
            Op::RemoveChild { index } => Patch::RemoveChild { index },
            Op::MoveChild { from, to } => Patch::MoveChild { from, to },
        };
        PatchEntry { path, patch }
    }
}

impl PartialEq for PatchList {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for PatchList {}
