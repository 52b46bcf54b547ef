//! Reference patch applier.
//!
//! [`MirrorTree`] is an owned tree that consumes a [`PatchList`] exactly the
//! way a platform shell consumes it against its native widgets. Host test
//! harnesses can use it to check that their own applier agrees with the
//! core, and the core's tests use it to verify that every patch stream
//! converges on the tree it was diffed against.

use alloc::{borrow::ToOwned, string::String, vec::Vec};

use crate::{
    arena::{Arena, NodeId},
    error::{ApplyError, ArenaError},
    patch::{Patch, PatchList},
    vnode::{Props, Tag},
};

/// Owned copy of a virtual node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MirrorNode {
    /// Element kind.
    pub tag: Tag,
    /// Sibling identity.
    pub key: Option<String>,
    /// Style and attributes.
    pub props: Props,
    /// Text payload.
    pub text: Option<String>,
    /// Children in order.
    pub children: Vec<MirrorNode>,
}

impl MirrorNode {
    /// Copies the subtree at `id` out of `arena`.
    ///
    /// # Errors
    ///
    /// Fails if `id`, or any handle below it, does not resolve.
    pub fn from_arena(arena: &Arena, id: NodeId) -> Result<Self, ArenaError> {
        let node = arena.get(id)?;
        let children = node
            .child_ids()
            .iter()
            .map(|child| Self::from_arena(arena, *child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            tag: node.tag(),
            key: node.key().map(ToOwned::to_owned),
            props: *node.props(),
            text: node.text().map(ToOwned::to_owned),
            children,
        })
    }

    /// Number of nodes in the subtree, this one included.
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Self::size).sum::<usize>()
    }
}

/// A tree kept in sync through patches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorTree {
    root: Option<MirrorNode>,
}

impl MirrorTree {
    /// An empty mirror; the first patch list must replace the root.
    #[must_use]
    pub const fn new() -> Self {
        Self { root: None }
    }

    /// A mirror initialised with the subtree at `id`.
    ///
    /// # Errors
    ///
    /// Fails if the subtree does not resolve.
    pub fn from_arena(arena: &Arena, id: NodeId) -> Result<Self, ArenaError> {
        MirrorNode::from_arena(arena, id).map(|root| Self { root: Some(root) })
    }

    /// Current root.
    #[must_use]
    pub const fn root(&self) -> Option<&MirrorNode> {
        self.root.as_ref()
    }

    /// Applies `patches` in order. Node payloads are read from `arena`.
    ///
    /// # Errors
    ///
    /// Stops at the first patch whose path or index does not fit the
    /// mirrored tree, leaving the earlier patches applied.
    pub fn apply(&mut self, arena: &Arena, patches: &PatchList) -> Result<(), ApplyError> {
        for entry in patches.iter() {
            if entry.path.is_empty() {
                if let Patch::Replace(node) = entry.patch {
                    self.root = Some(MirrorNode::from_arena(arena, node)?);
                    continue;
                }
            }
            let target = self.node_mut(entry.path)?;
            match entry.patch {
                Patch::Replace(node) => *target = MirrorNode::from_arena(arena, node)?,
                Patch::UpdateProps(props) => target.props = props,
                Patch::UpdateText(text) => target.text = Some(text.to_owned()),
                Patch::InsertChild { index, node } => {
                    check_index(index, target.children.len() + 1)?;
                    let child = MirrorNode::from_arena(arena, node)?;
                    target.children.insert(index as usize, child);
                }
                Patch::RemoveChild { index } => {
                    check_index(index, target.children.len())?;
                    target.children.remove(index as usize);
                }
                Patch::MoveChild { from, to } => {
                    check_index(from, target.children.len())?;
                    check_index(to, target.children.len())?;
                    let child = target.children.remove(from as usize);
                    target.children.insert(to as usize, child);
                }
            }
        }
        Ok(())
    }

    fn node_mut(&mut self, path: &[u32]) -> Result<&mut MirrorNode, ApplyError> {
        let mut node = self.root.as_mut().ok_or(ApplyError::Empty)?;
        for (depth, index) in path.iter().enumerate() {
            let len = node.children.len();
            node = node
                .children
                .get_mut(*index as usize)
                .ok_or(ApplyError::PathNotFound {
                    depth,
                    index: *index,
                    len,
                })?;
        }
        Ok(node)
    }
}

/// `index` must be below `bound`.
const fn check_index(index: u32, bound: usize) -> Result<(), ApplyError> {
    if (index as usize) < bound {
        Ok(())
    } else {
        Err(ApplyError::IndexOutOfRange {
            index,
            len: bound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::DEFAULT_CAPACITY;

    fn list(arena: &mut Arena, items: &[&str]) -> NodeId {
        let mut tree = arena.builder();
        tree.open(Tag::List);
        for item in items {
            tree.open(Tag::ListItem).key(item).text(item).close();
        }
        tree.close();
        tree.finish().expect("list builds")
    }

    #[test]
    fn applies_structural_patches() {
        let mut arena = Arena::new(DEFAULT_CAPACITY);
        let old = list(&mut arena, &["a", "b", "c"]);
        let mut mirror = MirrorTree::from_arena(&arena, old).expect("mirror");
        let extra = list(&mut arena, &["d"]);
        let d = arena
            .get(extra)
            .ok()
            .and_then(|n| n.child_ids().first().copied())
            .expect("d");

        let mut patches = PatchList::new();
        patches.push(&[], Patch::MoveChild { from: 2, to: 0 });
        patches.push(&[], Patch::RemoveChild { index: 1 });
        patches.push(&[], Patch::InsertChild { index: 2, node: d });
        patches.push(&[0], Patch::UpdateText("C"));
        mirror.apply(&arena, &patches).expect("patches apply");

        let root = mirror.root().expect("root");
        let texts: Vec<_> = root.children.iter().filter_map(|c| c.text.as_deref()).collect();
        assert_eq!(texts, ["C", "b", "d"]);
        assert_eq!(root.size(), 4);
    }

    #[test]
    fn rejects_patches_that_do_not_fit() {
        let mut arena = Arena::new(DEFAULT_CAPACITY);
        let old = list(&mut arena, &["a"]);
        let mut mirror = MirrorTree::from_arena(&arena, old).expect("mirror");

        let mut patches = PatchList::new();
        patches.push(&[3], Patch::UpdateText("x"));
        assert_eq!(
            mirror.apply(&arena, &patches),
            Err(ApplyError::PathNotFound {
                depth: 0,
                index: 3,
                len: 1
            })
        );

        patches.clear();
        patches.push(&[], Patch::RemoveChild { index: 1 });
        assert!(matches!(
            mirror.apply(&arena, &patches),
            Err(ApplyError::IndexOutOfRange { index: 1, len: 1 })
        ));

        let mut empty = MirrorTree::new();
        patches.clear();
        patches.push(&[0], Patch::RemoveChild { index: 0 });
        assert_eq!(empty.apply(&arena, &patches), Err(ApplyError::Empty));
    }
}
