//! Incremental construction of a virtual tree inside an arena.
//!
//! Views describe their tree with nested [`open`](TreeBuilder::open) /
//! [`close`](TreeBuilder::close) calls. Children are collected on a scratch
//! stack owned by the arena and copied into a contiguous child list when
//! their parent closes, so building a tree performs no heap allocation once
//! the arena pools have grown to the size of a typical frame.
//!
//! The builder is fail-sticky: the first allocation failure is recorded,
//! every later call becomes a no-op, and [`finish`](TreeBuilder::finish)
//! reports the failure.

use core::fmt;

use crate::{
    arena::{Arena, NodeId, Span},
    error::{ArenaError, TreeError},
    vnode::{Props, Tag, VNode},
};

/// An element that has been opened but not closed yet.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    tag: Tag,
    key: Option<Span>,
    props: Props,
    text: Option<Span>,
    first_child: usize,
}

/// Builds one tree into an [`Arena`].
#[derive(Debug)]
pub struct TreeBuilder<'a> {
    arena: &'a mut Arena,
    error: Option<TreeError>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(arena: &'a mut Arena) -> Self {
        arena.frames.clear();
        arena.pending.clear();
        Self { arena, error: None }
    }

    /// Opens a new element as the last child of the innermost open element
    /// (or as the root).
    pub fn open(&mut self, tag: Tag) -> &mut Self {
        if self.error.is_none() {
            let first_child = self.arena.pending.len();
            self.arena.frames.push(Frame {
                tag,
                key: None,
                props: Props::new(),
                text: None,
                first_child,
            });
        }
        self
    }

    /// Sets the key of the innermost open element.
    pub fn key(&mut self, key: &str) -> &mut Self {
        let span = self.try_alloc(|arena| arena.alloc_str(key));
        self.update(|frame| frame.key = span);
        self
    }

    /// Sets the key of the innermost open element from format arguments,
    /// writing straight into the arena.
    pub fn key_fmt(&mut self, key: fmt::Arguments<'_>) -> &mut Self {
        let span = self.try_alloc(|arena| arena.alloc_fmt(key));
        self.update(|frame| frame.key = span);
        self
    }

    /// Sets the props of the innermost open element.
    pub fn props(&mut self, props: Props) -> &mut Self {
        self.update(|frame| frame.props = props);
        self
    }

    /// Sets the text of the innermost open element.
    pub fn text(&mut self, text: &str) -> &mut Self {
        let span = self.try_alloc(|arena| arena.alloc_str(text));
        self.update(|frame| frame.text = span);
        self
    }

    /// Sets the text of the innermost open element from format arguments.
    pub fn text_fmt(&mut self, text: fmt::Arguments<'_>) -> &mut Self {
        let span = self.try_alloc(|arena| arena.alloc_fmt(text));
        self.update(|frame| frame.text = span);
        self
    }

    /// Closes the innermost open element.
    pub fn close(&mut self) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        let Some(frame) = self.arena.frames.pop() else {
            self.error = Some(TreeError::Unbalanced);
            return self;
        };
        let result = self
            .arena
            .alloc_children_from_pending(frame.first_child)
            .and_then(|children| {
                self.arena.alloc_node(VNode {
                    tag: frame.tag,
                    key: frame.key,
                    props: frame.props,
                    text: frame.text,
                    children,
                })
            });
        match result {
            Ok(id) => self.arena.pending.push(id),
            Err(err) => self.error = Some(err.into()),
        }
        self
    }

    /// Adds a childless element carrying `text`.
    pub fn leaf(&mut self, tag: Tag, text: &str) -> &mut Self {
        self.open(tag).text(text).close()
    }

    /// Returns `true` once an allocation has failed.
    #[must_use]
    pub const fn failed(&self) -> bool {
        self.error.is_some()
    }

    /// Completes the tree and returns its root.
    ///
    /// # Errors
    ///
    /// Returns the first allocation failure, or a shape error when elements
    /// were left open or the view did not produce exactly one root.
    pub fn finish(self) -> Result<NodeId, TreeError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if !self.arena.frames.is_empty() {
            return Err(TreeError::Unclosed {
                open: self.arena.frames.len(),
            });
        }
        match self.arena.pending.as_slice() {
            [root] => {
                let root = *root;
                self.arena.pending.clear();
                Ok(root)
            }
            [] => Err(TreeError::NoRoot),
            roots => Err(TreeError::MultipleRoots { count: roots.len() }),
        }
    }

    fn try_alloc<T>(
        &mut self,
        alloc: impl FnOnce(&mut Arena) -> Result<T, ArenaError>,
    ) -> Option<T> {
        if self.error.is_some() {
            return None;
        }
        if self.arena.frames.is_empty() {
            self.error = Some(TreeError::Unbalanced);
            return None;
        }
        match alloc(&mut *self.arena) {
            Ok(value) => Some(value),
            Err(err) => {
                self.error = Some(err.into());
                None
            }
        }
    }

    fn update(&mut self, apply: impl FnOnce(&mut Frame)) {
        if self.error.is_some() {
            return;
        }
        match self.arena.frames.last_mut() {
            Some(frame) => apply(frame),
            None => self.error = Some(TreeError::Unbalanced),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::DEFAULT_CAPACITY;
    use crate::vnode::PropFlags;

    #[test]
    fn builds_nested_tree_in_order() {
        let mut arena = Arena::new(DEFAULT_CAPACITY);
        let mut tree = arena.builder();
        tree.open(Tag::Container).key("root");
        tree.leaf(Tag::Text, "first");
        tree.open(Tag::Button)
            .props(Props::new().flag(PropFlags::DISABLED, true))
            .text("second")
            .close();
        tree.close();
        let root = tree.finish().expect("tree should build");

        let root = arena.get(root).expect("root resolves");
        assert_eq!(root.tag(), Tag::Container);
        assert_eq!(root.key(), Some("root"));
        let texts: std::vec::Vec<_> = root.children().filter_map(|c| c.text()).collect();
        assert_eq!(texts, ["first", "second"]);
        let button = root.child(1).expect("second child");
        assert!(button.props().flags.contains(PropFlags::DISABLED));
    }

    #[test]
    fn formatted_keys_and_text_are_stored_in_the_arena() {
        let mut arena = Arena::new(DEFAULT_CAPACITY);
        let mut tree = arena.builder();
        tree.open(Tag::ListItem)
            .key_fmt(format_args!("todo-{}", 7))
            .text_fmt(format_args!("{} items", 3))
            .close();
        let root = tree.finish().expect("tree should build");
        let root = arena.get(root).expect("root resolves");
        assert_eq!(root.key(), Some("todo-7"));
        assert_eq!(root.text(), Some("3 items"));
    }

    #[test]
    fn shape_errors_are_reported() {
        let mut arena = Arena::new(DEFAULT_CAPACITY);

        let tree = arena.builder();
        assert_eq!(tree.finish(), Err(TreeError::NoRoot));

        let mut tree = arena.builder();
        tree.leaf(Tag::Text, "a").leaf(Tag::Text, "b");
        assert_eq!(tree.finish(), Err(TreeError::MultipleRoots { count: 2 }));

        let mut tree = arena.builder();
        tree.open(Tag::Container);
        assert_eq!(tree.finish(), Err(TreeError::Unclosed { open: 1 }));

        let mut tree = arena.builder();
        tree.close();
        assert_eq!(tree.finish(), Err(TreeError::Unbalanced));

        let mut tree = arena.builder();
        tree.text("orphan");
        assert_eq!(tree.finish(), Err(TreeError::Unbalanced));
    }

    #[test]
    fn failure_is_sticky() {
        let mut arena = Arena::new(8);
        let mut tree = arena.builder();
        tree.open(Tag::Container).text("this text does not fit");
        assert!(tree.failed());
        tree.close().leaf(Tag::Text, "ignored");
        assert!(tree.finish().expect_err("exhausted").is_exhaustion());
    }
}
