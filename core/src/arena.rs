//! Frame arena for virtual nodes.
//!
//! Every render cycle builds a brand-new tree. Instead of allocating each node
//! on the heap, nodes, child lists and strings are bumped into three pools
//! owned by an [`Arena`]. The pools are cleared wholesale by [`Arena::reset`],
//! keeping their capacity, so a warmed-up arena does not touch the allocator.
//!
//! Nodes are addressed by [`NodeId`] handles rather than references. A handle
//! records the arena generation it was issued in; resolving a handle after
//! the arena has been reset fails with [`ArenaError::Stale`] instead of
//! reading recycled memory.

use alloc::{string::String, vec::Vec};
use core::{fmt, mem::size_of, ops::Range};

use crate::{
    builder::{Frame, TreeBuilder},
    error::ArenaError,
    vnode::{NodeRef, VNode},
};

/// Default byte budget of a single arena.
pub const DEFAULT_CAPACITY: usize = 256 * 1024;

/// Generation-checked handle to a node stored in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Slot of the node inside the arena.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Arena generation the handle was issued in.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Packs the handle into a single integer, generation in the high half.
    ///
    /// Generation zero is never live, so a raw value of `0` can be used as a
    /// null handle.
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Unpacks a handle produced by [`NodeId::to_raw`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

/// Range inside one of the arena pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct Span {
    pub(crate) start: u32,
    pub(crate) len: u32,
}

impl Span {
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn new(start: usize, len: usize) -> Self {
        Self {
            start: start as u32,
            len: len as u32,
        }
    }

    pub(crate) const fn range(self) -> Range<usize> {
        self.start as usize..(self.start + self.len) as usize
    }

    pub(crate) const fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// Bump storage for one render cycle worth of virtual nodes.
#[derive(Debug)]
pub struct Arena {
    nodes: Vec<VNode>,
    children: Vec<NodeId>,
    strings: String,
    pub(crate) frames: Vec<Frame>,
    pub(crate) pending: Vec<NodeId>,
    capacity: usize,
    used: usize,
    generation: u32,
    stride: u32,
    dirty: bool,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Arena {
    /// Creates an arena holding at most `capacity` bytes of node data.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_lane(capacity, 0, 1)
    }

    /// Creates one arena out of a group of `lanes` arenas whose handles must
    /// never be confused with each other.
    ///
    /// Arena `lane` issues generations `lane + 1`, `lane + 1 + lanes`, and so
    /// on, so two arenas of the same group never share a live generation.
    #[must_use]
    pub fn with_lane(capacity: usize, lane: u32, lanes: u32) -> Self {
        let stride = lanes.max(1);
        Self {
            nodes: Vec::new(),
            children: Vec::new(),
            strings: String::new(),
            frames: Vec::new(),
            pending: Vec::new(),
            capacity,
            used: 0,
            generation: lane % stride + 1,
            stride,
            dirty: false,
        }
    }

    /// Byte budget of the arena.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes handed out since the last reset.
    #[must_use]
    pub const fn used(&self) -> usize {
        self.used
    }

    /// Bytes still available.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.used)
    }

    /// Generation currently live.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Number of nodes allocated since the last reset.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node has been allocated since the last reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Changes the byte budget. Existing allocations are kept even if they
    /// exceed the new budget; only future allocations are checked against it.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Releases every allocation and invalidates every handle issued since the
    /// previous reset.
    ///
    /// Resetting an arena that has not allocated anything since its last reset
    /// is a no-op: the generation is left untouched.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.pending.clear();
        if !self.dirty {
            return;
        }
        self.nodes.clear();
        self.children.clear();
        self.strings.clear();
        self.used = 0;
        self.generation = self.generation.wrapping_add(self.stride);
        if self.generation == 0 {
            self.generation = self.stride;
        }
        self.dirty = false;
        tracing::trace!(generation = self.generation, "arena reset");
    }

    /// Accounts for `count` values of `T` against the byte budget.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Exhausted`] when the values do not fit.
    pub fn reserve_for<T>(&mut self, count: usize) -> Result<(), ArenaError> {
        let bytes = size_of::<T>()
            .checked_mul(count)
            .ok_or(ArenaError::Exhausted {
                requested: usize::MAX,
                remaining: self.remaining(),
            })?;
        self.reserve(bytes)
    }

    fn reserve(&mut self, bytes: usize) -> Result<(), ArenaError> {
        let remaining = self.remaining();
        if bytes > remaining {
            return Err(ArenaError::Exhausted {
                requested: bytes,
                remaining,
            });
        }
        if bytes > 0 {
            self.used += bytes;
            self.dirty = true;
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn alloc_node(&mut self, node: VNode) -> Result<NodeId, ArenaError> {
        self.reserve_for::<VNode>(1)?;
        let id = NodeId {
            index: self.nodes.len() as u32,
            generation: self.generation,
        };
        self.nodes.push(node);
        Ok(id)
    }

    pub(crate) fn alloc_str(&mut self, value: &str) -> Result<Span, ArenaError> {
        self.reserve(value.len())?;
        let start = self.strings.len();
        self.strings.push_str(value);
        Ok(Span::new(start, value.len()))
    }

    pub(crate) fn alloc_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<Span, ArenaError> {
        let start = self.strings.len();
        let used = self.used;
        let mut writer = ArenaWriter {
            arena: self,
            failure: None,
        };
        if fmt::write(&mut writer, args).is_err() {
            let failure = writer.failure.take();
            self.strings.truncate(start);
            self.used = used;
            return Err(failure.unwrap_or(ArenaError::Exhausted {
                requested: 0,
                remaining: self.remaining(),
            }));
        }
        Ok(Span::new(start, self.strings.len() - start))
    }

    /// Moves the pending child handles from `start` onwards into a contiguous
    /// child list.
    pub(crate) fn alloc_children_from_pending(&mut self, start: usize) -> Result<Span, ArenaError> {
        let count = self.pending.len().saturating_sub(start);
        self.reserve_for::<NodeId>(count)?;
        let first = self.children.len();
        self.children.extend_from_slice(&self.pending[start..]);
        self.pending.truncate(start);
        Ok(Span::new(first, count))
    }

    /// Resolves a handle into a borrowed view of the node.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Stale`] for handles issued before the last reset
    /// (or by another arena) and [`ArenaError::OutOfBounds`] for handles that
    /// never pointed at a node.
    pub fn get(&self, id: NodeId) -> Result<NodeRef<'_>, ArenaError> {
        if id.generation != self.generation {
            return Err(ArenaError::Stale {
                handle: id.generation,
                live: self.generation,
            });
        }
        let node = self
            .nodes
            .get(id.index as usize)
            .ok_or(ArenaError::OutOfBounds {
                index: id.index,
                len: self.nodes.len(),
            })?;
        Ok(NodeRef::new(self, id, node))
    }

    /// Starts building a tree in this arena.
    pub fn builder(&mut self) -> TreeBuilder<'_> {
        TreeBuilder::new(self)
    }

    pub(crate) fn str(&self, span: Span) -> &str {
        self.strings.get(span.range()).unwrap_or_default()
    }

    pub(crate) fn child_ids(&self, span: Span) -> &[NodeId] {
        self.children.get(span.range()).unwrap_or_default()
    }
}

struct ArenaWriter<'a> {
    arena: &'a mut Arena,
    failure: Option<ArenaError>,
}

impl fmt::Write for ArenaWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match self.arena.reserve(s.len()) {
            Ok(()) => {
                self.arena.strings.push_str(s);
                Ok(())
            }
            Err(err) => {
                self.failure = Some(err);
                Err(fmt::Error)
            }
        }
    }
}
