//! The dispatch/render loop.
//!
//! One [`Runtime::dispatch`] call runs a full cycle:
//! `Idle → EventReceived → Reduced → TreeBuilt → Diffed → PatchesEmitted → Idle`.
//!
//! The runtime owns two arenas. The committed tree lives in the front arena;
//! each cycle resets the back arena, builds the new tree into it and diffs
//! the two. Only once the tree has been built successfully are the state,
//! the committed tree and the patch list replaced, so an aborted cycle leaves
//! every observable value as it was after the last successful one.
//!
//! Patches returned by [`Runtime::patches`] refer to nodes in
//! [`Runtime::arena`] and stay valid until the next dispatch.

use crate::{
    arena::{Arena, DEFAULT_CAPACITY, NodeId},
    diff::Differ,
    error::{ArenaError, CoreError},
    event::Event,
    patch::{Patch, PatchList},
    state::{Limits, State, StateDiff, Store},
    view::{DefaultView, ViewBuilder},
    vnode::NodeRef,
};

/// Stage of the render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Waiting for an event.
    #[default]
    Idle,
    /// An event has been accepted.
    EventReceived,
    /// The reducer produced a new state.
    Reduced,
    /// The view built the new tree.
    TreeBuilt,
    /// The patch list has been computed.
    Diffed,
    /// The new state, tree and patches are committed.
    PatchesEmitted,
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The state changed and a new cycle was committed.
    Committed {
        /// Version of the committed state.
        version: u64,
    },
    /// The event left the state unchanged; the patch list is empty.
    Unchanged,
}

/// Tunables of a [`Runtime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuntimeConfig {
    /// Byte budget of each of the two frame arenas.
    pub arena_capacity: usize,
    /// Maximum number of todos.
    pub max_todos: usize,
    /// Maximum input and todo text length in bytes.
    pub max_input_len: usize,
    /// Depth of the navigation back-stack.
    pub history_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            arena_capacity: DEFAULT_CAPACITY,
            max_todos: limits.max_todos,
            max_input_len: limits.max_input_len,
            history_depth: limits.history_depth,
        }
    }
}

impl RuntimeConfig {
    /// Reducer limits described by this configuration.
    #[must_use]
    pub const fn limits(&self) -> Limits {
        Limits {
            max_todos: self.max_todos,
            max_input_len: self.max_input_len,
            history_depth: self.history_depth,
        }
    }
}

/// Builder for [`Runtime`].
#[derive(Debug, Clone, Default)]
pub struct RuntimeBuilder<V = DefaultView> {
    config: RuntimeConfig,
    view: V,
}

impl RuntimeBuilder {
    /// Creates a builder with default configuration and view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V: ViewBuilder> RuntimeBuilder<V> {
    /// Replaces the whole configuration.
    #[must_use]
    pub const fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the byte budget of each frame arena.
    #[must_use]
    pub const fn arena_capacity(mut self, bytes: usize) -> Self {
        self.config.arena_capacity = bytes;
        self
    }

    /// Sets the maximum number of todos.
    #[must_use]
    pub const fn max_todos(mut self, max: usize) -> Self {
        self.config.max_todos = max;
        self
    }

    /// Sets the maximum input length in bytes.
    #[must_use]
    pub const fn max_input_len(mut self, max: usize) -> Self {
        self.config.max_input_len = max;
        self
    }

    /// Sets the depth of the navigation back-stack.
    #[must_use]
    pub const fn history_depth(mut self, depth: usize) -> Self {
        self.config.history_depth = depth;
        self
    }

    /// Uses `view` to render the state.
    #[must_use]
    pub fn view<W: ViewBuilder>(self, view: W) -> RuntimeBuilder<W> {
        RuntimeBuilder {
            config: self.config,
            view,
        }
    }

    /// Builds the runtime and renders the initial state.
    ///
    /// The initial patch list replaces the root with the first tree.
    ///
    /// # Errors
    ///
    /// Fails if the initial tree cannot be built.
    pub fn build(self) -> Result<Runtime<V>, CoreError> {
        let config = self.config;
        let mut arenas = [
            Arena::with_lane(config.arena_capacity, 0, 2),
            Arena::with_lane(config.arena_capacity, 1, 2),
        ];
        let store = Store::new(config.limits());
        let root = render(&self.view, store.state(), &mut arenas[0])?;
        let mut patches = PatchList::new();
        patches.push(&[], Patch::Replace(root));
        tracing::debug!(nodes = arenas[0].len(), "initial tree built");
        Ok(Runtime {
            store,
            view: self.view,
            arenas,
            front: 0,
            root,
            patches,
            differ: Differ::new(),
            phase: Phase::Idle,
            config,
        })
    }
}

fn render<V: ViewBuilder>(view: &V, state: &State, arena: &mut Arena) -> Result<NodeId, CoreError> {
    let mut tree = arena.builder();
    view.build(state, &mut tree);
    Ok(tree.finish()?)
}

/// Owns the state, the committed tree and the latest patch list.
#[derive(Debug)]
pub struct Runtime<V: ViewBuilder = DefaultView> {
    store: Store,
    view: V,
    arenas: [Arena; 2],
    front: usize,
    root: NodeId,
    patches: PatchList,
    differ: Differ,
    phase: Phase,
    config: RuntimeConfig,
}

impl Runtime {
    /// Creates a runtime with the default configuration and view.
    ///
    /// # Errors
    ///
    /// Fails if the initial tree cannot be built.
    pub fn new() -> Result<Self, CoreError> {
        RuntimeBuilder::new().build()
    }

    /// Starts configuring a runtime.
    #[must_use]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }
}

impl<V: ViewBuilder> Runtime<V> {
    /// Runs one render cycle for `event`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Render`] when the new tree could not be built,
    /// typically because the arena is exhausted. State, committed tree and
    /// patches then keep their previous values.
    pub fn dispatch(&mut self, event: Event) -> Result<Outcome, CoreError> {
        let span = tracing::debug_span!("dispatch", event = event.name());
        let _enter = span.enter();
        self.begin();
        let next = self.store.reduce(&event);
        self.cycle(next)
    }

    /// Reduces `events` in order and renders the result in a single cycle.
    ///
    /// The patch list turns the previously committed tree straight into the
    /// tree for the final state; the version advances once per event that
    /// changed something.
    ///
    /// # Errors
    ///
    /// Same as [`Runtime::dispatch`]; on failure none of the events take
    /// effect.
    pub fn dispatch_batch(&mut self, events: &[Event]) -> Result<Outcome, CoreError> {
        let span = tracing::debug_span!("dispatch_batch", events = events.len());
        let _enter = span.enter();
        self.begin();
        let next = self.store.reduce_all(events);
        self.cycle(next)
    }

    fn begin(&mut self) {
        if self.phase != Phase::Idle {
            tracing::warn!(phase = ?self.phase, "previous cycle was interrupted");
            self.phase = Phase::Idle;
        }
        self.transition(Phase::EventReceived);
    }

    fn cycle(&mut self, next: Option<State>) -> Result<Outcome, CoreError> {
        let Some(next) = next else {
            self.store.mark_unchanged();
            self.patches.clear();
            self.transition(Phase::Idle);
            tracing::trace!(version = self.store.state().version, "state unchanged");
            return Ok(Outcome::Unchanged);
        };
        self.transition(Phase::Reduced);

        let back = 1 - self.front;
        self.arenas[back].reset();
        let root = match render(&self.view, &next, &mut self.arenas[back]) {
            Ok(root) => root,
            Err(err) => {
                self.arenas[back].reset();
                self.transition(Phase::Idle);
                tracing::warn!(
                    %err,
                    version = self.store.state().version,
                    "render cycle aborted, keeping last committed tree"
                );
                return Err(err);
            }
        };
        self.transition(Phase::TreeBuilt);

        self.differ.diff(
            &self.arenas[self.front],
            self.root,
            &self.arenas[back],
            root,
            &mut self.patches,
        );
        self.transition(Phase::Diffed);

        self.front = back;
        self.root = root;
        let diff = self.store.commit(next);
        self.transition(Phase::PatchesEmitted);
        tracing::debug!(
            version = diff.version,
            changed = diff.changed_mask,
            patches = self.patches.len(),
            nodes = self.arenas[back].len(),
            "cycle committed"
        );
        self.transition(Phase::Idle);
        Ok(Outcome::Committed {
            version: diff.version,
        })
    }

    /// Decodes an event from its wire form and dispatches it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decode`] for malformed payloads, leaving state
    /// and patches untouched, or any error of [`Runtime::dispatch`].
    pub fn dispatch_raw(&mut self, event_type: u32, payload: &[u8]) -> Result<Outcome, CoreError> {
        let event = Event::decode(event_type, payload).inspect_err(|err| {
            tracing::warn!(%err, event_type, "rejected event payload");
        })?;
        self.dispatch(event)
    }

    /// Read-only view of the current state.
    #[must_use]
    pub const fn state(&self) -> &State {
        self.store.state()
    }

    /// Fields changed by the most recent dispatch.
    #[must_use]
    pub const fn state_diff(&self) -> &StateDiff {
        self.store.last_diff()
    }

    /// Patches produced by the most recent committed or no-op cycle.
    #[must_use]
    pub const fn patches(&self) -> &PatchList {
        &self.patches
    }

    /// Arena holding the committed tree and the nodes the patches refer to.
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arenas[self.front]
    }

    /// Handle of the committed root.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// The committed root node.
    ///
    /// # Errors
    ///
    /// Only fails if the committed arena was tampered with, which the
    /// runtime never does.
    pub fn root_node(&self) -> Result<NodeRef<'_>, ArenaError> {
        self.arena().get(self.root)
    }

    /// Current stage of the render cycle.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Configuration the runtime was built with.
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Changes the byte budget of both arenas for future cycles.
    pub fn set_arena_capacity(&mut self, bytes: usize) {
        self.config.arena_capacity = bytes;
        for arena in &mut self.arenas {
            arena.set_capacity(bytes);
        }
    }

    fn transition(&mut self, next: Phase) {
        tracing::trace!(from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::TreeBuilder,
        error::Status,
        mirror::{MirrorNode, MirrorTree},
        patch::PatchKind,
        vnode::Tag,
    };
    use alloc::vec::Vec;

    fn runtime() -> Runtime {
        Runtime::new().expect("default runtime builds")
    }

    fn converges(runtime: &Runtime, mirror: &mut MirrorTree) {
        mirror
            .apply(runtime.arena(), runtime.patches())
            .expect("patches apply");
        let expected = MirrorNode::from_arena(runtime.arena(), runtime.root()).expect("tree");
        assert_eq!(mirror.root(), Some(&expected));
    }

    #[test]
    fn initial_patch_replaces_the_root() {
        let runtime = runtime();
        assert_eq!(runtime.state().version, 0);
        assert_eq!(runtime.patches().len(), 1);
        let entry = runtime.patches().get(0).expect("initial patch");
        assert!(entry.path.is_empty());
        assert_eq!(entry.patch, Patch::Replace(runtime.root()));
        assert_eq!(runtime.phase(), Phase::Idle);
    }

    #[test]
    fn increment_updates_only_the_counter_text() {
        let mut runtime = runtime();
        let outcome = runtime.dispatch(Event::Increment).expect("dispatch");
        assert_eq!(outcome, Outcome::Committed { version: 1 });
        let patches: Vec<_> = runtime.patches().iter().collect();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].path, [1, 1]);
        assert_eq!(patches[0].patch, Patch::UpdateText("1"));
    }

    #[test]
    fn counter_scenario_through_the_loop() {
        let mut runtime = runtime();
        runtime.dispatch(Event::Increment).expect("increment");
        runtime.dispatch(Event::Decrement).expect("decrement");
        runtime.dispatch(Event::Decrement).expect("decrement");
        assert_eq!(runtime.state().app.counter, -1);
        assert_eq!(runtime.state().version, 3);
        let count = runtime
            .root_node()
            .ok()
            .and_then(|root| root.child(1))
            .and_then(|counter| counter.child(1))
            .and_then(|count| count.text());
        assert_eq!(count, Some("-1"));
    }

    #[test]
    fn no_op_keeps_version_and_empties_patches() {
        let mut runtime = runtime();
        let outcome = runtime.dispatch(Event::Reset).expect("dispatch");
        assert_eq!(outcome, Outcome::Unchanged);
        assert_eq!(runtime.state().version, 0);
        assert!(runtime.patches().is_empty());
        assert!(runtime.state_diff().is_empty());
    }

    #[test]
    fn malformed_payload_keeps_previous_patches() {
        let mut runtime = runtime();
        runtime.dispatch(Event::Increment).expect("dispatch");
        let before = runtime.patches().clone();
        let err = runtime.dispatch_raw(0x2001, &[1]).expect_err("truncated payload");
        assert_eq!(err.status(), Status::InvalidArg);
        assert_eq!(runtime.patches(), &before);
        assert_eq!(runtime.state().version, 1);
    }

    #[test]
    fn arena_exhaustion_rolls_back() {
        let mut runtime = runtime();
        runtime.dispatch(Event::Increment).expect("dispatch");
        let patches = runtime.patches().clone();
        let root = runtime.root();

        runtime.set_arena_capacity(1);
        let err = runtime.dispatch(Event::Increment).expect_err("arena too small");
        assert_eq!(err.status(), Status::OutOfMemory);
        assert_eq!(runtime.state().version, 1);
        assert_eq!(runtime.state().app.counter, 1);
        assert_eq!(runtime.patches(), &patches);
        assert_eq!(runtime.root(), root);
        assert!(runtime.root_node().is_ok());
        assert_eq!(runtime.phase(), Phase::Idle);

        runtime.set_arena_capacity(DEFAULT_CAPACITY);
        runtime.dispatch(Event::Increment).expect("dispatch after recovery");
        assert_eq!(runtime.state().version, 2);
        assert_eq!(runtime.patches().get(0).map(|e| e.patch), Some(Patch::UpdateText("2")));
    }

    #[test]
    fn mirror_follows_every_cycle() {
        let mut runtime = runtime();
        let mut mirror = MirrorTree::new();
        converges(&runtime, &mut mirror);
        let events = [
            Event::TodoAdd("write tests".into()),
            Event::TodoAdd("ship".into()),
            Event::TodoToggle(1),
            Event::SetFilter(crate::state::Filter::Active),
            Event::Increment,
            Event::SetFilter(crate::state::Filter::All),
            Event::TodoRemove(2),
            Event::Navigate { screen: 2 },
            Event::Back,
        ];
        for event in events {
            runtime.dispatch(event).expect("dispatch");
            converges(&runtime, &mut mirror);
        }
    }

    #[test]
    fn adding_a_todo_inserts_one_list_item() {
        let mut runtime = runtime();
        runtime.dispatch(Event::TodoAdd("a".into())).expect("dispatch");
        let inserts: Vec<_> = runtime
            .patches()
            .iter()
            .filter(|e| e.patch.kind() == PatchKind::InsertChild)
            .collect();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].path, [2, 1]);
        assert_eq!(runtime.patches().count(PatchKind::Replace), 0);
    }

    #[test]
    fn batches_render_once() {
        let mut runtime = runtime();
        let mut mirror = MirrorTree::new();
        converges(&runtime, &mut mirror);
        let events = [
            Event::TodoAdd("a".into()),
            Event::TodoAdd("b".into()),
            Event::TodoAdd("c".into()),
            Event::Reset,
            Event::TodoToggle(2),
        ];
        let outcome = runtime.dispatch_batch(&events).expect("batch");
        assert_eq!(outcome, Outcome::Committed { version: 4 });
        assert_eq!(runtime.patches().count(PatchKind::InsertChild), 3);
        converges(&runtime, &mut mirror);
        assert_eq!(runtime.dispatch_batch(&[]), Ok(Outcome::Unchanged));
    }

    fn label(state: &State, tree: &mut TreeBuilder<'_>) {
        tree.open(Tag::Text)
            .text_fmt(format_args!("{}", state.app.counter))
            .close();
    }

    #[test]
    fn custom_views_and_limits() {
        let mut runtime = Runtime::builder()
            .max_todos(0)
            .view(label)
            .build()
            .expect("runtime builds");
        assert_eq!(runtime.config().max_todos, 0);
        runtime.dispatch(Event::Increment).expect("dispatch");
        assert_eq!(runtime.patches().get(0).map(|e| e.patch), Some(Patch::UpdateText("1")));
        runtime.dispatch(Event::TodoAdd("x".into())).expect("dispatch");
        assert!(runtime.state().error_message.is_some());
        assert!(runtime.patches().is_empty());
    }
}
