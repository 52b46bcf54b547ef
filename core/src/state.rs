//! The versioned application state and its reducer.
//!
//! [`Store`] owns the only mutable [`State`]. Events are applied to a copy of
//! the current state; the copy is committed (and the version bumped by one)
//! only when it differs from the current state, so dispatching an event that
//! changes nothing leaves the version untouched.

use alloc::{borrow::ToOwned, string::String, vec::Vec};

use crate::event::Event;

/// Error message set when a todo cannot be added because the list is full.
pub const TODO_LIST_FULL: &str = "todo list is full";

/// One entry of the todo list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Todo {
    /// Identity, unique for the lifetime of the store.
    pub id: u32,
    /// Description.
    pub text: String,
    /// Whether the todo is done.
    pub completed: bool,
}

/// Which todos the view shows.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Filter {
    /// Every todo.
    #[default]
    All = 0,
    /// Todos not completed yet.
    Active = 1,
    /// Completed todos.
    Completed = 2,
}

impl Filter {
    /// Every filter, in wire order.
    pub const ALL: [Self; 3] = [Self::All, Self::Active, Self::Completed];

    /// Decodes a raw filter value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::All),
            1 => Some(Self::Active),
            2 => Some(Self::Completed),
            _ => None,
        }
    }

    /// Raw filter value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self as u32
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }

    /// Returns `true` if `todo` passes the filter.
    #[must_use]
    pub const fn matches(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.completed,
            Self::Completed => todo.completed,
        }
    }
}

/// Bounds the reducer enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Limits {
    /// Maximum number of todos.
    pub max_todos: usize,
    /// Maximum length of the input buffer and of todo text, in bytes.
    pub max_input_len: usize,
    /// Maximum depth of the navigation back-stack.
    pub history_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_todos: 100,
            max_input_len: 255,
            history_depth: 16,
        }
    }
}

/// Screen-specific data interpreted by the view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AppState {
    /// Counter value.
    pub counter: i64,
    /// Todo list in insertion order.
    pub todos: Vec<Todo>,
    /// Id the next todo will get.
    pub next_todo_id: u32,
    /// Active todo filter.
    pub filter: Filter,
    /// Contents of the text input.
    pub input: String,
    /// Screens to return to, most recent last.
    pub history: Vec<u32>,
    /// Selected tab.
    pub tab: u32,
    /// Whether the application is in the foreground.
    pub foreground: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            counter: 0,
            todos: Vec::new(),
            next_todo_id: 1,
            filter: Filter::All,
            input: String::new(),
            history: Vec::new(),
            tab: 0,
            foreground: true,
        }
    }
}

impl AppState {
    /// Todos passing the current filter.
    pub fn visible_todos(&self) -> impl Iterator<Item = &Todo> + '_ {
        self.todos.iter().filter(|todo| self.filter.matches(todo))
    }

    /// Number of todos not completed yet.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.todos.iter().filter(|todo| !todo.completed).count()
    }
}

/// The single source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct State {
    /// Incremented by one on every committed change.
    pub version: u64,
    /// Current screen.
    pub screen: u32,
    /// Loading indicator.
    pub loading: bool,
    /// User-visible error, if any.
    pub error_message: Option<String>,
    /// Screen data.
    pub app: AppState,
}

/// Observable state fields, numbered as in the C header.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// [`AppState::counter`].
    Counter = 0,
    /// [`AppState::todos`].
    Todos = 1,
    /// [`AppState::filter`].
    Filter = 2,
    /// [`AppState::input`].
    Input = 3,
    /// [`State::screen`] and the back-stack.
    Screen = 4,
    /// [`State::loading`].
    Loading = 5,
    /// [`State::error_message`].
    ErrorMessage = 6,
    /// [`AppState::tab`].
    Tab = 7,
    /// [`AppState::foreground`].
    Lifecycle = 8,
}

impl Field {
    /// Every field.
    pub const ALL: [Self; 9] = [
        Self::Counter,
        Self::Todos,
        Self::Filter,
        Self::Input,
        Self::Screen,
        Self::Loading,
        Self::ErrorMessage,
        Self::Tab,
        Self::Lifecycle,
    ];

    /// Decodes a raw field id.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.raw() == raw)
    }

    /// Raw field id.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self as u32
    }

    /// Bit of the field in [`StateDiff::changed_mask`].
    #[must_use]
    pub const fn bit(self) -> u64 {
        1 << self as u32
    }

    fn differs(self, old: &State, new: &State) -> bool {
        match self {
            Self::Counter => old.app.counter != new.app.counter,
            Self::Todos => old.app.todos != new.app.todos,
            Self::Filter => old.app.filter != new.app.filter,
            Self::Input => old.app.input != new.app.input,
            Self::Screen => old.screen != new.screen || old.app.history != new.app.history,
            Self::Loading => old.loading != new.loading,
            Self::ErrorMessage => old.error_message != new.error_message,
            Self::Tab => old.app.tab != new.app.tab,
            Self::Lifecycle => old.app.foreground != new.app.foreground,
        }
    }
}

/// Which fields the last committed change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateDiff {
    /// One bit per [`Field`].
    pub changed_mask: u64,
    /// Number of bits set in `changed_mask`.
    pub change_count: u8,
    /// Version the diff leads to.
    pub version: u64,
}

impl StateDiff {
    /// Compares two states field by field.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn between(old: &State, new: &State) -> Self {
        let changed_mask = Field::ALL
            .into_iter()
            .filter(|field| field.differs(old, new))
            .fold(0, |mask, field| mask | field.bit());
        Self {
            changed_mask,
            change_count: changed_mask.count_ones() as u8,
            version: new.version,
        }
    }

    /// An empty diff at `version`.
    #[must_use]
    pub const fn unchanged(version: u64) -> Self {
        Self {
            changed_mask: 0,
            change_count: 0,
            version,
        }
    }

    /// Returns `true` if `field` changed.
    #[must_use]
    pub const fn changed(&self, field: Field) -> bool {
        self.changed_mask & field.bit() != 0
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.changed_mask == 0
    }
}

/// Applies `event` to `state` in place. The version is left alone.
pub fn reduce(state: &mut State, event: &Event, limits: &Limits) {
    let app = &mut state.app;
    match event {
        Event::Init => {
            state.loading = false;
            app.foreground = true;
        }
        Event::Foreground => app.foreground = true,
        Event::Background | Event::Terminate => app.foreground = false,
        Event::LowMemory
        | Event::ButtonPress { .. }
        | Event::Selection { .. }
        | Event::Scroll { .. }
        | Event::Gesture { .. } => {}
        Event::TextInput { text, .. } => {
            text_prefix(text, limits.max_input_len).clone_into(&mut app.input);
        }
        Event::TextCommit { .. } => {
            let text = core::mem::take(&mut app.input);
            add_todo(state, &text, limits);
        }
        Event::Navigate { screen } => {
            if *screen != state.screen {
                if limits.history_depth > 0 {
                    if app.history.len() >= limits.history_depth {
                        app.history.remove(0);
                    }
                    app.history.push(state.screen);
                }
                state.screen = *screen;
            }
        }
        Event::Back => {
            if let Some(screen) = app.history.pop() {
                state.screen = screen;
            }
        }
        Event::TabSwitch { tab } => app.tab = *tab,
        Event::Increment => app.counter = app.counter.saturating_add(1),
        Event::Decrement => app.counter = app.counter.saturating_sub(1),
        Event::Reset => app.counter = 0,
        Event::TodoAdd(text) => add_todo(state, text, limits),
        Event::TodoToggle(id) => {
            if let Some(todo) = app.todos.iter_mut().find(|todo| todo.id == *id) {
                todo.completed = !todo.completed;
                state.error_message = None;
            }
        }
        Event::TodoRemove(id) => {
            if let Some(index) = app.todos.iter().position(|todo| todo.id == *id) {
                app.todos.remove(index);
                state.error_message = None;
            }
        }
        Event::TodoToggleAll => {
            if !app.todos.is_empty() {
                let complete = app.todos.iter().any(|todo| !todo.completed);
                for todo in &mut app.todos {
                    todo.completed = complete;
                }
                state.error_message = None;
            }
        }
        Event::TodoClearCompleted => {
            let before = app.todos.len();
            app.todos.retain(|todo| !todo.completed);
            if app.todos.len() != before {
                state.error_message = None;
            }
        }
        Event::SetFilter(filter) => app.filter = *filter,
    }
}

fn add_todo(state: &mut State, text: &str, limits: &Limits) {
    let text = text_prefix(text.trim(), limits.max_input_len);
    if text.is_empty() {
        return;
    }
    let app = &mut state.app;
    if app.todos.len() >= limits.max_todos {
        state.error_message = Some(TODO_LIST_FULL.to_owned());
        return;
    }
    app.todos.push(Todo {
        id: app.next_todo_id,
        text: text.to_owned(),
        completed: false,
    });
    app.next_todo_id = app.next_todo_id.wrapping_add(1).max(1);
    state.error_message = None;
}

/// Longest prefix of `text` of at most `max` bytes ending on a char boundary.
fn text_prefix(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Owner of the application state.
#[derive(Debug, Clone, Default)]
pub struct Store {
    state: State,
    limits: Limits,
    last_diff: StateDiff,
}

impl Store {
    /// Creates a store holding the default state at version 0.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            state: State::default(),
            limits,
            last_diff: StateDiff::default(),
        }
    }

    /// Read-only view of the current state.
    #[must_use]
    pub const fn state(&self) -> &State {
        &self.state
    }

    /// Bounds enforced by the reducer.
    #[must_use]
    pub const fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Fields touched by the most recent dispatch.
    #[must_use]
    pub const fn last_diff(&self) -> &StateDiff {
        &self.last_diff
    }

    /// Computes the state `event` would lead to without committing it.
    ///
    /// Returns `None` when the event leaves every field unchanged.
    #[must_use]
    pub fn reduce(&self, event: &Event) -> Option<State> {
        self.reduce_all(core::iter::once(event))
    }

    /// Computes the state a sequence of events would lead to without
    /// committing it. Every event that changes something adds one to the
    /// version; events that change nothing are skipped.
    ///
    /// Returns `None` when no event changed anything.
    #[must_use]
    pub fn reduce_all<'e>(&self, events: impl IntoIterator<Item = &'e Event>) -> Option<State> {
        let mut latest: Option<State> = None;
        for event in events {
            let base = latest.as_ref().unwrap_or(&self.state);
            let mut next = base.clone();
            reduce(&mut next, event, &self.limits);
            if next != *base {
                next.version = base.version + 1;
                latest = Some(next);
            }
        }
        latest
    }

    /// Replaces the current state with one produced by [`Store::reduce`].
    pub fn commit(&mut self, next: State) -> StateDiff {
        self.last_diff = StateDiff::between(&self.state, &next);
        self.state = next;
        self.last_diff
    }

    /// Records that the last dispatch changed nothing.
    pub fn mark_unchanged(&mut self) {
        self.last_diff = StateDiff::unchanged(self.state.version);
    }

    /// Reduces and commits `event`. Returns `true` if the state changed.
    pub fn dispatch(&mut self, event: &Event) -> bool {
        match self.reduce(event) {
            Some(next) => {
                self.commit(next);
                true
            }
            None => {
                self.mark_unchanged();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    fn store() -> Store {
        Store::new(Limits::default())
    }

    #[test]
    fn counter_scenario() {
        let mut store = store();
        assert_eq!(store.state().version, 0);
        assert!(store.dispatch(&Event::Increment));
        assert_eq!((store.state().app.counter, store.state().version), (1, 1));
        store.dispatch(&Event::Decrement);
        store.dispatch(&Event::Decrement);
        assert_eq!((store.state().app.counter, store.state().version), (-1, 3));
        assert!(store.last_diff().changed(Field::Counter));
        assert_eq!(store.last_diff().change_count, 1);
    }

    #[test]
    fn no_ops_keep_the_version() {
        let mut store = store();
        for event in [
            Event::Reset,
            Event::Back,
            Event::TodoToggle(42),
            Event::TodoRemove(42),
            Event::TodoToggleAll,
            Event::TodoClearCompleted,
            Event::SetFilter(Filter::All),
            Event::ButtonPress { id: 1 },
            Event::Foreground,
            Event::TodoAdd("   ".to_string()),
        ] {
            assert!(!store.dispatch(&event), "{} changed the state", event.name());
        }
        assert_eq!(store.state().version, 0);
        assert!(store.last_diff().is_empty());
    }

    #[test]
    fn todos_get_increasing_ids() {
        let mut store = store();
        store.dispatch(&Event::TodoAdd("a".to_string()));
        store.dispatch(&Event::TodoAdd("b".to_string()));
        store.dispatch(&Event::TodoRemove(1));
        store.dispatch(&Event::TodoAdd("c".to_string()));
        let ids: Vec<u32> = store.state().app.todos.iter().map(|t| t.id).collect();
        assert_eq!(ids, [2, 3]);
    }

    #[test]
    fn toggle_all_and_clear_completed() {
        let mut store = store();
        store.dispatch(&Event::TodoAdd("a".to_string()));
        store.dispatch(&Event::TodoAdd("b".to_string()));
        store.dispatch(&Event::TodoToggle(1));
        store.dispatch(&Event::TodoToggleAll);
        assert!(store.state().app.todos.iter().all(|t| t.completed));
        store.dispatch(&Event::TodoToggleAll);
        assert_eq!(store.state().app.active_count(), 2);
        store.dispatch(&Event::TodoToggle(2));
        store.dispatch(&Event::TodoClearCompleted);
        assert_eq!(store.state().app.todos.len(), 1);
        assert_eq!(store.state().app.todos[0].text, "a");
    }

    #[test]
    fn full_list_reports_an_error_until_the_next_success() {
        let mut store = Store::new(Limits {
            max_todos: 1,
            ..Limits::default()
        });
        store.dispatch(&Event::TodoAdd("first".to_string()));
        assert!(store.dispatch(&Event::TodoAdd("second".to_string())));
        assert_eq!(store.state().error_message.as_deref(), Some(TODO_LIST_FULL));
        assert!(store.last_diff().changed(Field::ErrorMessage));
        assert!(!store.last_diff().changed(Field::Todos));

        assert!(!store.dispatch(&Event::TodoAdd("third".to_string())));
        store.dispatch(&Event::TodoToggle(1));
        assert_eq!(store.state().error_message, None);
    }

    #[test]
    fn text_input_is_truncated_on_a_char_boundary() {
        let mut store = Store::new(Limits {
            max_input_len: 4,
            ..Limits::default()
        });
        store.dispatch(&Event::TextInput {
            field: 0,
            text: "abcé".to_string(),
        });
        assert_eq!(store.state().app.input, "abc");
        store.dispatch(&Event::TextCommit { field: 0 });
        assert_eq!(store.state().app.input, "");
        assert_eq!(store.state().app.todos[0].text, "abc");
        let diff = store.last_diff();
        assert!(diff.changed(Field::Input) && diff.changed(Field::Todos));
        assert_eq!(diff.change_count, 2);
    }

    #[test]
    fn navigation_history_is_bounded() {
        let mut store = Store::new(Limits {
            history_depth: 2,
            ..Limits::default()
        });
        for screen in 1..=3 {
            store.dispatch(&Event::Navigate { screen });
        }
        assert_eq!(store.state().app.history, [1, 2]);
        store.dispatch(&Event::Back);
        store.dispatch(&Event::Back);
        assert_eq!(store.state().screen, 1);
        assert!(!store.dispatch(&Event::Back));
    }

    #[test]
    fn batches_bump_the_version_per_effective_event() {
        let store = store();
        let events = [Event::Increment, Event::Reset, Event::Reset, Event::Increment];
        let next = store.reduce_all(&events).expect("state changed");
        assert_eq!(next.version, 3);
        assert_eq!(next.app.counter, 1);
        assert_eq!(store.state().version, 0);
        assert!(store.reduce_all(&[Event::Reset, Event::Back]).is_none());
    }

    #[test]
    fn field_ids_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_raw(field.raw()), Some(field));
        }
        assert_eq!(Field::from_raw(9), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn state_serializes_for_host_tooling() {
        let mut store = store();
        assert!(store.dispatch(&Event::TodoAdd("write docs".to_string())));
        assert!(store.dispatch(&Event::Navigate { screen: 2 }));
        let json = serde_json::to_string(store.state()).expect("serializes");
        assert!(json.contains("write docs"));
        let back: State = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(&back, store.state());
    }
}
