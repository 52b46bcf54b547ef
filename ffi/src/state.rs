//! `#[repr(C)]` state snapshots.
//!
//! The host reads state through plain C structs owned by the per-thread
//! [`Host`](crate::host::Host). They are rebuilt after every committed cycle
//! and stay valid (same address, same contents) until the next call that
//! dispatches an event.

use core::ffi::{c_char, c_void};
use core::ptr;
use std::ffi::CString;

use zylix_core::{Field, RuntimeConfig, State, StateDiff, Todo};

use crate::{IntoFFI, IntoRust, host::with_host};

/// Capacity of [`ZylixAppState::input_text`], terminator included.
pub const INPUT_CAPACITY: usize = 256;

/// Top-level state snapshot.
#[repr(C)]
#[derive(Debug)]
pub struct ZylixState {
    /// Incremented once per committed state change.
    pub version: u64,
    /// Current screen.
    pub screen: u32,
    /// Loading indicator.
    pub loading: bool,
    /// NUL-terminated error message, or null.
    pub error_message: *const c_char,
    /// Points at a [`ZylixAppState`].
    pub view_data: *const c_void,
    /// Size of the struct behind `view_data`.
    pub view_data_size: usize,
}

impl Default for ZylixState {
    fn default() -> Self {
        Self {
            version: 0,
            screen: 0,
            loading: false,
            error_message: ptr::null(),
            view_data: ptr::null(),
            view_data_size: 0,
        }
    }
}

/// One todo item. `text` is not NUL-terminated.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ZylixTodo {
    /// Stable id, assigned from 1.
    pub id: u32,
    /// Completion flag.
    pub completed: bool,
    /// UTF-8 text.
    pub text: *const c_char,
    /// Length of `text` in bytes.
    pub text_len: usize,
}

impl From<&Todo> for ZylixTodo {
    fn from(todo: &Todo) -> Self {
        Self {
            id: todo.id,
            completed: todo.completed,
            text: todo.text.as_ptr().cast(),
            text_len: todo.text.len(),
        }
    }
}

/// Application payload behind [`ZylixState::view_data`].
#[repr(C)]
#[derive(Debug)]
pub struct ZylixAppState {
    /// Counter value.
    pub counter: i64,
    /// NUL-terminated copy of the input buffer.
    pub input_text: [c_char; INPUT_CAPACITY],
    /// Length of `input_text` without the terminator.
    pub input_len: usize,
    /// Array of `todo_count` todos.
    pub todos: *const ZylixTodo,
    /// Number of todos.
    pub todo_count: u32,
    /// Number of todos not yet completed.
    pub active_count: u32,
    /// Raw filter value.
    pub filter: u32,
    /// Selected tab.
    pub tab: u32,
    /// Id the next todo will receive.
    pub next_todo_id: u32,
    /// Depth of the navigation back-stack.
    pub history_len: u32,
    /// Whether the app is in the foreground.
    pub foreground: bool,
}

impl Default for ZylixAppState {
    fn default() -> Self {
        Self {
            counter: 0,
            input_text: [0; INPUT_CAPACITY],
            input_len: 0,
            todos: ptr::null(),
            todo_count: 0,
            active_count: 0,
            filter: 0,
            tab: 0,
            next_todo_id: 1,
            history_len: 0,
            foreground: true,
        }
    }
}

into_ffi! {
    StateDiff,
    /// Fields changed by the last committed cycle.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ZylixDiff {
        /// Bit `n` is set when the field with id `n` changed.
        changed_mask: u64,
        /// Number of bits set in `changed_mask`.
        change_count: u8,
        /// State version the diff leads to.
        version: u64,
    }
}

/// Runtime configuration passed to `zylix_init_with_config`.
///
/// Zero fields keep their defaults.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ZylixConfig {
    /// Bytes per frame arena.
    pub arena_capacity: usize,
    /// Maximum number of todos.
    pub max_todos: u32,
    /// Maximum input length in bytes.
    pub max_input_len: u32,
    /// Navigation back-stack bound.
    pub history_depth: u32,
}

impl IntoRust for ZylixConfig {
    type Rust = RuntimeConfig;

    unsafe fn into_rust(self) -> Self::Rust {
        let defaults = RuntimeConfig::default();
        let or = |value: u32, default: usize| {
            if value == 0 { default } else { value as usize }
        };
        RuntimeConfig {
            arena_capacity: if self.arena_capacity == 0 {
                defaults.arena_capacity
            } else {
                self.arena_capacity
            },
            max_todos: or(self.max_todos, defaults.max_todos),
            max_input_len: or(self.max_input_len, defaults.max_input_len),
            history_depth: or(self.history_depth, defaults.history_depth),
        }
    }
}

/// Owns the structs handed out by `zylix_get_state` and `zylix_get_diff`.
#[derive(Debug, Default)]
pub struct StateSnapshot {
    state: ZylixState,
    app: Box<ZylixAppState>,
    todos: Vec<ZylixTodo>,
    error: Option<CString>,
    diff: ZylixDiff,
}

impl StateSnapshot {
    /// Rebuilds the snapshot from `state`.
    ///
    /// Todo texts point into `state` itself, which the runtime leaves
    /// untouched until the next commit, after which the snapshot is rebuilt.
    #[allow(clippy::cast_possible_truncation)]
    pub fn update(&mut self, state: &State, diff: &StateDiff) {
        self.diff = (*diff).into_ffi();

        let app = &state.app;
        self.todos.clear();
        self.todos.extend(app.todos.iter().map(ZylixTodo::from));

        let snapshot = &mut *self.app;
        snapshot.counter = app.counter;
        snapshot.input_len = copy_input(&app.input, &mut snapshot.input_text);
        snapshot.todos = if self.todos.is_empty() {
            ptr::null()
        } else {
            self.todos.as_ptr()
        };
        snapshot.todo_count = self.todos.len() as u32;
        snapshot.active_count = app.active_count() as u32;
        snapshot.filter = app.filter.raw();
        snapshot.tab = app.tab;
        snapshot.next_todo_id = app.next_todo_id;
        snapshot.history_len = app.history.len() as u32;
        snapshot.foreground = app.foreground;

        self.error = state
            .error_message
            .as_deref()
            .and_then(|message| CString::new(message).ok());

        self.state = ZylixState {
            version: state.version,
            screen: state.screen,
            loading: state.loading,
            error_message: self.error.as_ref().map_or(ptr::null(), |error| error.as_ptr()),
            view_data: ptr::from_ref::<ZylixAppState>(&*self.app).cast(),
            view_data_size: size_of::<ZylixAppState>(),
        };
    }

    /// The top-level snapshot.
    pub const fn state(&self) -> &ZylixState {
        &self.state
    }

    /// The last field diff.
    pub const fn diff(&self) -> &ZylixDiff {
        &self.diff
    }
}

/// Copies `input` into `buffer` NUL-terminated, cutting at a character
/// boundary when it does not fit. Returns the bytes copied.
fn copy_input(input: &str, buffer: &mut [c_char; INPUT_CAPACITY]) -> usize {
    let mut len = input.len().min(INPUT_CAPACITY - 1);
    while !input.is_char_boundary(len) {
        len -= 1;
    }
    for (slot, byte) in buffer.iter_mut().zip(&input.as_bytes()[..len]) {
        *slot = c_char::from_ne_bytes([*byte]);
    }
    buffer[len] = 0;
    len
}

/// Returns the current state snapshot, or null before `zylix_init`.
///
/// The pointer stays valid until the next dispatching call or
/// `zylix_deinit`.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_get_state() -> *const ZylixState {
    with_host(|host| ptr::from_ref(host.state.state())).unwrap_or(ptr::null())
}

/// Returns the current state version, `0` before `zylix_init`.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_get_state_version() -> u64 {
    with_host(|host| host.runtime.state().version).unwrap_or(0)
}

/// Returns the field diff of the last cycle, or null before `zylix_init`.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_get_diff() -> *const ZylixDiff {
    with_host(|host| ptr::from_ref(host.state.diff())).unwrap_or(ptr::null())
}

/// Returns `true` when the field with id `field_id` changed in the last
/// cycle. Unknown ids report `false`.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_field_changed(field_id: u16) -> bool {
    Field::from_raw(u32::from(field_id))
        .and_then(|field| with_host(|host| host.runtime.state_diff().changed(field)).ok())
        .unwrap_or(false)
}
