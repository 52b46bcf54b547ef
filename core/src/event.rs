//! The closed set of events the core reacts to, and their wire format.
//!
//! Platform shells hand events over as an integer type code plus a byte
//! payload. Integers in payloads are little-endian; text is raw UTF-8 with
//! no terminator, its length given by the payload length. Fixed-size
//! payloads may carry trailing bytes, which are ignored.

use alloc::{string::String, vec::Vec};

use crate::{error::DecodeError, state::Filter};

/// Event type codes shared with the C header.
pub mod codes {
    /// Application finished launching.
    pub const APP_INIT: u32 = 0x0001;
    /// Application is about to exit.
    pub const APP_TERMINATE: u32 = 0x0002;
    /// Application moved to the foreground.
    pub const APP_FOREGROUND: u32 = 0x0003;
    /// Application moved to the background.
    pub const APP_BACKGROUND: u32 = 0x0004;
    /// The system is low on memory.
    pub const APP_LOW_MEMORY: u32 = 0x0005;

    /// A button was pressed. Payload: `u32` button id.
    pub const BUTTON_PRESS: u32 = 0x0100;
    /// Text field contents changed. Payload: `u32` field id, UTF-8 text.
    pub const TEXT_INPUT: u32 = 0x0101;
    /// Text field was submitted. Payload: `u32` field id.
    pub const TEXT_COMMIT: u32 = 0x0102;
    /// A selection changed. Payload: `u32` field id, `u32` index.
    pub const SELECTION: u32 = 0x0103;
    /// A view scrolled. Payload: `i32` dx, `i32` dy.
    pub const SCROLL: u32 = 0x0104;
    /// A gesture was recognized. Payload: `u32` gesture kind.
    pub const GESTURE: u32 = 0x0105;

    /// Go to a screen. Payload: `u32` screen id.
    pub const NAVIGATE: u32 = 0x0200;
    /// Go back to the previous screen.
    pub const NAVIGATE_BACK: u32 = 0x0201;
    /// Switch tab. Payload: `u32` tab index.
    pub const TAB_SWITCH: u32 = 0x0202;

    /// Add one to the counter.
    pub const COUNTER_INCREMENT: u32 = 0x1000;
    /// Subtract one from the counter.
    pub const COUNTER_DECREMENT: u32 = 0x1001;
    /// Set the counter back to zero.
    pub const COUNTER_RESET: u32 = 0x1002;

    /// First application-defined event code.
    pub const CUSTOM_BASE: u32 = 0x2000;
    /// Add a todo. Payload: UTF-8 text.
    pub const TODO_ADD: u32 = CUSTOM_BASE;
    /// Flip a todo's completion. Payload: `u32` todo id.
    pub const TODO_TOGGLE: u32 = CUSTOM_BASE + 1;
    /// Delete a todo. Payload: `u32` todo id.
    pub const TODO_REMOVE: u32 = CUSTOM_BASE + 2;
    /// Complete every todo, or reopen all if all are complete.
    pub const TODO_TOGGLE_ALL: u32 = CUSTOM_BASE + 3;
    /// Delete every completed todo.
    pub const TODO_CLEAR_COMPLETED: u32 = CUSTOM_BASE + 4;
    /// Change the visible todos. Payload: `u32` filter.
    pub const TODO_SET_FILTER: u32 = CUSTOM_BASE + 5;
}

/// Everything the reducer can be asked to do.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Event {
    /// Application finished launching.
    Init,
    /// Application is about to exit.
    Terminate,
    /// Application moved to the foreground.
    Foreground,
    /// Application moved to the background.
    Background,
    /// The system is low on memory.
    LowMemory,
    /// A button was pressed.
    ButtonPress {
        /// Host-assigned button id.
        id: u32,
    },
    /// A text field changed.
    TextInput {
        /// Host-assigned field id.
        field: u32,
        /// New contents of the field.
        text: String,
    },
    /// A text field was submitted.
    TextCommit {
        /// Host-assigned field id.
        field: u32,
    },
    /// A selection changed. Reserved.
    Selection {
        /// Host-assigned field id.
        field: u32,
        /// Selected index.
        index: u32,
    },
    /// A view scrolled. Reserved.
    Scroll {
        /// Horizontal delta.
        dx: i32,
        /// Vertical delta.
        dy: i32,
    },
    /// A gesture was recognized. Reserved.
    Gesture {
        /// Host-defined gesture kind.
        kind: u32,
    },
    /// Go to a screen.
    Navigate {
        /// Target screen.
        screen: u32,
    },
    /// Return to the previous screen.
    Back,
    /// Switch tab.
    TabSwitch {
        /// Target tab.
        tab: u32,
    },
    /// Add one to the counter.
    Increment,
    /// Subtract one from the counter.
    Decrement,
    /// Set the counter to zero.
    Reset,
    /// Add a todo.
    TodoAdd(String),
    /// Flip a todo's completion.
    TodoToggle(u32),
    /// Delete a todo.
    TodoRemove(u32),
    /// Complete every todo, or reopen all if all are complete.
    TodoToggleAll,
    /// Delete completed todos.
    TodoClearCompleted,
    /// Change the visible todos.
    SetFilter(Filter),
}

impl Event {
    /// Decodes an event from its type code and payload.
    ///
    /// # Errors
    ///
    /// Fails on unknown type codes, payloads shorter than the event needs,
    /// text that is not UTF-8 and out-of-range enumerated values.
    pub fn decode(event_type: u32, payload: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader {
            event: event_type,
            bytes: payload,
        };
        let event = match event_type {
            codes::APP_INIT => Self::Init,
            codes::APP_TERMINATE => Self::Terminate,
            codes::APP_FOREGROUND => Self::Foreground,
            codes::APP_BACKGROUND => Self::Background,
            codes::APP_LOW_MEMORY => Self::LowMemory,
            codes::BUTTON_PRESS => Self::ButtonPress {
                id: reader.u32()?,
            },
            codes::TEXT_INPUT => Self::TextInput {
                field: reader.u32()?,
                text: reader.rest_str()?,
            },
            codes::TEXT_COMMIT => Self::TextCommit {
                field: reader.u32()?,
            },
            codes::SELECTION => Self::Selection {
                field: reader.u32()?,
                index: reader.u32()?,
            },
            codes::SCROLL => Self::Scroll {
                dx: reader.i32()?,
                dy: reader.i32()?,
            },
            codes::GESTURE => Self::Gesture {
                kind: reader.u32()?,
            },
            codes::NAVIGATE => Self::Navigate {
                screen: reader.u32()?,
            },
            codes::NAVIGATE_BACK => Self::Back,
            codes::TAB_SWITCH => Self::TabSwitch { tab: reader.u32()? },
            codes::COUNTER_INCREMENT => Self::Increment,
            codes::COUNTER_DECREMENT => Self::Decrement,
            codes::COUNTER_RESET => Self::Reset,
            codes::TODO_ADD => Self::TodoAdd(reader.rest_str()?),
            codes::TODO_TOGGLE => Self::TodoToggle(reader.u32()?),
            codes::TODO_REMOVE => Self::TodoRemove(reader.u32()?),
            codes::TODO_TOGGLE_ALL => Self::TodoToggleAll,
            codes::TODO_CLEAR_COMPLETED => Self::TodoClearCompleted,
            codes::TODO_SET_FILTER => {
                let value = reader.u32()?;
                Self::SetFilter(Filter::from_raw(value).ok_or(DecodeError::InvalidValue {
                    what: "filter",
                    value,
                })?)
            }
            unknown => return Err(DecodeError::UnknownEvent(unknown)),
        };
        Ok(event)
    }

    /// Type code of the event.
    #[must_use]
    pub const fn type_code(&self) -> u32 {
        match self {
            Self::Init => codes::APP_INIT,
            Self::Terminate => codes::APP_TERMINATE,
            Self::Foreground => codes::APP_FOREGROUND,
            Self::Background => codes::APP_BACKGROUND,
            Self::LowMemory => codes::APP_LOW_MEMORY,
            Self::ButtonPress { .. } => codes::BUTTON_PRESS,
            Self::TextInput { .. } => codes::TEXT_INPUT,
            Self::TextCommit { .. } => codes::TEXT_COMMIT,
            Self::Selection { .. } => codes::SELECTION,
            Self::Scroll { .. } => codes::SCROLL,
            Self::Gesture { .. } => codes::GESTURE,
            Self::Navigate { .. } => codes::NAVIGATE,
            Self::Back => codes::NAVIGATE_BACK,
            Self::TabSwitch { .. } => codes::TAB_SWITCH,
            Self::Increment => codes::COUNTER_INCREMENT,
            Self::Decrement => codes::COUNTER_DECREMENT,
            Self::Reset => codes::COUNTER_RESET,
            Self::TodoAdd(_) => codes::TODO_ADD,
            Self::TodoToggle(_) => codes::TODO_TOGGLE,
            Self::TodoRemove(_) => codes::TODO_REMOVE,
            Self::TodoToggleAll => codes::TODO_TOGGLE_ALL,
            Self::TodoClearCompleted => codes::TODO_CLEAR_COMPLETED,
            Self::SetFilter(_) => codes::TODO_SET_FILTER,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Terminate => "terminate",
            Self::Foreground => "foreground",
            Self::Background => "background",
            Self::LowMemory => "low_memory",
            Self::ButtonPress { .. } => "button_press",
            Self::TextInput { .. } => "text_input",
            Self::TextCommit { .. } => "text_commit",
            Self::Selection { .. } => "selection",
            Self::Scroll { .. } => "scroll",
            Self::Gesture { .. } => "gesture",
            Self::Navigate { .. } => "navigate",
            Self::Back => "back",
            Self::TabSwitch { .. } => "tab_switch",
            Self::Increment => "counter_increment",
            Self::Decrement => "counter_decrement",
            Self::Reset => "counter_reset",
            Self::TodoAdd(_) => "todo_add",
            Self::TodoToggle(_) => "todo_toggle",
            Self::TodoRemove(_) => "todo_remove",
            Self::TodoToggleAll => "todo_toggle_all",
            Self::TodoClearCompleted => "todo_clear_completed",
            Self::SetFilter(_) => "todo_set_filter",
        }
    }

    /// Appends the payload bytes of the event to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Init
            | Self::Terminate
            | Self::Foreground
            | Self::Background
            | Self::LowMemory
            | Self::Back
            | Self::Increment
            | Self::Decrement
            | Self::Reset
            | Self::TodoToggleAll
            | Self::TodoClearCompleted => {}
            Self::ButtonPress { id: value }
            | Self::TextCommit { field: value }
            | Self::Gesture { kind: value }
            | Self::Navigate { screen: value }
            | Self::TabSwitch { tab: value }
            | Self::TodoToggle(value)
            | Self::TodoRemove(value) => out.extend_from_slice(&value.to_le_bytes()),
            Self::TextInput { field, text } => {
                out.extend_from_slice(&field.to_le_bytes());
                out.extend_from_slice(text.as_bytes());
            }
            Self::Selection { field, index } => {
                out.extend_from_slice(&field.to_le_bytes());
                out.extend_from_slice(&index.to_le_bytes());
            }
            Self::Scroll { dx, dy } => {
                out.extend_from_slice(&dx.to_le_bytes());
                out.extend_from_slice(&dy.to_le_bytes());
            }
            Self::TodoAdd(text) => out.extend_from_slice(text.as_bytes()),
            Self::SetFilter(filter) => out.extend_from_slice(&filter.raw().to_le_bytes()),
        }
    }

    /// Payload bytes of the event.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }
}

struct Reader<'a> {
    event: u32,
    bytes: &'a [u8],
}

impl Reader<'_> {
    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        match self.bytes.split_first_chunk::<N>() {
            Some((head, rest)) => {
                self.bytes = rest;
                Ok(*head)
            }
            None => Err(DecodeError::Truncated {
                event: self.event,
                expected: N,
                actual: self.bytes.len(),
            }),
        }
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        self.array().map(u32::from_le_bytes)
    }

    fn i32(&mut self) -> Result<i32, DecodeError> {
        self.array().map(i32::from_le_bytes)
    }

    fn rest_str(&mut self) -> Result<String, DecodeError> {
        let text = core::str::from_utf8(self.bytes).map_err(|_| DecodeError::InvalidUtf8)?;
        self.bytes = &[];
        Ok(String::from(text))
    }
}
