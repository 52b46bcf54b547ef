//! Error types and the status codes they map to at the boundary.

use thiserror::Error;

/// Status codes returned across the C boundary.
///
/// The numeric values are part of the ABI and must never be reordered.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The call succeeded.
    Ok = 0,
    /// An argument or event payload was malformed.
    InvalidArg = 1,
    /// The frame arena ran out of capacity.
    OutOfMemory = 2,
    /// The call is not valid in the current state.
    InvalidState = 3,
    /// The core has not been initialized.
    NotInitialized = 4,
}

impl Status {
    /// Returns the raw status code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Failures reported by the frame [`Arena`](crate::Arena).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// The allocation does not fit in the remaining capacity.
    #[error("arena exhausted: requested {requested} bytes with {remaining} remaining")]
    Exhausted {
        /// Bytes the allocation needed.
        requested: usize,
        /// Bytes left before the allocation.
        remaining: usize,
    },
    /// The handle was issued before the arena was last reset.
    #[error("stale node handle: generation {handle} is not the live generation {live}")]
    Stale {
        /// Generation recorded in the handle.
        handle: u32,
        /// Generation the arena is currently on.
        live: u32,
    },
    /// The handle does not point at an allocated node.
    #[error("node index {index} out of bounds ({len} nodes allocated)")]
    OutOfBounds {
        /// Index recorded in the handle.
        index: u32,
        /// Number of nodes currently allocated.
        len: usize,
    },
}

/// Failures while a view builds its tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The arena refused an allocation.
    #[error(transparent)]
    Arena(#[from] ArenaError),
    /// An element was configured or closed with no element open.
    #[error("no open element to modify or close")]
    Unbalanced,
    /// The view returned with elements still open.
    #[error("{open} elements were left open")]
    Unclosed {
        /// Number of frames still open.
        open: usize,
    },
    /// The view produced nothing.
    #[error("view produced no root node")]
    NoRoot,
    /// The view produced more than one top-level node.
    #[error("view produced {count} root nodes")]
    MultipleRoots {
        /// Number of top-level nodes.
        count: usize,
    },
}

impl TreeError {
    /// Returns `true` when the failure was caused by arena exhaustion.
    #[must_use]
    pub const fn is_exhaustion(&self) -> bool {
        matches!(self, Self::Arena(ArenaError::Exhausted { .. }))
    }
}

/// Failures decoding an event from its wire representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The event type tag is not part of the event set.
    #[error("unknown event type {0:#06x}")]
    UnknownEvent(u32),
    /// The payload is shorter than the event requires.
    #[error("payload for event {event:#06x} is {actual} bytes, expected at least {expected}")]
    Truncated {
        /// Event type being decoded.
        event: u32,
        /// Minimum payload length.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },
    /// A text payload is not UTF-8.
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
    /// An enumerated payload field holds an unknown value.
    #[error("invalid {what} value {value}")]
    InvalidValue {
        /// Name of the field.
        what: &'static str,
        /// Value received.
        value: u32,
    },
    /// The payload exceeds the size limit of the channel carrying it.
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    TooLarge {
        /// Payload length.
        len: usize,
        /// Limit in bytes.
        max: usize,
    },
}

/// Failures applying a patch list to a [`MirrorTree`](crate::MirrorTree).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// A patch targets a node while the mirror holds no tree.
    #[error("mirror has no root")]
    Empty,
    /// A path step points past the end of a child list.
    #[error("path step {depth} selects child {index} of {len}")]
    PathNotFound {
        /// Zero-based position of the step in the path.
        depth: usize,
        /// Child index requested.
        index: u32,
        /// Number of children present.
        len: usize,
    },
    /// A structural patch names a position the child list does not have.
    #[error("child index {index} out of range for {len} children")]
    IndexOutOfRange {
        /// Index requested.
        index: u32,
        /// Number of children present.
        len: usize,
    },
    /// A node payload no longer resolves.
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

/// Top-level error returned by [`Runtime`](crate::Runtime) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The event payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The render cycle was aborted while building the tree.
    #[error("render cycle aborted: {0}")]
    Render(#[from] TreeError),
    /// The operation is not valid right now.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

impl CoreError {
    /// Maps the error onto its boundary status code.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Decode(_) => Status::InvalidArg,
            Self::Render(err) if err.is_exhaustion() => Status::OutOfMemory,
            Self::Render(_) | Self::InvalidState(_) => Status::InvalidState,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_the_header() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::InvalidArg.code(), 1);
        assert_eq!(Status::OutOfMemory.code(), 2);
        assert_eq!(Status::InvalidState.code(), 3);
        assert_eq!(Status::NotInitialized.code(), 4);
    }

    #[test]
    fn exhaustion_maps_to_out_of_memory() {
        let err = CoreError::Render(TreeError::Arena(ArenaError::Exhausted {
            requested: 64,
            remaining: 1,
        }));
        assert_eq!(err.status(), Status::OutOfMemory);

        let err = CoreError::Render(TreeError::NoRoot);
        assert_eq!(err.status(), Status::InvalidState);

        let err = CoreError::Decode(DecodeError::InvalidUtf8);
        assert_eq!(err.status(), Status::InvalidArg);
    }
}
