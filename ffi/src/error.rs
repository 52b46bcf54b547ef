//! Errors raised at the boundary and their status codes.

use thiserror::Error;
use zylix_core::{ArenaError, CoreError, DecodeError, Status};

use crate::queue::QueueError;

/// Everything a boundary call can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FfiError {
    /// The core rejected the call.
    #[error(transparent)]
    Core(#[from] CoreError),
    /// An event payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The event queue refused an event.
    #[error(transparent)]
    Queue(#[from] QueueError),
    /// A node handle did not resolve against the committed tree.
    #[error(transparent)]
    Node(#[from] ArenaError),
    /// A pointer or scalar argument was invalid.
    #[error("invalid argument: {0}")]
    InvalidArg(&'static str),
    /// `zylix_init` has not been called on this thread.
    #[error("zylix is not initialized")]
    NotInitialized,
    /// `zylix_init` was called twice.
    #[error("zylix is already initialized")]
    AlreadyInitialized,
    /// A call arrived while another one was still running.
    #[error("re-entrant call into zylix")]
    Reentrant,
}

impl FfiError {
    /// Status code reported to the host.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Core(err) => err.status(),
            Self::Decode(_) | Self::Node(_) | Self::InvalidArg(_) => Status::InvalidArg,
            Self::Queue(_) => Status::OutOfMemory,
            Self::NotInitialized => Status::NotInitialized,
            Self::AlreadyInitialized | Self::Reentrant => Status::InvalidState,
        }
    }
}
