//! # Zylix Core
//!
//! The platform-agnostic heart of a Zylix application. Platform shells
//! (SwiftUI, Compose, GTK4, WinUI, the web, embedded LCD drivers) push
//! [`Event`]s in and pull [`Patch`]es out; everything in between lives here:
//!
//! - [`arena`]: bump storage for per-frame virtual nodes with generation-checked handles
//! - [`vnode`] and [`builder`]: the immutable virtual tree and the way views construct it
//! - [`event`]: the closed event set and its byte-level wire format
//! - [`state`]: the versioned single-writer state store and its reducer
//! - [`diff`]: keyed/positional reconciliation producing an ordered patch list
//! - [`runtime`]: the render loop tying the pieces together
//! - [`mirror`]: a reference patch applier used to verify patch streams
//!
//! The crate is `no_std` and single-threaded by construction: every call is
//! expected to originate from the host UI thread.

#![no_std]
extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod arena;
pub mod builder;
pub mod diff;
pub mod error;
pub mod event;
pub mod mirror;
pub mod patch;
pub mod runtime;
pub mod state;
pub mod view;
pub mod vnode;

#[cfg(test)]
mod tests;

pub use arena::{Arena, NodeId};
pub use builder::TreeBuilder;
pub use diff::{Differ, diff};
pub use error::{ApplyError, ArenaError, CoreError, DecodeError, Status, TreeError};
pub use event::Event;
pub use mirror::{MirrorNode, MirrorTree};
pub use patch::{Patch, PatchEntry, PatchKind, PatchList};
pub use runtime::{Outcome, Phase, Runtime, RuntimeBuilder, RuntimeConfig};
pub use state::{AppState, Field, Filter, Limits, State, StateDiff, Store, Todo};
pub use view::{DefaultView, ViewBuilder};
pub use vnode::{Alignment, Color, Direction, FontWeight, NodeRef, PropFlags, Props, Tag, VNode};
