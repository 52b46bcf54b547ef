//! Prioritised event queue.
//!
//! The core processes events strictly one cycle at a time and has no queue
//! of its own. Shells that receive input faster than they want to render
//! park events here and drain them with `zylix_process_events`, which
//! reduces them in priority order and renders once.

use core::ffi::c_void;
use std::collections::VecDeque;

use thiserror::Error;
use zylix_core::{DecodeError, Event};

use crate::{
    error::FfiError,
    host::{clear_last_error, report, set_last_error, with_host},
};

/// Largest payload accepted by the queue, in bytes.
pub const MAX_PAYLOAD: usize = 256;

/// Maximum number of queued events.
pub const CAPACITY: usize = 64;

/// Urgency of a queued event.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    /// Drained last.
    Low = 0,
    /// Default priority.
    Normal = 1,
    /// Drained first.
    High = 2,
    /// Not queued: dispatched as soon as it arrives.
    Immediate = 3,
}

impl Priority {
    /// Decodes a raw priority.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Low),
            1 => Some(Self::Normal),
            2 => Some(Self::High),
            3 => Some(Self::Immediate),
            _ => None,
        }
    }

    const fn lane(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Normal => 1,
            Self::High | Self::Immediate => 2,
        }
    }
}

/// Failures queueing an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue already holds [`CAPACITY`] events.
    #[error("event queue is full ({capacity} events)")]
    Full {
        /// Queue capacity.
        capacity: usize,
    },
}

/// Decoded events waiting to be processed, one FIFO lane per priority.
#[derive(Debug, Default)]
pub struct EventQueue {
    lanes: [VecDeque<Event>; 3],
}

impl EventQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }

    /// Returns `true` when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(VecDeque::is_empty)
    }

    /// Appends `event` to the lane of `priority`.
    ///
    /// # Errors
    ///
    /// Fails when the queue is full.
    pub fn push(&mut self, priority: Priority, event: Event) -> Result<(), QueueError> {
        if self.len() >= CAPACITY {
            return Err(QueueError::Full { capacity: CAPACITY });
        }
        self.lanes[priority.lane()].push_back(event);
        Ok(())
    }

    /// Removes the oldest event of the most urgent non-empty lane.
    pub fn pop(&mut self) -> Option<Event> {
        self.lanes.iter_mut().rev().find_map(VecDeque::pop_front)
    }

    /// Removes up to `max` events in processing order.
    pub fn drain(&mut self, max: usize) -> Vec<Event> {
        core::iter::from_fn(|| self.pop()).take(max).collect()
    }

    /// Drops every queued event.
    pub fn clear(&mut self) {
        self.lanes.iter_mut().for_each(VecDeque::clear);
    }
}

/// Queues an event, or dispatches it right away when `priority` is
/// immediate.
///
/// The payload is decoded before it is queued; malformed payloads are
/// rejected with `InvalidArg` and never reach the queue. A full queue
/// reports `OutOfMemory`.
///
/// # Safety
///
/// `payload` must point to `payload_len` readable bytes, or be null when
/// `payload_len` is zero.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn zylix_queue_event(
    event_type: u32,
    payload: *const c_void,
    payload_len: usize,
    priority: u8,
) -> i32 {
    let result = (|| -> Result<(), FfiError> {
        let priority =
            Priority::from_raw(priority).ok_or(FfiError::InvalidArg("unknown priority"))?;
        if payload_len > MAX_PAYLOAD {
            return Err(DecodeError::TooLarge {
                len: payload_len,
                max: MAX_PAYLOAD,
            }
            .into());
        }
        let bytes = unsafe { crate::payload(payload, payload_len) }?;
        let event = Event::decode(event_type, bytes)?;
        with_host(|host| {
            if priority == Priority::Immediate {
                host.dispatch(event).map(drop).map_err(FfiError::from)
            } else {
                host.queue.push(priority, event).map_err(FfiError::from)
            }
        })?
    })();
    report(result)
}

/// Drains up to `max_events` queued events (all of them when zero),
/// reduces them in priority order and renders the result once.
///
/// Returns the number of events processed. On failure the drained events
/// are discarded, zero is returned and the last error is set.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_process_events(max_events: u32) -> u32 {
    let max = if max_events == 0 {
        usize::MAX
    } else {
        max_events as usize
    };
    let result = with_host(|host| {
        let events = host.queue.drain(max);
        if events.is_empty() {
            return Ok(0);
        }
        tracing::debug!(
            count = events.len(),
            remaining = host.queue.len(),
            "draining event queue"
        );
        host.dispatch_batch(&events).map(|_| events.len())
    });
    match result {
        Ok(Ok(count)) => {
            clear_last_error();
            u32::try_from(count).unwrap_or(u32::MAX)
        }
        Ok(Err(err)) => {
            set_last_error(&err);
            0
        }
        Err(err) => {
            set_last_error(&err);
            0
        }
    }
}

/// Number of queued events, zero when not initialized.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_queue_depth() -> u32 {
    with_host(|host| u32::try_from(host.queue.len()).unwrap_or(u32::MAX)).unwrap_or(0)
}

/// Drops every queued event.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_queue_clear() {
    // Nothing to clear before init.
    let _ = with_host(|host| host.queue.clear());
}
