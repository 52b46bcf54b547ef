//! The per-thread core instance behind the C functions.
//!
//! Every shell drives the core from its UI thread, so the instance lives in
//! a thread local. Snapshots handed to the host (state, patches) are owned
//! by the boxed [`Host`] and stay at a fixed address until the next call
//! that changes them.

use std::{cell::RefCell, ffi::CString, fmt};

use zylix_core::{CoreError, Event, Outcome, Runtime, RuntimeConfig};

use crate::{error::FfiError, patch::PatchBuffer, queue::EventQueue, state::StateSnapshot};

const NO_ERROR: &str = "no error";

thread_local! {
    static HOST: RefCell<Option<Box<Host>>> = const { RefCell::new(None) };
    static LAST_ERROR: RefCell<CString> = RefCell::new(c_string(NO_ERROR));
}

/// Core instance plus everything exposed to the shell.
#[derive(Debug)]
pub(crate) struct Host {
    pub(crate) runtime: Runtime,
    pub(crate) queue: EventQueue,
    pub(crate) state: StateSnapshot,
    pub(crate) patches: PatchBuffer,
}

impl Host {
    pub(crate) fn new(config: RuntimeConfig) -> Result<Box<Self>, CoreError> {
        let runtime = Runtime::builder().config(config).build()?;
        let mut host = Box::new(Self {
            runtime,
            queue: EventQueue::new(),
            state: StateSnapshot::default(),
            patches: PatchBuffer::default(),
        });
        host.refresh();
        Ok(host)
    }

    pub(crate) fn dispatch(&mut self, event: Event) -> Result<Outcome, CoreError> {
        let outcome = self.runtime.dispatch(event)?;
        self.refresh();
        Ok(outcome)
    }

    pub(crate) fn dispatch_batch(&mut self, events: &[Event]) -> Result<Outcome, CoreError> {
        let outcome = self.runtime.dispatch_batch(events)?;
        self.refresh();
        Ok(outcome)
    }

    fn refresh(&mut self) {
        self.state
            .update(self.runtime.state(), self.runtime.state_diff());
        self.patches.update(self.runtime.patches());
    }
}

/// Installs a new instance on this thread.
pub(crate) fn install(config: RuntimeConfig) -> Result<(), FfiError> {
    HOST.with(|cell| {
        let mut slot = cell.try_borrow_mut().map_err(|_| FfiError::Reentrant)?;
        if slot.is_some() {
            return Err(FfiError::AlreadyInitialized);
        }
        *slot = Some(Host::new(config)?);
        Ok(())
    })
}

/// Drops the instance of this thread.
pub(crate) fn uninstall() -> Result<(), FfiError> {
    HOST.with(|cell| {
        let mut slot = cell.try_borrow_mut().map_err(|_| FfiError::Reentrant)?;
        slot.take().map(drop).ok_or(FfiError::NotInitialized)
    })
}

/// Runs `f` against the instance of this thread.
pub(crate) fn with_host<R>(f: impl FnOnce(&mut Host) -> R) -> Result<R, FfiError> {
    HOST.with(|cell| {
        let mut slot = cell.try_borrow_mut().map_err(|_| FfiError::Reentrant)?;
        slot.as_deref_mut().map(f).ok_or(FfiError::NotInitialized)
    })
}

/// Records the outcome of a fallible call and returns its status code.
pub(crate) fn report(result: Result<(), FfiError>) -> i32 {
    match result {
        Ok(()) => {
            clear_last_error();
            0
        }
        Err(err) => {
            let status = err.status();
            set_last_error(&err);
            status.code()
        }
    }
}

pub(crate) fn set_last_error(message: &dyn fmt::Display) {
    let message = c_string(&message.to_string());
    tracing::debug!(error = ?message, "boundary call failed");
    LAST_ERROR.with_borrow_mut(|last| *last = message);
}

pub(crate) fn clear_last_error() {
    LAST_ERROR.with_borrow_mut(|last| {
        if last.as_bytes() != NO_ERROR.as_bytes() {
            *last = c_string(NO_ERROR);
        }
    });
}

pub(crate) fn last_error_ptr() -> *const core::ffi::c_char {
    LAST_ERROR.with_borrow(|last| last.as_ptr())
}

fn c_string(text: &str) -> CString {
    let bytes: Vec<u8> = text.bytes().filter(|byte| *byte != 0).collect();
    CString::new(bytes).unwrap_or_default()
}
