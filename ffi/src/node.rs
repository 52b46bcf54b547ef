//! Node inspection.
//!
//! Patches reference nodes by handle (`generation << 32 | index`). These
//! functions resolve a handle against the committed arena so the shell can
//! build the native subtree for `Replace` and `InsertChild`. A handle from an
//! earlier cycle no longer resolves: the lookup fails and the last error
//! names the stale generation.

use core::ptr;

use zylix_core::{NodeId, NodeRef};

use crate::{
    IntoFFI,
    error::FfiError,
    host::{clear_last_error, report, set_last_error, with_host},
    patch::ZylixProps,
};

/// Resolves `handle` and runs `f` on the node.
fn inspect<R>(handle: u64, f: impl FnOnce(NodeRef<'_>) -> R) -> Result<R, FfiError> {
    with_host(|host| {
        host.runtime
            .arena()
            .get(NodeId::from_raw(handle))
            .map(f)
            .map_err(FfiError::from)
    })?
}

/// Unwraps `result`, recording the outcome in the last error.
fn or_report<R>(result: Result<R, FfiError>, fallback: R) -> R {
    match result {
        Ok(value) => {
            clear_last_error();
            value
        }
        Err(err) => {
            set_last_error(&err);
            fallback
        }
    }
}

fn raw_parts(text: &str) -> (*const u8, usize) {
    (text.as_ptr(), text.len())
}

/// Writes the length of a string to `out_len` and returns its address.
unsafe fn string_out(parts: Option<(*const u8, usize)>, out_len: *mut usize) -> *const u8 {
    let (ptr, len) = parts.unwrap_or((ptr::null(), 0));
    if !out_len.is_null() {
        unsafe { out_len.write(len) };
    }
    ptr
}

/// Handle of the committed root, `0` before `zylix_init`.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_get_root() -> u64 {
    with_host(|host| host.runtime.root().to_raw()).unwrap_or(0)
}

/// Raw tag of the node, `-1` when the handle does not resolve.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_node_tag(handle: u64) -> i32 {
    or_report(inspect(handle, |node| i32::from(node.tag().raw())), -1)
}

/// Key of the node as UTF-8 (not NUL-terminated), or null when it has none
/// or the handle does not resolve.
///
/// # Safety
///
/// `out_len` must be null or point to writable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn zylix_node_key(handle: u64, out_len: *mut usize) -> *const u8 {
    let key = or_report(inspect(handle, |node| node.key().map(raw_parts)), None);
    unsafe { string_out(key, out_len) }
}

/// Text of the node as UTF-8 (not NUL-terminated), or null when it has none
/// or the handle does not resolve.
///
/// # Safety
///
/// `out_len` must be null or point to writable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn zylix_node_text(handle: u64, out_len: *mut usize) -> *const u8 {
    let text = or_report(inspect(handle, |node| node.text().map(raw_parts)), None);
    unsafe { string_out(text, out_len) }
}

/// Copies the props of the node into `out`.
///
/// # Safety
///
/// `out` must be null or point to a writable `ZylixProps`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn zylix_node_props(handle: u64, out: *mut ZylixProps) -> i32 {
    let result = (|| -> Result<(), FfiError> {
        if out.is_null() {
            return Err(FfiError::InvalidArg("props output is null"));
        }
        let props = inspect(handle, |node| (*node.props()).into_ffi())?;
        unsafe { out.write(props) };
        Ok(())
    })();
    report(result)
}

/// Number of children, `-1` when the handle does not resolve.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_node_child_count(handle: u64) -> i32 {
    or_report(
        inspect(handle, |node| i32::try_from(node.child_count()).unwrap_or(i32::MAX)),
        -1,
    )
}

/// Handle of child `index`, `0` when out of range or the handle does not
/// resolve.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_node_child(handle: u64, index: u32) -> u64 {
    let child = inspect(handle, |node| {
        node.child_ids()
            .get(index as usize)
            .map(|child| child.to_raw())
            .ok_or(FfiError::InvalidArg("child index out of range"))
    });
    or_report(child.and_then(|child| child), 0)
}
