//! # Zylix FFI
//!
//! The C ABI the platform shells link against. Every function is expected to
//! be called from the host's UI thread; the core instance lives in a thread
//! local, so independent threads (and tests) get independent instances.
//!
//! The surface is small:
//! - lifecycle: `zylix_init`, `zylix_init_with_config`, `zylix_deinit`
//! - input: `zylix_dispatch` and the prioritised queue in [`queue`]
//! - output: state snapshots in [`state`], patch records in [`patch`], node
//!   inspection in [`node`]
//! - diagnostics: `zylix_get_last_error`, `zylix_get_abi_version`
//!
//! Functions returning `i32` use the status codes of
//! [`zylix_core::Status`]. Pointers handed to the host stay valid until the
//! next call that dispatches an event.

#[macro_use]
mod macros;
pub mod error;
mod host;
pub mod node;
pub mod patch;
pub mod queue;
pub mod state;

use core::ffi::{c_char, c_void};
use core::ptr;

use zylix_core::{Event, RuntimeConfig};

use crate::{
    error::FfiError,
    host::{install, last_error_ptr, report, uninstall, with_host},
    state::ZylixConfig,
};

/// Version of the C ABI described by `zylix.h`.
pub const ZYLIX_ABI_VERSION: u32 = 2;

#[cfg(not(target_arch = "wasm32"))]
fn install_panic_hook() {
    use std::sync::Once;

    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .without_time()
            .with_target(false)
            .try_init();

        // Route panics through tracing
        std::panic::set_hook(Box::new(tracing_panic::panic_hook));
    });
}

#[cfg(target_arch = "wasm32")]
fn install_panic_hook() {}

/// Converts a Rust value into its C representation.
///
/// ```ignore
/// impl IntoFFI for Props {
///     type FFI = ZylixProps;
///     fn into_ffi(self) -> Self::FFI { /* ... */ }
/// }
/// ```
pub trait IntoFFI: 'static {
    /// The C representation.
    type FFI: 'static;

    /// Performs the conversion.
    fn into_ffi(self) -> Self::FFI;
}

/// Converts a C value received from the host back into a Rust value.
///
/// # Safety
///
/// Implementations may read through pointers contained in the value.
pub trait IntoRust {
    /// The Rust representation.
    type Rust;

    /// Performs the conversion.
    ///
    /// # Safety
    ///
    /// The caller must ensure every pointer in the value is valid for reads.
    unsafe fn into_rust(self) -> Self::Rust;
}

ffi_safe!(u8, u16, u32, u64, i32, i64, bool, usize);

/// Borrows a host payload buffer.
///
/// # Safety
///
/// `data` must point to `len` readable bytes or be null with `len == 0`.
pub(crate) unsafe fn payload<'a>(data: *const c_void, len: usize) -> Result<&'a [u8], FfiError> {
    if len == 0 {
        return Ok(&[]);
    }
    if data.is_null() {
        return Err(FfiError::InvalidArg("payload is null"));
    }
    Ok(unsafe { core::slice::from_raw_parts(data.cast::<u8>(), len) })
}

/// Initializes the core on the calling thread with the default
/// configuration.
///
/// Returns `InvalidState` if the thread already has an instance.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_init() -> i32 {
    init(RuntimeConfig::default())
}

/// Initializes the core with `config`; null selects the defaults.
///
/// # Safety
///
/// `config` must be null or point to a readable `ZylixConfig`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn zylix_init_with_config(config: *const ZylixConfig) -> i32 {
    let config = if config.is_null() {
        RuntimeConfig::default()
    } else {
        unsafe { config.read().into_rust() }
    };
    init(config)
}

fn init(config: RuntimeConfig) -> i32 {
    install_panic_hook();
    let capacity = config.arena_capacity;
    let status = report(install(config));
    if status == 0 {
        tracing::info!(
            abi = ZYLIX_ABI_VERSION,
            arena_capacity = capacity,
            "zylix initialized"
        );
    }
    status
}

/// Releases the instance of the calling thread.
///
/// Returns `NotInitialized` when there is none.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_deinit() -> i32 {
    let status = report(uninstall());
    if status == 0 {
        tracing::info!("zylix shut down");
    }
    status
}

/// ABI version, callable before `zylix_init`.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_get_abi_version() -> u32 {
    ZYLIX_ABI_VERSION
}

/// Decodes one event and runs a full render cycle.
///
/// On failure nothing changes: the state, the committed tree and the patch
/// list of the previous cycle stay as they were.
///
/// # Safety
///
/// `payload` must point to `payload_len` readable bytes, or be null when
/// `payload_len` is zero.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn zylix_dispatch(
    event_type: u32,
    payload: *const c_void,
    payload_len: usize,
) -> i32 {
    let result = (|| -> Result<(), FfiError> {
        let bytes = unsafe { crate::payload(payload, payload_len) }?;
        let event = Event::decode(event_type, bytes).inspect_err(|err| {
            tracing::warn!(%err, event_type, "rejected event payload");
        })?;
        with_host(|host| host.dispatch(event).map(drop).map_err(FfiError::from))?
    })();
    report(result)
}

/// Changes the byte budget of the frame arenas for future cycles.
///
/// A budget too small for the next tree makes dispatching calls fail with
/// `OutOfMemory` while the last committed cycle stays readable.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_set_arena_capacity(bytes: usize) -> i32 {
    report(with_host(|host| host.runtime.set_arena_capacity(bytes)))
}

/// Message describing the last failed call, `"no error"` after a successful
/// one. Never null; valid until the next call on this thread.
#[unsafe(no_mangle)]
pub extern "C" fn zylix_get_last_error() -> *const c_char {
    last_error_ptr()
}

/// Copies `src_len` bytes of `src` into `dst` as a NUL-terminated string,
/// truncating to `dst_len - 1` bytes. Returns the bytes copied.
///
/// # Safety
///
/// `src` must point to `src_len` readable bytes and `dst` to `dst_len`
/// writable bytes; either may be null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn zylix_copy_string(
    src: *const c_char,
    src_len: usize,
    dst: *mut c_char,
    dst_len: usize,
) -> usize {
    if src.is_null() || dst.is_null() || dst_len == 0 {
        return 0;
    }
    let len = src_len.min(dst_len - 1);
    unsafe {
        ptr::copy_nonoverlapping(src, dst, len);
        dst.add(len).write(0);
    }
    len
}
