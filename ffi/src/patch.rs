//! `#[repr(C)]` patch records.
//!
//! Each record borrows its path and text from the runtime's [`PatchList`],
//! and node handles resolve against the committed arena, so the array
//! returned by `zylix_get_patches` must be consumed before the next
//! dispatching call.

use core::ptr;

use zylix_core::{Patch, PatchEntry, PatchKind, PatchList, Props};

use crate::{IntoFFI, host::with_host};

into_ffi! {
    PatchKind,
    /// Discriminant of a [`ZylixPatch`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ZylixPatchKind {
        /// Replace the node at `path` with `node`.
        Replace,
        /// Overwrite the props of the node at `path`.
        UpdateProps,
        /// Overwrite the text of the node at `path`.
        UpdateText,
        /// Insert `node` as child `index`.
        InsertChild,
        /// Remove child `index`.
        RemoveChild,
        /// Move child `from` to `to`.
        MoveChild,
    }
}

/// Flattened [`Props`].
///
/// Colors are packed as `0xRRGGBBAA` and only meaningful when the matching
/// `has_*` flag is set.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZylixProps {
    /// Background color.
    pub background: u32,
    /// Foreground color.
    pub foreground: u32,
    /// Whether `background` is set.
    pub has_background: bool,
    /// Whether `foreground` is set.
    pub has_foreground: bool,
    /// Padding in points.
    pub padding: u16,
    /// Spacing in points.
    pub spacing: u16,
    /// Font size in points, `0` for the default.
    pub font_size: u16,
    /// Raw font weight.
    pub font_weight: u8,
    /// Raw direction.
    pub direction: u8,
    /// Raw alignment.
    pub alignment: u8,
    /// Prop flag bits.
    pub flags: u32,
}

impl IntoFFI for Props {
    type FFI = ZylixProps;

    fn into_ffi(self) -> Self::FFI {
        ZylixProps {
            background: self.background.map_or(0, |color| color.to_rgba_u32()),
            foreground: self.foreground.map_or(0, |color| color.to_rgba_u32()),
            has_background: self.background.is_some(),
            has_foreground: self.foreground.is_some(),
            padding: self.padding,
            spacing: self.spacing,
            font_size: self.font_size,
            font_weight: self.font_weight as u8,
            direction: self.direction as u8,
            alignment: self.alignment as u8,
            flags: self.flags.bits(),
        }
    }
}

/// One patch. Fields not used by `kind` are zero.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ZylixPatch {
    /// What to do.
    pub kind: ZylixPatchKind,
    /// Child indices from the root to the target node.
    pub path: *const u32,
    /// Number of entries in `path`.
    pub path_len: usize,
    /// Node handle for `Replace` and `InsertChild`.
    pub node: u64,
    /// Child position for `InsertChild` and `RemoveChild`.
    pub index: u32,
    /// Source position for `MoveChild`.
    pub from: u32,
    /// Destination position for `MoveChild`.
    pub to: u32,
    /// UTF-8 text for `UpdateText`, not NUL-terminated.
    pub text: *const u8,
    /// Length of `text` in bytes.
    pub text_len: usize,
    /// Props for `UpdateProps`.
    pub props: ZylixProps,
}

impl From<PatchEntry<'_>> for ZylixPatch {
    fn from(entry: PatchEntry<'_>) -> Self {
        let mut patch = Self {
            kind: entry.patch.kind().into_ffi(),
            path: if entry.path.is_empty() {
                ptr::null()
            } else {
                entry.path.as_ptr()
            },
            path_len: entry.path.len(),
            node: 0,
            index: 0,
            from: 0,
            to: 0,
            text: ptr::null(),
            text_len: 0,
            props: ZylixProps::default(),
        };
        match entry.patch {
            Patch::Replace(node) => patch.node = node.to_raw(),
            Patch::UpdateProps(props) => patch.props = props.into_ffi(),
            Patch::UpdateText(text) => {
                patch.text = text.as_ptr();
                patch.text_len = text.len();
            }
            Patch::InsertChild { index, node } => {
                patch.index = index;
                patch.node = node.to_raw();
            }
            Patch::RemoveChild { index } => patch.index = index,
            Patch::MoveChild { from, to } => {
                patch.from = from;
                patch.to = to;
            }
        }
        patch
    }
}

/// Records handed out by `zylix_get_patches`.
#[derive(Debug, Default)]
pub struct PatchBuffer {
    records: Vec<ZylixPatch>,
}

impl PatchBuffer {
    /// Rebuilds the records from `patches`.
    pub fn update(&mut self, patches: &PatchList) {
        self.records.clear();
        self.records.extend(patches.iter().map(ZylixPatch::from));
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Pointer to the first record, null when there are none.
    pub fn as_ptr(&self) -> *const ZylixPatch {
        if self.records.is_empty() {
            ptr::null()
        } else {
            self.records.as_ptr()
        }
    }
}

/// Returns the patches of the last cycle and writes their number to
/// `out_count`.
///
/// Returns null (with a count of zero) when the last cycle changed nothing
/// or before `zylix_init`.
///
/// # Safety
///
/// `out_count` must be null or point to writable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn zylix_get_patches(out_count: *mut usize) -> *const ZylixPatch {
    let (records, count) =
        with_host(|host| (host.patches.as_ptr(), host.patches.len())).unwrap_or((ptr::null(), 0));
    if !out_count.is_null() {
        unsafe { out_count.write(count) };
    }
    records
}
