/// Declares types whose FFI representation is the type itself.
///
/// # Example
///
/// ```ignore
/// ffi_safe!(u32, i32, bool);
/// ```
macro_rules! ffi_safe {
    ($($ty:ty),*) => {
       $(
            impl $crate::IntoFFI for $ty {
                type FFI = $ty;
                fn into_ffi(self) -> Self::FFI {
                    self
                }
            }

            impl $crate::IntoRust for $ty {
                type Rust = $ty;
                unsafe fn into_rust(self) -> Self::Rust {
                    self
                }
            }
       )*
    };
}

/// Declares a `#[repr(C)]` mirror of a Rust struct or fieldless enum and
/// derives `IntoFFI` for the Rust type.
///
/// Struct fields are converted one by one through `IntoFFI`; enum variants
/// are matched by name, and the `IntoRust` direction is derived as well.
///
/// # Example
///
/// ```ignore
/// into_ffi! {
///     StateDiff,
///     pub struct ZylixDiff {
///         changed_mask: u64,
///     }
/// }
/// ```
macro_rules! into_ffi {
    ($ty:ty, $(#[$meta:meta])* pub struct $ffi:ident { $($(#[$fmeta:meta])* $field:ident : $ftype:ty),* $(,)? }) => {
        $(#[$meta])*
        #[repr(C)]
        pub struct $ffi {
            $($(#[$fmeta])* pub $field: $ftype),*
        }

        impl $crate::IntoFFI for $ty {
            type FFI = $ffi;
            fn into_ffi(self) -> Self::FFI {
                let value = self;
                $ffi {
                    $($field: $crate::IntoFFI::into_ffi(value.$field)),*
                }
            }
        }
    };

    ($ty:ty, $(#[$meta:meta])* pub enum $ffi:ident { $($(#[$vmeta:meta])* $variant:ident),* $(,)? }) => {
        $(#[$meta])*
        #[repr(C)]
        pub enum $ffi {
            $($(#[$vmeta])* $variant),*
        }

        impl $crate::IntoFFI for $ty {
            type FFI = $ffi;
            fn into_ffi(self) -> Self::FFI {
                match self {
                    $(<$ty>::$variant => $ffi::$variant),*
                }
            }
        }

        impl $crate::IntoRust for $ffi {
            type Rust = $ty;
            unsafe fn into_rust(self) -> Self::Rust {
                match self {
                    $($ffi::$variant => <$ty>::$variant),*
                }
            }
        }
    };
}
