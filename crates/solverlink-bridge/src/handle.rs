//! Handle codec - opaque native handles ↔ 64-bit wire values
//!
//! Every native resource crosses the boundary as an `i64` regardless of the
//! native pointer width:
//! - encode: pointer → `usize` → `u64` (zero-extended on 32-bit targets) → `i64`
//!   (bit reinterpretation, so high addresses may appear negative)
//! - decode: the inverse; `0` is the null sentinel and is rejected, and on
//!   32-bit targets a wire value with any of the upper 32 bits set is rejected
//!
//! A decoded `Handle<K>` wraps `NonNull`, so a null can never reach a native
//! function through a handle parameter. Call sites where null is a meaningful
//! "absent" value use [`decode_optional`] and say so.

use crate::error::{BridgeError, BridgeResult};
use std::ffi::c_void;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Wire representation of a handle
pub type Wire = i64;

/// Wire value of the null sentinel
pub const NULL_WIRE: Wire = 0;

/// Resource kinds a handle can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Environment,
    Config,
    Term,
    Type,
    Declaration,
    ModelIterator,
    Objective,
    ObjectiveIterator,
}

impl HandleKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            HandleKind::Environment => "environment",
            HandleKind::Config => "config",
            HandleKind::Term => "term",
            HandleKind::Type => "type",
            HandleKind::Declaration => "declaration",
            HandleKind::ModelIterator => "model iterator",
            HandleKind::Objective => "objective",
            HandleKind::ObjectiveIterator => "objective iterator",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Type-level tag for a handle kind
pub trait Kind: 'static {
    const KIND: HandleKind;
}

macro_rules! handle_kinds {
    ($($(#[$doc:meta])* $name:ident => $kind:ident;)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug)]
            pub enum $name {}

            impl Kind for $name {
                const KIND: HandleKind = HandleKind::$kind;
            }
        )*
    };
}

handle_kinds! {
    /// Solver environment (`msat_env`)
    Env => Environment;
    /// Configuration (`msat_config`)
    Config => Config;
    /// Term (`msat_term`)
    Term => Term;
    /// Type (`msat_type`)
    Type => Type;
    /// Function declaration (`msat_decl`)
    Decl => Declaration;
    /// Model iterator (`msat_model_iterator`)
    ModelIterator => ModelIterator;
    /// Optimization objective (`msat_objective`)
    Objective => Objective;
    /// Objective iterator (`msat_objective_iterator`)
    ObjectiveIterator => ObjectiveIterator;
}

/// Non-null opaque reference to a native resource of kind `K`
///
/// Layout-compatible with a C pointer (and with the `struct { void *repr; }`
/// wrappers of the native headers); `Option<Handle<K>>` is a nullable pointer.
#[repr(transparent)]
pub struct Handle<K: Kind> {
    ptr: NonNull<c_void>,
    _kind: PhantomData<K>,
}

/// A native return value or output slot that may be null
pub type Nullable<K> = Option<Handle<K>>;

impl<K: Kind> Handle<K> {
    /// Wrap a native pointer; `None` if it is null
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self {
            ptr,
            _kind: PhantomData,
        })
    }

    /// The native pointer
    pub fn as_ptr(self) -> *mut c_void {
        self.ptr.as_ptr()
    }

    /// Pointer value as an address (for bookkeeping, never dereferenced)
    pub fn addr(self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub fn kind(self) -> HandleKind {
        K::KIND
    }
}

impl<K: Kind> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: Kind> Copy for Handle<K> {}

impl<K: Kind> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<K: Kind> Eq for Handle<K> {}

impl<K: Kind> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ptr.hash(state);
    }
}

impl<K: Kind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{}>({:p})", K::KIND, self.ptr)
    }
}

/// Encode a handle as its wire value
pub fn encode<K: Kind>(handle: Handle<K>) -> Wire {
    handle.addr() as u64 as i64
}

/// Encode a nullable handle; absent encodes as the null sentinel
pub fn encode_optional<K: Kind>(handle: Nullable<K>) -> Wire {
    handle.map_or(NULL_WIRE, encode)
}

/// Decode a required handle
pub fn decode<K: Kind>(wire: Wire) -> BridgeResult<Handle<K>> {
    decode_optional(wire)?.ok_or_else(|| BridgeError::null_handle(K::KIND))
}

/// Decode a handle at a call site where null means "absent"
pub fn decode_optional<K: Kind>(wire: Wire) -> BridgeResult<Nullable<K>> {
    let addr = usize::try_from(wire as u64).map_err(|_| BridgeError::InvalidHandle {
        kind: K::KIND,
        reason: format!(
            "wire value {:#x} does not fit a {}-bit native pointer",
            wire,
            usize::BITS
        ),
    })?;
    Ok(Handle::new(addr as *mut c_void))
}
