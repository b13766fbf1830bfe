//! Argument marshaling - host values → native call arguments
//!
//! Every transient buffer handed to native code is a guard that releases on
//! `Drop`, so cleanup runs on every exit path of a dispatched call. Guards are
//! bound as locals before the native call; Rust drops locals in reverse
//! declaration order, which gives reverse-acquisition release for free.
//!
//! # Width table
//!
//! | Host      | Native   | Rule                                   |
//! |-----------|----------|----------------------------------------|
//! | `i64`     | `usize`  | sizes, widths, indices: reject < 0 and > `usize::MAX` |
//! | `i32`     | `c_int`  | identity                               |
//! | `usize`   | `i64`    | size results: reject > `i64::MAX`      |

use crate::error::{BridgeError, BridgeResult};
use crate::native::SolverLibrary;
use crate::stats::BridgeStats;
use num_bigint::BigInt;
use std::ffi::{c_char, c_int, c_void, CStr, CString};

/// NUL-terminated copy of a host string, released on drop
pub(crate) struct NativeString<'s> {
    raw: CString,
    stats: &'s BridgeStats,
}

impl<'s> NativeString<'s> {
    /// Copy `value` into a native buffer
    ///
    /// An interior NUL cannot be represented and is rejected. A buffer that
    /// cannot be allocated is `OutOfMemory`.
    pub(crate) fn new(value: &str, what: &str, stats: &'s BridgeStats) -> BridgeResult<Self> {
        let nul_error = |offset: usize| {
            BridgeError::invalid_argument(format!("{} contains a NUL byte at offset {}", what, offset))
        };
        if let Some(offset) = value.bytes().position(|b| b == 0) {
            return Err(nul_error(offset));
        }

        let mut bytes = reserve_bytes(value.len() + 1, what)?;
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        let raw = CString::from_vec_with_nul(bytes).map_err(|_| nul_error(value.len()))?;

        stats.record_string_acquired();
        Ok(Self { raw, stats })
    }

    /// Decimal rendering of an arbitrary-precision integer
    ///
    /// The digits live only as long as the guard.
    pub(crate) fn from_big_integer(value: &BigInt, stats: &'s BridgeStats) -> BridgeResult<Self> {
        Self::new(&value.to_str_radix(10), "integer literal", stats)
    }

    pub(crate) fn as_ptr(&self) -> *const c_char {
        self.raw.as_ptr()
    }
}

impl Drop for NativeString<'_> {
    fn drop(&mut self) {
        self.stats.record_string_released();
    }
}

/// Empty byte buffer with room for exactly `len` bytes
fn reserve_bytes(len: usize, what: &str) -> BridgeResult<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|_| BridgeError::OutOfMemory(format!("{} ({} bytes)", what, len)))?;
    Ok(bytes)
}

/// Optional string argument: absent maps to a native null without allocating
pub(crate) fn optional_string<'s>(
    value: Option<&str>,
    what: &str,
    stats: &'s BridgeStats,
) -> BridgeResult<Option<NativeString<'s>>> {
    value.map(|v| NativeString::new(v, what, stats)).transpose()
}

/// Pointer for an optional string guard; null when absent
pub(crate) fn ptr_or_null(value: &Option<NativeString<'_>>) -> *const c_char {
    value.as_ref().map_or(std::ptr::null(), NativeString::as_ptr)
}

/// Host `i64` size/count/width/index → native `usize`
pub(crate) fn size_arg(value: i64, what: &str) -> BridgeResult<usize> {
    if value < 0 {
        return Err(BridgeError::invalid_argument(format!(
            "{} must be non-negative, got {}",
            what, value
        )));
    }
    usize::try_from(value).map_err(|_| {
        BridgeError::invalid_argument(format!(
            "{} {} exceeds the native size range",
            what, value
        ))
    })
}

/// Host `i32` → native `c_int`
pub(crate) fn int_arg(value: i32) -> c_int {
    value
}

/// Native `usize` result → host `i64`
pub(crate) fn size_result(value: usize, symbol: &str) -> BridgeResult<i64> {
    i64::try_from(value).map_err(|_| {
        BridgeError::invalid_argument(format!(
            "{} returned {} which exceeds the host size range",
            symbol, value
        ))
    })
}

/// A buffer allocated by the native library, freed through it on drop
///
/// Ownership transfers to the bridge only for the duration of one call.
pub(crate) struct NativeAllocation<'l, L: SolverLibrary> {
    ptr: *mut c_void,
    library: &'l L,
    stats: &'l BridgeStats,
}

impl<'l, L: SolverLibrary> NativeAllocation<'l, L> {
    pub(crate) fn new(ptr: *mut c_void, library: &'l L, stats: &'l BridgeStats) -> Self {
        Self {
            ptr,
            library,
            stats,
        }
    }

    pub(crate) fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Copy the allocation as a NUL-terminated string
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    ///
    /// # Safety
    ///
    /// The allocation must be a non-null NUL-terminated string.
    pub(crate) unsafe fn copy_string(&self) -> String {
        CStr::from_ptr(self.ptr as *const c_char)
            .to_string_lossy()
            .into_owned()
    }

    pub(crate) fn as_ptr<T>(&self) -> *const T {
        self.ptr as *const T
    }
}

impl<L: SolverLibrary> Drop for NativeAllocation<'_, L> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { self.library.free(self.ptr) };
            self.stats.record_native_free();
        }
    }
}
