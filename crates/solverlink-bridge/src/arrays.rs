//! Array marshaling
//!
//! Host → native: [`MarshaledArray`] decodes each element into a freshly
//! sized buffer. The buffer exists (and counts as acquired) before the first
//! element is converted, so a failure at element k drops a partially filled
//! guard and the release still happens exactly once.
//!
//! Native → host: [`copy_output_handles`] copies a library-allocated array
//! under a [`NativeAllocation`] guard, which frees the native buffer whether
//! or not every element converts.

use crate::error::{BridgeError, BridgeResult};
use crate::handle::{decode, encode, Handle, Kind, Nullable, Wire};
use crate::marshal::NativeAllocation;
use crate::native::SolverLibrary;
use crate::stats::BridgeStats;
use std::ffi::c_int;

/// Transient native-side buffer built from a host array
pub(crate) struct MarshaledArray<'s, T> {
    items: Vec<T>,
    stats: &'s BridgeStats,
}

impl<'s, T> MarshaledArray<'s, T> {
    /// Allocate room for exactly `len` elements
    fn with_capacity(len: usize, what: &str, stats: &'s BridgeStats) -> BridgeResult<Self> {
        let mut items = Vec::new();
        items.try_reserve_exact(len).map_err(|_| {
            BridgeError::OutOfMemory(format!("{} ({} elements)", what, len))
        })?;
        stats.record_array_acquired();
        Ok(Self { items, stats })
    }

    /// Fill a new buffer from fallible element conversions
    ///
    /// Stops at the first failing element; the partial buffer is released
    /// when the guard drops on the error path.
    pub(crate) fn collect<I>(len: usize, what: &str, stats: &'s BridgeStats, elements: I) -> BridgeResult<Self>
    where
        I: IntoIterator<Item = BridgeResult<T>>,
    {
        let mut array = Self::with_capacity(len, what, stats)?;
        for element in elements {
            array.items.push(element?);
        }
        Ok(array)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Base pointer, or null for an empty array
    pub(crate) fn as_nullable_ptr(&self) -> *const T {
        if self.items.is_empty() {
            std::ptr::null()
        } else {
            self.items.as_ptr()
        }
    }
}

impl<'s, K: Kind> MarshaledArray<'s, Handle<K>> {
    /// Decode every wire value as a required handle
    pub(crate) fn handles(wires: &[Wire], stats: &'s BridgeStats) -> BridgeResult<Self> {
        Self::collect(
            wires.len(),
            "handle array",
            stats,
            wires.iter().enumerate().map(|(i, &wire)| {
                decode::<K>(wire).map_err(|e| match e {
                    BridgeError::InvalidHandle { kind, reason } => BridgeError::InvalidHandle {
                        kind,
                        reason: format!("element {}: {}", i, reason),
                    },
                    other => other,
                })
            }),
        )
    }
}

impl<'s> MarshaledArray<'s, c_int> {
    /// Copy 32-bit host integers
    pub(crate) fn ints(values: &[i32], stats: &'s BridgeStats) -> BridgeResult<Self> {
        Self::collect(values.len(), "integer array", stats, values.iter().map(|&v| Ok(v)))
    }
}

impl<T> Drop for MarshaledArray<'_, T> {
    fn drop(&mut self) {
        self.stats.record_array_released();
    }
}

/// Copy a library-allocated array of `len` handles into host wire values
///
/// The native buffer is freed exactly once on every path. A null element
/// fails the copy at that index.
pub(crate) fn copy_output_handles<L: SolverLibrary, K: Kind>(
    buffer: &NativeAllocation<'_, L>,
    len: usize,
    symbol: &'static str,
) -> BridgeResult<Vec<Wire>> {
    if buffer.is_null() {
        return Err(BridgeError::NativeOperation {
            symbol,
            message: "returned a null array".to_string(),
        });
    }

    let base = buffer.as_ptr::<Nullable<K>>();
    let mut out = Vec::new();
    out.try_reserve_exact(len)
        .map_err(|_| BridgeError::OutOfMemory(format!("{} result ({} elements)", symbol, len)))?;

    for index in 0..len {
        let element = unsafe { *base.add(index) };
        let handle = element.ok_or_else(|| BridgeError::NativeOperation {
            symbol,
            message: format!("null {} at index {} of {}", K::KIND, index, len),
        })?;
        out.push(encode(handle));
    }
    Ok(out)
}
