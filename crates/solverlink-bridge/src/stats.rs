//! Bridge statistics for monitoring and leak checks

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by a bridge
#[derive(Debug, Default)]
pub struct BridgeStats {
    native_calls: AtomicU64,
    marshaling_errors: AtomicU64,
    strings_acquired: AtomicU64,
    strings_released: AtomicU64,
    arrays_acquired: AtomicU64,
    arrays_released: AtomicU64,
    native_frees: AtomicU64,
    callbacks_invoked: AtomicU64,
}

/// Point-in-time copy of [`BridgeStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub native_calls: u64,
    pub marshaling_errors: u64,
    pub strings_acquired: u64,
    pub strings_released: u64,
    pub arrays_acquired: u64,
    pub arrays_released: u64,
    pub native_frees: u64,
    pub callbacks_invoked: u64,
}

impl StatsSnapshot {
    /// No transient buffer is outstanding
    pub fn is_balanced(&self) -> bool {
        self.strings_acquired == self.strings_released
            && self.arrays_acquired == self.arrays_released
    }
}

macro_rules! counters {
    ($($record:ident => $field:ident),* $(,)?) => {
        impl BridgeStats {
            $(
                pub(crate) fn $record(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )*

            pub fn snapshot(&self) -> StatsSnapshot {
                StatsSnapshot {
                    $($field: self.$field.load(Ordering::Relaxed),)*
                }
            }
        }
    };
}

counters! {
    record_native_call => native_calls,
    record_marshaling_error => marshaling_errors,
    record_string_acquired => strings_acquired,
    record_string_released => strings_released,
    record_array_acquired => arrays_acquired,
    record_array_released => arrays_released,
    record_native_free => native_frees,
    record_callback => callbacks_invoked,
}
