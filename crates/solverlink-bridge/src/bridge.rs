//! The bridge object
//!
//! Owns the native library, the statistics, the live environments and the
//! termination-context registry. Each live environment carries a generation
//! number unique for the bridge's lifetime, so an address the allocator
//! hands out again is never mistaken for the environment it used to name. Host-facing operations live in
//! [`crate::api`]; marshaling helpers here record every rejected argument.

use crate::arrays::MarshaledArray;
use crate::callbacks::TerminationRegistry;
use crate::entry;
use crate::error::BridgeResult;
use crate::handle::{decode, decode_optional, Env, Handle, Kind, Nullable, Wire};
use crate::logging;
use crate::marshal::{optional_string, size_arg, NativeString};
use crate::native::{LibraryLocator, LoadError, LoadedSolver, SolverLibrary};
use crate::stats::BridgeStats;
use num_bigint::BigInt;
use parking_lot::Mutex;
use solverlink_config::bridge::DEFAULT_NAMESPACE;
use solverlink_config::BridgeConfig;
use std::collections::HashMap;
use std::ffi::c_int;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Bridge between host callers and a solver library
pub struct Bridge<L: SolverLibrary> {
    library: L,
    namespace: String,
    stats: Arc<BridgeStats>,
    live_envs: Mutex<HashMap<usize, u64>>,
    next_generation: AtomicU64,
    pub(crate) terminations: TerminationRegistry,
}

impl<L: SolverLibrary> Bridge<L> {
    pub fn new(library: L) -> Self {
        Self {
            library,
            namespace: DEFAULT_NAMESPACE.to_string(),
            stats: Arc::new(BridgeStats::default()),
            live_envs: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            terminations: TerminationRegistry::new(),
        }
    }

    /// Expose entry points under `namespace` instead of the default
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Host namespace the entry points are named under
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `(symbol, entry point)` for every native symbol under this bridge's
    /// namespace
    pub fn entry_points(&self) -> Vec<(&'static str, String)> {
        entry::entry_points(&self.namespace)
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub(crate) fn shared_stats(&self) -> Arc<BridgeStats> {
        Arc::clone(&self.stats)
    }

    /// True while `env` was created by this bridge and not yet destroyed
    pub fn is_live(&self, env: Wire) -> bool {
        match decode_optional::<Env>(env) {
            Ok(Some(env)) => self.live_envs.lock().contains_key(&env.addr()),
            _ => false,
        }
    }

    /// Number of termination contexts awaiting release
    pub fn registered_terminations(&self) -> usize {
        self.terminations.len()
    }

    pub(crate) fn track_env(&self, env: Handle<Env>) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.live_envs.lock().insert(env.addr(), generation);
    }

    /// Forget `env`; false if it was not live
    pub(crate) fn untrack_env(&self, env: Handle<Env>) -> bool {
        self.live_envs.lock().remove(&env.addr()).is_some()
    }

    /// Generation of `env` if it is live
    pub(crate) fn env_generation(&self, env: Handle<Env>) -> Option<u64> {
        self.live_envs.lock().get(&env.addr()).copied()
    }

    pub(crate) fn generation_is_live(&self, generation: u64) -> bool {
        self.live_envs.lock().values().any(|&g| g == generation)
    }

    fn marshaled<T>(&self, result: BridgeResult<T>) -> BridgeResult<T> {
        if let Err(err) = &result {
            self.stats.record_marshaling_error();
            tracing::debug!(error = %err, "argument rejected");
        }
        result
    }

    pub(crate) fn handle<K: Kind>(&self, wire: Wire) -> BridgeResult<Handle<K>> {
        self.marshaled(decode(wire))
    }

    pub(crate) fn optional_handle<K: Kind>(&self, wire: Wire) -> BridgeResult<Nullable<K>> {
        self.marshaled(decode_optional(wire))
    }

    pub(crate) fn handles<K: Kind>(
        &self,
        wires: &[Wire],
    ) -> BridgeResult<MarshaledArray<'_, Handle<K>>> {
        self.marshaled(MarshaledArray::handles(wires, &self.stats))
    }

    pub(crate) fn ints(&self, values: &[i32]) -> BridgeResult<MarshaledArray<'_, c_int>> {
        self.marshaled(MarshaledArray::<c_int>::ints(values, &self.stats))
    }

    pub(crate) fn string(&self, value: &str, what: &str) -> BridgeResult<NativeString<'_>> {
        self.marshaled(NativeString::new(value, what, &self.stats))
    }

    pub(crate) fn optional_string(
        &self,
        value: Option<&str>,
        what: &str,
    ) -> BridgeResult<Option<NativeString<'_>>> {
        self.marshaled(optional_string(value, what, &self.stats))
    }

    pub(crate) fn big_integer(&self, value: &BigInt) -> BridgeResult<NativeString<'_>> {
        self.marshaled(NativeString::from_big_integer(value, &self.stats))
    }

    pub(crate) fn size(&self, value: i64, what: &str) -> BridgeResult<usize> {
        self.marshaled(size_arg(value, what))
    }
}

impl Bridge<LoadedSolver> {
    /// Install logging, then locate and load the configured solver library
    ///
    /// # Safety
    ///
    /// Loads and runs native code; see [`LoadedSolver::load`].
    pub unsafe fn open(config: &BridgeConfig) -> Result<Self, LoadError> {
        logging::init(&config.logging);
        let locator = LibraryLocator::with_paths(&config.library.search_paths);
        let library = LoadedSolver::locate(&locator, &config.library.name)?;
        tracing::debug!(namespace = %config.host.namespace, "solver library loaded");
        Ok(Self::new(library).with_namespace(config.host.namespace.clone()))
    }
}

impl<L: SolverLibrary> Drop for Bridge<L> {
    fn drop(&mut self) {
        let outstanding = self.terminations.len();
        if outstanding > 0 {
            tracing::debug!(outstanding, "dropping bridge with unreleased termination contexts");
        }
    }
}
