//! Call dispatcher
//!
//! Every bridged operation runs the same pipeline:
//!
//! 1. marshal inputs into guards (fail fast, nothing native has run)
//! 2. invoke the native function exactly once
//! 3. convert the native result with a [`ResultStrategy`]
//! 4. drop the guards in reverse acquisition order
//!
//! Step 4 is scoping: guards are locals of the operation, so they outlive
//! the conversion and drop on every return path. Result strategies are
//! zero-sized values selected per native signature; the shape helpers at the
//! bottom cover the common signatures so most operations are one line.

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{encode, Env, Handle, Kind, Nullable, Wire};
use crate::marshal::{size_result, NativeAllocation};
use crate::native::SolverLibrary;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::marker::PhantomData;

/// Where a native call happens: its symbol and, if any, the environment
/// whose error state describes a failure
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallSite {
    pub(crate) symbol: &'static str,
    pub(crate) env: Option<Handle<Env>>,
}

impl CallSite {
    pub(crate) fn env(symbol: &'static str, env: Handle<Env>) -> Self {
        Self {
            symbol,
            env: Some(env),
        }
    }

    /// A call with no environment to read error text from
    pub(crate) fn global(symbol: &'static str) -> Self {
        Self { symbol, env: None }
    }
}

/// Conversion of a raw native result `N` into a host value
pub(crate) trait ResultStrategy<N> {
    type Host;

    fn convert<L: SolverLibrary>(
        self,
        bridge: &Bridge<L>,
        site: &CallSite,
        native: N,
    ) -> BridgeResult<Self::Host>;
}

/// Required handle result: null is a native failure
pub(crate) struct HandleOut<K>(PhantomData<K>);

impl<K: Kind> HandleOut<K> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<K: Kind> ResultStrategy<Nullable<K>> for HandleOut<K> {
    type Host = Wire;

    fn convert<L: SolverLibrary>(
        self,
        bridge: &Bridge<L>,
        site: &CallSite,
        native: Nullable<K>,
    ) -> BridgeResult<Wire> {
        native
            .map(encode)
            .ok_or_else(|| bridge.native_failure(site, &format!("returned a null {}", K::KIND)))
    }
}

/// Optional handle result: null means "absent"
pub(crate) struct MaybeHandle<K>(PhantomData<K>);

impl<K: Kind> MaybeHandle<K> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<K: Kind> ResultStrategy<Nullable<K>> for MaybeHandle<K> {
    type Host = Option<Wire>;

    fn convert<L: SolverLibrary>(
        self,
        _bridge: &Bridge<L>,
        _site: &CallSite,
        native: Nullable<K>,
    ) -> BridgeResult<Option<Wire>> {
        Ok(native.map(encode))
    }
}

/// Status code: zero is success
pub(crate) struct StatusCode;

impl ResultStrategy<c_int> for StatusCode {
    type Host = ();

    fn convert<L: SolverLibrary>(
        self,
        bridge: &Bridge<L>,
        site: &CallSite,
        native: c_int,
    ) -> BridgeResult<()> {
        if native == 0 {
            Ok(())
        } else {
            Err(bridge.native_failure(site, &format!("returned status {}", native)))
        }
    }
}

/// Boolean flag: non-zero is true
pub(crate) struct Flag;

impl ResultStrategy<c_int> for Flag {
    type Host = bool;

    fn convert<L: SolverLibrary>(
        self,
        _bridge: &Bridge<L>,
        _site: &CallSite,
        native: c_int,
    ) -> BridgeResult<bool> {
        Ok(native != 0)
    }
}

/// Count or id: negative is a native failure
pub(crate) struct NonNegative;

impl ResultStrategy<c_int> for NonNegative {
    type Host = i32;

    fn convert<L: SolverLibrary>(
        self,
        bridge: &Bridge<L>,
        site: &CallSite,
        native: c_int,
    ) -> BridgeResult<i32> {
        if native < 0 {
            Err(bridge.native_failure(site, &format!("returned {}", native)))
        } else {
            Ok(native)
        }
    }
}

/// Native size → host `i64`
pub(crate) struct SizeOut;

impl ResultStrategy<usize> for SizeOut {
    type Host = i64;

    fn convert<L: SolverLibrary>(
        self,
        _bridge: &Bridge<L>,
        site: &CallSite,
        native: usize,
    ) -> BridgeResult<i64> {
        size_result(native, site.symbol)
    }
}

/// Library-allocated string: copied, then freed through the library
pub(crate) struct OwnedString;

impl ResultStrategy<*mut c_char> for OwnedString {
    type Host = String;

    fn convert<L: SolverLibrary>(
        self,
        bridge: &Bridge<L>,
        site: &CallSite,
        native: *mut c_char,
    ) -> BridgeResult<String> {
        let buffer = NativeAllocation::new(native as *mut c_void, bridge.library(), bridge.stats());
        if buffer.is_null() {
            return Err(bridge.native_failure(site, "returned a null string"));
        }
        Ok(unsafe { buffer.copy_string() })
    }
}

/// Satisfiability verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveResult {
    /// The search gave up or was terminated
    Unknown,
    Unsat,
    Sat,
}

impl SolveResult {
    pub fn is_sat(self) -> bool {
        self == SolveResult::Sat
    }
}

/// -1 / 0 / 1 → [`SolveResult`]; anything else is a failure
pub(crate) struct SolveOutcome;

impl ResultStrategy<c_int> for SolveOutcome {
    type Host = SolveResult;

    fn convert<L: SolverLibrary>(
        self,
        bridge: &Bridge<L>,
        site: &CallSite,
        native: c_int,
    ) -> BridgeResult<SolveResult> {
        match native {
            -1 => Ok(SolveResult::Unknown),
            0 => Ok(SolveResult::Unsat),
            1 => Ok(SolveResult::Sat),
            other => Err(bridge.native_failure(site, &format!("returned verdict {}", other))),
        }
    }
}

pub(crate) struct Unit;

impl ResultStrategy<()> for Unit {
    type Host = ();

    fn convert<L: SolverLibrary>(
        self,
        _bridge: &Bridge<L>,
        _site: &CallSite,
        _native: (),
    ) -> BridgeResult<()> {
        Ok(())
    }
}

impl<L: SolverLibrary> Bridge<L> {
    /// Run one native call, counted and traced
    pub(crate) fn invoke<N>(&self, site: &CallSite, call: impl FnOnce(&L) -> N) -> N {
        self.stats().record_native_call();
        tracing::trace!(symbol = site.symbol, "native call");
        call(self.library())
    }

    /// Invoke once, then convert with `strategy`
    pub(crate) fn dispatch<N, S>(
        &self,
        site: CallSite,
        strategy: S,
        call: impl FnOnce(&L) -> N,
    ) -> BridgeResult<S::Host>
    where
        S: ResultStrategy<N>,
    {
        let native = self.invoke(&site, call);
        strategy.convert(self, &site, native)
    }

    /// Failure raised right after a native call reported one
    ///
    /// Carries the environment's last-error text when there is any,
    /// otherwise `fallback`.
    pub(crate) fn native_failure(&self, site: &CallSite, fallback: &str) -> BridgeError {
        let message = site
            .env
            .and_then(|env| self.last_error(env))
            .unwrap_or_else(|| fallback.to_string());
        tracing::debug!(symbol = site.symbol, %message, "native call failed");
        BridgeError::NativeOperation {
            symbol: site.symbol,
            message,
        }
    }

    pub(crate) fn last_error(&self, env: Handle<Env>) -> Option<String> {
        let ptr = unsafe { self.library().last_error_message(env) };
        if ptr.is_null() {
            return None;
        }
        let text = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
        (!text.is_empty()).then_some(text)
    }

    // Shape helpers. `f` is a `SolverLibrary` method; the handle arguments
    // are decoded (and rejected) before it can run.

    /// `f(env)`
    pub(crate) fn env_call<N, S>(
        &self,
        symbol: &'static str,
        strategy: S,
        env: Wire,
        f: unsafe fn(&L, Handle<Env>) -> N,
    ) -> BridgeResult<S::Host>
    where
        S: ResultStrategy<N>,
    {
        let env = self.handle::<Env>(env)?;
        self.dispatch(CallSite::env(symbol, env), strategy, |lib| unsafe { f(lib, env) })
    }

    /// `f(env, a)`
    pub(crate) fn env_unary_call<K, N, S>(
        &self,
        symbol: &'static str,
        strategy: S,
        env: Wire,
        a: Wire,
        f: unsafe fn(&L, Handle<Env>, Handle<K>) -> N,
    ) -> BridgeResult<S::Host>
    where
        K: Kind,
        S: ResultStrategy<N>,
    {
        let env = self.handle::<Env>(env)?;
        let a = self.handle::<K>(a)?;
        self.dispatch(CallSite::env(symbol, env), strategy, |lib| unsafe { f(lib, env, a) })
    }

    /// `f(env, a, b)`
    pub(crate) fn env_binary_call<A, B, N, S>(
        &self,
        symbol: &'static str,
        strategy: S,
        env: Wire,
        a: Wire,
        b: Wire,
        f: unsafe fn(&L, Handle<Env>, Handle<A>, Handle<B>) -> N,
    ) -> BridgeResult<S::Host>
    where
        A: Kind,
        B: Kind,
        S: ResultStrategy<N>,
    {
        let env = self.handle::<Env>(env)?;
        let a = self.handle::<A>(a)?;
        let b = self.handle::<B>(b)?;
        self.dispatch(CallSite::env(symbol, env), strategy, |lib| unsafe { f(lib, env, a, b) })
    }

    /// `f(h)` for calls that take no environment
    pub(crate) fn handle_call<K, N, S>(
        &self,
        symbol: &'static str,
        strategy: S,
        handle: Wire,
        f: unsafe fn(&L, Handle<K>) -> N,
    ) -> BridgeResult<S::Host>
    where
        K: Kind,
        S: ResultStrategy<N>,
    {
        let handle = self.handle::<K>(handle)?;
        self.dispatch(CallSite::global(symbol), strategy, |lib| unsafe { f(lib, handle) })
    }
}
