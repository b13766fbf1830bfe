//! Callback bridge - native code calling back into host code
//!
//! Two protocols, both re-entered synchronously on the thread blocked in a
//! dispatched native call:
//!
//! - **Enumeration** (`all_sat`): a scoped [`EnumerationContext`] lives on
//!   the dispatching call's stack and is handed to native code as
//!   `user_data`. Each invocation copies the current model into a transient
//!   host array, runs the host callback, and answers continue/stop. A host
//!   error stops the search and is held until the native call returns.
//!
//! - **Termination** (`set_termination_test`): an escaping
//!   [`TerminationContext`] is heap-allocated and kept in a
//!   [`TerminationRegistry`] under an id. The id is the host's token; the
//!   context's heap address is native `user_data`. It stays alive across any
//!   number of later native polls until the token is explicitly released.
//!
//! Trampolines never unwind into native code: panics are caught and turned
//! into [`BridgeError::Callback`].

use crate::arrays::MarshaledArray;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{encode, Env, Handle, Nullable, Term, Wire};
use crate::stats::BridgeStats;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::ffi::{c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Enumeration callback answer: keep searching
pub(crate) const CONTINUE: c_int = 1;
/// Enumeration callback answer: stop the search
pub(crate) const STOP: c_int = 0;

/// Host callback for one enumerated model
pub(crate) type ModelCallback<'a> = dyn FnMut(&[Wire]) -> BridgeResult<()> + 'a;

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("callback panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("callback panicked: {}", s)
    } else {
        "callback panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Enumeration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumerationState {
    NotStarted,
    Invoking(u64),
    Concluded,
}

/// What an `all_sat` call reports back to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerationSummary {
    /// Model count reported by the native search
    pub models: i32,
    /// Times the host callback ran
    pub invocations: u64,
    /// The bridge asked the search to stop before it concluded
    pub stopped_early: bool,
}

/// Result of a finished enumeration, as seen by the bridge
#[derive(Debug)]
pub(crate) struct EnumerationOutcome {
    pub(crate) invocations: u64,
    pub(crate) stopped_early: bool,
    pub(crate) pending: Option<BridgeError>,
}

/// Scoped context for one `all_sat` call
pub(crate) struct EnumerationContext<'a> {
    callback: &'a mut ModelCallback<'a>,
    state: EnumerationState,
    stopped_early: bool,
    pending: Option<BridgeError>,
    stats: &'a BridgeStats,
}

impl<'a> EnumerationContext<'a> {
    pub(crate) fn new(callback: &'a mut ModelCallback<'a>, stats: &'a BridgeStats) -> Self {
        Self {
            callback,
            state: EnumerationState::NotStarted,
            stopped_early: false,
            pending: None,
            stats,
        }
    }

    /// Native `user_data` for this context
    ///
    /// Valid until the context moves or drops; the context must stay put for
    /// the whole native call.
    pub(crate) fn as_user_data(&mut self) -> *mut c_void {
        self as *mut Self as *mut c_void
    }

    fn on_model(&mut self, model: *mut Nullable<Term>, size: c_int) -> c_int {
        let invocation = match self.state {
            EnumerationState::NotStarted => 1,
            EnumerationState::Invoking(n) => n + 1,
            EnumerationState::Concluded => return STOP,
        };
        if self.pending.is_some() {
            return STOP;
        }
        self.state = EnumerationState::Invoking(invocation);
        self.stats.record_callback();

        // Released at the end of this invocation
        let values = match copy_model(model, size, self.stats) {
            Ok(values) => values,
            Err(err) => {
                self.stats.record_marshaling_error();
                tracing::warn!(invocation, error = %err, "dropping model that failed to marshal; stopping search");
                self.stopped_early = true;
                return STOP;
            }
        };

        match (self.callback)(values.as_slice()) {
            Ok(()) => CONTINUE,
            Err(err) => {
                tracing::debug!(invocation, error = %err, "model callback raised; stopping search");
                self.fail(err);
                STOP
            }
        }
    }

    fn fail(&mut self, err: BridgeError) {
        self.stopped_early = true;
        self.pending.get_or_insert(err);
    }

    /// Mark the search finished and hand back what happened
    pub(crate) fn conclude(&mut self) -> EnumerationOutcome {
        let invocations = match self.state {
            EnumerationState::Invoking(n) => n,
            _ => 0,
        };
        self.state = EnumerationState::Concluded;
        EnumerationOutcome {
            invocations,
            stopped_early: self.stopped_early,
            pending: self.pending.take(),
        }
    }
}

fn copy_model<'s>(
    model: *mut Nullable<Term>,
    size: c_int,
    stats: &'s BridgeStats,
) -> BridgeResult<MarshaledArray<'s, Wire>> {
    let len = usize::try_from(size)
        .map_err(|_| BridgeError::invalid_argument(format!("negative model size {}", size)))?;
    if len > 0 && model.is_null() {
        return Err(BridgeError::invalid_argument("null model array"));
    }

    MarshaledArray::collect(
        len,
        "model",
        stats,
        (0..len).map(|i| {
            let element = unsafe { *model.add(i) };
            element
                .map(encode)
                .ok_or_else(|| BridgeError::invalid_argument(format!("null term at model index {}", i)))
        }),
    )
}

/// `AllSatModelFn` trampoline; `user_data` is an [`EnumerationContext`]
pub(crate) unsafe extern "C" fn enumeration_trampoline(
    model: *mut Nullable<Term>,
    size: c_int,
    user_data: *mut c_void,
) -> c_int {
    if user_data.is_null() {
        return STOP;
    }
    let context = &mut *(user_data as *mut EnumerationContext<'_>);

    match panic::catch_unwind(AssertUnwindSafe(|| context.on_model(model, size))) {
        Ok(signal) => signal,
        Err(payload) => {
            context.fail(BridgeError::Callback(panic_message(payload)));
            STOP
        }
    }
}

// ---------------------------------------------------------------------------
// Termination
// ---------------------------------------------------------------------------

/// Cooperative cancellation check polled during long native computations
pub trait TerminationTest: Send {
    /// `Ok(true)` asks the computation to stop
    fn should_terminate(&mut self) -> BridgeResult<bool>;
}

impl<F> TerminationTest for F
where
    F: FnMut() -> BridgeResult<bool> + Send,
{
    fn should_terminate(&mut self) -> BridgeResult<bool> {
        self()
    }
}

struct TerminationState {
    test: Box<dyn TerminationTest>,
    pending: Option<BridgeError>,
}

/// Escaping context for one registered termination test
pub(crate) struct TerminationContext {
    env: usize,
    /// Generation of `env` at registration; `None` if the bridge did not
    /// create it
    generation: Option<u64>,
    state: Mutex<TerminationState>,
    polls: AtomicU64,
    stats: Arc<BridgeStats>,
}

impl TerminationContext {
    fn poll(&self) -> c_int {
        self.polls.fetch_add(1, Ordering::Relaxed);

        // A test that polls itself gets "keep going"
        let Some(mut state) = self.state.try_lock() else {
            return 0;
        };
        if state.pending.is_some() {
            return 1;
        }
        self.stats.record_callback();

        match panic::catch_unwind(AssertUnwindSafe(|| state.test.should_terminate())) {
            Ok(Ok(stop)) => c_int::from(stop),
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "termination test raised; requesting stop");
                state.pending = Some(err);
                1
            }
            Err(payload) => {
                state.pending = Some(BridgeError::Callback(panic_message(payload)));
                1
            }
        }
    }
}

/// `TerminationTestFn` trampoline; `user_data` is a [`TerminationContext`]
pub(crate) unsafe extern "C" fn termination_trampoline(user_data: *mut c_void) -> c_int {
    if user_data.is_null() {
        return 0;
    }
    let context = &*(user_data as *const TerminationContext);
    context.poll()
}

/// Owner of every escaping termination context
pub(crate) struct TerminationRegistry {
    next_id: AtomicU64,
    contexts: Mutex<HashMap<u64, Arc<TerminationContext>>>,
}

impl TerminationRegistry {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate and keep a context; returns its id and native `user_data`
    pub(crate) fn register(
        &self,
        env: Handle<Env>,
        generation: Option<u64>,
        test: Box<dyn TerminationTest>,
        stats: Arc<BridgeStats>,
    ) -> (u64, *mut c_void) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let context = Arc::new(TerminationContext {
            env: env.addr(),
            generation,
            state: Mutex::new(TerminationState {
                test,
                pending: None,
            }),
            polls: AtomicU64::new(0),
            stats,
        });
        let user_data = Arc::as_ptr(&context) as *mut c_void;
        self.contexts.lock().insert(id, context);
        (id, user_data)
    }

    /// Drop a context native code never got to see
    pub(crate) fn discard(&self, id: u64) {
        self.contexts.lock().remove(&id);
    }

    /// Release a context by id
    ///
    /// Rejects unknown ids and contexts whose environment generation
    /// `is_live` says is still alive; a rejected context stays registered.
    pub(crate) fn release(&self, id: u64, is_live: impl Fn(u64) -> bool) -> BridgeResult<()> {
        let mut contexts = self.contexts.lock();
        let context = contexts.get(&id).ok_or_else(|| {
            BridgeError::invalid_argument(format!(
                "termination token {} is not registered (never issued or already released)",
                id
            ))
        })?;
        if context.generation.is_some_and(is_live) {
            return Err(BridgeError::invalid_argument(format!(
                "termination token {} is still in use: destroy its environment first",
                id
            )));
        }
        contexts.remove(&id);
        Ok(())
    }

    /// Take the first error a termination test on `env` raised, if any
    ///
    /// Only contexts registered against this `generation` of the address
    /// are considered.
    pub(crate) fn take_pending(
        &self,
        env: Handle<Env>,
        generation: Option<u64>,
    ) -> Option<BridgeError> {
        let contexts = self.contexts.lock();
        contexts
            .values()
            .filter(|c| c.env == env.addr() && c.generation == generation)
            .find_map(|c| c.state.lock().pending.take())
    }

    /// Times native code has polled the context
    pub(crate) fn polls(&self, id: u64) -> Option<u64> {
        self.contexts
            .lock()
            .get(&id)
            .map(|c| c.polls.load(Ordering::Relaxed))
    }

    pub(crate) fn len(&self) -> usize {
        self.contexts.lock().len()
    }
}
