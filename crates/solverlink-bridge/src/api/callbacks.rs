//! Callback-driven operations: model enumeration and termination tests

use crate::bridge::Bridge;
use crate::callbacks::{
    enumeration_trampoline, termination_trampoline, EnumerationContext, EnumerationSummary,
    TerminationTest,
};
use crate::dispatch::{CallSite, NonNegative, ResultStrategy, StatusCode};
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{Env, Term, Wire, NULL_WIRE};
use crate::native::SolverLibrary;

impl<L: SolverLibrary> Bridge<L> {
    /// Enumerate the models of the asserted formulas projected on `important`
    ///
    /// `callback` runs once per model, in search order, with the values of
    /// the important terms. Returning an error stops the search; that error
    /// is what this call returns.
    pub fn all_sat<F>(&self, env: Wire, important: &[Wire], mut callback: F) -> BridgeResult<EnumerationSummary>
    where
        F: FnMut(&[Wire]) -> BridgeResult<()>,
    {
        let env = self.handle::<Env>(env)?;
        let important = self.handles::<Term>(important)?;
        let site = CallSite::env("msat_all_sat", env);

        let mut context = EnumerationContext::new(&mut callback, self.stats());
        let user_data = context.as_user_data();
        let count = self.invoke(&site, |lib| unsafe {
            lib.all_sat(
                env,
                important.as_nullable_ptr(),
                important.len(),
                Some(enumeration_trampoline),
                user_data,
            )
        });
        let outcome = context.conclude();

        if let Some(err) = outcome.pending {
            return Err(err);
        }
        self.surface_termination_error(env)?;
        let models = NonNegative.convert(self, &site, count)?;

        Ok(EnumerationSummary {
            models,
            invocations: outcome.invocations,
            stopped_early: outcome.stopped_early,
        })
    }

    /// Register a termination test polled by long computations on `env`
    ///
    /// Returns a token for [`Bridge::release_termination_test`]. The test
    /// stays registered after this call returns; release it exactly once,
    /// after `env` has been destroyed.
    pub fn set_termination_test(
        &self,
        env: Wire,
        test: Option<Box<dyn TerminationTest>>,
    ) -> BridgeResult<Wire> {
        let test = test.ok_or_else(|| {
            self.stats().record_marshaling_error();
            BridgeError::invalid_argument("termination test is absent")
        })?;
        let env = self.handle::<Env>(env)?;

        let generation = self.env_generation(env);
        let (id, user_data) =
            self.terminations
                .register(env, generation, test, self.shared_stats());
        let registered = self.dispatch(
            CallSite::env("msat_set_termination_test", env),
            StatusCode,
            |lib| unsafe { lib.set_termination_test(env, Some(termination_trampoline), user_data) },
        );
        if let Err(err) = registered {
            self.terminations.discard(id);
            return Err(err);
        }

        tracing::debug!(token = id, env = ?env, "termination test registered");
        Ok(id as Wire)
    }

    /// Release a termination test registered with [`Bridge::set_termination_test`]
    ///
    /// Rejects the null token, tokens never issued or already released, and
    /// tokens whose environment is still live.
    pub fn release_termination_test(&self, token: Wire) -> BridgeResult<()> {
        if token == NULL_WIRE {
            return Err(BridgeError::invalid_argument("null termination token"));
        }
        let id = u64::try_from(token)
            .map_err(|_| BridgeError::invalid_argument(format!("malformed termination token {}", token)))?;

        self.terminations
            .release(id, |generation| self.generation_is_live(generation))?;
        tracing::debug!(token = id, "termination test released");
        Ok(())
    }

    /// Times native code has polled the test behind `token`
    pub fn termination_polls(&self, token: Wire) -> Option<u64> {
        u64::try_from(token).ok().and_then(|id| self.terminations.polls(id))
    }
}
