//! Assertions, backtracking and satisfiability checks

use crate::arrays::copy_output_handles;
use crate::bridge::Bridge;
use crate::dispatch::{CallSite, HandleOut, ResultStrategy, SizeOut, SolveOutcome, SolveResult, StatusCode};
use crate::error::BridgeResult;
use crate::handle::{Env, Handle, Nullable, Term, Wire};
use crate::marshal::NativeAllocation;
use crate::native::SolverLibrary;
use std::ffi::c_void;

type OutputTermsFn<L> = unsafe fn(&L, Handle<Env>, *mut usize) -> *mut Nullable<Term>;

impl<L: SolverLibrary> Bridge<L> {
    pub fn push_backtrack_point(&self, env: Wire) -> BridgeResult<()> {
        self.env_call("msat_push_backtrack_point", StatusCode, env, L::push_backtrack_point)
    }

    pub fn pop_backtrack_point(&self, env: Wire) -> BridgeResult<()> {
        self.env_call("msat_pop_backtrack_point", StatusCode, env, L::pop_backtrack_point)
    }

    pub fn num_backtrack_points(&self, env: Wire) -> BridgeResult<i64> {
        self.env_call("msat_num_backtrack_points", SizeOut, env, L::num_backtrack_points)
    }

    pub fn assert_formula(&self, env: Wire, formula: Wire) -> BridgeResult<()> {
        self.env_unary_call("msat_assert_formula", StatusCode, env, formula, L::assert_formula)
    }

    /// Check satisfiability of the asserted formulas
    ///
    /// A registered termination test that stopped the search yields
    /// [`SolveResult::Unknown`]; one that raised surfaces its error here.
    pub fn solve(&self, env: Wire) -> BridgeResult<SolveResult> {
        let env = self.handle::<Env>(env)?;
        let site = CallSite::env("msat_solve", env);
        let verdict = self.invoke(&site, |lib| unsafe { lib.solve(env) });
        self.surface_termination_error(env)?;
        SolveOutcome.convert(self, &site, verdict)
    }

    /// Check satisfiability under extra assumed literals
    pub fn solve_with_assumptions(&self, env: Wire, assumptions: &[Wire]) -> BridgeResult<SolveResult> {
        let env = self.handle::<Env>(env)?;
        let assumptions = self.handles::<Term>(assumptions)?;
        let site = CallSite::env("msat_solve_with_assumptions", env);
        let verdict = self.invoke(&site, |lib| unsafe {
            lib.solve_with_assumptions(env, assumptions.as_nullable_ptr(), assumptions.len())
        });
        self.surface_termination_error(env)?;
        SolveOutcome.convert(self, &site, verdict)
    }

    /// Unsat core of the last unsatisfiable check
    pub fn get_unsat_core(&self, env: Wire) -> BridgeResult<Vec<Wire>> {
        self.output_terms("msat_get_unsat_core", env, L::get_unsat_core)
    }

    /// Assumptions responsible for the last unsatisfiable check
    pub fn get_unsat_assumptions(&self, env: Wire) -> BridgeResult<Vec<Wire>> {
        self.output_terms("msat_get_unsat_assumptions", env, L::get_unsat_assumptions)
    }

    pub fn get_model_value(&self, env: Wire, term: Wire) -> BridgeResult<Wire> {
        self.env_unary_call("msat_get_model_value", HandleOut::new(), env, term, L::get_model_value)
    }

    /// Library-allocated term array with its length in an out-parameter
    fn output_terms(&self, symbol: &'static str, env: Wire, f: OutputTermsFn<L>) -> BridgeResult<Vec<Wire>> {
        let env = self.handle::<Env>(env)?;
        let site = CallSite::env(symbol, env);

        let mut size = 0usize;
        let raw = self.invoke(&site, |lib| unsafe { f(lib, env, &mut size) });
        let buffer = NativeAllocation::new(raw as *mut c_void, self.library(), self.stats());
        if buffer.is_null() {
            return Err(self.native_failure(&site, "returned a null array"));
        }
        copy_output_handles::<L, Term>(&buffer, size, symbol)
    }

    pub(crate) fn surface_termination_error(&self, env: Handle<Env>) -> BridgeResult<()> {
        match self.terminations.take_pending(env, self.env_generation(env)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
