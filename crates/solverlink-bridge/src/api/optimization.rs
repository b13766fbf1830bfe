//! Optimization objectives

use crate::bridge::Bridge;
use crate::dispatch::{CallSite, Flag, HandleOut, OwnedString, ResultStrategy, StatusCode, Unit};
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{encode, Env, Handle, Nullable, Objective, ObjectiveIterator, Term, Wire};
use crate::marshal::{int_arg, ptr_or_null};
use crate::native::SolverLibrary;
use std::ffi::c_char;

type ObjectiveFn<L> = unsafe fn(
    &L,
    Handle<Env>,
    Handle<Term>,
    *const c_char,
    *const c_char,
    *const c_char,
) -> Nullable<Objective>;

/// Which value of an objective to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveValue {
    Optimum,
    LowerBound,
    UpperBound,
}

impl ObjectiveValue {
    fn selector(self) -> i32 {
        match self {
            ObjectiveValue::Optimum => 0,
            ObjectiveValue::LowerBound => 1,
            ObjectiveValue::UpperBound => 2,
        }
    }
}

impl<L: SolverLibrary> Bridge<L> {
    /// Objective minimizing `term`
    ///
    /// `id`, `lower` and `upper` are optional; bounds are numerals.
    pub fn make_minimize(
        &self,
        env: Wire,
        term: Wire,
        id: Option<&str>,
        lower: Option<&str>,
        upper: Option<&str>,
    ) -> BridgeResult<Wire> {
        self.objective("msat_make_minimize", env, term, id, lower, upper, L::make_minimize)
    }

    /// Objective maximizing `term`
    pub fn make_maximize(
        &self,
        env: Wire,
        term: Wire,
        id: Option<&str>,
        lower: Option<&str>,
        upper: Option<&str>,
    ) -> BridgeResult<Wire> {
        self.objective("msat_make_maximize", env, term, id, lower, upper, L::make_maximize)
    }

    #[allow(clippy::too_many_arguments)]
    fn objective(
        &self,
        symbol: &'static str,
        env: Wire,
        term: Wire,
        id: Option<&str>,
        lower: Option<&str>,
        upper: Option<&str>,
        f: ObjectiveFn<L>,
    ) -> BridgeResult<Wire> {
        let env = self.handle::<Env>(env)?;
        let term = self.handle::<Term>(term)?;
        let id = self.optional_string(id, "objective id")?;
        let lower = self.optional_string(lower, "lower bound")?;
        let upper = self.optional_string(upper, "upper bound")?;
        self.dispatch(CallSite::env(symbol, env), HandleOut::new(), |lib| unsafe {
            f(lib, env, term, ptr_or_null(&id), ptr_or_null(&lower), ptr_or_null(&upper))
        })
    }

    pub fn assert_objective(&self, env: Wire, objective: Wire) -> BridgeResult<()> {
        self.env_unary_call("msat_assert_objective", StatusCode, env, objective, L::assert_objective)
    }

    pub fn create_objective_iterator(&self, env: Wire) -> BridgeResult<Wire> {
        self.env_call(
            "msat_create_objective_iterator",
            HandleOut::new(),
            env,
            L::create_objective_iterator,
        )
    }

    pub fn objective_iterator_has_next(&self, iter: Wire) -> BridgeResult<bool> {
        self.handle_call(
            "msat_objective_iterator_has_next",
            Flag,
            iter,
            L::objective_iterator_has_next,
        )
    }

    pub fn objective_iterator_next(&self, iter: Wire) -> BridgeResult<Wire> {
        let iter = self.handle::<ObjectiveIterator>(iter)?;
        let site = CallSite::global("msat_objective_iterator_next");

        let mut objective: Nullable<Objective> = None;
        let status = self.invoke(&site, |lib| unsafe { lib.objective_iterator_next(iter, &mut objective) });
        StatusCode.convert(self, &site, status)?;

        objective.map(encode).ok_or_else(|| BridgeError::NativeOperation {
            symbol: site.symbol,
            message: "reported success without an objective".to_string(),
        })
    }

    pub fn destroy_objective_iterator(&self, iter: Wire) -> BridgeResult<()> {
        self.handle_call(
            "msat_destroy_objective_iterator",
            Unit,
            iter,
            L::destroy_objective_iterator,
        )
    }

    /// Rendering of the optimum or a bound of `objective`
    pub fn objective_value_repr(&self, env: Wire, objective: Wire, which: ObjectiveValue) -> BridgeResult<String> {
        let env = self.handle::<Env>(env)?;
        let objective = self.handle::<Objective>(objective)?;
        let which = int_arg(which.selector());
        self.dispatch(
            CallSite::env("msat_objective_value_repr", env),
            OwnedString,
            |lib| unsafe { lib.objective_value_repr(env, objective, which) },
        )
    }
}
