//! Craig interpolation groups

use crate::bridge::Bridge;
use crate::dispatch::{CallSite, HandleOut, NonNegative, StatusCode};
use crate::error::BridgeResult;
use crate::handle::{Env, Wire};
use crate::marshal::int_arg;
use crate::native::SolverLibrary;

impl<L: SolverLibrary> Bridge<L> {
    /// New interpolation group id
    pub fn create_itp_group(&self, env: Wire) -> BridgeResult<i32> {
        self.env_call("msat_create_itp_group", NonNegative, env, L::create_itp_group)
    }

    /// Make `group` the group of subsequently asserted formulas
    pub fn set_itp_group(&self, env: Wire, group: i32) -> BridgeResult<()> {
        let env = self.handle::<Env>(env)?;
        let group = int_arg(group);
        self.dispatch(CallSite::env("msat_set_itp_group", env), StatusCode, |lib| unsafe {
            lib.set_itp_group(env, group)
        })
    }

    /// Interpolant of the groups in `groups_of_a` against the rest
    pub fn get_interpolant(&self, env: Wire, groups_of_a: &[i32]) -> BridgeResult<Wire> {
        let env = self.handle::<Env>(env)?;
        let groups = self.ints(groups_of_a)?;
        self.dispatch(CallSite::env("msat_get_interpolant", env), HandleOut::new(), |lib| unsafe {
            lib.get_interpolant(env, groups.as_nullable_ptr(), groups.len())
        })
    }
}
