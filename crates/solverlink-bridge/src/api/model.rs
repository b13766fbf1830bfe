//! Model iteration

use crate::bridge::Bridge;
use crate::dispatch::{CallSite, Flag, HandleOut, ResultStrategy, StatusCode, Unit};
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{encode, ModelIterator, Nullable, Term, Wire};
use crate::native::SolverLibrary;

impl<L: SolverLibrary> Bridge<L> {
    /// Iterator over the assignments of the last satisfiable check
    pub fn create_model_iterator(&self, env: Wire) -> BridgeResult<Wire> {
        self.env_call("msat_create_model_iterator", HandleOut::new(), env, L::create_model_iterator)
    }

    pub fn model_iterator_has_next(&self, iter: Wire) -> BridgeResult<bool> {
        self.handle_call("msat_model_iterator_has_next", Flag, iter, L::model_iterator_has_next)
    }

    /// Next `(term, value)` assignment
    pub fn model_iterator_next(&self, iter: Wire) -> BridgeResult<(Wire, Wire)> {
        let iter = self.handle::<ModelIterator>(iter)?;
        let site = CallSite::global("msat_model_iterator_next");

        let mut term: Nullable<Term> = None;
        let mut value: Nullable<Term> = None;
        let status = self.invoke(&site, |lib| unsafe { lib.model_iterator_next(iter, &mut term, &mut value) });
        StatusCode.convert(self, &site, status)?;

        match (term, value) {
            (Some(term), Some(value)) => Ok((encode(term), encode(value))),
            _ => Err(BridgeError::NativeOperation {
                symbol: site.symbol,
                message: "reported success with an empty assignment".to_string(),
            }),
        }
    }

    pub fn destroy_model_iterator(&self, iter: Wire) -> BridgeResult<()> {
        self.handle_call("msat_destroy_model_iterator", Unit, iter, L::destroy_model_iterator)
    }
}
