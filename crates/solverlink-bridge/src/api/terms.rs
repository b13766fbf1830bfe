//! Term construction and inspection

use crate::bridge::Bridge;
use crate::dispatch::{CallSite, Flag, HandleOut, MaybeHandle, OwnedString, SizeOut};
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{Decl, Env, Term, Wire};
use crate::marshal::int_arg;
use crate::native::SolverLibrary;
use num_bigint::BigInt;

impl<L: SolverLibrary> Bridge<L> {
    pub fn make_true(&self, env: Wire) -> BridgeResult<Wire> {
        self.env_call("msat_make_true", HandleOut::new(), env, L::make_true)
    }

    pub fn make_false(&self, env: Wire) -> BridgeResult<Wire> {
        self.env_call("msat_make_false", HandleOut::new(), env, L::make_false)
    }

    pub fn make_not(&self, env: Wire, arg: Wire) -> BridgeResult<Wire> {
        self.env_unary_call("msat_make_not", HandleOut::new(), env, arg, L::make_not)
    }

    pub fn make_and(&self, env: Wire, lhs: Wire, rhs: Wire) -> BridgeResult<Wire> {
        self.env_binary_call("msat_make_and", HandleOut::new(), env, lhs, rhs, L::make_and)
    }

    pub fn make_or(&self, env: Wire, lhs: Wire, rhs: Wire) -> BridgeResult<Wire> {
        self.env_binary_call("msat_make_or", HandleOut::new(), env, lhs, rhs, L::make_or)
    }

    pub fn make_equal(&self, env: Wire, lhs: Wire, rhs: Wire) -> BridgeResult<Wire> {
        self.env_binary_call("msat_make_equal", HandleOut::new(), env, lhs, rhs, L::make_equal)
    }

    pub fn make_leq(&self, env: Wire, lhs: Wire, rhs: Wire) -> BridgeResult<Wire> {
        self.env_binary_call("msat_make_leq", HandleOut::new(), env, lhs, rhs, L::make_leq)
    }

    pub fn make_plus(&self, env: Wire, lhs: Wire, rhs: Wire) -> BridgeResult<Wire> {
        self.env_binary_call("msat_make_plus", HandleOut::new(), env, lhs, rhs, L::make_plus)
    }

    /// Numeric literal from its decimal text (`"-12"`, `"3/4"`)
    pub fn make_number(&self, env: Wire, repr: &str) -> BridgeResult<Wire> {
        let env = self.handle::<Env>(env)?;
        let repr = self.string(repr, "numeral")?;
        self.dispatch(CallSite::env("msat_make_number", env), HandleOut::new(), |lib| unsafe {
            lib.make_number(env, repr.as_ptr())
        })
    }

    /// Integer literal of any magnitude
    ///
    /// Rendered to a temporary decimal string for `msat_make_number`.
    pub fn make_integer(&self, env: Wire, value: &BigInt) -> BridgeResult<Wire> {
        let env = self.handle::<Env>(env)?;
        let digits = self.big_integer(value)?;
        self.dispatch(CallSite::env("msat_make_number", env), HandleOut::new(), |lib| unsafe {
            lib.make_number(env, digits.as_ptr())
        })
    }

    pub fn make_int_number(&self, env: Wire, value: i32) -> BridgeResult<Wire> {
        let env = self.handle::<Env>(env)?;
        let value = int_arg(value);
        self.dispatch(CallSite::env("msat_make_int_number", env), HandleOut::new(), |lib| unsafe {
            lib.make_int_number(env, value)
        })
    }

    /// Bit-vector literal of `width` bits from `repr` written in `base`
    pub fn make_bv_number(&self, env: Wire, repr: &str, width: i64, base: i64) -> BridgeResult<Wire> {
        let env = self.handle::<Env>(env)?;
        let repr = self.string(repr, "bit-vector numeral")?;
        let width = self.size(width, "bit-vector width")?;
        let base = self.size(base, "numeral base")?;
        self.dispatch(CallSite::env("msat_make_bv_number", env), HandleOut::new(), |lib| unsafe {
            lib.make_bv_number(env, repr.as_ptr(), width, base)
        })
    }

    /// Bit-vector literal of `width` bits from an integer of any magnitude
    pub fn make_bv_from_integer(&self, env: Wire, value: &BigInt, width: i64) -> BridgeResult<Wire> {
        let env = self.handle::<Env>(env)?;
        let digits = self.big_integer(value)?;
        let width = self.size(width, "bit-vector width")?;
        self.dispatch(CallSite::env("msat_make_bv_number", env), HandleOut::new(), |lib| unsafe {
            lib.make_bv_number(env, digits.as_ptr(), width, 10)
        })
    }

    pub fn make_constant(&self, env: Wire, decl: Wire) -> BridgeResult<Wire> {
        self.env_unary_call(
            "msat_make_constant",
            HandleOut::new(),
            env,
            decl,
            L::make_constant,
        )
    }

    /// Apply `decl` to `args`
    ///
    /// The native call reads exactly as many arguments as `decl` takes, so a
    /// count mismatch is rejected here first.
    pub fn make_uf(&self, env: Wire, decl: Wire, args: &[Wire]) -> BridgeResult<Wire> {
        let env = self.handle::<Env>(env)?;
        let decl = self.handle::<Decl>(decl)?;
        let args = self.handles::<Term>(args)?;

        let arity_site = CallSite::global("msat_decl_get_arity");
        let arity = self.invoke(&arity_site, |lib| unsafe { lib.decl_get_arity(decl) });
        if arity != args.len() {
            self.stats().record_marshaling_error();
            return Err(BridgeError::invalid_argument(format!(
                "declaration takes {} arguments, got {}",
                arity,
                args.len()
            )));
        }

        self.dispatch(CallSite::env("msat_make_uf", env), HandleOut::new(), |lib| unsafe {
            lib.make_uf(env, decl, args.as_nullable_ptr())
        })
    }

    /// Parse a term in SMT-LIB 2 syntax
    pub fn from_smtlib2(&self, env: Wire, data: &str) -> BridgeResult<Wire> {
        let env = self.handle::<Env>(env)?;
        let data = self.string(data, "SMT-LIB 2 text")?;
        self.dispatch(CallSite::env("msat_from_smtlib2", env), HandleOut::new(), |lib| unsafe {
            lib.from_smtlib2(env, data.as_ptr())
        })
    }

    pub fn to_smtlib2(&self, env: Wire, term: Wire) -> BridgeResult<String> {
        self.env_unary_call("msat_to_smtlib2", OwnedString, env, term, L::to_smtlib2)
    }

    pub fn term_repr(&self, term: Wire) -> BridgeResult<String> {
        self.handle_call("msat_term_repr", OwnedString, term, L::term_repr)
    }

    pub fn term_id(&self, term: Wire) -> BridgeResult<i64> {
        self.handle_call("msat_term_id", SizeOut, term, L::term_id)
    }

    pub fn term_arity(&self, term: Wire) -> BridgeResult<i64> {
        self.handle_call("msat_term_arity", SizeOut, term, L::term_arity)
    }

    /// Argument `index` of `term`; absent when out of range
    pub fn term_get_arg(&self, term: Wire, index: i64) -> BridgeResult<Option<Wire>> {
        let term = self.handle::<Term>(term)?;
        let index = self.size(index, "argument index")?;
        self.dispatch(CallSite::global("msat_term_get_arg"), MaybeHandle::new(), |lib| unsafe {
            lib.term_get_arg(term, index)
        })
    }

    pub fn term_get_type(&self, term: Wire) -> BridgeResult<Wire> {
        self.handle_call("msat_term_get_type", HandleOut::new(), term, L::term_get_type)
    }

    pub fn term_is_true(&self, env: Wire, term: Wire) -> BridgeResult<bool> {
        self.env_unary_call("msat_term_is_true", Flag, env, term, L::term_is_true)
    }

    /// Simplify `formula`, leaving the terms in `to_protect` intact
    pub fn simplify(&self, env: Wire, formula: Wire, to_protect: &[Wire]) -> BridgeResult<Wire> {
        let env = self.handle::<Env>(env)?;
        let formula = self.handle::<Term>(formula)?;
        let to_protect = self.handles::<Term>(to_protect)?;
        self.dispatch(CallSite::env("msat_simplify", env), HandleOut::new(), |lib| unsafe {
            lib.simplify(env, formula, to_protect.as_nullable_ptr(), to_protect.len())
        })
    }
}
