//! Types and function declarations

use crate::bridge::Bridge;
use crate::dispatch::{CallSite, Flag, HandleOut, MaybeHandle, OwnedString, ResultStrategy, SizeOut};
use crate::error::BridgeResult;
use crate::handle::{Env, Type, Wire};
use crate::marshal::size_result;
use crate::native::SolverLibrary;

impl<L: SolverLibrary> Bridge<L> {
    pub fn get_bool_type(&self, env: Wire) -> BridgeResult<Wire> {
        self.env_call("msat_get_bool_type", HandleOut::new(), env, L::get_bool_type)
    }

    pub fn get_integer_type(&self, env: Wire) -> BridgeResult<Wire> {
        self.env_call("msat_get_integer_type", HandleOut::new(), env, L::get_integer_type)
    }

    pub fn get_rational_type(&self, env: Wire) -> BridgeResult<Wire> {
        self.env_call("msat_get_rational_type", HandleOut::new(), env, L::get_rational_type)
    }

    /// Bit-vector type of `width` bits
    pub fn get_bv_type(&self, env: Wire, width: i64) -> BridgeResult<Wire> {
        let env = self.handle::<Env>(env)?;
        let width = self.size(width, "bit-vector width")?;
        self.dispatch(CallSite::env("msat_get_bv_type", env), HandleOut::new(), |lib| unsafe {
            lib.get_bv_type(env, width)
        })
    }

    pub fn get_array_type(&self, env: Wire, index: Wire, element: Wire) -> BridgeResult<Wire> {
        self.env_binary_call(
            "msat_get_array_type",
            HandleOut::new(),
            env,
            index,
            element,
            L::get_array_type,
        )
    }

    /// Function type `params -> result`
    pub fn get_function_type(&self, env: Wire, params: &[Wire], result: Wire) -> BridgeResult<Wire> {
        let env = self.handle::<Env>(env)?;
        let params = self.handles::<Type>(params)?;
        let result = self.handle::<Type>(result)?;
        self.dispatch(
            CallSite::env("msat_get_function_type", env),
            HandleOut::new(),
            |lib| unsafe { lib.get_function_type(env, params.as_nullable_ptr(), params.len(), result) },
        )
    }

    /// Width of `ty` if it is a bit-vector type
    pub fn is_bv_type(&self, env: Wire, ty: Wire) -> BridgeResult<Option<i64>> {
        let env = self.handle::<Env>(env)?;
        let ty = self.handle::<Type>(ty)?;
        let site = CallSite::env("msat_is_bv_type", env);

        let mut width = 0usize;
        let flag = self.invoke(&site, |lib| unsafe { lib.is_bv_type(env, ty, &mut width) });
        if Flag.convert(self, &site, flag)? {
            size_result(width, site.symbol).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn type_repr(&self, ty: Wire) -> BridgeResult<String> {
        self.handle_call("msat_type_repr", OwnedString, ty, L::type_repr)
    }

    pub fn declare_function(&self, env: Wire, name: &str, ty: Wire) -> BridgeResult<Wire> {
        let env = self.handle::<Env>(env)?;
        let name = self.string(name, "declaration name")?;
        let ty = self.handle::<Type>(ty)?;
        self.dispatch(
            CallSite::env("msat_declare_function", env),
            HandleOut::new(),
            |lib| unsafe { lib.declare_function(env, name.as_ptr(), ty) },
        )
    }

    /// Declaration named `name`, if there is one
    pub fn find_decl(&self, env: Wire, name: &str) -> BridgeResult<Option<Wire>> {
        let env = self.handle::<Env>(env)?;
        let name = self.string(name, "declaration name")?;
        self.dispatch(CallSite::env("msat_find_decl", env), MaybeHandle::new(), |lib| unsafe {
            lib.find_decl(env, name.as_ptr())
        })
    }

    pub fn decl_get_arity(&self, decl: Wire) -> BridgeResult<i64> {
        self.handle_call("msat_decl_get_arity", SizeOut, decl, L::decl_get_arity)
    }

    pub fn decl_get_name(&self, decl: Wire) -> BridgeResult<String> {
        self.handle_call("msat_decl_get_name", OwnedString, decl, L::decl_get_name)
    }
}
