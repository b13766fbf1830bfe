//! Native solver surface
//!
//! The C API of the solver library, declared once below. The declaration
//! table expands to:
//! - [`SolverLibrary`]: one `unsafe fn` per native function, mirroring the C
//!   signature (the bridge is generic over this trait, so tests can swap in
//!   an in-process implementation)
//! - [`SYMBOLS`]: the exported symbol names, in declaration order
//! - a symbol table resolved from a dynamic library, and the
//!   [`SolverLibrary`] impl for [`LoadedSolver`] that forwards to it
//!
//! Handle parameters are `Handle<K>` (never null), handle results and output
//! slots are `Nullable<K>`. Strings are NUL-terminated. Strings and arrays
//! returned as `*mut` are owned by the caller and released with `free`.

pub mod loader;

pub use loader::{LibraryLocator, LoadError, LoadedSolver};

use crate::handle::{
    Config, Decl, Env, Handle, ModelIterator, Nullable, Objective, ObjectiveIterator, Term, Type,
};
use std::ffi::{c_char, c_int, c_void};

/// Polled by long computations; a non-zero return requests termination
pub type TerminationTestFn = unsafe extern "C" fn(user_data: *mut c_void) -> c_int;

/// Called once per model found by `all_sat`; return 1 to continue, 0 to stop
pub type AllSatModelFn =
    unsafe extern "C" fn(model: *mut Nullable<Term>, size: c_int, user_data: *mut c_void) -> c_int;

/// Native prefix shared by every exported symbol
pub const SYMBOL_PREFIX: &str = "msat_";

macro_rules! solver_api {
    ($(
        $(#[$doc:meta])*
        fn $name:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)?;
    )*) => {
        /// The solver's C surface
        ///
        /// # Safety
        ///
        /// Every method is a direct call into native code. Callers must pass
        /// handles obtained from the same library instance that have not been
        /// destroyed, pointers valid for the advertised lengths, and
        /// NUL-terminated strings.
        pub trait SolverLibrary {
            $(
                $(#[$doc])*
                #[allow(clippy::missing_safety_doc)]
                unsafe fn $name(&self, $($arg: $ty),*) $(-> $ret)?;
            )*
        }

        /// Exported symbol names, in declaration order
        pub const SYMBOLS: &[&str] = &[$(concat!("msat_", stringify!($name))),*];

        pub(crate) struct SymbolTable {
            $($name: unsafe extern "C" fn($($ty),*) $(-> $ret)?,)*
        }

        impl SymbolTable {
            /// Resolve every symbol; the first missing one fails the load.
            pub(crate) unsafe fn resolve(
                library: &libloading::Library,
                path: &str,
            ) -> Result<Self, LoadError> {
                Ok(Self {
                    $($name: *library
                        .get::<unsafe extern "C" fn($($ty),*) $(-> $ret)?>(
                            concat!("msat_", stringify!($name), "\0").as_bytes(),
                        )
                        .map_err(|_| LoadError::SymbolNotFound {
                            library: path.to_string(),
                            symbol: concat!("msat_", stringify!($name)).to_string(),
                        })?,)*
                })
            }
        }

        impl SolverLibrary for LoadedSolver {
            $(
                unsafe fn $name(&self, $($arg: $ty),*) $(-> $ret)? {
                    (self.table.$name)($($arg),*)
                }
            )*
        }
    };
}

solver_api! {
    // Configuration
    fn create_config() -> Nullable<Config>;
    /// Default configuration for an SMT-LIB logic name
    fn create_default_config(logic: *const c_char) -> Nullable<Config>;
    /// Configuration from `key = value` lines
    fn parse_config(data: *const c_char) -> Nullable<Config>;
    fn set_option(cfg: Handle<Config>, option: *const c_char, value: *const c_char) -> c_int;
    fn destroy_config(cfg: Handle<Config>);

    // Environments
    fn create_env(cfg: Handle<Config>) -> Nullable<Env>;
    /// Environment sharing the term manager of `sibling`
    fn create_shared_env(cfg: Handle<Config>, sibling: Handle<Env>) -> Nullable<Env>;
    fn destroy_env(env: Handle<Env>);
    fn reset_env(env: Handle<Env>) -> c_int;
    /// Message of the last failure on `env`; owned by the library, not freed
    fn last_error_message(env: Handle<Env>) -> *const c_char;

    // Types
    fn get_bool_type(env: Handle<Env>) -> Nullable<Type>;
    fn get_integer_type(env: Handle<Env>) -> Nullable<Type>;
    fn get_rational_type(env: Handle<Env>) -> Nullable<Type>;
    fn get_bv_type(env: Handle<Env>, width: usize) -> Nullable<Type>;
    fn get_array_type(env: Handle<Env>, index: Handle<Type>, element: Handle<Type>) -> Nullable<Type>;
    fn get_function_type(
        env: Handle<Env>,
        params: *const Handle<Type>,
        num_params: usize,
        result: Handle<Type>,
    ) -> Nullable<Type>;
    /// Non-zero if `ty` is a bit-vector type; writes its width to `out_width`
    fn is_bv_type(env: Handle<Env>, ty: Handle<Type>, out_width: *mut usize) -> c_int;
    fn type_repr(ty: Handle<Type>) -> *mut c_char;

    // Declarations
    fn declare_function(env: Handle<Env>, name: *const c_char, ty: Handle<Type>) -> Nullable<Decl>;
    /// Null when no declaration has that name
    fn find_decl(env: Handle<Env>, name: *const c_char) -> Nullable<Decl>;
    fn decl_get_arity(decl: Handle<Decl>) -> usize;
    fn decl_get_name(decl: Handle<Decl>) -> *mut c_char;

    // Terms
    fn make_true(env: Handle<Env>) -> Nullable<Term>;
    fn make_false(env: Handle<Env>) -> Nullable<Term>;
    fn make_not(env: Handle<Env>, arg: Handle<Term>) -> Nullable<Term>;
    fn make_and(env: Handle<Env>, lhs: Handle<Term>, rhs: Handle<Term>) -> Nullable<Term>;
    fn make_or(env: Handle<Env>, lhs: Handle<Term>, rhs: Handle<Term>) -> Nullable<Term>;
    fn make_equal(env: Handle<Env>, lhs: Handle<Term>, rhs: Handle<Term>) -> Nullable<Term>;
    fn make_leq(env: Handle<Env>, lhs: Handle<Term>, rhs: Handle<Term>) -> Nullable<Term>;
    fn make_plus(env: Handle<Env>, lhs: Handle<Term>, rhs: Handle<Term>) -> Nullable<Term>;
    /// Integer or rational literal in decimal (`"-12"`, `"3/4"`)
    fn make_number(env: Handle<Env>, repr: *const c_char) -> Nullable<Term>;
    fn make_int_number(env: Handle<Env>, value: c_int) -> Nullable<Term>;
    fn make_bv_number(env: Handle<Env>, repr: *const c_char, width: usize, base: usize) -> Nullable<Term>;
    fn make_constant(env: Handle<Env>, decl: Handle<Decl>) -> Nullable<Term>;
    /// Application of `decl`; `args` holds exactly `decl_get_arity(decl)` terms
    fn make_uf(env: Handle<Env>, decl: Handle<Decl>, args: *const Handle<Term>) -> Nullable<Term>;
    fn from_smtlib2(env: Handle<Env>, data: *const c_char) -> Nullable<Term>;
    fn to_smtlib2(env: Handle<Env>, term: Handle<Term>) -> *mut c_char;
    fn term_repr(term: Handle<Term>) -> *mut c_char;
    fn term_id(term: Handle<Term>) -> usize;
    fn term_arity(term: Handle<Term>) -> usize;
    /// Null when `index` is out of range
    fn term_get_arg(term: Handle<Term>, index: usize) -> Nullable<Term>;
    fn term_get_type(term: Handle<Term>) -> Nullable<Type>;
    fn term_is_true(env: Handle<Env>, term: Handle<Term>) -> c_int;
    /// `to_protect` may be null when `num_to_protect` is zero
    fn simplify(
        env: Handle<Env>,
        formula: Handle<Term>,
        to_protect: *const Handle<Term>,
        num_to_protect: usize,
    ) -> Nullable<Term>;

    // Solving
    fn push_backtrack_point(env: Handle<Env>) -> c_int;
    fn pop_backtrack_point(env: Handle<Env>) -> c_int;
    fn num_backtrack_points(env: Handle<Env>) -> usize;
    fn assert_formula(env: Handle<Env>, formula: Handle<Term>) -> c_int;
    /// -1 unknown, 0 unsat, 1 sat
    fn solve(env: Handle<Env>) -> c_int;
    fn solve_with_assumptions(env: Handle<Env>, assumptions: *const Handle<Term>, num_assumptions: usize) -> c_int;
    fn get_unsat_core(env: Handle<Env>, out_size: *mut usize) -> *mut Nullable<Term>;
    fn get_unsat_assumptions(env: Handle<Env>, out_size: *mut usize) -> *mut Nullable<Term>;
    fn get_model_value(env: Handle<Env>, term: Handle<Term>) -> Nullable<Term>;

    // Model iteration
    fn create_model_iterator(env: Handle<Env>) -> Nullable<ModelIterator>;
    fn model_iterator_has_next(iter: Handle<ModelIterator>) -> c_int;
    fn model_iterator_next(
        iter: Handle<ModelIterator>,
        out_term: *mut Nullable<Term>,
        out_value: *mut Nullable<Term>,
    ) -> c_int;
    fn destroy_model_iterator(iter: Handle<ModelIterator>);

    // Callback hook points
    /// Install (or clear, with `None`) the termination test polled during search
    fn set_termination_test(env: Handle<Env>, func: Option<TerminationTestFn>, user_data: *mut c_void) -> c_int;
    /// Enumerate models over `important`; returns the model count or -1
    fn all_sat(
        env: Handle<Env>,
        important: *const Handle<Term>,
        num_important: usize,
        func: Option<AllSatModelFn>,
        user_data: *mut c_void,
    ) -> c_int;

    // Interpolation
    /// New group id, or -1
    fn create_itp_group(env: Handle<Env>) -> c_int;
    fn set_itp_group(env: Handle<Env>, group: c_int) -> c_int;
    fn get_interpolant(env: Handle<Env>, groups_of_a: *const c_int, num_groups: usize) -> Nullable<Term>;

    // Optimization
    /// `id`, `lower` and `upper` may each be null
    fn make_minimize(
        env: Handle<Env>,
        term: Handle<Term>,
        id: *const c_char,
        lower: *const c_char,
        upper: *const c_char,
    ) -> Nullable<Objective>;
    fn make_maximize(
        env: Handle<Env>,
        term: Handle<Term>,
        id: *const c_char,
        lower: *const c_char,
        upper: *const c_char,
    ) -> Nullable<Objective>;
    fn assert_objective(env: Handle<Env>, objective: Handle<Objective>) -> c_int;
    fn create_objective_iterator(env: Handle<Env>) -> Nullable<ObjectiveIterator>;
    fn objective_iterator_has_next(iter: Handle<ObjectiveIterator>) -> c_int;
    fn objective_iterator_next(iter: Handle<ObjectiveIterator>, out: *mut Nullable<Objective>) -> c_int;
    fn destroy_objective_iterator(iter: Handle<ObjectiveIterator>);
    /// `which`: 0 optimum, 1 lower bound, 2 upper bound
    fn objective_value_repr(env: Handle<Env>, objective: Handle<Objective>, which: c_int) -> *mut c_char;

    // Memory
    /// Release a string or array returned by the library
    fn free(ptr: *mut c_void);
}
