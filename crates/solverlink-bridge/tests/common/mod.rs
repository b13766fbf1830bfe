//! In-memory stand-in for the native solver library
//!
//! Handles are fake addresses (never dereferenced). Every entry point counts
//! its calls, strings and arrays handed to the bridge are tracked until
//! `free`, and scripts drive unsat cores, model enumeration and termination
//! polling. The state lock is never held while a bridge callback runs.

#![allow(dead_code)]

use parking_lot::Mutex;
use solverlink_bridge::handle::{
    Config, Decl, Env, Handle, Kind, ModelIterator, Nullable, Objective, ObjectiveIterator, Term,
    Type,
};
use solverlink_bridge::native::{AllSatModelFn, SolverLibrary, TerminationTestFn};
use solverlink_bridge::{Bridge, Wire, NULL_WIRE};
use std::collections::{HashMap, HashSet};
use std::ffi::{c_char, c_int, c_void, CStr, CString};

pub fn bridge() -> Bridge<StubSolver> {
    Bridge::new(StubSolver::new())
}

/// Bridge with a config and a live environment
pub fn bridge_with_env() -> (Bridge<StubSolver>, Wire, Wire) {
    let bridge = bridge();
    let cfg = bridge.create_config().unwrap();
    let env = bridge.create_env(cfg, NULL_WIRE).unwrap();
    (bridge, cfg, env)
}

fn handle<K: Kind>(addr: usize) -> Handle<K> {
    Handle::new(addr as *mut c_void).unwrap()
}

fn text(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

enum Allocation {
    Text(*mut c_char),
    Terms(*mut Nullable<Term>, usize),
}

#[derive(Default)]
struct Registration {
    func: Option<TerminationTestFn>,
    user_data: usize,
}

#[derive(Default)]
struct State {
    next_addr: usize,
    calls: HashMap<&'static str, usize>,
    fail_next: HashMap<&'static str, String>,
    last_error: HashMap<usize, CString>,

    configs: HashSet<usize>,
    envs: HashSet<usize>,
    reuse_env_addresses: bool,
    freed_envs: Vec<usize>,
    types: HashMap<usize, (String, usize)>,
    decls: HashMap<usize, (String, usize)>,
    terms: HashMap<usize, (String, Vec<usize>)>,
    backtrack_points: usize,
    asserted: Vec<usize>,
    last_assumptions: Vec<usize>,
    last_interpolant_groups: Vec<c_int>,
    next_group: c_int,
    numerals: Vec<String>,
    objectives: Vec<(usize, Option<String>, Option<String>, Option<String>)>,
    asserted_objectives: Vec<usize>,
    model_iterators: HashMap<usize, Vec<(usize, usize)>>,
    objective_iterators: HashMap<usize, Vec<usize>>,

    terminations: HashMap<usize, Registration>,
    polls_per_solve: usize,
    verdict: c_int,
    unsat_core: Vec<usize>,
    models: Vec<Vec<usize>>,
    model_assignments: Vec<(usize, usize)>,

    allocations: HashMap<usize, Allocation>,
    frees: usize,
    bad_frees: usize,
}

pub struct StubSolver {
    state: Mutex<State>,
}

impl StubSolver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_addr: 0x1000,
                verdict: 1,
                ..State::default()
            }),
        }
    }

    /// Hand destroyed environments' addresses to later `create_env` calls,
    /// most recently freed first
    pub fn reuse_env_addresses(&self) {
        self.state.lock().reuse_env_addresses = true;
    }

    /// Times `symbol` was called
    pub fn calls(&self, symbol: &str) -> usize {
        self.state.lock().calls.get(symbol).copied().unwrap_or(0)
    }

    /// Calls across every symbol
    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }

    /// Make the next call of `symbol` fail, with `message` as the
    /// environment's last error
    pub fn fail_next(&self, symbol: &'static str, message: &str) {
        self.state.lock().fail_next.insert(symbol, message.to_string());
    }

    /// Unsat core (and unsat assumptions) to report; `0` entries are null
    pub fn script_unsat_core(&self, core: &[Wire]) {
        self.state.lock().unsat_core = core.iter().map(|&w| w as usize).collect();
    }

    /// Models `all_sat` reports, in order; `0` entries are null
    pub fn script_models(&self, models: Vec<Vec<Wire>>) {
        self.state.lock().models = models
            .into_iter()
            .map(|m| m.into_iter().map(|w| w as usize).collect())
            .collect();
    }

    /// Polls of the termination test per `solve`, and the verdict of a
    /// search that runs to completion
    pub fn script_solve(&self, polls: usize, verdict: c_int) {
        let mut state = self.state.lock();
        state.polls_per_solve = polls;
        state.verdict = verdict;
    }

    pub fn script_model(&self, assignments: &[(Wire, Wire)]) {
        self.state.lock().model_assignments = assignments
            .iter()
            .map(|&(t, v)| (t as usize, v as usize))
            .collect();
    }

    /// Native allocations handed out and not yet freed
    pub fn outstanding_allocations(&self) -> usize {
        self.state.lock().allocations.len()
    }

    pub fn frees(&self) -> usize {
        self.state.lock().frees
    }

    /// `free` calls on pointers the stub never handed out (or freed twice)
    pub fn bad_frees(&self) -> usize {
        self.state.lock().bad_frees
    }

    pub fn has_termination_test(&self, env: Wire) -> bool {
        self.state
            .lock()
            .terminations
            .get(&(env as usize))
            .map_or(false, |r| r.func.is_some())
    }

    pub fn numerals(&self) -> Vec<String> {
        self.state.lock().numerals.clone()
    }

    pub fn last_assumptions(&self) -> Vec<Wire> {
        self.state.lock().last_assumptions.iter().map(|&a| a as Wire).collect()
    }

    pub fn last_interpolant_groups(&self) -> Vec<i32> {
        self.state.lock().last_interpolant_groups.clone()
    }

    pub fn objectives(&self) -> Vec<(Option<String>, Option<String>, Option<String>)> {
        self.state
            .lock()
            .objectives
            .iter()
            .map(|(_, id, lo, hi)| (id.clone(), lo.clone(), hi.clone()))
            .collect()
    }

    pub fn term_repr_of(&self, term: Wire) -> Option<String> {
        self.state.lock().terms.get(&(term as usize)).map(|(r, _)| r.clone())
    }

    /// Count the call; true if it should fail (last error set for `env`)
    fn enter(&self, symbol: &'static str, env: Option<Handle<Env>>) -> bool {
        let mut state = self.state.lock();
        *state.calls.entry(symbol).or_insert(0) += 1;
        match state.fail_next.remove(symbol) {
            Some(message) => {
                if let Some(env) = env {
                    let message = CString::new(message).unwrap();
                    state.last_error.insert(env.addr(), message);
                }
                true
            }
            None => false,
        }
    }

    fn env_address(&self) -> usize {
        let recycled = {
            let mut state = self.state.lock();
            if state.reuse_env_addresses {
                state.freed_envs.pop()
            } else {
                None
            }
        };
        recycled.unwrap_or_else(|| self.fresh())
    }

    fn fresh(&self) -> usize {
        let mut state = self.state.lock();
        state.next_addr += 0x10;
        state.next_addr
    }

    fn new_term(&self, repr: String, args: Vec<usize>) -> Nullable<Term> {
        let addr = self.fresh();
        self.state.lock().terms.insert(addr, (repr, args));
        Some(handle(addr))
    }

    fn new_type(&self, repr: String, arity: usize) -> Nullable<Type> {
        let addr = self.fresh();
        self.state.lock().types.insert(addr, (repr, arity));
        Some(handle(addr))
    }

    fn repr(&self, term: usize) -> String {
        self.state
            .lock()
            .terms
            .get(&term)
            .map(|(r, _)| r.clone())
            .unwrap_or_else(|| format!("t{:x}", term))
    }

    fn alloc_text(&self, value: &str) -> *mut c_char {
        let ptr = CString::new(value).unwrap().into_raw();
        self.state
            .lock()
            .allocations
            .insert(ptr as usize, Allocation::Text(ptr));
        ptr
    }

    fn alloc_terms(&self, terms: &[usize]) -> (*mut Nullable<Term>, usize) {
        let boxed: Box<[Nullable<Term>]> = terms
            .iter()
            .map(|&a| Handle::new(a as *mut c_void))
            .collect();
        let len = boxed.len();
        let ptr = Box::into_raw(boxed) as *mut Nullable<Term>;
        self.state
            .lock()
            .allocations
            .insert(ptr as usize, Allocation::Terms(ptr, len));
        (ptr, len)
    }

    fn term_op(&self, symbol: &'static str, env: Handle<Env>, op: &str, args: &[Handle<Term>]) -> Nullable<Term> {
        if self.enter(symbol, Some(env)) {
            return None;
        }
        let reprs: Vec<String> = args.iter().map(|a| self.repr(a.addr())).collect();
        self.new_term(
            format!("({} {})", op, reprs.join(" ")),
            args.iter().map(|a| a.addr()).collect(),
        )
    }

    fn output_terms(&self, symbol: &'static str, env: Handle<Env>, out_size: *mut usize) -> *mut Nullable<Term> {
        if self.enter(symbol, Some(env)) {
            return std::ptr::null_mut();
        }
        let core = self.state.lock().unsat_core.clone();
        let (ptr, len) = self.alloc_terms(&core);
        unsafe { *out_size = len };
        ptr
    }

    fn poll_then(&self, env: Handle<Env>) -> c_int {
        let (func, user_data, polls, verdict) = {
            let state = self.state.lock();
            let registration = state.terminations.get(&env.addr());
            (
                registration.and_then(|r| r.func),
                registration.map_or(0, |r| r.user_data),
                state.polls_per_solve,
                state.verdict,
            )
        };
        if let Some(func) = func {
            for _ in 0..polls {
                if unsafe { func(user_data as *mut c_void) } != 0 {
                    return -1;
                }
            }
        }
        verdict
    }

    fn objective(
        &self,
        symbol: &'static str,
        env: Handle<Env>,
        term: Handle<Term>,
        id: *const c_char,
        lower: *const c_char,
        upper: *const c_char,
    ) -> Nullable<Objective> {
        if self.enter(symbol, Some(env)) {
            return None;
        }
        let opt = |p: *const c_char| (!p.is_null()).then(|| text(p));
        let addr = self.fresh();
        self.state
            .lock()
            .objectives
            .push((addr, opt(id), opt(lower), opt(upper)));
        let _ = term;
        Some(handle(addr))
    }
}

impl Default for StubSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StubSolver {
    fn drop(&mut self) {
        for (_, allocation) in self.state.get_mut().allocations.drain() {
            match allocation {
                Allocation::Text(ptr) => drop(unsafe { CString::from_raw(ptr) }),
                Allocation::Terms(ptr, len) => drop(unsafe {
                    Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len))
                }),
            }
        }
    }
}

impl SolverLibrary for StubSolver {
    unsafe fn create_config(&self) -> Nullable<Config> {
        if self.enter("msat_create_config", None) {
            return None;
        }
        let addr = self.fresh();
        self.state.lock().configs.insert(addr);
        Some(handle(addr))
    }

    unsafe fn create_default_config(&self, logic: *const c_char) -> Nullable<Config> {
        if self.enter("msat_create_default_config", None) || text(logic).is_empty() {
            return None;
        }
        let addr = self.fresh();
        self.state.lock().configs.insert(addr);
        Some(handle(addr))
    }

    unsafe fn parse_config(&self, data: *const c_char) -> Nullable<Config> {
        if self.enter("msat_parse_config", None) || !text(data).contains('=') {
            return None;
        }
        let addr = self.fresh();
        self.state.lock().configs.insert(addr);
        Some(handle(addr))
    }

    unsafe fn set_option(&self, cfg: Handle<Config>, option: *const c_char, value: *const c_char) -> c_int {
        if self.enter("msat_set_option", None) {
            return 1;
        }
        let _ = (text(option), text(value));
        c_int::from(!self.state.lock().configs.contains(&cfg.addr()))
    }

    unsafe fn destroy_config(&self, cfg: Handle<Config>) {
        self.enter("msat_destroy_config", None);
        self.state.lock().configs.remove(&cfg.addr());
    }

    unsafe fn create_env(&self, cfg: Handle<Config>) -> Nullable<Env> {
        if self.enter("msat_create_env", None) || !self.state.lock().configs.contains(&cfg.addr()) {
            return None;
        }
        let addr = self.env_address();
        self.state.lock().envs.insert(addr);
        Some(handle(addr))
    }

    unsafe fn create_shared_env(&self, cfg: Handle<Config>, sibling: Handle<Env>) -> Nullable<Env> {
        if self.enter("msat_create_shared_env", Some(sibling)) {
            return None;
        }
        let _ = cfg;
        let addr = self.env_address();
        self.state.lock().envs.insert(addr);
        Some(handle(addr))
    }

    unsafe fn destroy_env(&self, env: Handle<Env>) {
        self.enter("msat_destroy_env", None);
        let mut state = self.state.lock();
        if state.envs.remove(&env.addr()) {
            state.freed_envs.push(env.addr());
        }
        state.terminations.remove(&env.addr());
        state.last_error.remove(&env.addr());
    }

    unsafe fn reset_env(&self, env: Handle<Env>) -> c_int {
        if self.enter("msat_reset_env", Some(env)) {
            return 1;
        }
        let mut state = self.state.lock();
        state.asserted.clear();
        state.backtrack_points = 0;
        0
    }

    unsafe fn last_error_message(&self, env: Handle<Env>) -> *const c_char {
        self.enter("msat_last_error_message", None);
        self.state
            .lock()
            .last_error
            .get(&env.addr())
            .map_or(std::ptr::null(), |m| m.as_ptr())
    }

    unsafe fn get_bool_type(&self, env: Handle<Env>) -> Nullable<Type> {
        if self.enter("msat_get_bool_type", Some(env)) {
            return None;
        }
        self.new_type("Bool".to_string(), 0)
    }

    unsafe fn get_integer_type(&self, env: Handle<Env>) -> Nullable<Type> {
        if self.enter("msat_get_integer_type", Some(env)) {
            return None;
        }
        self.new_type("Int".to_string(), 0)
    }

    unsafe fn get_rational_type(&self, env: Handle<Env>) -> Nullable<Type> {
        if self.enter("msat_get_rational_type", Some(env)) {
            return None;
        }
        self.new_type("Real".to_string(), 0)
    }

    unsafe fn get_bv_type(&self, env: Handle<Env>, width: usize) -> Nullable<Type> {
        if self.enter("msat_get_bv_type", Some(env)) {
            return None;
        }
        self.new_type(format!("(_ BitVec {})", width), 0)
    }

    unsafe fn get_array_type(&self, env: Handle<Env>, index: Handle<Type>, element: Handle<Type>) -> Nullable<Type> {
        if self.enter("msat_get_array_type", Some(env)) {
            return None;
        }
        let (i, e) = {
            let state = self.state.lock();
            (
                state.types.get(&index.addr()).map(|t| t.0.clone()).unwrap_or_default(),
                state.types.get(&element.addr()).map(|t| t.0.clone()).unwrap_or_default(),
            )
        };
        self.new_type(format!("(Array {} {})", i, e), 0)
    }

    unsafe fn get_function_type(
        &self,
        env: Handle<Env>,
        params: *const Handle<Type>,
        num_params: usize,
        result: Handle<Type>,
    ) -> Nullable<Type> {
        if self.enter("msat_get_function_type", Some(env)) {
            return None;
        }
        let params: Vec<Handle<Type>> = if num_params == 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(params, num_params).to_vec()
        };
        let names = {
            let state = self.state.lock();
            params
                .iter()
                .chain(std::iter::once(&result))
                .map(|t| state.types.get(&t.addr()).map(|t| t.0.clone()).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(" ")
        };
        self.new_type(format!("(-> {})", names), num_params)
    }

    unsafe fn is_bv_type(&self, env: Handle<Env>, ty: Handle<Type>, out_width: *mut usize) -> c_int {
        self.enter("msat_is_bv_type", Some(env));
        let repr = self.state.lock().types.get(&ty.addr()).map(|t| t.0.clone());
        match repr.as_deref().and_then(|r| r.strip_prefix("(_ BitVec ")) {
            Some(rest) => {
                *out_width = rest.trim_end_matches(')').parse().unwrap_or(0);
                1
            }
            None => 0,
        }
    }

    unsafe fn type_repr(&self, ty: Handle<Type>) -> *mut c_char {
        if self.enter("msat_type_repr", None) {
            return std::ptr::null_mut();
        }
        let repr = self.state.lock().types.get(&ty.addr()).map(|t| t.0.clone());
        repr.map_or(std::ptr::null_mut(), |r| self.alloc_text(&r))
    }

    unsafe fn declare_function(&self, env: Handle<Env>, name: *const c_char, ty: Handle<Type>) -> Nullable<Decl> {
        if self.enter("msat_declare_function", Some(env)) {
            return None;
        }
        let arity = self.state.lock().types.get(&ty.addr()).map_or(0, |t| t.1);
        let addr = self.fresh();
        self.state.lock().decls.insert(addr, (text(name), arity));
        Some(handle(addr))
    }

    unsafe fn find_decl(&self, env: Handle<Env>, name: *const c_char) -> Nullable<Decl> {
        self.enter("msat_find_decl", Some(env));
        let name = text(name);
        let state = self.state.lock();
        state
            .decls
            .iter()
            .find(|(_, (n, _))| *n == name)
            .map(|(&addr, _)| handle(addr))
    }

    unsafe fn decl_get_arity(&self, decl: Handle<Decl>) -> usize {
        self.enter("msat_decl_get_arity", None);
        self.state.lock().decls.get(&decl.addr()).map_or(0, |d| d.1)
    }

    unsafe fn decl_get_name(&self, decl: Handle<Decl>) -> *mut c_char {
        self.enter("msat_decl_get_name", None);
        let name = self.state.lock().decls.get(&decl.addr()).map(|d| d.0.clone());
        name.map_or(std::ptr::null_mut(), |n| self.alloc_text(&n))
    }

    unsafe fn make_true(&self, env: Handle<Env>) -> Nullable<Term> {
        if self.enter("msat_make_true", Some(env)) {
            return None;
        }
        self.new_term("true".to_string(), Vec::new())
    }

    unsafe fn make_false(&self, env: Handle<Env>) -> Nullable<Term> {
        if self.enter("msat_make_false", Some(env)) {
            return None;
        }
        self.new_term("false".to_string(), Vec::new())
    }

    unsafe fn make_not(&self, env: Handle<Env>, arg: Handle<Term>) -> Nullable<Term> {
        self.term_op("msat_make_not", env, "not", &[arg])
    }

    unsafe fn make_and(&self, env: Handle<Env>, lhs: Handle<Term>, rhs: Handle<Term>) -> Nullable<Term> {
        self.term_op("msat_make_and", env, "and", &[lhs, rhs])
    }

    unsafe fn make_or(&self, env: Handle<Env>, lhs: Handle<Term>, rhs: Handle<Term>) -> Nullable<Term> {
        self.term_op("msat_make_or", env, "or", &[lhs, rhs])
    }

    unsafe fn make_equal(&self, env: Handle<Env>, lhs: Handle<Term>, rhs: Handle<Term>) -> Nullable<Term> {
        self.term_op("msat_make_equal", env, "=", &[lhs, rhs])
    }

    unsafe fn make_leq(&self, env: Handle<Env>, lhs: Handle<Term>, rhs: Handle<Term>) -> Nullable<Term> {
        self.term_op("msat_make_leq", env, "<=", &[lhs, rhs])
    }

    unsafe fn make_plus(&self, env: Handle<Env>, lhs: Handle<Term>, rhs: Handle<Term>) -> Nullable<Term> {
        self.term_op("msat_make_plus", env, "+", &[lhs, rhs])
    }

    unsafe fn make_number(&self, env: Handle<Env>, repr: *const c_char) -> Nullable<Term> {
        if self.enter("msat_make_number", Some(env)) {
            return None;
        }
        let repr = text(repr);
        self.state.lock().numerals.push(repr.clone());
        self.new_term(repr, Vec::new())
    }

    unsafe fn make_int_number(&self, env: Handle<Env>, value: c_int) -> Nullable<Term> {
        if self.enter("msat_make_int_number", Some(env)) {
            return None;
        }
        self.new_term(value.to_string(), Vec::new())
    }

    unsafe fn make_bv_number(&self, env: Handle<Env>, repr: *const c_char, width: usize, base: usize) -> Nullable<Term> {
        if self.enter("msat_make_bv_number", Some(env)) {
            return None;
        }
        let repr = text(repr);
        self.state.lock().numerals.push(repr.clone());
        self.new_term(format!("(_ bv{} {}) base {}", repr, width, base), Vec::new())
    }

    unsafe fn make_constant(&self, env: Handle<Env>, decl: Handle<Decl>) -> Nullable<Term> {
        if self.enter("msat_make_constant", Some(env)) {
            return None;
        }
        let name = self.state.lock().decls.get(&decl.addr()).map(|d| d.0.clone());
        self.new_term(name.unwrap_or_default(), Vec::new())
    }

    unsafe fn make_uf(&self, env: Handle<Env>, decl: Handle<Decl>, args: *const Handle<Term>) -> Nullable<Term> {
        if self.enter("msat_make_uf", Some(env)) {
            return None;
        }
        let (name, arity) = self
            .state
            .lock()
            .decls
            .get(&decl.addr())
            .cloned()
            .unwrap_or_default();
        let args: Vec<Handle<Term>> = if arity == 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(args, arity).to_vec()
        };
        let reprs: Vec<String> = args.iter().map(|a| self.repr(a.addr())).collect();
        self.new_term(
            format!("({} {})", name, reprs.join(" ")),
            args.iter().map(|a| a.addr()).collect(),
        )
    }

    unsafe fn from_smtlib2(&self, env: Handle<Env>, data: *const c_char) -> Nullable<Term> {
        if self.enter("msat_from_smtlib2", Some(env)) {
            return None;
        }
        self.new_term(text(data), Vec::new())
    }

    unsafe fn to_smtlib2(&self, env: Handle<Env>, term: Handle<Term>) -> *mut c_char {
        if self.enter("msat_to_smtlib2", Some(env)) {
            return std::ptr::null_mut();
        }
        let repr = self.repr(term.addr());
        self.alloc_text(&repr)
    }

    unsafe fn term_repr(&self, term: Handle<Term>) -> *mut c_char {
        if self.enter("msat_term_repr", None) {
            return std::ptr::null_mut();
        }
        let repr = self.repr(term.addr());
        self.alloc_text(&repr)
    }

    unsafe fn term_id(&self, term: Handle<Term>) -> usize {
        self.enter("msat_term_id", None);
        term.addr() / 0x10
    }

    unsafe fn term_arity(&self, term: Handle<Term>) -> usize {
        self.enter("msat_term_arity", None);
        self.state.lock().terms.get(&term.addr()).map_or(0, |t| t.1.len())
    }

    unsafe fn term_get_arg(&self, term: Handle<Term>, index: usize) -> Nullable<Term> {
        self.enter("msat_term_get_arg", None);
        let state = self.state.lock();
        state
            .terms
            .get(&term.addr())
            .and_then(|t| t.1.get(index))
            .map(|&a| handle(a))
    }

    unsafe fn term_get_type(&self, term: Handle<Term>) -> Nullable<Type> {
        if self.enter("msat_term_get_type", None) {
            return None;
        }
        let _ = term;
        self.new_type("Bool".to_string(), 0)
    }

    unsafe fn term_is_true(&self, env: Handle<Env>, term: Handle<Term>) -> c_int {
        self.enter("msat_term_is_true", Some(env));
        c_int::from(self.repr(term.addr()) == "true")
    }

    unsafe fn simplify(
        &self,
        env: Handle<Env>,
        formula: Handle<Term>,
        to_protect: *const Handle<Term>,
        num_to_protect: usize,
    ) -> Nullable<Term> {
        if self.enter("msat_simplify", Some(env)) {
            return None;
        }
        if num_to_protect > 0 {
            let _ = std::slice::from_raw_parts(to_protect, num_to_protect);
        }
        Some(formula)
    }

    unsafe fn push_backtrack_point(&self, env: Handle<Env>) -> c_int {
        if self.enter("msat_push_backtrack_point", Some(env)) {
            return 1;
        }
        self.state.lock().backtrack_points += 1;
        0
    }

    unsafe fn pop_backtrack_point(&self, env: Handle<Env>) -> c_int {
        if self.enter("msat_pop_backtrack_point", Some(env)) {
            return 1;
        }
        let mut state = self.state.lock();
        if state.backtrack_points == 0 {
            let message = CString::new("no backtrack point to pop").unwrap();
            state.last_error.insert(env.addr(), message);
            return 1;
        }
        state.backtrack_points -= 1;
        0
    }

    unsafe fn num_backtrack_points(&self, env: Handle<Env>) -> usize {
        self.enter("msat_num_backtrack_points", Some(env));
        self.state.lock().backtrack_points
    }

    unsafe fn assert_formula(&self, env: Handle<Env>, formula: Handle<Term>) -> c_int {
        if self.enter("msat_assert_formula", Some(env)) {
            return 1;
        }
        self.state.lock().asserted.push(formula.addr());
        0
    }

    unsafe fn solve(&self, env: Handle<Env>) -> c_int {
        if self.enter("msat_solve", Some(env)) {
            return 7;
        }
        self.poll_then(env)
    }

    unsafe fn solve_with_assumptions(
        &self,
        env: Handle<Env>,
        assumptions: *const Handle<Term>,
        num_assumptions: usize,
    ) -> c_int {
        if self.enter("msat_solve_with_assumptions", Some(env)) {
            return 7;
        }
        let assumptions: Vec<usize> = if num_assumptions == 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(assumptions, num_assumptions)
                .iter()
                .map(|a| a.addr())
                .collect()
        };
        self.state.lock().last_assumptions = assumptions;
        self.poll_then(env)
    }

    unsafe fn get_unsat_core(&self, env: Handle<Env>, out_size: *mut usize) -> *mut Nullable<Term> {
        self.output_terms("msat_get_unsat_core", env, out_size)
    }

    unsafe fn get_unsat_assumptions(&self, env: Handle<Env>, out_size: *mut usize) -> *mut Nullable<Term> {
        self.output_terms("msat_get_unsat_assumptions", env, out_size)
    }

    unsafe fn get_model_value(&self, env: Handle<Env>, term: Handle<Term>) -> Nullable<Term> {
        if self.enter("msat_get_model_value", Some(env)) {
            return None;
        }
        let repr = self.repr(term.addr());
        self.new_term(format!("value of {}", repr), Vec::new())
    }

    unsafe fn create_model_iterator(&self, env: Handle<Env>) -> Nullable<ModelIterator> {
        if self.enter("msat_create_model_iterator", Some(env)) {
            return None;
        }
        let addr = self.fresh();
        let mut state = self.state.lock();
        let mut assignments = state.model_assignments.clone();
        assignments.reverse();
        state.model_iterators.insert(addr, assignments);
        Some(handle(addr))
    }

    unsafe fn model_iterator_has_next(&self, iter: Handle<ModelIterator>) -> c_int {
        self.enter("msat_model_iterator_has_next", None);
        let state = self.state.lock();
        c_int::from(state.model_iterators.get(&iter.addr()).map_or(false, |a| !a.is_empty()))
    }

    unsafe fn model_iterator_next(
        &self,
        iter: Handle<ModelIterator>,
        out_term: *mut Nullable<Term>,
        out_value: *mut Nullable<Term>,
    ) -> c_int {
        if self.enter("msat_model_iterator_next", None) {
            return 1;
        }
        let next = self
            .state
            .lock()
            .model_iterators
            .get_mut(&iter.addr())
            .and_then(|a| a.pop());
        match next {
            Some((term, value)) => {
                *out_term = Handle::new(term as *mut c_void);
                *out_value = Handle::new(value as *mut c_void);
                0
            }
            None => 1,
        }
    }

    unsafe fn destroy_model_iterator(&self, iter: Handle<ModelIterator>) {
        self.enter("msat_destroy_model_iterator", None);
        self.state.lock().model_iterators.remove(&iter.addr());
    }

    unsafe fn set_termination_test(&self, env: Handle<Env>, func: Option<TerminationTestFn>, user_data: *mut c_void) -> c_int {
        if self.enter("msat_set_termination_test", Some(env)) {
            return 1;
        }
        self.state.lock().terminations.insert(
            env.addr(),
            Registration {
                func,
                user_data: user_data as usize,
            },
        );
        0
    }

    unsafe fn all_sat(
        &self,
        env: Handle<Env>,
        important: *const Handle<Term>,
        num_important: usize,
        func: Option<AllSatModelFn>,
        user_data: *mut c_void,
    ) -> c_int {
        if self.enter("msat_all_sat", Some(env)) {
            return -1;
        }
        if num_important > 0 {
            let _ = std::slice::from_raw_parts(important, num_important);
        }
        let Some(func) = func else {
            return -1;
        };

        let models = self.state.lock().models.clone();
        let mut delivered = 0;
        for model in models {
            let mut values: Vec<Nullable<Term>> = model
                .iter()
                .map(|&a| Handle::new(a as *mut c_void))
                .collect();
            delivered += 1;
            if func(values.as_mut_ptr(), values.len() as c_int, user_data) == 0 {
                break;
            }
        }
        delivered
    }

    unsafe fn create_itp_group(&self, env: Handle<Env>) -> c_int {
        if self.enter("msat_create_itp_group", Some(env)) {
            return -1;
        }
        let mut state = self.state.lock();
        let group = state.next_group;
        state.next_group += 1;
        group
    }

    unsafe fn set_itp_group(&self, env: Handle<Env>, group: c_int) -> c_int {
        if self.enter("msat_set_itp_group", Some(env)) {
            return 1;
        }
        c_int::from(group < 0 || group >= self.state.lock().next_group)
    }

    unsafe fn get_interpolant(&self, env: Handle<Env>, groups_of_a: *const c_int, num_groups: usize) -> Nullable<Term> {
        if self.enter("msat_get_interpolant", Some(env)) {
            return None;
        }
        let groups = if num_groups == 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(groups_of_a, num_groups).to_vec()
        };
        self.state.lock().last_interpolant_groups = groups;
        self.new_term("interpolant".to_string(), Vec::new())
    }

    unsafe fn make_minimize(
        &self,
        env: Handle<Env>,
        term: Handle<Term>,
        id: *const c_char,
        lower: *const c_char,
        upper: *const c_char,
    ) -> Nullable<Objective> {
        self.objective("msat_make_minimize", env, term, id, lower, upper)
    }

    unsafe fn make_maximize(
        &self,
        env: Handle<Env>,
        term: Handle<Term>,
        id: *const c_char,
        lower: *const c_char,
        upper: *const c_char,
    ) -> Nullable<Objective> {
        self.objective("msat_make_maximize", env, term, id, lower, upper)
    }

    unsafe fn assert_objective(&self, env: Handle<Env>, objective: Handle<Objective>) -> c_int {
        if self.enter("msat_assert_objective", Some(env)) {
            return 1;
        }
        self.state.lock().asserted_objectives.push(objective.addr());
        0
    }

    unsafe fn create_objective_iterator(&self, env: Handle<Env>) -> Nullable<ObjectiveIterator> {
        if self.enter("msat_create_objective_iterator", Some(env)) {
            return None;
        }
        let addr = self.fresh();
        let mut state = self.state.lock();
        let mut objectives = state.asserted_objectives.clone();
        objectives.reverse();
        state.objective_iterators.insert(addr, objectives);
        Some(handle(addr))
    }

    unsafe fn objective_iterator_has_next(&self, iter: Handle<ObjectiveIterator>) -> c_int {
        self.enter("msat_objective_iterator_has_next", None);
        let state = self.state.lock();
        c_int::from(state.objective_iterators.get(&iter.addr()).map_or(false, |o| !o.is_empty()))
    }

    unsafe fn objective_iterator_next(&self, iter: Handle<ObjectiveIterator>, out: *mut Nullable<Objective>) -> c_int {
        if self.enter("msat_objective_iterator_next", None) {
            return 1;
        }
        let next = self
            .state
            .lock()
            .objective_iterators
            .get_mut(&iter.addr())
            .and_then(|o| o.pop());
        match next {
            Some(addr) => {
                *out = Handle::new(addr as *mut c_void);
                0
            }
            None => 1,
        }
    }

    unsafe fn destroy_objective_iterator(&self, iter: Handle<ObjectiveIterator>) {
        self.enter("msat_destroy_objective_iterator", None);
        self.state.lock().objective_iterators.remove(&iter.addr());
    }

    unsafe fn objective_value_repr(&self, env: Handle<Env>, objective: Handle<Objective>, which: c_int) -> *mut c_char {
        if self.enter("msat_objective_value_repr", Some(env)) {
            return std::ptr::null_mut();
        }
        let _ = objective;
        let value = match which {
            0 => "42",
            1 => "-inf",
            2 => "+inf",
            _ => return std::ptr::null_mut(),
        };
        self.alloc_text(value)
    }

    unsafe fn free(&self, ptr: *mut c_void) {
        self.enter("msat_free", None);
        let allocation = self.state.lock().allocations.remove(&(ptr as usize));
        match allocation {
            Some(Allocation::Text(p)) => drop(CString::from_raw(p)),
            Some(Allocation::Terms(p, len)) => {
                drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(p, len)))
            }
            None => {
                self.state.lock().bad_frees += 1;
                return;
            }
        }
        self.state.lock().frees += 1;
    }
}
