//! Solverlink bridge
//!
//! Marshaling layer between a managed host and an opaque-handle SMT solver
//! C API. Handles cross as 64-bit wire values, arguments are marshaled into
//! scoped guards, every native call goes through one generic dispatcher, and
//! native code can call back into host code for model enumeration and
//! cooperative termination.
//!
//! ```no_run
//! use solverlink_bridge::{Bridge, LoadedSolver, SolveResult, NULL_WIRE};
//! use solverlink_config::BridgeConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bridge = unsafe { Bridge::<LoadedSolver>::open(&BridgeConfig::default())? };
//! let cfg = bridge.create_default_config("QF_LRA")?;
//! let env = bridge.create_env(cfg, NULL_WIRE)?;
//! let t = bridge.make_true(env)?;
//! bridge.assert_formula(env, t)?;
//! assert_eq!(bridge.solve(env)?, SolveResult::Sat);
//! bridge.destroy_env(env)?;
//! bridge.destroy_config(cfg)?;
//! # Ok(())
//! # }
//! ```

pub mod api;
mod arrays;
mod bridge;
mod callbacks;
mod dispatch;
pub mod entry;
pub mod error;
pub mod handle;
pub mod logging;
mod marshal;
pub mod native;
pub mod stats;

pub use api::ObjectiveValue;
pub use bridge::Bridge;
pub use callbacks::{EnumerationSummary, TerminationTest};
pub use dispatch::SolveResult;
pub use entry::{entry_point, entry_points};
pub use error::{BridgeError, BridgeResult};
pub use handle::{decode, encode, Handle, HandleKind, Wire, NULL_WIRE};
pub use native::{LibraryLocator, LoadError, LoadedSolver, SolverLibrary};
pub use stats::{BridgeStats, StatsSnapshot};

/// Bridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
