//! Host-facing bridged operations
//!
//! One method on [`Bridge`](crate::Bridge) per native function. Host values
//! cross as:
//! - handles: [`Wire`](crate::Wire) (`i64`), `0` rejected unless documented
//!   as "absent"
//! - sizes, widths, indices: `i64`
//! - small integers and group ids: `i32`
//! - strings: `&str` / `Option<&str>`; arbitrary-precision integers: `&BigInt`
//! - handle arrays: `&[Wire]`; group-id arrays: `&[i32]`

mod callbacks;
mod config_env;
mod interpolation;
mod model;
mod optimization;
mod solving;
mod terms;
mod types;

pub use optimization::ObjectiveValue;
