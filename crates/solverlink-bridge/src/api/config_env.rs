//! Configurations and environments

use crate::bridge::Bridge;
use crate::dispatch::{CallSite, HandleOut, StatusCode, Unit};
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{encode, Config, Env, Wire};
use crate::native::SolverLibrary;

impl<L: SolverLibrary> Bridge<L> {
    pub fn create_config(&self) -> BridgeResult<Wire> {
        self.dispatch(CallSite::global("msat_create_config"), HandleOut::new(), |lib| unsafe {
            lib.create_config()
        })
    }

    /// Default configuration for an SMT-LIB logic (`"QF_LRA"`, ...)
    pub fn create_default_config(&self, logic: &str) -> BridgeResult<Wire> {
        let logic = self.string(logic, "logic")?;
        self.dispatch(
            CallSite::global("msat_create_default_config"),
            HandleOut::new(),
            |lib| unsafe { lib.create_default_config(logic.as_ptr()) },
        )
    }

    /// Configuration from `key = value` lines
    pub fn parse_config(&self, data: &str) -> BridgeResult<Wire> {
        let data = self.string(data, "configuration text")?;
        self.dispatch(CallSite::global("msat_parse_config"), HandleOut::new(), |lib| unsafe {
            lib.parse_config(data.as_ptr())
        })
    }

    pub fn set_option(&self, config: Wire, option: &str, value: &str) -> BridgeResult<()> {
        let config = self.handle::<Config>(config)?;
        let option = self.string(option, "option name")?;
        let value = self.string(value, "option value")?;
        self.dispatch(CallSite::global("msat_set_option"), StatusCode, |lib| unsafe {
            lib.set_option(config, option.as_ptr(), value.as_ptr())
        })
    }

    pub fn destroy_config(&self, config: Wire) -> BridgeResult<()> {
        self.handle_call("msat_destroy_config", Unit, config, L::destroy_config)
    }

    /// Create an environment from `config`
    ///
    /// `sibling` is the one handle argument where `0` is accepted: it means
    /// "no sibling". A non-null sibling makes the new environment share its
    /// term manager (`msat_create_shared_env`).
    pub fn create_env(&self, config: Wire, sibling: Wire) -> BridgeResult<Wire> {
        let config = self.handle::<Config>(config)?;
        let sibling = self.optional_handle::<Env>(sibling)?;

        let (site, created) = match sibling {
            None => {
                let site = CallSite::global("msat_create_env");
                (site, self.invoke(&site, |lib| unsafe { lib.create_env(config) }))
            }
            Some(sibling) => {
                let site = CallSite::env("msat_create_shared_env", sibling);
                (
                    site,
                    self.invoke(&site, |lib| unsafe { lib.create_shared_env(config, sibling) }),
                )
            }
        };

        let env = created.ok_or_else(|| self.native_failure(&site, "returned a null environment"))?;
        self.track_env(env);
        tracing::debug!(env = ?env, "environment created");
        Ok(encode(env))
    }

    /// Destroy an environment created by this bridge
    ///
    /// Destroying an environment that is not live (already destroyed, or not
    /// created here) is rejected without calling native code.
    pub fn destroy_env(&self, env: Wire) -> BridgeResult<()> {
        let env = self.handle::<Env>(env)?;
        if !self.untrack_env(env) {
            return Err(BridgeError::invalid_argument(format!(
                "environment {:#x} is not live",
                encode(env)
            )));
        }
        self.dispatch(CallSite::env("msat_destroy_env", env), Unit, |lib| unsafe {
            lib.destroy_env(env)
        })
    }

    pub fn reset_env(&self, env: Wire) -> BridgeResult<()> {
        self.env_call("msat_reset_env", StatusCode, env, L::reset_env)
    }

    /// Text of the most recent failure on `env`; empty if there is none
    pub fn last_error_message(&self, env: Wire) -> BridgeResult<String> {
        let env = self.handle::<Env>(env)?;
        Ok(self.last_error(env).unwrap_or_default())
    }
}
