//! Module execution and failure policy.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use aether_core::{AetherError, Environment};
use futures::FutureExt;

use crate::module::{Module, ModuleError};
use crate::output::ModuleOutput;

/// What happens to the page when a module fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The failure aborts the render.
    Strict,
    /// The failure is logged and the module's slot stays empty.
    Lenient,
}

impl FailurePolicy {
    /// Strict everywhere except production.
    pub fn for_env(env: Environment) -> Self {
        if env.is_strict() {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

/// Runs modules and applies the failure policy.
#[derive(Debug, Clone, Copy)]
pub struct ModuleRunner {
    policy: FailurePolicy,
}

impl ModuleRunner {
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Run a module. A panic is reported as [`ModuleError::Panicked`].
    pub async fn run(
        &self,
        name: &str,
        module: &mut dyn Module,
    ) -> Result<ModuleOutput, ModuleError> {
        let start = Instant::now();
        let result = match AssertUnwindSafe(module.run()).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(ModuleError::Panicked(panic_message(payload.as_ref()))),
        };
        tracing::debug!(
            module = %name,
            elapsed_us = start.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "module run"
        );
        result
    }

    /// Apply the policy to a module failure.
    ///
    /// Returns the error to abort the render with under the strict policy.
    pub fn isolate(&self, provider: &str, module: &str, error: ModuleError) -> Result<(), AetherError> {
        match self.policy {
            FailurePolicy::Strict => Err(AetherError::module_runtime(module, error.to_string())),
            FailurePolicy::Lenient => {
                tracing::error!(provider = %provider, module = %module, error = %error, "module failed, slot left empty");
                Ok(())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
