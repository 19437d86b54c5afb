//! The module contract.

use std::sync::Arc;

use aether_core::{ModuleSpec, Options, RequestContext};
use aether_response::ResponseEnvelope;
use async_trait::async_trait;
use serde_json::Value;

use crate::output::ModuleOutput;

/// Module errors.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// The module does not expose the named service.
    #[error("service '{0}' is not supported")]
    ServiceUnsupported(String),

    /// The module rejected its options at construction.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The module panicked while running.
    #[error("module panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// What a module is constructed with.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    /// The request being handled.
    pub request: Arc<RequestContext>,
    /// Registered module name.
    pub name: String,
    /// Alias the output is published under, if any.
    pub provides: Option<String>,
    /// Fully merged options.
    pub options: Options,
}

impl ModuleContext {
    pub fn new(request: Arc<RequestContext>, spec: &ModuleSpec) -> Self {
        Self {
            request,
            name: spec.name.clone(),
            provides: spec.provides.clone(),
            options: spec.options.clone(),
        }
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get_str(key)
    }

    /// Key the output is published under.
    pub fn output_key(&self) -> &str {
        self.provides.as_deref().unwrap_or(&self.name)
    }
}

/// A unit of page content.
///
/// A module is constructed once per request, runs at most once during the
/// page render, and is stopped after every module of the page has run.
#[async_trait]
pub trait Module: Send + Sync {
    /// Produce the module's output.
    async fn run(&mut self) -> Result<ModuleOutput, ModuleError>;

    /// Handle a named service call made outside the page render.
    async fn service(&mut self, name: &str) -> Result<ResponseEnvelope, ModuleError> {
        Err(ModuleError::ServiceUnsupported(name.to_string()))
    }

    /// Release per-request resources.
    async fn stop(&mut self) {}

    /// Cache lifetime in seconds the module declares for its output.
    ///
    /// Overrides the `cache` value configured on the module.
    fn cache_time(&self) -> Option<u64> {
        None
    }
}
