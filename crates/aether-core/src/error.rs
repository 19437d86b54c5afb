//! Error taxonomy for request handling.

use http::StatusCode;

/// Result alias used across the Aether crates.
pub type Result<T, E = AetherError> = std::result::Result<T, E>;

/// Errors raised while turning a request into a response.
#[derive(Debug, thiserror::Error)]
pub enum AetherError {
    /// No URL rule matched the request path.
    #[error("No rule matched url: {0}")]
    NoRuleMatch(String),

    /// The configuration is missing a field the plan requires.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No factory is registered under the module name.
    #[error("Module '{0}' is not registered")]
    ModuleNotFound(String),

    /// The resolved module does not expose the requested service.
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// A module failed while running.
    #[error("Module '{module}' failed: {message}")]
    ModuleRuntime { module: String, message: String },

    /// The cache backend failed. Never surfaced by the cache coordinator.
    #[error("Cache backend error: {0}")]
    CacheBackend(String),

    /// The template collaborator failed to render.
    #[error("Template error: {0}")]
    Template(String),

    /// The response could not be written.
    #[error("Response error: {0}")]
    Response(String),
}

impl AetherError {
    /// Create a module runtime error.
    pub fn module_runtime(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModuleRuntime {
            module: module.into(),
            message: message.into(),
        }
    }

    /// HTTP status to report for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ServiceNotFound(_) | Self::ModuleNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error aborts the whole request rather than a single module.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoRuleMatch(_) | Self::Config(_) | Self::Template(_) | Self::Response(_)
        )
    }

    /// Whether the error is the client's fault.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Short machine-readable kind, used in logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoRuleMatch(_) => "no_rule_match",
            Self::Config(_) => "config_error",
            Self::ModuleNotFound(_) => "module_not_found",
            Self::ServiceNotFound(_) => "service_not_found",
            Self::ModuleRuntime { .. } => "module_runtime_error",
            Self::CacheBackend(_) => "cache_backend_error",
            Self::Template(_) => "template_error",
            Self::Response(_) => "response_error",
        }
    }
}
