//! Out-of-band service dispatch.

use std::sync::Arc;

use aether_core::{AetherError, ModuleSpec, RenderPlan, RequestContext};
use aether_response::ResponseEnvelope;

use crate::module::ModuleError;
use crate::registry::ModuleRegistry;
use crate::runner::ModuleRunner;
use crate::session::{SessionHandler, SESSION_OPTION};

/// Which module list a dispatch searches first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// `?module=X&service=Y`: page modules.
    Normal,
    /// `?fragment=X&service=Y`: fragment modules.
    Fragment,
}

/// Invokes a module service outside the page pipeline.
#[derive(Clone)]
pub struct ServiceDispatcher {
    registry: ModuleRegistry,
    runner: ModuleRunner,
    session: Option<Arc<dyn SessionHandler>>,
}

impl ServiceDispatcher {
    pub fn new(registry: ModuleRegistry, runner: ModuleRunner) -> Self {
        Self {
            registry,
            runner,
            session: None,
        }
    }

    pub fn with_session(mut self, session: Arc<dyn SessionHandler>) -> Self {
        self.session = Some(session);
        self
    }

    /// Find the spec a dispatch targets.
    ///
    /// Aliases are matched before module names, the mode's own list before
    /// every other provider. An unknown name yields a bare spec so modules
    /// not wired into the rule can still be called.
    pub fn lookup(plan: &RenderPlan, name: &str, mode: DispatchMode) -> ModuleSpec {
        let preferred = match mode {
            DispatchMode::Normal => plan.find_module(name),
            DispatchMode::Fragment => plan.find_fragment(name),
        };
        preferred
            .or_else(|| plan.find_provider(name))
            .cloned()
            .unwrap_or_else(|| plan.bare_spec(name))
    }

    /// Call `service` on the module `name` resolves to.
    ///
    /// A fragment dispatch without a service returns the module's run output.
    pub async fn dispatch(
        &self,
        request: Arc<RequestContext>,
        plan: &RenderPlan,
        name: &str,
        service: Option<&str>,
        mode: DispatchMode,
    ) -> Result<ResponseEnvelope, AetherError> {
        let spec = Self::lookup(plan, name, mode);

        if spec.options.is_on(SESSION_OPTION) {
            if let Some(session) = &self.session {
                session.start(&request);
            }
        }

        let mut module = self
            .registry
            .create(Arc::clone(&request), &spec)
            .map_err(|e| match e {
                AetherError::ModuleNotFound(module) => {
                    AetherError::ServiceNotFound(format!("no module '{}' to call '{}' on", module, name))
                }
                other => other,
            })?;

        tracing::debug!(
            request_id = %request.request_id,
            module = %spec.name,
            service = ?service,
            mode = ?mode,
            "dispatching service"
        );

        let result = match (service, mode) {
            (Some(service), _) => module.service(service).await,
            (None, DispatchMode::Fragment) => self
                .runner
                .run(&spec.name, &mut *module)
                .await
                .map(|output| output.into_envelope()),
            (None, DispatchMode::Normal) => Err(ModuleError::ServiceUnsupported(String::new())),
        };
        module.stop().await;

        result.map_err(|e| match e {
            ModuleError::ServiceUnsupported(service) => AetherError::ServiceNotFound(format!(
                "module '{}' has no service '{}'",
                spec.name, service
            )),
            other => AetherError::module_runtime(spec.name.clone(), other.to_string()),
        })
    }
}

impl std::fmt::Debug for ServiceDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDispatcher")
            .field("runner", &self.runner)
            .field("session", &self.session.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Module, ModuleContext};
    use crate::output::ModuleOutput;
    use crate::runner::FailurePolicy;
    use aether_core::{ConfigResolver, Environment, ProjectConfig, Rule};
    use async_trait::async_trait;
    use http::Method;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers `whoami` with its own text option.
    struct Named(String);

    #[async_trait]
    impl Module for Named {
        async fn run(&mut self) -> Result<ModuleOutput, ModuleError> {
            Ok(ModuleOutput::Text(format!("run:{}", self.0)))
        }

        async fn service(&mut self, name: &str) -> Result<ResponseEnvelope, ModuleError> {
            match name {
                "whoami" => Ok(ResponseEnvelope::json(json!({ "text": self.0 }))),
                "fail" => Err(anyhow::anyhow!("service exploded").into()),
                other => Err(ModuleError::ServiceUnsupported(other.to_string())),
            }
        }
    }

    #[derive(Default)]
    struct CountingSession(AtomicUsize);

    impl SessionHandler for CountingSession {
        fn start(&self, _request: &RequestContext) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn registry() -> ModuleRegistry {
        let registry = ModuleRegistry::new();
        for name in ["M", "A", "Frag"] {
            registry.register(name, |ctx: ModuleContext| {
                let text = ctx.option_str("text").unwrap_or(&ctx.name).to_string();
                Ok(Box::new(Named(text)) as Box<dyn Module>)
            });
        }
        registry
    }

    fn plan() -> RenderPlan {
        let rule = Rule::new("/", "Home")
            .with_template("home.hbs")
            .with_module(ModuleSpec::new("M").with_provides("A").with_option("text", "aliased"))
            .with_module(ModuleSpec::new("A").with_option("text", "raw"))
            .with_fragment(ModuleSpec::new("Frag").with_option("session", "on"));
        let config = ProjectConfig::new(Environment::Production).with_rule(rule);
        ConfigResolver::new(Arc::new(config))
            .unwrap()
            .resolve_path("/")
            .unwrap()
    }

    fn dispatcher() -> ServiceDispatcher {
        ServiceDispatcher::new(registry(), ModuleRunner::new(FailurePolicy::Lenient))
    }

    fn request() -> Arc<RequestContext> {
        Arc::new(RequestContext::new(Method::GET, "/"))
    }

    // === Lookup Tests ===

    #[tokio::test]
    async fn test_alias_before_name() {
        let envelope = dispatcher()
            .dispatch(request(), &plan(), "A", Some("whoami"), DispatchMode::Normal)
            .await
            .unwrap();
        assert_eq!(envelope.get().unwrap(), r#"{"text":"aliased"}"#);
    }

    #[test]
    fn test_unknown_name_gets_bare_spec() {
        let spec = ServiceDispatcher::lookup(&plan(), "Adhoc", DispatchMode::Normal);
        assert_eq!(spec.name, "Adhoc");
        assert_eq!(spec.options.get_str("running_mode"), Some("prod"));
    }

    // === Dispatch Tests ===

    #[tokio::test]
    async fn test_unsupported_service_is_not_found() {
        let err = dispatcher()
            .dispatch(request(), &plan(), "M", Some("nope"), DispatchMode::Normal)
            .await
            .unwrap_err();
        assert!(matches!(err, AetherError::ServiceNotFound(_)));
        assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unregistered_module_is_not_found() {
        let err = dispatcher()
            .dispatch(request(), &plan(), "Ghost", Some("x"), DispatchMode::Normal)
            .await
            .unwrap_err();
        assert!(matches!(err, AetherError::ServiceNotFound(_)));
    }

    #[tokio::test]
    async fn test_service_failure_is_runtime_error() {
        let err = dispatcher()
            .dispatch(request(), &plan(), "M", Some("fail"), DispatchMode::Normal)
            .await
            .unwrap_err();
        assert!(matches!(err, AetherError::ModuleRuntime { .. }));
    }

    #[tokio::test]
    async fn test_fragment_without_service_runs_module() {
        let session = Arc::new(CountingSession::default());
        let envelope = dispatcher()
            .with_session(session.clone())
            .dispatch(request(), &plan(), "Frag", None, DispatchMode::Fragment)
            .await
            .unwrap();
        assert_eq!(envelope.get().unwrap(), "run:Frag");
        assert_eq!(session.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_not_started_without_option() {
        let session = Arc::new(CountingSession::default());
        dispatcher()
            .with_session(session.clone())
            .dispatch(request(), &plan(), "M", Some("whoami"), DispatchMode::Normal)
            .await
            .unwrap();
        assert_eq!(session.0.load(Ordering::SeqCst), 0);
    }
}
