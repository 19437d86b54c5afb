//! Aether application and builder.

use std::sync::Arc;

use aether_cache::{CacheBackend, InMemoryBackend, DEFAULT_MAX_ENTRIES};
use aether_core::{AetherError, ConfigResolver, LifecycleObserver, ProjectConfig};
use aether_executor::{
    HandlebarsEngine, Module, ModuleContext, ModuleError, ModuleRegistry, SectionPipeline,
    ServiceDispatcher, SessionHandler, TemplateEngine,
};

use crate::builtin::register_builtin;

/// Aether application builder.
///
/// # Example
///
/// ```rust,ignore
/// let aether = Aether::builder(config)
///     .module("Weather", |ctx| Ok(Box::new(Weather::new(ctx)) as Box<dyn Module>))
///     .with_cache(Arc::new(RedisBackend::connect(url)?))
///     .build()?;
/// ```
pub struct AetherBuilder {
    config: ProjectConfig,
    registry: ModuleRegistry,
    templates: Option<Arc<dyn TemplateEngine>>,
    cache: Option<Arc<dyn CacheBackend>>,
    session: Option<Arc<dyn SessionHandler>>,
    observer: Option<Arc<dyn LifecycleObserver>>,
}

impl AetherBuilder {
    /// Start from a configuration. The builtin modules are registered.
    pub fn new(config: ProjectConfig) -> Self {
        let registry = ModuleRegistry::new();
        register_builtin(&registry);
        Self {
            config,
            registry,
            templates: None,
            cache: None,
            session: None,
            observer: None,
        }
    }

    /// Register a module factory.
    pub fn module<F>(self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(ModuleContext) -> Result<Box<dyn Module>, ModuleError> + Send + Sync + 'static,
    {
        self.registry.register(name, factory);
        self
    }

    /// Use a template engine. Defaults to Handlebars over `[templates] dir`.
    pub fn with_templates(mut self, engine: impl TemplateEngine + 'static) -> Self {
        self.templates = Some(Arc::new(engine));
        self
    }

    /// Use a cache backend. Defaults to an in-memory backend when caching
    /// is enabled.
    pub fn with_cache(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(backend);
        self
    }

    pub fn with_session(mut self, session: Arc<dyn SessionHandler>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Build the application.
    pub fn build(self) -> Result<Aether, AetherError> {
        let Self {
            config,
            registry,
            templates,
            cache,
            session,
            observer,
        } = self;

        let templates: Arc<dyn TemplateEngine> = match (templates, &config.templates.dir) {
            (Some(engine), _) => engine,
            (None, Some(dir)) => Arc::new(HandlebarsEngine::from_dir(dir)?),
            (None, None) => Arc::new(HandlebarsEngine::default()),
        };
        let settings = &config.app.cache;
        let cache = cache.or_else(|| {
            settings.enabled.then(|| {
                let capacity = settings.max_entries.unwrap_or(DEFAULT_MAX_ENTRIES);
                Arc::new(InMemoryBackend::with_capacity(capacity)) as Arc<dyn CacheBackend>
            })
        });

        tracing::info!(
            env = %config.app.env,
            rules = config.rules.len(),
            modules = registry.len(),
            cache = cache.is_some(),
            "aether ready"
        );

        let resolver = Arc::new(ConfigResolver::new(Arc::new(config))?);
        let mut pipeline = SectionPipeline::new(resolver, registry.clone(), templates);
        if let Some(backend) = cache {
            pipeline = pipeline.with_cache(backend);
        }
        if let Some(observer) = observer {
            pipeline = pipeline.with_observer(observer);
        }

        let mut dispatcher = ServiceDispatcher::new(registry, pipeline.runner());
        if let Some(session) = &session {
            dispatcher = dispatcher.with_session(Arc::clone(session));
        }

        Ok(Aether {
            pipeline,
            dispatcher,
            session,
        })
    }
}

/// The front controller: turns HTTP requests into responses.
///
/// Cheap to clone; every request shares the registry and the cache.
#[derive(Clone)]
pub struct Aether {
    pub(crate) pipeline: SectionPipeline,
    pub(crate) dispatcher: ServiceDispatcher,
    pub(crate) session: Option<Arc<dyn SessionHandler>>,
}

impl Aether {
    pub fn builder(config: ProjectConfig) -> AetherBuilder {
        AetherBuilder::new(config)
    }

    pub fn config(&self) -> &ProjectConfig {
        self.pipeline.config()
    }

    /// The module registry. Modules registered here are visible to the next
    /// request.
    pub fn registry(&self) -> &ModuleRegistry {
        self.pipeline.registry()
    }

    pub fn pipeline(&self) -> &SectionPipeline {
        &self.pipeline
    }

    pub fn resolver(&self) -> &ConfigResolver {
        self.pipeline.resolver()
    }
}

impl std::fmt::Debug for Aether {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aether")
            .field("pipeline", &self.pipeline)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_core::{Environment, Rule};

    // === AetherBuilder Tests ===

    #[test]
    fn test_builder_registers_builtins() {
        let builder = Aether::builder(ProjectConfig::new(Environment::Local));
        assert!(builder.registry().contains("Helloworld"));
        assert!(builder.registry().contains("Text"));
    }

    #[test]
    fn test_build_rejects_bad_pattern() {
        let config = ProjectConfig::new(Environment::Local)
            .with_rule(Rule::new("/*rest/tail", "Broken").with_template("t"));
        let err = Aether::builder(config).build().unwrap_err();
        assert!(matches!(err, AetherError::Config(_)));
    }

    #[test]
    fn test_late_registration_is_shared() {
        let aether = Aether::builder(ProjectConfig::new(Environment::Local))
            .build()
            .unwrap();
        let copy = aether.clone();
        aether
            .registry()
            .register("Late", |_| Ok(Box::new(crate::Helloworld) as Box<dyn Module>));
        assert!(copy.registry().contains("Late"));
    }

    #[test]
    fn test_missing_template_dir_fails() {
        let mut config = ProjectConfig::new(Environment::Local);
        config.templates.dir = Some("/nonexistent/aether/templates".into());
        let err = Aether::builder(config).build().unwrap_err();
        assert!(matches!(err, AetherError::Template(_)));
    }
}
