//! Module registry.

use std::sync::Arc;

use aether_core::{AetherError, ModuleSpec, RequestContext};
use dashmap::DashMap;

use crate::module::{Module, ModuleContext, ModuleError};

/// Constructs a module for one request.
pub type ModuleFactory =
    Arc<dyn Fn(ModuleContext) -> Result<Box<dyn Module>, ModuleError> + Send + Sync>;

/// Name-to-factory lookup shared by every request.
///
/// Modules can be registered at any time, including after the application
/// started handling requests.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    factories: Arc<DashMap<String, ModuleFactory>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. Returns `true` when it replaced an existing one.
    pub fn register<F>(&self, name: impl Into<String>, factory: F) -> bool
    where
        F: Fn(ModuleContext) -> Result<Box<dyn Module>, ModuleError> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(module = %name, "registering module");
        self.factories.insert(name, Arc::new(factory)).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Construct the module a spec names.
    pub fn create(
        &self,
        request: Arc<RequestContext>,
        spec: &ModuleSpec,
    ) -> Result<Box<dyn Module>, AetherError> {
        // Clone the factory out so no shard lock is held while it runs.
        let factory = self
            .factories
            .get(&spec.name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AetherError::ModuleNotFound(spec.name.clone()))?;

        factory(ModuleContext::new(request, spec))
            .map_err(|e| AetherError::module_runtime(spec.name.clone(), e.to_string()))
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ModuleOutput;
    use async_trait::async_trait;
    use http::Method;

    struct Echo(String);

    #[async_trait]
    impl Module for Echo {
        async fn run(&mut self) -> Result<ModuleOutput, ModuleError> {
            Ok(ModuleOutput::Text(self.0.clone()))
        }
    }

    fn request() -> Arc<RequestContext> {
        Arc::new(RequestContext::new(Method::GET, "/"))
    }

    #[tokio::test]
    async fn test_create_passes_options() {
        let registry = ModuleRegistry::new();
        registry.register("Echo", |ctx| {
            let text = ctx.option_str("text").unwrap_or_default().to_string();
            Ok(Box::new(Echo(text)) as Box<dyn Module>)
        });

        let spec = ModuleSpec::new("Echo").with_option("text", "hi");
        let mut module = registry.create(request(), &spec).unwrap();
        assert_eq!(module.run().await.unwrap(), ModuleOutput::Text("hi".into()));
    }

    #[test]
    fn test_unknown_module() {
        let registry = ModuleRegistry::new();
        let err = registry
            .create(request(), &ModuleSpec::new("Nope"))
            .err()
            .unwrap();
        assert!(matches!(err, AetherError::ModuleNotFound(ref n) if n == "Nope"));
    }

    #[test]
    fn test_construction_failure() {
        let registry = ModuleRegistry::new();
        registry.register("Picky", |_| {
            Err(ModuleError::InvalidOptions("missing 'id'".into()))
        });
        let err = registry
            .create(request(), &ModuleSpec::new("Picky"))
            .err()
            .unwrap();
        assert!(matches!(err, AetherError::ModuleRuntime { .. }));
    }

    #[test]
    fn test_late_registration_and_replace() {
        let registry = ModuleRegistry::new();
        let shared = registry.clone();
        assert!(!shared.register("B", |_| Ok(Box::new(Echo("b".into())) as Box<dyn Module>)));
        assert!(!registry.register("A", |_| Ok(Box::new(Echo("a".into())) as Box<dyn Module>)));
        assert!(registry.register("A", |_| Ok(Box::new(Echo("a2".into())) as Box<dyn Module>)));

        assert_eq!(registry.names(), vec!["A", "B"]);
        assert!(registry.contains("B"));
        assert_eq!(registry.len(), 2);
    }
}
