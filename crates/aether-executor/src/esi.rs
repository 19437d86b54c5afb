//! Edge-side include support: the provider catalog and standalone module
//! renders.

use std::sync::Arc;

use aether_cache::{CacheExplainHeaders, CacheStatus, PageCacheTime};
use aether_core::{AetherError, ModuleSpec, RenderPlan, RequestContext};
use aether_observability::{MetricsCollector, ModuleOutcome};
use aether_response::ResponseEnvelope;
use serde::Serialize;
use serde_json::Value;

use crate::output::{ModuleOutput, OutputMap};
use crate::pipeline::{RenderedPage, SectionPipeline};

/// One provider in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderEntry {
    /// Alias of the provider, `null` when it has none.
    pub provides: Option<String>,
    /// Configured cache time, `false` when none.
    pub cache: Value,
    /// Providers nested under this one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<ProviderEntry>>,
}

impl ProviderEntry {
    fn from_spec(spec: &ModuleSpec, nested: bool) -> Self {
        let providers = (nested && !spec.modules.is_empty()).then(|| {
            spec.modules
                .iter()
                .map(|child| Self::from_spec(child, false))
                .collect()
        });
        Self {
            provides: spec.provides.clone(),
            cache: spec.cache.map_or(Value::Bool(false), Value::from),
            providers,
        }
    }
}

/// Listing of every provider of a plan, page modules first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderCatalog {
    pub providers: Vec<ProviderEntry>,
}

impl ProviderCatalog {
    pub fn from_plan(plan: &RenderPlan) -> Self {
        let providers = plan
            .modules
            .iter()
            .chain(plan.fragments.iter())
            .map(|spec| ProviderEntry::from_spec(spec, true))
            .collect();
        Self { providers }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn to_envelope(&self) -> Result<ResponseEnvelope, AetherError> {
        let value = serde_json::to_value(self)
            .map_err(|e| AetherError::Response(e.to_string()))?;
        Ok(ResponseEnvelope::json(value))
    }
}

impl SectionPipeline {
    /// Render one provider on its own, with its own page cache time.
    ///
    /// Fails with [`AetherError::ServiceNotFound`] when the plan has no such
    /// provider.
    pub async fn render_provider(
        &self,
        request: Arc<RequestContext>,
        plan: &RenderPlan,
        name: &str,
    ) -> Result<RenderedPage, AetherError> {
        let mut spec = plan
            .find_provider(name)
            .cloned()
            .ok_or_else(|| AetherError::ServiceNotFound(format!("no provider '{}'", name)))?;

        let coordinator = self.coordinator(&request, plan);
        let runner = self.runner();
        let mut page = PageCacheTime::new(None);
        let mut metrics = MetricsCollector::new(request.request_id.clone());
        metrics.set_section(plan.section_id.as_str());
        metrics.set_route(plan.pattern.as_str());

        let mut module = self.registry().create(Arc::clone(&request), &spec)?;
        coordinator.preload(&mut spec, module.cache_time(), &mut page);

        let key = spec.output_key().to_string();
        let mut explain = CacheExplainHeaders::new();
        let mut outputs = OutputMap::new();
        metrics.record_module_start(&key);

        let result = coordinator
            .load_or_run(&spec, &mut page, || runner.run(&spec.name, &mut *module))
            .await;
        module.stop().await;

        let envelope = match result {
            Ok((output, status)) => {
                let outcome = if status == CacheStatus::Hit {
                    ModuleOutcome::Cached
                } else {
                    ModuleOutcome::Rendered
                };
                metrics.record_module_finish(&key, &spec.name, outcome);
                explain.add_fragment(key.as_str(), spec.name.as_str(), status);
                outputs.insert(key.as_str(), output.clone());
                output.into_envelope()
            }
            Err(error) => {
                metrics.record_module_finish(&key, &spec.name, ModuleOutcome::Failed);
                runner.isolate(&key, &spec.name, error)?;
                // A failed fragment must not be cached at the edge.
                page.mark_uncacheable();
                ModuleOutput::Text(String::new()).into_envelope()
            }
        };

        tracing::debug!(
            request_id = %request.request_id,
            provider = %key,
            page_cache_time = ?page.get(),
            "provider rendered"
        );

        Ok(RenderedPage {
            envelope,
            page_cache_time: page,
            outputs,
            explain: explain.with_page_cache_time(page),
            metrics: metrics.finalize(page.get()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Module, ModuleContext, ModuleError};
    use crate::registry::ModuleRegistry;
    use crate::template::HandlebarsEngine;
    use aether_cache::InMemoryBackend;
    use aether_core::{ConfigResolver, Environment, ProjectConfig, Rule};
    use aether_response::ResponseSink;
    use async_trait::async_trait;
    use http::Method;
    use serde_json::json;

    struct Fixed(String, Option<u64>);

    #[async_trait]
    impl Module for Fixed {
        async fn run(&mut self) -> Result<ModuleOutput, ModuleError> {
            Ok(ModuleOutput::Text(self.0.clone()))
        }

        fn cache_time(&self) -> Option<u64> {
            self.1
        }
    }

    fn rule() -> Rule {
        Rule::new("/", "Home")
            .with_template("home.hbs")
            .with_module(ModuleSpec::new("Fixed").with_provides("headline").with_cache(60))
            .with_module(ModuleSpec::new("Fixed"))
            .with_module(ModuleSpec::new("Live").with_provides("live"))
            .with_fragment(
                ModuleSpec::new("Fixed")
                    .with_provides("comments")
                    .with_cache(30)
                    .with_module(ModuleSpec::new("Fixed").with_provides("count").with_cache(10)),
            )
    }

    fn pipeline() -> SectionPipeline {
        let config = ProjectConfig::new(Environment::Production).with_rule(rule());
        let registry = ModuleRegistry::new();
        registry.register("Fixed", |ctx: ModuleContext| {
            let text = format!("<{}>", ctx.output_key());
            Ok(Box::new(Fixed(text, None)) as Box<dyn Module>)
        });
        registry.register("Live", |_| Ok(Box::new(Fixed("now".into(), None)) as Box<dyn Module>));
        SectionPipeline::new(
            Arc::new(ConfigResolver::new(Arc::new(config)).unwrap()),
            registry,
            Arc::new(HandlebarsEngine::from_templates([("home.hbs", "")]).unwrap()),
        )
        .with_cache(Arc::new(InMemoryBackend::new()))
    }

    fn resolved(p: &SectionPipeline) -> (Arc<RequestContext>, RenderPlan) {
        p.resolve(RequestContext::new(Method::GET, "/")).unwrap()
    }

    // === Catalog Tests ===

    #[test]
    fn test_catalog_counts_modules_and_fragments() {
        let (_, plan) = resolved(&pipeline());
        let catalog = ProviderCatalog::from_plan(&plan);
        assert_eq!(catalog.len(), 4);

        let value = catalog.to_envelope().unwrap().value().cloned().unwrap();
        assert_eq!(
            value,
            json!({"providers": [
                {"provides": "headline", "cache": 60},
                {"provides": null, "cache": false},
                {"provides": "live", "cache": false},
                {"provides": "comments", "cache": 30, "providers": [
                    {"provides": "count", "cache": 10}
                ]}
            ]})
        );
    }

    // === Standalone Render Tests ===

    #[tokio::test]
    async fn test_render_nested_provider_with_own_cache_time() {
        let p = pipeline();
        let (request, plan) = resolved(&p);
        let page = p.render_provider(request, &plan, "count").await.unwrap();

        assert_eq!(page.envelope.get().unwrap(), "<count>");
        assert_eq!(page.page_cache_time.get(), Some(10));

        let mut sink = ResponseSink::new();
        page.draw(&mut sink).unwrap();
        assert_eq!(sink.header("Cache-Control"), Some("s-maxage=10"));
    }

    #[tokio::test]
    async fn test_render_by_module_name() {
        let p = pipeline();
        let (request, plan) = resolved(&p);
        let page = p.render_provider(request, &plan, "Fixed").await.unwrap();
        assert_eq!(page.envelope.get().unwrap(), "<headline>");
        assert_eq!(page.page_cache_time.get(), Some(60));
    }

    #[tokio::test]
    async fn test_render_uncacheable_provider() {
        let p = pipeline();
        let (request, plan) = resolved(&p);
        let page = p.render_provider(request, &plan, "live").await.unwrap();

        assert_eq!(page.envelope.get().unwrap(), "now");
        assert_eq!(page.page_cache_time.get(), Some(0));
        let mut sink = ResponseSink::new();
        page.draw(&mut sink).unwrap();
        assert_eq!(sink.header("Cache-Control"), None);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_not_found() {
        let p = pipeline();
        let (request, plan) = resolved(&p);
        let err = p.render_provider(request, &plan, "nope").await.unwrap_err();
        assert!(matches!(err, AetherError::ServiceNotFound(_)));
    }
}
