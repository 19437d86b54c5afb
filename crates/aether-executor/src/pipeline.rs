//! Page render pipeline.
//!
//! A render walks through the phases of [`PipelinePhase`]:
//!
//! 1. Resolving - match the URL and build the [`RenderPlan`]
//! 2. Preloading - construct every module and negotiate the page cache time
//! 3. Running - run modules in declaration order through the module cache
//! 4. Assembling - feed the outputs into the section template
//!
//! Modules that cannot be constructed are skipped. A module that fails while
//! running aborts the render under [`FailurePolicy::Strict`] and leaves an
//! empty slot otherwise.

use std::sync::Arc;
use std::time::{Duration, Instant};

use aether_cache::{
    header_names, CacheBackend, CacheCoordinator, CacheExplainHeaders, CacheStatus, PageCacheTime,
};
use aether_core::{
    AetherError, ConfigResolver, LifecycleObserver, ModuleSpec, PipelinePhase, ProjectConfig,
    RenderPlan, RequestContext,
};
use aether_observability::{MetricsCollector, ModuleOutcome, RenderMetrics};
use aether_response::{DrawTarget, ResponseEnvelope, ResponseError};
use serde_json::{json, Value};

use crate::module::Module;
use crate::output::OutputMap;
use crate::registry::ModuleRegistry;
use crate::runner::{FailurePolicy, ModuleRunner};
use crate::template::TemplateEngine;

/// Template variable holding the request-level globals.
pub const GLOBALS_KEY: &str = "aether";

/// A finished render.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Assembled body.
    pub envelope: ResponseEnvelope,
    /// Negotiated page cache time.
    pub page_cache_time: PageCacheTime,
    /// Module outputs by alias-or-name.
    pub outputs: OutputMap,
    /// Per-module cache statuses.
    pub explain: CacheExplainHeaders,
    /// Module timings.
    pub metrics: RenderMetrics,
}

impl RenderedPage {
    /// Write the page to a response. `Cache-Control` is only sent for a
    /// positive page cache time and only while headers can still be set.
    pub fn draw(&self, target: &mut dyn DrawTarget) -> Result<(), ResponseError> {
        if let Some(value) = self.page_cache_time.cache_control() {
            if !target.headers_sent() {
                target.set_header(header_names::CACHE_CONTROL, &value)?;
            }
        }
        self.envelope.draw(target)
    }
}

/// Tracks the current phase and reports transitions.
struct PhaseTracker {
    phase: PipelinePhase,
    start: Instant,
    observer: Option<Arc<dyn LifecycleObserver>>,
}

impl PhaseTracker {
    fn new(observer: Option<Arc<dyn LifecycleObserver>>) -> Self {
        let tracker = Self {
            phase: PipelinePhase::Resolving,
            start: Instant::now(),
            observer,
        };
        tracker.notify();
        tracker
    }

    fn enter(&mut self, next: PipelinePhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal phase transition {} -> {}",
            self.phase,
            next
        );
        self.phase = next;
        self.notify();
    }

    fn fail(&mut self, error: AetherError) -> AetherError {
        tracing::debug!(phase = %self.phase, error = %error, "render failed");
        self.enter(PipelinePhase::Failed);
        error
    }

    fn notify(&self) {
        let elapsed = self.start.elapsed();
        tracing::trace!(phase = %self.phase, elapsed_us = elapsed.as_micros() as u64, "pipeline phase");
        if let Some(observer) = &self.observer {
            observer.on_phase(self.phase, elapsed);
        }
    }
}

/// A constructed module waiting to run.
struct Slot {
    spec: ModuleSpec,
    module: Box<dyn Module>,
}

/// Renders pages. Shared by every request; cloning is cheap.
#[derive(Clone)]
pub struct SectionPipeline {
    resolver: Arc<ConfigResolver>,
    registry: ModuleRegistry,
    templates: Arc<dyn TemplateEngine>,
    cache: Option<Arc<dyn CacheBackend>>,
    observer: Option<Arc<dyn LifecycleObserver>>,
}

impl SectionPipeline {
    pub fn new(
        resolver: Arc<ConfigResolver>,
        registry: ModuleRegistry,
        templates: Arc<dyn TemplateEngine>,
    ) -> Self {
        Self {
            resolver,
            registry,
            templates,
            cache: None,
            observer: None,
        }
    }

    /// Cache module output in `backend`.
    pub fn with_cache(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(backend);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &ProjectConfig {
        self.resolver.config()
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn runner(&self) -> ModuleRunner {
        ModuleRunner::new(FailurePolicy::for_env(self.config().app.env))
    }

    /// Match the request and build its plan.
    ///
    /// The returned context carries the URL variables and the project's
    /// environment and root.
    pub fn resolve(
        &self,
        request: RequestContext,
    ) -> Result<(Arc<RequestContext>, RenderPlan), AetherError> {
        let route = self.resolver.match_path(&request.path)?;
        let plan = self.resolver.resolve(&route)?;
        let app = &self.config().app;
        let request = request
            .with_env(app.env)
            .with_root(app.root.clone())
            .with_url_vars(route.params);

        tracing::debug!(
            request_id = %request.request_id,
            path = %request.path,
            pattern = %plan.pattern,
            section = %plan.section_id,
            "rule matched"
        );
        Ok((Arc::new(request), plan))
    }

    /// Cache coordinator for one page.
    ///
    /// The namespace defaults to the request host and the cache name to the
    /// request's normalized URL.
    pub fn coordinator(&self, request: &RequestContext, plan: &RenderPlan) -> CacheCoordinator {
        let settings = &self.config().app.cache;
        let backend = match &self.cache {
            Some(backend) if settings.enabled => Arc::clone(backend),
            _ => return CacheCoordinator::disabled(),
        };

        let namespace = settings
            .namespace
            .clone()
            .unwrap_or_else(|| request.host.clone());
        let cache_name = plan
            .cache_name
            .clone()
            .unwrap_or_else(|| request.cache_name());
        let coordinator = CacheCoordinator::new(backend, namespace, cache_name);

        match settings.timeout_ms {
            Some(ms) => coordinator.with_timeout(Duration::from_millis(ms)),
            None => coordinator,
        }
    }

    /// Render the page a request points to.
    pub async fn render(&self, request: RequestContext) -> Result<RenderedPage, AetherError> {
        let mut phases = PhaseTracker::new(self.observer.clone());
        let (request, plan) = match self.resolve(request) {
            Ok(resolved) => resolved,
            Err(error) => return Err(phases.fail(error)),
        };
        self.run_plan(phases, request, &plan).await
    }

    /// Render an already resolved plan.
    pub async fn render_plan(
        &self,
        request: Arc<RequestContext>,
        plan: &RenderPlan,
    ) -> Result<RenderedPage, AetherError> {
        let phases = PhaseTracker::new(self.observer.clone());
        self.run_plan(phases, request, plan).await
    }

    async fn run_plan(
        &self,
        mut phases: PhaseTracker,
        request: Arc<RequestContext>,
        plan: &RenderPlan,
    ) -> Result<RenderedPage, AetherError> {
        let coordinator = self.coordinator(&request, plan);
        let runner = self.runner();
        let mut page = PageCacheTime::new(plan.initial_page_cache_time);
        let mut metrics = MetricsCollector::new(request.request_id.clone());
        metrics.set_section(plan.section_id.as_str());
        metrics.set_route(plan.pattern.as_str());

        phases.enter(PipelinePhase::Preloading);
        let mut slots = self.preload(&request, plan, &coordinator, &mut page, &mut metrics);

        phases.enter(PipelinePhase::Running);
        let mut outputs = OutputMap::new();
        let mut legacy: Vec<(String, Value)> = Vec::new();
        let mut explain = CacheExplainHeaders::new();
        let mut failure = None;

        for slot in slots.iter_mut() {
            let spec = &slot.spec;
            let module = &mut slot.module;
            let key = spec.output_key().to_string();
            metrics.record_module_start(&key);

            let result = coordinator
                .load_or_run(spec, &mut page, || runner.run(&spec.name, &mut **module))
                .await;

            match result {
                Ok((output, status)) => {
                    let outcome = if status == CacheStatus::Hit {
                        ModuleOutcome::Cached
                    } else {
                        ModuleOutcome::Rendered
                    };
                    metrics.record_module_finish(&key, &spec.name, outcome);
                    explain.add_fragment(key.as_str(), spec.name.as_str(), status);
                    if spec.name != key {
                        legacy.push((spec.name.clone(), output.to_value()));
                    }
                    outputs.insert(key, output);
                }
                Err(error) => {
                    metrics.record_module_finish(&key, &spec.name, ModuleOutcome::Failed);
                    if let Err(fatal) = runner.isolate(&key, &spec.name, error) {
                        failure = Some(fatal);
                        break;
                    }
                }
            }
        }

        for slot in slots.iter_mut() {
            slot.module.stop().await;
        }
        if let Some(error) = failure {
            return Err(phases.fail(error));
        }

        phases.enter(PipelinePhase::Assembling);
        let body = match self.assemble(&request, plan, &outputs, legacy) {
            Ok(body) => body,
            Err(error) => return Err(phases.fail(error)),
        };
        phases.enter(PipelinePhase::Done);

        let metrics = metrics.finalize(page.get());
        tracing::debug!(
            request_id = %request.request_id,
            section = %plan.section_id,
            page_cache_time = ?page.get(),
            modules = outputs.len(),
            total_us = metrics.total_duration_us,
            "page rendered"
        );

        Ok(RenderedPage {
            envelope: ResponseEnvelope::text(body),
            page_cache_time: page,
            outputs,
            explain: explain.with_page_cache_time(page),
            metrics,
        })
    }

    fn preload(
        &self,
        request: &Arc<RequestContext>,
        plan: &RenderPlan,
        coordinator: &CacheCoordinator,
        page: &mut PageCacheTime,
        metrics: &mut MetricsCollector,
    ) -> Vec<Slot> {
        let mut slots = Vec::with_capacity(plan.modules.len());
        for spec in &plan.modules {
            match self.registry.create(Arc::clone(request), spec) {
                Ok(module) => {
                    let mut spec = spec.clone();
                    let ttl = coordinator.preload(&mut spec, module.cache_time(), page);
                    tracing::trace!(module = %spec.name, ttl = ?ttl, "module preloaded");
                    slots.push(Slot { spec, module });
                }
                Err(error) => {
                    tracing::warn!(module = %spec.name, error = %error, "module could not be constructed, skipping");
                    metrics.record_module_finish(spec.output_key(), &spec.name, ModuleOutcome::Skipped);
                }
            }
        }
        slots
    }

    fn assemble(
        &self,
        request: &RequestContext,
        plan: &RenderPlan,
        outputs: &OutputMap,
        legacy: Vec<(String, Value)>,
    ) -> Result<String, AetherError> {
        let mut template = self.templates.instance();
        if !template.exists(&plan.template_id) {
            return Err(AetherError::Config(format!(
                "Template '{}' of section {} does not exist",
                plan.template_id, plan.section_id
            )));
        }

        template.set(GLOBALS_KEY, template_globals(request, plan, outputs));
        // Outputs are also reachable by bare module name; aliases win on collision.
        for (name, value) in legacy {
            template.set(&name, value);
        }
        for (key, output) in outputs.iter() {
            template.set(key, output.to_value());
        }

        Ok(template.fetch(&plan.template_id)?)
    }
}

impl std::fmt::Debug for SectionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionPipeline")
            .field("registry", &self.registry)
            .field("cache", &self.cache.is_some())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Request-level values every template can read under [`GLOBALS_KEY`].
pub fn template_globals(request: &RequestContext, plan: &RenderPlan, outputs: &OutputMap) -> Value {
    json!({
        "base": request.base(),
        "root": request.root,
        "urlVars": plan.url_vars,
        "runningMode": request.env.running_mode(),
        "requestUri": request.request_uri(),
        "domain": request.host,
        "referer": request.referer(),
        "options": plan.base_options.to_value(),
        "section": plan.section_id,
        "providers": outputs.to_value(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleContext, ModuleError};
    use crate::output::ModuleOutput;
    use crate::template::HandlebarsEngine;
    use aether_cache::InMemoryBackend;
    use aether_core::{Environment, Rule};
    use aether_response::ResponseSink;
    use async_trait::async_trait;
    use http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Static {
        text: String,
        ttl: Option<u64>,
        runs: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Module for Static {
        async fn run(&mut self) -> Result<ModuleOutput, ModuleError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(ModuleOutput::Text(self.text.clone()))
        }

        async fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn cache_time(&self) -> Option<u64> {
            self.ttl
        }
    }

    struct Broken;

    #[async_trait]
    impl Module for Broken {
        async fn run(&mut self) -> Result<ModuleOutput, ModuleError> {
            Err(anyhow::anyhow!("database unavailable").into())
        }
    }

    #[derive(Default)]
    struct Counters {
        runs: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
    }

    #[derive(Default)]
    struct RecordingObserver {
        phases: Mutex<Vec<PipelinePhase>>,
    }

    impl LifecycleObserver for RecordingObserver {
        fn on_phase(&self, phase: PipelinePhase, _elapsed: Duration) {
            self.phases.lock().unwrap().push(phase);
        }
    }

    fn registry(counters: &Counters) -> ModuleRegistry {
        let registry = ModuleRegistry::new();
        let (runs, stops) = (counters.runs.clone(), counters.stops.clone());
        registry.register("Static", move |ctx: ModuleContext| {
            Ok(Box::new(Static {
                text: ctx.option_str("text").unwrap_or_default().to_string(),
                ttl: ctx.options.get_u64("ttl"),
                runs: runs.clone(),
                stops: stops.clone(),
            }) as Box<dyn Module>)
        });
        registry.register("Broken", |_| Ok(Box::new(Broken) as Box<dyn Module>));
        registry.register("Unbuildable", |_| {
            Err(ModuleError::InvalidOptions("no feed url".into()))
        });
        registry
    }

    fn templates() -> Arc<dyn TemplateEngine> {
        Arc::new(
            HandlebarsEngine::from_templates([
                (
                    "page.hbs",
                    "[{{{headline}}}|{{{Static}}}|{{{broken}}}|{{aether.section}}|{{aether.urlVars.id}}]",
                ),
                ("globals.hbs", "{{aether.domain}} {{aether.runningMode}} {{aether.base}}"),
            ])
            .unwrap(),
        )
    }

    fn page_rule() -> Rule {
        Rule::new("/articles/:id", "Article")
            .with_template("page.hbs")
            .with_cache(300)
            .with_module(
                ModuleSpec::new("Static")
                    .with_provides("headline")
                    .with_option("text", "Top story")
                    .with_option("ttl", 60),
            )
            .with_module(
                ModuleSpec::new("Static")
                    .with_option("text", "Body")
                    .with_cache(120),
            )
    }

    fn pipeline(env: Environment, rule: Rule, counters: &Counters) -> SectionPipeline {
        let config = ProjectConfig::new(env).with_rule(rule);
        let resolver = ConfigResolver::new(Arc::new(config)).unwrap();
        SectionPipeline::new(Arc::new(resolver), registry(counters), templates())
    }

    fn request(path: &str) -> RequestContext {
        RequestContext::new(Method::GET, path).with_host("example.com")
    }

    // === Render Tests ===

    #[tokio::test]
    async fn test_render_publishes_alias_and_name() {
        let counters = Counters::default();
        let page = pipeline(Environment::Production, page_rule(), &counters)
            .render(request("/articles/7"))
            .await
            .unwrap();

        assert_eq!(page.envelope.get().unwrap(), "[Top story|Body||Article|7]");
        assert_eq!(page.outputs.keys().collect::<Vec<_>>(), vec!["headline", "Static"]);
        assert_eq!(counters.runs.load(Ordering::SeqCst), 2);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_template_globals() {
        let counters = Counters::default();
        let rule = Rule::new("/", "Home").with_template("globals.hbs");
        let page = pipeline(Environment::Production, rule, &counters)
            .render(request("/"))
            .await
            .unwrap();
        assert_eq!(page.envelope.get().unwrap(), "example.com prod http://example.com/");
    }

    #[tokio::test]
    async fn test_page_without_modules_keeps_rule_cache_time() {
        let counters = Counters::default();
        let rule = Rule::new("/", "Home").with_template("globals.hbs").with_cache(90);
        let p = pipeline(Environment::Production, rule, &counters)
            .with_cache(Arc::new(InMemoryBackend::new()));
        let page = p.render(request("/")).await.unwrap();
        assert_eq!(page.page_cache_time.get(), Some(90));
    }

    #[tokio::test]
    async fn test_missing_template_file_is_config_error() {
        let counters = Counters::default();
        let rule = Rule::new("/", "Home").with_template("absent.hbs");
        let err = pipeline(Environment::Production, rule, &counters)
            .render(request("/"))
            .await
            .unwrap_err();
        assert!(matches!(err, AetherError::Config(_)));
    }

    #[tokio::test]
    async fn test_unmatched_path() {
        let counters = Counters::default();
        let err = pipeline(Environment::Production, page_rule(), &counters)
            .render(request("/nowhere"))
            .await
            .unwrap_err();
        assert!(matches!(err, AetherError::NoRuleMatch(_)));
    }

    // === Failure Policy Tests ===

    #[tokio::test]
    async fn test_lenient_leaves_failed_slot_empty() {
        let counters = Counters::default();
        let rule = page_rule().with_module(ModuleSpec::new("Broken").with_provides("broken"));
        let page = pipeline(Environment::Production, rule, &counters)
            .render(request("/articles/1"))
            .await
            .unwrap();

        assert_eq!(page.envelope.get().unwrap(), "[Top story|Body||Article|1]");
        assert!(!page.outputs.contains_key("broken"));
        assert_eq!(page.metrics.count(ModuleOutcome::Failed), 1);
    }

    #[tokio::test]
    async fn test_lenient_failure_does_not_stop_later_modules() {
        let counters = Counters::default();
        let rule = Rule::new("/articles/:id", "Article")
            .with_template("page.hbs")
            .with_module(ModuleSpec::new("Broken").with_provides("broken"))
            .with_module(
                ModuleSpec::new("Static")
                    .with_provides("headline")
                    .with_option("text", "Still here"),
            );
        let page = pipeline(Environment::Production, rule, &counters)
            .render(request("/articles/5"))
            .await
            .unwrap();

        assert_eq!(counters.runs.load(Ordering::SeqCst), 1);
        assert_eq!(page.outputs.keys().collect::<Vec<_>>(), vec!["headline"]);
        assert_eq!(page.envelope.get().unwrap(), "[Still here|Still here||Article|5]");
        assert_eq!(page.metrics.count(ModuleOutcome::Failed), 1);
        assert_eq!(page.metrics.count(ModuleOutcome::Rendered), 1);
    }

    #[tokio::test]
    async fn test_strict_aborts_and_still_stops_modules() {
        let counters = Counters::default();
        let observer = Arc::new(RecordingObserver::default());
        let rule = page_rule().with_module(ModuleSpec::new("Broken"));
        let err = pipeline(Environment::Development, rule, &counters)
            .with_observer(observer.clone())
            .render(request("/articles/1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AetherError::ModuleRuntime { ref module, .. } if module == "Broken"));
        assert_eq!(counters.stops.load(Ordering::SeqCst), 2);
        assert_eq!(observer.phases.lock().unwrap().last(), Some(&PipelinePhase::Failed));
    }

    #[tokio::test]
    async fn test_construction_failure_skipped_even_when_strict() {
        let counters = Counters::default();
        let rule = page_rule().with_module(ModuleSpec::new("Unbuildable"));
        let page = pipeline(Environment::Local, rule, &counters)
            .render(request("/articles/1"))
            .await
            .unwrap();
        assert_eq!(page.metrics.count(ModuleOutcome::Skipped), 1);
        assert_eq!(page.outputs.len(), 2);
    }

    #[tokio::test]
    async fn test_unregistered_module_is_skipped() {
        let counters = Counters::default();
        let rule = page_rule().with_module(ModuleSpec::new("Nowhere"));
        let page = pipeline(Environment::Production, rule, &counters)
            .render(request("/articles/1"))
            .await
            .unwrap();
        assert_eq!(page.metrics.count(ModuleOutcome::Skipped), 1);
    }

    // === Lifecycle Tests ===

    #[tokio::test]
    async fn test_phases_in_order() {
        let counters = Counters::default();
        let observer = Arc::new(RecordingObserver::default());
        pipeline(Environment::Production, page_rule(), &counters)
            .with_observer(observer.clone())
            .render(request("/articles/1"))
            .await
            .unwrap();

        use PipelinePhase::*;
        assert_eq!(
            *observer.phases.lock().unwrap(),
            vec![Resolving, Preloading, Running, Assembling, Done]
        );
    }

    // === Cache Tests ===

    #[tokio::test]
    async fn test_page_cache_time_is_minimum() {
        let counters = Counters::default();
        let p = pipeline(Environment::Production, page_rule(), &counters)
            .with_cache(Arc::new(InMemoryBackend::new()));
        let page = p.render(request("/articles/1")).await.unwrap();

        assert_eq!(page.page_cache_time.get(), Some(60));

        let mut sink = ResponseSink::new();
        page.draw(&mut sink).unwrap();
        assert_eq!(sink.header("Cache-Control"), Some("s-maxage=60"));
    }

    #[tokio::test]
    async fn test_uncacheable_module_forces_zero() {
        let counters = Counters::default();
        let rule = page_rule().with_module(ModuleSpec::new("Static").with_provides("live"));
        let p = pipeline(Environment::Production, rule, &counters)
            .with_cache(Arc::new(InMemoryBackend::new()));
        let page = p.render(request("/articles/1")).await.unwrap();

        assert_eq!(page.page_cache_time.get(), Some(0));
        let mut sink = ResponseSink::new();
        page.draw(&mut sink).unwrap();
        assert_eq!(sink.header("Cache-Control"), None);
    }

    #[tokio::test]
    async fn test_disabled_cache_keeps_rule_time() {
        let counters = Counters::default();
        let page = pipeline(Environment::Production, page_rule(), &counters)
            .render(request("/articles/1"))
            .await
            .unwrap();
        assert_eq!(page.page_cache_time.get(), Some(300));
        assert!(page
            .explain
            .fragments
            .iter()
            .all(|f| f.status == CacheStatus::Bypass));
    }

    #[tokio::test]
    async fn test_second_render_hits_cache() {
        let counters = Counters::default();
        let p = pipeline(Environment::Production, page_rule(), &counters)
            .with_cache(Arc::new(InMemoryBackend::new()));

        p.render(request("/articles/1")).await.unwrap();
        let page = p.render(request("/articles/1")).await.unwrap();

        assert_eq!(counters.runs.load(Ordering::SeqCst), 2);
        assert_eq!(page.metrics.count(ModuleOutcome::Cached), 2);
        assert_eq!(page.envelope.get().unwrap(), "[Top story|Body||Article|1]");

        // Another URL of the same rule has its own cache entries.
        p.render(request("/articles/2")).await.unwrap();
        assert_eq!(counters.runs.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_coordinator_uses_rule_cache_name() {
        let counters = Counters::default();
        let p = pipeline(
            Environment::Production,
            page_rule().with_cache_name("articles"),
            &counters,
        )
        .with_cache(Arc::new(InMemoryBackend::new()));
        let (request, plan) = p.resolve(request("/articles/3")).unwrap();
        let key = p.coordinator(&request, &plan).key_for(&plan.modules[0]);
        assert_eq!(key.as_str(), "example.com_articlesStaticheadline");
    }

    #[tokio::test]
    async fn test_configured_namespace_replaces_host() {
        let counters = Counters::default();
        let config = ProjectConfig::new(Environment::Production)
            .with_namespace("site-a")
            .with_rule(page_rule().with_cache_name("articles"));
        let resolver = ConfigResolver::new(Arc::new(config)).unwrap();
        let p = SectionPipeline::new(Arc::new(resolver), registry(&counters), templates())
            .with_cache(Arc::new(InMemoryBackend::new()));

        let (request, plan) = p.resolve(request("/articles/3")).unwrap();
        let key = p.coordinator(&request, &plan).key_for(&plan.modules[1]);
        assert_eq!(key.as_str(), "site-a_articlesStatic");
    }
}
