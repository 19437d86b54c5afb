//! Resolution of a matched rule into a render plan.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::{ModuleSpec, Options, ProjectConfig, Rule};
use crate::error::AetherError;
use crate::routing::{RouteMatch, RouteParams, UrlMatcher};

/// Immutable description of what to render for one request.
#[derive(Debug, Clone, Serialize)]
pub struct RenderPlan {
    /// Section selected by the rule.
    pub section_id: String,
    /// Template the section is assembled with.
    pub template_id: String,
    /// Pattern of the matched rule.
    pub pattern: String,
    /// Page modules in render order, options already merged.
    pub modules: Vec<ModuleSpec>,
    /// Fragment-only modules, options already merged.
    pub fragments: Vec<ModuleSpec>,
    /// Section-level options with URL variables folded in.
    pub base_options: Options,
    /// Page cache time before any module is considered.
    pub initial_page_cache_time: Option<u64>,
    /// Cache name shared by every URL of the rule.
    pub cache_name: Option<String>,
    /// Variables extracted from the path.
    pub url_vars: RouteParams,
}

impl RenderPlan {
    /// Find a page module by alias first, then by module name.
    pub fn find_module(&self, name: &str) -> Option<&ModuleSpec> {
        find_by_alias_then_name(self.modules.iter(), name)
    }

    /// Find a fragment by alias first, then by module name.
    pub fn find_fragment(&self, name: &str) -> Option<&ModuleSpec> {
        find_by_alias_then_name(self.fragments.iter(), name)
    }

    /// Find any provider, including providers nested under fragments.
    pub fn find_provider(&self, name: &str) -> Option<&ModuleSpec> {
        find_by_alias_then_name(self.all_providers(), name)
    }

    /// Every provider of the plan, depth first.
    pub fn all_providers(&self) -> impl Iterator<Item = &ModuleSpec> + Clone {
        self.modules
            .iter()
            .chain(self.fragments.iter())
            .flat_map(|spec| std::iter::once(spec).chain(spec.modules.iter()))
    }

    /// A bare spec for a module that is not wired into the rule.
    pub fn bare_spec(&self, name: &str) -> ModuleSpec {
        let mut spec = ModuleSpec::new(name);
        spec.options = self.base_options.clone();
        spec
    }
}

fn find_by_alias_then_name<'a>(
    specs: impl Iterator<Item = &'a ModuleSpec> + Clone,
    name: &str,
) -> Option<&'a ModuleSpec> {
    specs
        .clone()
        .find(|spec| spec.provides.as_deref() == Some(name))
        .or_else(|| specs.into_iter().find(|spec| spec.name == name))
}

/// Turns requests into render plans using a project configuration.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    config: Arc<ProjectConfig>,
    matcher: UrlMatcher,
}

impl ConfigResolver {
    /// Compile the rule patterns of a configuration.
    pub fn new(config: Arc<ProjectConfig>) -> Result<Self, AetherError> {
        let matcher =
            UrlMatcher::new(&config.rules).map_err(|e| AetherError::Config(e.to_string()))?;
        Ok(Self { config, matcher })
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Match a path against the rules.
    pub fn match_path(&self, path: &str) -> Result<RouteMatch, AetherError> {
        self.matcher.match_path(path)
    }

    /// Match a path and resolve the selected rule.
    pub fn resolve_path(&self, path: &str) -> Result<RenderPlan, AetherError> {
        let route = self.match_path(path)?;
        self.resolve(&route)
    }

    /// Resolve a matched rule into a plan.
    pub fn resolve(&self, route: &RouteMatch) -> Result<RenderPlan, AetherError> {
        let rule = self.config.rules.get(route.rule_index).ok_or_else(|| {
            AetherError::Config(format!("rule {} does not exist", route.rule_index))
        })?;

        let template_id = rule
            .template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                AetherError::Config(format!(
                    "Template not specified for rule '{}' (section {})",
                    rule.pattern, rule.section
                ))
            })?
            .to_string();

        let base_options = self.section_options(rule, &route.params);

        Ok(RenderPlan {
            section_id: rule.section.clone(),
            template_id,
            pattern: rule.pattern.clone(),
            modules: merge_module_options(&rule.modules, &base_options),
            fragments: merge_module_options(&rule.fragments, &base_options),
            base_options,
            initial_page_cache_time: rule.cache,
            cache_name: rule.cache_name.clone(),
            url_vars: route.params.clone(),
        })
    }

    fn section_options(&self, rule: &Rule, url_vars: &RouteParams) -> Options {
        let mut options = self.config.default_options();
        options.extend(&rule.options);
        for (name, value) in url_vars {
            options.insert(name.clone(), Value::String(value.clone()));
        }
        options
    }
}

fn merge_module_options(specs: &[ModuleSpec], base: &Options) -> Vec<ModuleSpec> {
    specs
        .iter()
        .map(|spec| {
            let mut merged = spec.clone();
            merged.options = spec.options.merged_over(base);
            merged.modules = merge_module_options(&spec.modules, base);
            merged
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    fn config() -> Arc<ProjectConfig> {
        Arc::new(
            ProjectConfig::new(Environment::Production)
                .with_option("locale", "nb_NO")
                .with_rule(
                    Rule::new("/articles/:id", "Article")
                        .with_template("article.hbs")
                        .with_cache(300)
                        .with_cache_name("articles")
                        .with_option("layout", "wide")
                        .with_option("id", "overridden")
                        .with_module(
                            ModuleSpec::new("Headline")
                                .with_provides("headline")
                                .with_option("layout", "narrow"),
                        )
                        .with_module(ModuleSpec::new("Body"))
                        .with_fragment(
                            ModuleSpec::new("Comments")
                                .with_provides("comments")
                                .with_module(ModuleSpec::new("Count").with_provides("count")),
                        ),
                )
                .with_rule(Rule::new("/broken", "Broken")),
        )
    }

    // === Resolution Tests ===

    #[test]
    fn test_resolve_plan() {
        let resolver = ConfigResolver::new(config()).unwrap();
        let plan = resolver.resolve_path("/articles/7").unwrap();

        assert_eq!(plan.section_id, "Article");
        assert_eq!(plan.template_id, "article.hbs");
        assert_eq!(plan.initial_page_cache_time, Some(300));
        assert_eq!(plan.cache_name.as_deref(), Some("articles"));
        assert_eq!(plan.modules.len(), 2);
        assert_eq!(plan.fragments.len(), 1);
    }

    #[test]
    fn test_option_precedence() {
        let resolver = ConfigResolver::new(config()).unwrap();
        let plan = resolver.resolve_path("/articles/7").unwrap();

        // URL variables override rule options.
        assert_eq!(plan.base_options.get_str("id"), Some("7"));
        assert_eq!(plan.base_options.get_str("locale"), Some("nb_NO"));
        assert_eq!(plan.base_options.get_str("running_mode"), Some("prod"));

        // Module options override section options.
        assert_eq!(plan.modules[0].options.get_str("layout"), Some("narrow"));
        assert_eq!(plan.modules[1].options.get_str("layout"), Some("wide"));
        assert_eq!(plan.fragments[0].modules[0].options.get_str("id"), Some("7"));
    }

    #[test]
    fn test_missing_template_is_config_error() {
        let resolver = ConfigResolver::new(config()).unwrap();
        let err = resolver.resolve_path("/broken").unwrap_err();
        assert!(matches!(err, AetherError::Config(_)));
    }

    #[test]
    fn test_unmatched_path() {
        let resolver = ConfigResolver::new(config()).unwrap();
        assert!(matches!(
            resolver.resolve_path("/nowhere"),
            Err(AetherError::NoRuleMatch(_))
        ));
    }

    // === Lookup Tests ===

    #[test]
    fn test_alias_resolved_before_name() {
        let mut plan = ConfigResolver::new(config())
            .unwrap()
            .resolve_path("/articles/1")
            .unwrap();
        plan.modules.push(ModuleSpec::new("headline"));

        let found = plan.find_module("headline").unwrap();
        assert_eq!(found.name, "Headline");
        assert_eq!(plan.find_module("Body").unwrap().name, "Body");
        assert!(plan.find_module("Missing").is_none());
    }

    #[test]
    fn test_find_nested_provider() {
        let plan = ConfigResolver::new(config())
            .unwrap()
            .resolve_path("/articles/1")
            .unwrap();
        assert_eq!(plan.find_provider("count").unwrap().name, "Count");
        assert_eq!(plan.find_fragment("comments").unwrap().name, "Comments");
        assert_eq!(plan.all_providers().count(), 4);
    }

    #[test]
    fn test_bare_spec_carries_section_options() {
        let plan = ConfigResolver::new(config())
            .unwrap()
            .resolve_path("/articles/1")
            .unwrap();
        let spec = plan.bare_spec("Adhoc");
        assert_eq!(spec.output_key(), "Adhoc");
        assert_eq!(spec.options.get_str("layout"), Some("wide"));
    }
}
