//! Routes command implementation.

use std::sync::Arc;

use aether_core::{ConfigResolver, ProjectConfig, Rule};
use anyhow::Result;
use serde::Serialize;

use super::{load_project, request_path, RoutesArgs};
use crate::context::Context;
use crate::output::format_cache;

#[derive(Debug, Serialize, PartialEq)]
struct RouteSummary {
    pattern: String,
    section: String,
    template: Option<String>,
    cache: Option<u64>,
    modules: usize,
    fragments: usize,
}

impl From<&Rule> for RouteSummary {
    fn from(rule: &Rule) -> Self {
        Self {
            pattern: rule.pattern.clone(),
            section: rule.section.clone(),
            template: rule.template.clone(),
            cache: rule.cache,
            modules: rule.modules.len(),
            fragments: rule.fragments.len(),
        }
    }
}

fn summarize(config: &ProjectConfig) -> Vec<RouteSummary> {
    config.rules.iter().map(RouteSummary::from).collect()
}

/// Run the routes command.
pub async fn run(args: RoutesArgs, ctx: &Context) -> Result<()> {
    let config = load_project(ctx, None)?;

    match args.url {
        Some(url) => show_match(&url, config, ctx),
        None => list(&config, ctx),
    }
}

fn list(config: &ProjectConfig, ctx: &Context) -> Result<()> {
    let routes = summarize(config);
    if ctx.output.is_json() {
        ctx.output.json(&routes);
        return Ok(());
    }

    ctx.output.header("Rules");
    if routes.is_empty() {
        ctx.output.info("No rules configured");
        return Ok(());
    }

    let widths = [28, 16, 20, 6, 8];
    ctx.output
        .table_row(&["PATTERN", "SECTION", "TEMPLATE", "CACHE", "MODULES"], &widths);
    for route in &routes {
        let cache = format_cache(route.cache);
        let modules = format!("{}+{}", route.modules, route.fragments);
        ctx.output.table_row(
            &[
                &route.pattern,
                &route.section,
                route.template.as_deref().unwrap_or("-"),
                &cache,
                &modules,
            ],
            &widths,
        );
    }
    Ok(())
}

fn show_match(url: &str, config: ProjectConfig, ctx: &Context) -> Result<()> {
    let path = request_path(url)?;
    let resolver = ConfigResolver::new(Arc::new(config))?;
    let route = resolver.match_path(&path)?;
    let plan = resolver.resolve(&route)?;

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "rule": route.rule_index,
            "pattern": plan.pattern,
            "section": plan.section_id,
            "template": plan.template_id,
            "cache": plan.initial_page_cache_time,
            "urlVars": plan.url_vars,
            "modules": plan.modules.iter().map(|m| m.output_key()).collect::<Vec<_>>(),
            "fragments": plan.fragments.iter().map(|m| m.output_key()).collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    ctx.output
        .success(&format!("{} matches rule {} ({})", path, route.rule_index, plan.pattern));
    ctx.output.kv("section", &plan.section_id);
    ctx.output.kv("template", &plan.template_id);
    ctx.output
        .kv("cache", &format_cache(plan.initial_page_cache_time));
    for (name, value) in &plan.url_vars {
        ctx.output.kv(&format!(":{}", name), value);
    }
    for spec in &plan.modules {
        ctx.output
            .list_item(&format!("{} ({})", spec.output_key(), spec.name));
    }
    for spec in &plan.fragments {
        ctx.output
            .list_item(&format!("{} ({}, fragment)", spec.output_key(), spec.name));
    }
    Ok(())
}
