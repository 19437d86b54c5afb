//! Providers command implementation.

use std::sync::Arc;

use aether_core::ConfigResolver;
use aether_executor::ProviderCatalog;
use anyhow::Result;

use super::{load_project, request_path, ProvidersArgs};
use crate::context::Context;
use crate::output::format_cache;

/// Run the providers command.
pub async fn run(args: ProvidersArgs, ctx: &Context) -> Result<()> {
    let config = load_project(ctx, None)?;
    let resolver = ConfigResolver::new(Arc::new(config))?;
    let path = request_path(&args.url)?;
    let plan = resolver.resolve_path(&path)?;

    if ctx.output.is_json() {
        ctx.output.json(&ProviderCatalog::from_plan(&plan));
        return Ok(());
    }

    ctx.output
        .header(&format!("Providers of {} ({})", path, plan.section_id));
    if plan.modules.is_empty() && plan.fragments.is_empty() {
        ctx.output.info("No providers");
        return Ok(());
    }

    let widths = [20, 20, 8, 10];
    ctx.output.table_row(&["KEY", "MODULE", "CACHE", "KIND"], &widths);
    let kinds = plan
        .modules
        .iter()
        .map(|spec| (spec, "module"))
        .chain(plan.fragments.iter().map(|spec| (spec, "fragment")));
    for (spec, kind) in kinds {
        let cache = format_cache(spec.cache);
        ctx.output
            .table_row(&[spec.output_key(), &spec.name, &cache, kind], &widths);
        for nested in &spec.modules {
            let key = format!("└ {}", nested.output_key());
            let cache = format_cache(nested.cache);
            ctx.output
                .table_row(&[&key, &nested.name, &cache, "nested"], &widths);
        }
    }

    Ok(())
}
