//! Render command implementation.

use aether_cache::header_names;
use aether_sdk::AetherBuilder;
use anyhow::{Context as _, Result};
use serde::Serialize;

use super::{load_project, parse_header, request_uri, RenderArgs};
use crate::context::Context;
use crate::output::status_badge;

#[derive(Serialize)]
struct RenderReport {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

/// Run the render command.
pub async fn run(args: RenderArgs, ctx: &Context) -> Result<()> {
    let config = load_project(ctx, args.env.as_deref())?;
    ctx.output
        .debug(&format!("Environment: {}", config.app.env));
    let aether = AetherBuilder::new(config)
        .build()
        .context("Failed to build the application")?;

    let mut request = http::Request::builder().uri(request_uri(&args.url));
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        request = request.header(name, value);
    }
    if args.debug_cache {
        request = request.header(header_names::X_DEBUG_CACHE, "1");
    }
    let request = request
        .body(())
        .with_context(|| format!("Invalid request for '{}'", args.url))?;

    let response = aether.handle(request).await;
    let status = response.status().as_u16();
    let headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = String::from_utf8_lossy(response.body()).into_owned();

    if ctx.output.is_json() {
        ctx.output.json(&RenderReport {
            status,
            headers,
            body,
        });
        return Ok(());
    }

    if !args.body_only {
        let reason = response.status().canonical_reason().unwrap_or_default();
        println!("{} {}", status_badge(status), reason);
        for (name, value) in &headers {
            ctx.output.kv(name, value);
        }
        ctx.output.rule();
    }
    ctx.output.raw(&body);

    Ok(())
}
