//! CLI command implementations.

pub mod providers;
pub mod render;
pub mod routes;
pub mod validate;

use aether_core::{Environment, ProjectConfig};
use anyhow::{anyhow, bail, Context as _, Result};
use clap::Args;

use crate::context::Context;

/// Arguments for the render command.
#[derive(Args)]
pub struct RenderArgs {
    /// URL or path to render (e.g. /articles/7?module=Poll&service=vote).
    pub url: String,

    /// Extra request header, as `Name: value`. May be repeated.
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Override the configured environment.
    #[arg(short, long)]
    pub env: Option<String>,

    /// Ask for cache debugging headers.
    #[arg(long)]
    pub debug_cache: bool,

    /// Print only the response body.
    #[arg(short, long)]
    pub body_only: bool,
}

/// Arguments for the providers command.
#[derive(Args)]
pub struct ProvidersArgs {
    /// Path whose rule lists the providers.
    pub url: String,
}

/// Arguments for the routes command.
#[derive(Args)]
pub struct RoutesArgs {
    /// Show the rule this path matches instead of listing every rule.
    pub url: Option<String>,
}

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Print the normalized configuration as TOML.
    #[arg(short, long)]
    pub print: bool,
}

/// Load the project, applying an environment override.
pub(crate) fn load_project(ctx: &Context, env: Option<&str>) -> Result<ProjectConfig> {
    let mut config = ctx.project()?;
    if let Some(env) = env {
        config.app.env = env.parse::<Environment>().map_err(|e| anyhow!(e))?;
    }
    Ok(config)
}

/// Split a `Name: value` header argument.
pub(crate) fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("Invalid header '{}', expected 'Name: value'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid header '{}', the name is empty", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Turn a path or absolute URL into a request URI.
pub(crate) fn request_uri(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("http://localhost{}", url)
    } else {
        format!("http://localhost/{}", url)
    }
}

/// Path part of a path or URL, without the query string.
pub(crate) fn request_path(url: &str) -> Result<String> {
    let uri: http::Uri = request_uri(url)
        .parse()
        .with_context(|| format!("Invalid URL '{}'", url))?;
    Ok(uri.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Header Parsing Tests ===

    #[test]
    fn test_parse_header() {
        let (name, value) = parse_header("X-Debug-Cache: 1").unwrap();
        assert_eq!(name, "X-Debug-Cache");
        assert_eq!(value, "1");

        let (_, value) = parse_header("Referer:http://a.example/x").unwrap();
        assert_eq!(value, "http://a.example/x");
    }

    #[test]
    fn test_parse_header_rejects_malformed() {
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    // === URL Tests ===

    #[test]
    fn test_request_uri() {
        assert_eq!(request_uri("/a?b=1"), "http://localhost/a?b=1");
        assert_eq!(request_uri("a"), "http://localhost/a");
        assert_eq!(request_uri("https://example.com/x"), "https://example.com/x");
    }

    #[test]
    fn test_request_path_drops_query() {
        assert_eq!(request_path("/articles/7?_esi").unwrap(), "/articles/7");
        assert_eq!(request_path("http://example.com/").unwrap(), "/");
    }
}
