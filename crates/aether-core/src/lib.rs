//! Core abstractions for the Aether rule-driven delegation framework.
//!
//! This crate provides:
//! - `ProjectConfig` - Rules, modules and options loaded from TOML or JSON
//! - `UrlMatcher` - First-match-wins URL rule matching
//! - `ConfigResolver` - Turns a matched rule into an immutable `RenderPlan`
//! - `RequestContext` - Per-request, read-only view of the incoming request
//! - `AetherError` - Error taxonomy shared by every crate in the workspace

mod config;
mod context;
mod error;
mod lifecycle;
mod plan;
mod routing;

pub use config::*;
pub use context::*;
pub use error::*;
pub use lifecycle::*;
pub use plan::*;
pub use routing::*;
