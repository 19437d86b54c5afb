//! Module execution pipeline for the Aether framework.
//!
//! This crate provides:
//! - `Module` - Capability contract every page module implements
//! - `ModuleRegistry` - Name-to-factory lookup with late registration
//! - `ModuleRunner` - Runs one module and applies the failure policy
//! - `SectionPipeline` - Preloads, runs and assembles the modules of a page
//! - `ServiceDispatcher` - Invokes a module service outside the page pipeline
//! - `ProviderCatalog` - ESI provider listing and standalone module render
//! - `TemplateEngine` - Template collaborator, with a Handlebars implementation

mod esi;
mod module;
mod output;
mod pipeline;
mod registry;
mod runner;
mod service;
mod session;
mod template;

pub use esi::*;
pub use module::*;
pub use output::*;
pub use pipeline::*;
pub use registry::*;
pub use runner::*;
pub use service::*;
pub use session::*;
pub use template::*;
