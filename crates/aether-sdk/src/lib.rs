//! Public SDK for the Aether web delegation framework.
//!
//! This crate re-exports all framework functionality and provides the
//! [`Aether`] front controller:
//!
//! ```ignore
//! use aether_sdk::prelude::*;
//!
//! let aether = Aether::builder(ProjectConfig::load("aether.toml")?)
//!     .module("Weather", |ctx| Ok(Box::new(Weather::new(ctx)) as Box<dyn Module>))
//!     .build()?;
//!
//! let response = aether.handle(request).await;
//! ```

mod app;
mod builtin;
mod front;

pub use app::*;
pub use builtin::*;
pub use front::*;

pub use aether_cache;
pub use aether_core;
pub use aether_executor;
pub use aether_observability;
pub use aether_response;

/// Prelude for convenient imports.
pub mod prelude {
    pub use aether_cache::*;
    pub use aether_core::*;
    pub use aether_executor::*;
    pub use aether_observability::*;
    pub use aether_response::*;

    pub use crate::{register_builtin, Aether, AetherBuilder, Helloworld, RequestRoute, Text};
}
