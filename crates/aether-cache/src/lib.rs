//! Module cache coordination for the Aether framework.
//!
//! This crate provides:
//! - `CacheBackend` - Async get/set contract of the external cache
//! - `InMemoryBackend` - TTL-aware backend for development and tests
//! - `CacheCoordinator` - Per-module read-through/write-through caching
//! - `PageCacheTime` - Page-level cache time negotiated across modules
//! - `CacheExplainHeaders` - Debug headers describing cache behavior
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use aether_cache::{CacheCoordinator, InMemoryBackend, PageCacheTime};
//!
//! let coordinator = CacheCoordinator::new(Arc::new(InMemoryBackend::new()), "example.com", "/articles/1");
//! let mut page = PageCacheTime::new(Some(300));
//! let ttl = coordinator.preload(&mut spec, module.cache_time(), &mut page);
//! let (output, status) = coordinator.load_or_run(&spec, &mut page, || module.run()).await?;
//! ```

mod backend;
mod coordinator;
mod headers;
mod key;

pub use backend::*;
pub use coordinator::*;
pub use headers::*;
pub use key::*;
