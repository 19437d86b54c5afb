//! Cache response and debugging headers.

use aether_core::RequestContext;
use serde::{Deserialize, Serialize};

use crate::backend::CacheStatus;
use crate::coordinator::PageCacheTime;

/// Header names for cache debugging.
pub mod header_names {
    /// Page cache directive for the edge cache.
    pub const CACHE_CONTROL: &str = "Cache-Control";
    /// Per-module cache statuses.
    pub const X_FRAGMENT_CACHE: &str = "X-Fragment-Cache";
    /// Negotiated page cache time, including 0.
    pub const X_PAGE_CACHE_TIME: &str = "X-Page-Cache-Time";
    /// Request header asking for debug headers.
    pub const X_DEBUG_CACHE: &str = "X-Debug-Cache";
    /// Request ID for tracing.
    pub const X_REQUEST_ID: &str = "X-Request-ID";
    /// Module render time in the local environment.
    pub const X_RENDER_TIME: &str = "X-Render-Time";
}

/// Per-module cache information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentCacheInfo {
    /// Output key of the module.
    pub provider: String,
    /// Registered module name.
    pub module: String,
    /// Cache status for this module.
    pub status: CacheStatus,
}

impl FragmentCacheInfo {
    /// `provider=STATUS`, or `provider(module)=STATUS` for an aliased module.
    fn label(&self) -> String {
        if self.provider == self.module {
            format!("{}={}", self.provider, self.status)
        } else {
            format!("{}({})={}", self.provider, self.module, self.status)
        }
    }
}

/// Cache explain headers for debugging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheExplainHeaders {
    /// Negotiated page cache time.
    pub page_cache_time: Option<u64>,
    /// Per-module statuses, in render order.
    pub fragments: Vec<FragmentCacheInfo>,
}

impl CacheExplainHeaders {
    /// Create new explain headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page cache time.
    pub fn with_page_cache_time(mut self, page: PageCacheTime) -> Self {
        self.page_cache_time = page.get();
        self
    }

    /// Add module info.
    pub fn add_fragment(
        &mut self,
        provider: impl Into<String>,
        module: impl Into<String>,
        status: CacheStatus,
    ) {
        self.fragments.push(FragmentCacheInfo {
            provider: provider.into(),
            module: module.into(),
            status,
        });
    }

    /// Convert to HTTP headers.
    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();

        if let Some(seconds) = self.page_cache_time {
            headers.push((header_names::X_PAGE_CACHE_TIME.to_string(), seconds.to_string()));
        }

        if !self.fragments.is_empty() {
            let fragment_info: Vec<String> = self
                .fragments
                .iter()
                .map(FragmentCacheInfo::label)
                .collect();
            headers.push((header_names::X_FRAGMENT_CACHE.to_string(), fragment_info.join(", ")));
        }

        headers
    }
}

/// Whether debug headers should be added to the response.
pub fn should_include_debug_headers(ctx: &RequestContext) -> bool {
    ctx.env.shows_error_details() || ctx.header(header_names::X_DEBUG_CACHE) == Some("1")
}
