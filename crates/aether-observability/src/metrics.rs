//! Per-render module timing metrics.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use aether_core::RequestId;
use serde::{Deserialize, Serialize};

/// How a module slot ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleOutcome {
    /// The module ran and produced output.
    Rendered,
    /// Output was served from cache.
    Cached,
    /// The module failed; its slot is empty.
    Failed,
    /// The module could not be constructed.
    Skipped,
}

/// Metrics for one module slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleMetrics {
    /// Output key (alias or module name).
    pub provider: String,
    /// Registered module name.
    pub module: String,
    /// Time spent on the slot (microseconds).
    pub duration_us: u64,
    /// Outcome.
    pub outcome: ModuleOutcome,
}

/// Metrics for one render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderMetrics {
    /// Request ID for correlation.
    pub request_id: String,
    /// Section rendered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Rule pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Module slots in render order.
    pub modules: Vec<ModuleMetrics>,
    /// Negotiated page cache time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_cache_time: Option<u64>,
    /// Total render duration (microseconds).
    pub total_duration_us: u64,
}

/// Collector for render metrics.
#[derive(Debug)]
pub struct MetricsCollector {
    request_id: RequestId,
    section: Option<String>,
    route: Option<String>,
    start: Instant,
    started: HashMap<String, Instant>,
    modules: Vec<ModuleMetrics>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            section: None,
            route: None,
            start: Instant::now(),
            started: HashMap::new(),
            modules: Vec::new(),
        }
    }

    /// Set section name.
    pub fn set_section(&mut self, section: impl Into<String>) {
        self.section = Some(section.into());
    }

    /// Set route pattern.
    pub fn set_route(&mut self, route: impl Into<String>) {
        self.route = Some(route.into());
    }

    /// Record module start.
    pub fn record_module_start(&mut self, provider: &str) {
        self.started.insert(provider.to_string(), Instant::now());
    }

    /// Record module finish. A module that was never started gets a zero duration.
    pub fn record_module_finish(&mut self, provider: &str, module: &str, outcome: ModuleOutcome) {
        let duration = self
            .started
            .remove(provider)
            .map(|start| start.elapsed())
            .unwrap_or_default();
        self.modules.push(ModuleMetrics {
            provider: provider.to_string(),
            module: module.to_string(),
            duration_us: duration.as_micros() as u64,
            outcome,
        });
    }

    /// Get total elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Finalize and return the metrics.
    pub fn finalize(self, page_cache_time: Option<u64>) -> RenderMetrics {
        RenderMetrics {
            request_id: self.request_id.to_string(),
            section: self.section,
            route: self.route,
            modules: self.modules,
            page_cache_time,
            total_duration_us: self.start.elapsed().as_micros() as u64,
        }
    }
}

impl RenderMetrics {
    /// Format as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Count modules with an outcome.
    pub fn count(&self, outcome: ModuleOutcome) -> usize {
        self.modules.iter().filter(|m| m.outcome == outcome).count()
    }

    /// Compact per-module timing list for a response header.
    pub fn timing_header(&self) -> String {
        let mut parts: Vec<String> = self
            .modules
            .iter()
            .map(|m| format!("{};dur={:.2}", m.provider, m.duration_us as f64 / 1000.0))
            .collect();
        parts.push(format!("total;dur={:.2}", self.total_duration_us as f64 / 1000.0));
        parts.join(", ")
    }

    /// Format as human-readable summary.
    pub fn to_summary(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Request: {}", self.request_id));

        if let Some(section) = &self.section {
            lines.push(format!("  Section: {}", section));
        }

        lines.push(format!(
            "  Total: {}us ({:.2}ms)",
            self.total_duration_us,
            self.total_duration_us as f64 / 1000.0
        ));

        if let Some(seconds) = self.page_cache_time {
            lines.push(format!("  Page cache time: {}s", seconds));
        }

        if !self.modules.is_empty() {
            lines.push("  Modules:".to_string());
            for module in &self.modules {
                lines.push(format!(
                    "    {} ({}): {}us ({:.2}ms) [{:?}]",
                    module.provider,
                    module.module,
                    module.duration_us,
                    module.duration_us as f64 / 1000.0,
                    module.outcome
                ));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect() -> RenderMetrics {
        let mut collector = MetricsCollector::new(RequestId::from_string("req-1"));
        collector.set_section("Article");
        collector.set_route("/articles/:id");
        collector.record_module_start("headline");
        collector.record_module_finish("headline", "Headline", ModuleOutcome::Rendered);
        collector.record_module_start("body");
        collector.record_module_finish("body", "Body", ModuleOutcome::Cached);
        collector.record_module_finish("ads", "Ads", ModuleOutcome::Skipped);
        collector.finalize(Some(60))
    }

    #[test]
    fn test_collects_in_render_order() {
        let metrics = collect();
        let providers: Vec<_> = metrics.modules.iter().map(|m| m.provider.as_str()).collect();
        assert_eq!(providers, vec!["headline", "body", "ads"]);
        assert_eq!(metrics.count(ModuleOutcome::Cached), 1);
        assert_eq!(metrics.modules[2].duration_us, 0);
    }

    #[test]
    fn test_summary_and_json() {
        let metrics = collect();
        let summary = metrics.to_summary();
        assert!(summary.contains("Request: req-1"));
        assert!(summary.contains("Section: Article"));
        assert!(summary.contains("Page cache time: 60s"));

        let json: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(json["modules"][1]["outcome"], "cached");
        assert_eq!(json["route"], "/articles/:id");
    }

    #[test]
    fn test_timing_header() {
        let header = collect().timing_header();
        assert!(header.starts_with("headline;dur="));
        assert!(header.contains("total;dur="));
    }
}
