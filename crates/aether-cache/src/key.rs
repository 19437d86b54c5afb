//! Cache key composition.

use aether_core::ModuleSpec;
use serde::{Deserialize, Serialize};

/// A cache key uniquely identifying one module's output for one page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// The computed key string.
    key: String,
    /// Components that make up the key (for debugging).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<String>,
}

impl CacheKey {
    /// Create a cache key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            components: Vec::new(),
        }
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Get the key components (for debugging).
    pub fn components(&self) -> &[String] {
        &self.components
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Builder for module cache keys.
///
/// Keys have the form `namespace_cacheName` followed by the module name, the
/// alias and the override, each appended only when present.
#[derive(Debug, Clone, Default)]
pub struct CacheKeyBuilder {
    namespace: String,
    cache_name: String,
    module: String,
    provides: Option<String>,
    key_override: Option<String>,
}

impl CacheKeyBuilder {
    /// Create a builder for a page.
    pub fn new(namespace: impl Into<String>, cache_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            cache_name: cache_name.into(),
            ..Self::default()
        }
    }

    pub fn module(mut self, name: impl Into<String>) -> Self {
        self.module = name.into();
        self
    }

    pub fn provides(mut self, alias: Option<&str>) -> Self {
        self.provides = alias.map(str::to_string);
        self
    }

    pub fn key_override(mut self, key: Option<&str>) -> Self {
        self.key_override = key.map(str::to_string);
        self
    }

    /// Take module name, alias and override from a spec.
    pub fn spec(self, spec: &ModuleSpec) -> Self {
        self.module(spec.name.clone())
            .provides(spec.provides.as_deref())
            .key_override(spec.cache_as.as_deref())
    }

    /// Build the key.
    pub fn build(self) -> CacheKey {
        let mut components = vec![
            format!("namespace:{}", self.namespace),
            format!("cache_name:{}", self.cache_name),
            format!("module:{}", self.module),
        ];
        let mut key = format!("{}_{}{}", self.namespace, self.cache_name, self.module);

        if let Some(alias) = &self.provides {
            key.push_str(alias);
            components.push(format!("provides:{}", alias));
        }
        if let Some(key_override) = &self.key_override {
            key.push_str(key_override);
            components.push(format!("override:{}", key_override));
        }

        CacheKey { key, components }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let key = CacheKeyBuilder::new("example.com", "articles").module("Headline").build();
        assert_eq!(key.as_str(), "example.com_articlesHeadline");
        assert_eq!(key.components().len(), 3);
    }

    #[test]
    fn test_key_with_alias_and_override() {
        let spec = ModuleSpec::new("Headline")
            .with_provides("top")
            .with_cache_as("v2");
        let key = CacheKeyBuilder::new("ns", "/a").spec(&spec).build();
        assert_eq!(key.as_str(), "ns_/aHeadlinetopv2");
        assert!(key.components().contains(&"override:v2".to_string()));
    }

    #[test]
    fn test_aliases_get_distinct_keys() {
        let a = CacheKeyBuilder::new("ns", "p")
            .spec(&ModuleSpec::new("List").with_provides("left"))
            .build();
        let b = CacheKeyBuilder::new("ns", "p")
            .spec(&ModuleSpec::new("List").with_provides("right"))
            .build();
        assert_ne!(a, b);
    }
}
