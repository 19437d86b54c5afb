//! Project configuration: rules, modules and options.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::routing::{PatternError, UrlPattern};

/// Errors raised while loading a project configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern '{pattern}' in rule {index}: {source}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: PatternError,
    },
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    #[serde(alias = "dev")]
    Development,
    Stage,
    #[default]
    #[serde(alias = "prod")]
    Production,
}

impl Environment {
    /// Module failures abort the page everywhere but production.
    pub fn is_strict(&self) -> bool {
        *self != Self::Production
    }

    /// Running mode exposed to templates and options.
    pub fn running_mode(&self) -> &'static str {
        match self {
            Self::Production | Self::Stage => "prod",
            Self::Local | Self::Development => "test",
        }
    }

    /// Whether error responses may include details.
    pub fn shows_error_details(&self) -> bool {
        matches!(self, Self::Local | Self::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Development => "development",
            Self::Stage => "stage",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "development" | "dev" => Ok(Self::Development),
            "stage" => Ok(Self::Stage),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Option map attached to the project, rules and modules.
///
/// Keys keep their declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    /// Create an empty option map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a string option.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Get a non-negative integer option, accepting numeric strings.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether a switch option is turned on (`"on"` or `true`).
    pub fn is_on(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::String(s)) => s.eq_ignore_ascii_case("on"),
            Some(Value::Bool(b)) => *b,
            _ => false,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Shallow-merge `other` into this map; keys from `other` win.
    pub fn extend(&mut self, other: &Options) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Return `self` shallow-merged over `base`.
    pub fn merged_over(&self, base: &Options) -> Options {
        let mut merged = base.clone();
        merged.extend(self);
        merged
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert to a JSON object value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One module slot in a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Registered module name.
    pub name: String,
    /// Output alias, lets one module type fill several slots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provides: Option<String>,
    /// Module options, shallow-merged over the rule options.
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub options: Options,
    /// Cache time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<u64>,
    /// Extra cache key suffix.
    #[serde(default, alias = "cacheas", skip_serializing_if = "Option::is_none")]
    pub cache_as: Option<String>,
    /// Nested providers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleSpec>,
}

impl ModuleSpec {
    /// Create a bare spec carrying only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provides: None,
            options: Options::new(),
            cache: None,
            cache_as: None,
            modules: Vec::new(),
        }
    }

    pub fn with_provides(mut self, alias: impl Into<String>) -> Self {
        self.provides = Some(alias.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key, value);
        self
    }

    pub fn with_cache(mut self, seconds: u64) -> Self {
        self.cache = Some(seconds);
        self
    }

    pub fn with_cache_as(mut self, key: impl Into<String>) -> Self {
        self.cache_as = Some(key.into());
        self
    }

    pub fn with_module(mut self, nested: ModuleSpec) -> Self {
        self.modules.push(nested);
        self
    }

    /// Key the output is published under.
    pub fn output_key(&self) -> &str {
        self.provides.as_deref().unwrap_or(&self.name)
    }
}

/// A URL rule mapping a pattern to a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// URL pattern (e.g., "/articles/:id").
    pub pattern: String,
    /// Section identifier.
    #[serde(default = "default_section")]
    pub section: String,
    /// Template identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Page cache time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<u64>,
    /// Cache name shared by every URL of this rule.
    #[serde(default, alias = "cacheas", skip_serializing_if = "Option::is_none")]
    pub cache_name: Option<String>,
    /// Section-level options.
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub options: Options,
    /// Page modules, in render order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleSpec>,
    /// Modules only reachable through fragment and ESI requests.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fragments: Vec<ModuleSpec>,
}

fn default_section() -> String {
    "Generic".to_string()
}

impl Rule {
    /// Create a new rule.
    pub fn new(pattern: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            section: section.into(),
            template: None,
            cache: None,
            cache_name: None,
            options: Options::new(),
            modules: Vec::new(),
            fragments: Vec::new(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_cache(mut self, seconds: u64) -> Self {
        self.cache = Some(seconds);
        self
    }

    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = Some(name.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key, value);
        self
    }

    pub fn with_module(mut self, module: ModuleSpec) -> Self {
        self.modules.push(module);
        self
    }

    pub fn with_fragment(mut self, fragment: ModuleSpec) -> Self {
        self.fragments.push(fragment);
        self
    }
}

/// Cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Whether module caching is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cache key namespace; defaults to the request host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Per-call backend timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Entry limit for the built-in in-memory backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: None,
            timeout_ms: None,
            max_entries: None,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub env: Environment,
    /// Root path the project is mounted under.
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default)]
    pub cache: CacheSettings,
}

fn default_root() -> String {
    "/".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: Environment::default(),
            root: default_root(),
            cache: CacheSettings::default(),
        }
    }
}

/// Template settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateSettings {
    /// Directory holding template files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// A complete project configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub templates: TemplateSettings,
    /// Project-wide default options.
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub options: Options,
    /// Rules, in match order.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl ProjectConfig {
    /// Create an empty configuration for an environment.
    pub fn new(env: Environment) -> Self {
        Self {
            app: AppConfig {
                env,
                ..AppConfig::default()
            },
            ..Self::default()
        }
    }

    /// Load from a file. `.json` files are parsed as JSON, everything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };

        // Relative template directories are resolved against the config file.
        if let (Some(dir), Some(parent)) = (config.templates.dir.as_ref(), path.parent()) {
            if dir.is_relative() {
                config.templates.dir = Some(parent.join(dir));
            }
        }

        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every rule pattern parses.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        for (index, rule) in self.rules.iter().enumerate() {
            UrlPattern::parse(&rule.pattern).map_err(|source| ConfigLoadError::InvalidPattern {
                index,
                pattern: rule.pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Add a rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set a project-wide option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key, value);
        self
    }

    /// Enable or disable module caching.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.app.cache.enabled = enabled;
        self
    }

    /// Set the cache key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.app.cache.namespace = Some(namespace.into());
        self
    }

    /// Default options every rule starts from.
    pub fn default_options(&self) -> Options {
        let mut options = Options::new()
            .with("running_mode", self.app.env.running_mode())
            .with("cache", if self.app.cache.enabled { "on" } else { "off" });
        options.extend(&self.options);
        options
    }
}
