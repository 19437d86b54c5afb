//! Template collaborator.

use std::path::Path;
use std::sync::Arc;

use aether_core::AetherError;
use handlebars::Handlebars;
use serde_json::{Map, Value};

/// File extensions picked up when loading a template directory.
pub const TEMPLATE_EXTENSIONS: [&str; 3] = ["hbs", "html", "tpl"];

/// Template errors.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("failed to compile template '{name}': {message}")]
    Compile { name: String, message: String },

    #[error("failed to render template '{name}': {message}")]
    Render { name: String, message: String },

    #[error("failed to read template directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<TemplateError> for AetherError {
    fn from(error: TemplateError) -> Self {
        AetherError::Template(error.to_string())
    }
}

/// One template rendering session: variables are set, then a template is fetched.
pub trait Template: Send {
    fn set(&mut self, key: &str, value: Value);

    fn exists(&self, template_id: &str) -> bool;

    fn fetch(&self, template_id: &str) -> Result<String, TemplateError>;
}

/// Hands out template sessions.
pub trait TemplateEngine: Send + Sync {
    fn instance(&self) -> Box<dyn Template>;
}

/// Handlebars-backed template engine.
///
/// Templates are registered under their file name, e.g. `article.hbs`.
/// Missing variables render as empty strings.
#[derive(Clone)]
pub struct HandlebarsEngine {
    registry: Arc<Handlebars<'static>>,
}

impl HandlebarsEngine {
    pub fn new(registry: Handlebars<'static>) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Compile templates given as `(name, source)` pairs.
    pub fn from_templates<'a>(
        templates: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        for (name, source) in templates {
            register(&mut registry, name, source)?;
        }
        Ok(Self::new(registry))
    }

    /// Compile every template file found directly in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();
        let io_error = |source| TemplateError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut registry = Handlebars::new();
        for entry in std::fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            let is_template = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext));
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !is_template || !path.is_file() {
                continue;
            }

            let source = std::fs::read_to_string(&path).map_err(io_error)?;
            register(&mut registry, name, &source)?;
            tracing::debug!(template = %name, "loaded template");
        }
        Ok(Self::new(registry))
    }

    /// Names of the registered templates, sorted.
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.get_templates().keys().cloned().collect();
        names.sort();
        names
    }
}

fn register(registry: &mut Handlebars<'static>, name: &str, source: &str) -> Result<(), TemplateError> {
    registry
        .register_template_string(name, source)
        .map_err(|e| TemplateError::Compile {
            name: name.to_string(),
            message: e.to_string(),
        })
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new(Handlebars::new())
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn instance(&self) -> Box<dyn Template> {
        Box::new(HandlebarsTemplate {
            registry: Arc::clone(&self.registry),
            data: Map::new(),
        })
    }
}

impl std::fmt::Debug for HandlebarsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlebarsEngine")
            .field("templates", &self.template_names())
            .finish()
    }
}

/// A Handlebars rendering session.
pub struct HandlebarsTemplate {
    registry: Arc<Handlebars<'static>>,
    data: Map<String, Value>,
}

impl Template for HandlebarsTemplate {
    fn set(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    fn exists(&self, template_id: &str) -> bool {
        self.registry.has_template(template_id)
    }

    fn fetch(&self, template_id: &str) -> Result<String, TemplateError> {
        if !self.exists(template_id) {
            return Err(TemplateError::NotFound(template_id.to_string()));
        }
        self.registry
            .render(template_id, &self.data)
            .map_err(|e| TemplateError::Render {
                name: template_id.to_string(),
                message: e.to_string(),
            })
    }
}
