//! Modules every project can use without registering them.

use aether_executor::{Module, ModuleContext, ModuleError, ModuleOutput, ModuleRegistry};
use async_trait::async_trait;

/// Returns `Hello world`.
#[derive(Debug, Default)]
pub struct Helloworld;

#[async_trait]
impl Module for Helloworld {
    async fn run(&mut self) -> Result<ModuleOutput, ModuleError> {
        Ok(ModuleOutput::Text("Hello world".to_string()))
    }
}

/// Returns its `text` option. The `cache` option, when numeric, is the
/// declared cache time.
#[derive(Debug)]
pub struct Text {
    text: String,
    cache: Option<u64>,
}

impl Text {
    pub fn from_context(ctx: &ModuleContext) -> Self {
        Self {
            text: ctx.option_str("text").unwrap_or_default().to_string(),
            cache: ctx.options.get_u64("cache"),
        }
    }
}

#[async_trait]
impl Module for Text {
    async fn run(&mut self) -> Result<ModuleOutput, ModuleError> {
        Ok(ModuleOutput::Text(self.text.clone()))
    }

    fn cache_time(&self) -> Option<u64> {
        self.cache
    }
}

/// Register the builtin modules.
pub fn register_builtin(registry: &ModuleRegistry) {
    registry.register("Helloworld", |_| Ok(Box::new(Helloworld) as Box<dyn Module>));
    registry.register("Text", |ctx| Ok(Box::new(Text::from_context(&ctx)) as Box<dyn Module>));
}
