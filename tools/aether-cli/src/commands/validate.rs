//! Validate command implementation.

use std::sync::Arc;

use aether_core::{ConfigResolver, ModuleSpec, ProjectConfig};
use aether_executor::{HandlebarsEngine, ModuleRegistry};
use aether_sdk::register_builtin;
use anyhow::{bail, Context as _, Result};
use serde::Serialize;

use super::{load_project, ValidateArgs};
use crate::context::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Serialize)]
struct Finding {
    severity: Severity,
    message: String,
}

impl Finding {
    fn error(message: String) -> Self {
        Self {
            severity: Severity::Error,
            message,
        }
    }

    fn warning(message: String) -> Self {
        Self {
            severity: Severity::Warning,
            message,
        }
    }
}

/// Check rules against the available templates and builtin modules.
fn check_project(
    config: &ProjectConfig,
    templates: Option<&HandlebarsEngine>,
    registry: &ModuleRegistry,
) -> Vec<Finding> {
    let known_templates = templates.map(HandlebarsEngine::template_names);
    let mut findings = Vec::new();

    for (index, rule) in config.rules.iter().enumerate() {
        match rule.template.as_deref().filter(|t| !t.trim().is_empty()) {
            None => findings.push(Finding::error(format!(
                "rule {} ({}) has no template",
                index, rule.pattern
            ))),
            Some(template) => {
                if let Some(names) = &known_templates {
                    if !names.iter().any(|name| name == template) {
                        findings.push(Finding::error(format!(
                            "rule {} ({}) uses missing template '{}'",
                            index, rule.pattern, template
                        )));
                    }
                }
            }
        }

        let mut specs: Vec<&ModuleSpec> = Vec::new();
        for spec in rule.modules.iter().chain(rule.fragments.iter()) {
            specs.push(spec);
            specs.extend(spec.modules.iter());
        }
        for spec in specs {
            if !registry.contains(&spec.name) {
                findings.push(Finding::warning(format!(
                    "rule {} ({}) uses module '{}' which is not a builtin; the host must register it",
                    index, rule.pattern, spec.name
                )));
            }
        }
    }

    findings
}

/// Run the validate command.
pub async fn run(args: ValidateArgs, ctx: &Context) -> Result<()> {
    let config = load_project(ctx, None)?;
    ConfigResolver::new(Arc::new(config.clone()))?;

    let templates = match &config.templates.dir {
        Some(dir) => Some(
            HandlebarsEngine::from_dir(dir)
                .with_context(|| format!("Failed to load templates from {}", dir.display()))?,
        ),
        None => None,
    };
    let registry = ModuleRegistry::new();
    register_builtin(&registry);

    let findings = check_project(&config, templates.as_ref(), &registry);
    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();

    if args.print {
        let rendered = toml::to_string_pretty(&config).context("Failed to serialize config")?;
        ctx.output.raw(&rendered);
    }

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "valid": errors == 0,
            "rules": config.rules.len(),
            "findings": findings,
        }));
    } else {
        for finding in &findings {
            match finding.severity {
                Severity::Error => ctx.output.error(&finding.message),
                Severity::Warning => ctx.output.warn(&finding.message),
            }
        }
        if errors == 0 {
            ctx.output.success(&format!(
                "Configuration is valid ({} rules, {} warnings)",
                config.rules.len(),
                findings.len()
            ));
        }
    }

    if errors > 0 {
        bail!("{} error(s) found", errors);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_core::{Environment, Rule};

    fn registry() -> ModuleRegistry {
        let registry = ModuleRegistry::new();
        register_builtin(&registry);
        registry
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let config = ProjectConfig::new(Environment::Local)
            .with_rule(Rule::new("/", "Home"))
            .with_rule(Rule::new("/a", "A").with_template("a.hbs"));
        let engine = HandlebarsEngine::from_templates([("b.hbs", "b")]).unwrap();

        let findings = check_project(&config, Some(&engine), &registry());
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.severity == Severity::Error));
        assert!(findings[1].message.contains("a.hbs"));
    }

    #[test]
    fn test_unknown_module_is_a_warning() {
        let config = ProjectConfig::new(Environment::Local).with_rule(
            Rule::new("/", "Home")
                .with_template("home.hbs")
                .with_module(ModuleSpec::new("Helloworld"))
                .with_fragment(ModuleSpec::new("Comments").with_module(ModuleSpec::new("Count"))),
        );

        let findings = check_project(&config, None, &registry());
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.severity == Severity::Warning));
        assert!(findings[0].message.contains("'Comments'"));
        assert!(findings[1].message.contains("'Count'"));
    }
}
