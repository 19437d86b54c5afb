//! CLI execution context.

use std::path::{Path, PathBuf};

use aether_core::ProjectConfig;
use anyhow::{anyhow, Context as _, Result};

use crate::output::Output;

/// Config file names looked for, in order, in each directory.
const CONFIG_NAMES: [&str; 3] = ["aether.toml", ".aether.toml", "aether.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// Path of the project configuration, when one was found.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Locate the project configuration.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config_path = match config_path {
            Some(path) => Some(resolve_path(&cwd, path)),
            None => find_config(&cwd),
        };
        if let Some(path) = &config_path {
            output.debug(&format!("Using config {}", path.display()));
        }

        Ok(Self {
            config_path,
            output,
            cwd,
        })
    }

    /// Load and parse the project configuration.
    pub fn project(&self) -> Result<ProjectConfig> {
        let path = self.config_path.as_ref().ok_or_else(|| {
            anyhow!(
                "No project configuration found in {} or its parents (looked for {})",
                self.cwd.display(),
                CONFIG_NAMES.join(", ")
            )
        })?;
        ProjectConfig::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }
}

/// Find a config file in the directory tree, starting at `start`.
fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

fn resolve_path(cwd: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_config_walks_up() {
        let root = std::env::temp_dir().join(format!("aether-cli-{}", std::process::id()));
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join(".aether.toml"), "").unwrap();

        assert_eq!(find_config(&nested), Some(root.join(".aether.toml")));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_resolve_path() {
        let cwd = Path::new("/srv/site");
        assert_eq!(resolve_path(cwd, "aether.toml"), PathBuf::from("/srv/site/aether.toml"));
        assert_eq!(resolve_path(cwd, "/etc/aether.toml"), PathBuf::from("/etc/aether.toml"));
    }
}
