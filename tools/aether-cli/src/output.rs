//! Terminal output for the CLI.
//!
//! In `--json` mode only [`Output::json`] and errors are printed; everything
//! else is meant for people.

use console::{style, StyledObject, Term};

/// Output handler for CLI messages.
#[derive(Clone, Copy)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    fn line(&self, marker: StyledObject<&str>, msg: &str) {
        if !self.json {
            println!("{} {}", marker, msg);
        }
    }

    pub fn info(&self, msg: &str) {
        self.line(style("ℹ").blue(), msg);
    }

    pub fn success(&self, msg: &str) {
        self.line(style("✓").green(), msg);
    }

    /// Warnings go to stderr so piped bodies stay clean.
    pub fn warn(&self, msg: &str) {
        if !self.json {
            eprintln!("{} {}", style("⚠").yellow(), msg);
        }
    }

    /// Errors are printed in every mode; as `{"error": ...}` with `--json`.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        } else {
            eprintln!("{} {}", style("✗").red(), style(msg).red());
        }
    }

    /// Only shown with `--verbose`.
    pub fn debug(&self, msg: &str) {
        if self.verbose && !self.json {
            eprintln!("{}", style(format!("→ {}", msg)).dim());
        }
    }

    pub fn header(&self, msg: &str) {
        if !self.json {
            println!("\n{}", style(msg).bold().underlined());
        }
    }

    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if !self.json {
            println!("  {}: {}", style(key).dim(), value);
        }
    }

    pub fn list_item(&self, item: &str) {
        self.line(style("  •").dim(), item);
    }

    /// One row of a left-aligned table.
    pub fn table_row(&self, cols: &[&str], widths: &[usize]) {
        if !self.json {
            println!("  {}", pad_columns(cols, widths));
        }
    }

    /// Separator between response headers and body.
    pub fn rule(&self) {
        if !self.json {
            let width = usize::from(Term::stdout().size().1).clamp(20, 80);
            println!("{}", style("─".repeat(width)).dim());
        }
    }

    /// Print text unchanged, adding a final newline when it has none.
    pub fn raw(&self, text: &str) {
        if self.json {
            return;
        }
        if text.ends_with('\n') {
            print!("{}", text);
        } else {
            println!("{}", text);
        }
    }
}

fn pad_columns(cols: &[&str], widths: &[usize]) -> String {
    let padded: Vec<String> = cols
        .iter()
        .zip(widths)
        .map(|(col, width)| format!("{:width$}", col, width = width))
        .collect();
    padded.join("  ").trim_end().to_string()
}

/// HTTP status colored by class.
pub fn status_badge(status: u16) -> String {
    let text = style(status);
    match status {
        200..=299 => text.green(),
        300..=399 => text.cyan(),
        400..=499 => text.yellow(),
        _ => text.red(),
    }
    .to_string()
}

/// Cache lifetime in the largest whole unit: `-` when unset, `off` for zero.
pub fn format_cache(seconds: Option<u64>) -> String {
    match seconds {
        None => "-".to_string(),
        Some(0) => "off".to_string(),
        Some(s) if s % 3600 == 0 => format!("{}h", s / 3600),
        Some(s) if s % 60 == 0 => format!("{}m", s / 60),
        Some(s) => format!("{}s", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cache() {
        assert_eq!(format_cache(None), "-");
        assert_eq!(format_cache(Some(0)), "off");
        assert_eq!(format_cache(Some(45)), "45s");
        assert_eq!(format_cache(Some(120)), "2m");
        assert_eq!(format_cache(Some(7200)), "2h");
    }

    #[test]
    fn test_pad_columns() {
        assert_eq!(pad_columns(&["/a", "Home", "-"], &[4, 6, 3]), "/a    Home    -");
        assert_eq!(pad_columns(&["x"], &[10]), "x");
    }
}
