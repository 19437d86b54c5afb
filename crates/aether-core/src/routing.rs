//! URL rule matching.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::Rule;
use crate::error::AetherError;

/// Variables extracted from the path (e.g., `:id` from `/articles/:id`).
pub type RouteParams = BTreeMap<String, String>;

/// Errors in a URL pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("variable segment at position {0} has no name")]
    EmptyVariableName(usize),

    #[error("catch-all segment '{0}' must be the last segment")]
    CatchAllNotLast(String),

    #[error("variable '{0}' is declared twice")]
    DuplicateVariable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(String),
    CatchAll(String),
}

/// A compiled URL pattern.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl UrlPattern {
    /// Compile a pattern such as `/articles/:id` or `/static/*path`.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let parts: Vec<&str> = split_path(pattern).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: Vec<&str> = Vec::new();

        for (position, part) in parts.iter().enumerate() {
            let (name, catch_all) = if let Some(name) = part.strip_prefix(':') {
                (name, false)
            } else if let Some(name) = part.strip_prefix('*') {
                (name, true)
            } else {
                segments.push(Segment::Literal(part.to_string()));
                continue;
            };

            if name.is_empty() {
                return Err(PatternError::EmptyVariableName(position));
            }
            if catch_all && position + 1 != parts.len() {
                return Err(PatternError::CatchAllNotLast(name.to_string()));
            }
            if names.contains(&name) {
                return Err(PatternError::DuplicateVariable(name.to_string()));
            }
            names.push(name);
            segments.push(if catch_all {
                Segment::CatchAll(name.to_string())
            } else {
                Segment::Var(name.to_string())
            });
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a path, returning the extracted variables.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let parts: Vec<&str> = split_path(path).collect();
        let mut params = RouteParams::new();

        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => {
                    if parts.get(position) != Some(&literal.as_str()) {
                        return None;
                    }
                }
                Segment::Var(name) => {
                    let value = parts.get(position)?;
                    params.insert(name.clone(), (*value).to_string());
                }
                Segment::CatchAll(name) => {
                    let rest = parts.get(position..).unwrap_or_default().join("/");
                    params.insert(name.clone(), rest);
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Normalize a path: single leading slash, no trailing or repeated slashes.
pub fn normalize_path(path: &str) -> String {
    let joined = split_path(path).collect::<Vec<_>>().join("/");
    format!("/{}", joined)
}

/// The rule selected for a request.
#[derive(Debug, Clone, Serialize)]
pub struct RouteMatch {
    /// Index of the rule in declaration order.
    pub rule_index: usize,
    /// Pattern that matched.
    pub pattern: String,
    /// Extracted path variables.
    pub params: RouteParams,
}

/// Matches request paths against rules in declaration order.
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    patterns: Vec<UrlPattern>,
}

impl UrlMatcher {
    /// Compile the patterns of every rule.
    pub fn new(rules: &[Rule]) -> Result<Self, PatternError> {
        let patterns = rules
            .iter()
            .map(|rule| UrlPattern::parse(&rule.pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Return the first rule whose pattern matches the whole path.
    pub fn match_path(&self, path: &str) -> Result<RouteMatch, AetherError> {
        self.patterns
            .iter()
            .enumerate()
            .find_map(|(rule_index, pattern)| {
                pattern.matches(path).map(|params| RouteMatch {
                    rule_index,
                    pattern: pattern.as_str().to_string(),
                    params,
                })
            })
            .ok_or_else(|| AetherError::NoRuleMatch(normalize_path(path)))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
