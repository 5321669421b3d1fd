//! Scenario selection: which scenarios of a program get generated.
//!
//! A selection combines an exact scenario name, tag inclusion/exclusion and
//! name patterns. Every criterion that is set must match.
//!
//! ```
//! use vero_lang::selection::{ScenarioSelection, TagMode};
//!
//! let selection = ScenarioSelection::new()
//!     .with_tag("@smoke")
//!     .with_tag("checkout")
//!     .tag_mode(TagMode::All)
//!     .without_tag("flaky")
//!     .with_pattern("/^guest/")
//!     .unwrap();
//! assert!(!selection.is_empty());
//! ```

use std::{fmt, str::FromStr};

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use thiserror::Error;

use crate::ast::{Feature, Scenario};

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Invalid name pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Unknown tag mode '{0}', expected 'any' or 'all'")]
    UnknownTagMode(String),
}

/// How `include_tags` combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    /// At least one included tag is present
    #[default]
    Any,
    /// Every included tag is present
    All,
}

impl FromStr for TagMode {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(TagMode::Any),
            "all" => Ok(TagMode::All),
            _ => Err(SelectionError::UnknownTagMode(s.to_string())),
        }
    }
}

/// A free-text name filter. `/.../` is a case-insensitive regular
/// expression; anything else is a case-insensitive substring.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Substring(String),
    Regex(Regex),
}

impl NamePattern {
    pub fn parse(pattern: &str) -> Result<Self, SelectionError> {
        let matcher = match pattern
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            Some(expression) if !expression.is_empty() => Matcher::Regex(
                RegexBuilder::new(expression)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| SelectionError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    })?,
            ),
            _ => Matcher::Substring(pattern.to_lowercase()),
        };
        Ok(NamePattern {
            source: pattern.to_string(),
            matcher,
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        match &self.matcher {
            Matcher::Substring(needle) => name.to_lowercase().contains(needle),
            Matcher::Regex(regex) => regex.is_match(name),
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for NamePattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_name: Option<String>,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub tag_mode: TagMode,
    pub name_patterns: Vec<NamePattern>,
}

impl ScenarioSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scenario(mut self, name: impl Into<String>) -> Self {
        self.scenario_name = Some(name.into());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.include_tags.push(normalize_tag(tag));
        self
    }

    pub fn without_tag(mut self, tag: &str) -> Self {
        self.exclude_tags.push(normalize_tag(tag));
        self
    }

    pub fn tag_mode(mut self, mode: TagMode) -> Self {
        self.tag_mode = mode;
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, SelectionError> {
        self.name_patterns.push(NamePattern::parse(pattern)?);
        Ok(self)
    }

    /// A selection with no criteria keeps every scenario.
    pub fn is_empty(&self) -> bool {
        self.scenario_name.is_none()
            && self.include_tags.is_empty()
            && self.exclude_tags.is_empty()
            && self.name_patterns.is_empty()
    }

    /// Whether a scenario survives the selection. Its tags are the feature's
    /// tags plus its own.
    pub fn matches(&self, feature: &Feature, scenario: &Scenario) -> bool {
        if let Some(name) = &self.scenario_name {
            if scenario.name != *name {
                return false;
            }
        }

        let tags: Vec<String> = feature
            .tags
            .iter()
            .chain(&scenario.tags)
            .map(|t| normalize_tag(t))
            .collect();
        let has = |tag: &String| tags.contains(&normalize_tag(tag));

        if self.exclude_tags.iter().any(has) {
            return false;
        }

        if !self.include_tags.is_empty() {
            let included = match self.tag_mode {
                TagMode::Any => self.include_tags.iter().any(has),
                TagMode::All => self.include_tags.iter().all(has),
            };
            if !included {
                return false;
            }
        }

        self.name_patterns.is_empty()
            || self
                .name_patterns
                .iter()
                .any(|pattern| pattern.is_match(&scenario.name))
    }
}

/// `@Smoke` and `smoke` are the same tag.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('@').to_lowercase()
}
