//! Ignore rule matching
//!
//! A rule is tested against a candidate's base name and against the path of
//! the directory containing it. A match prunes the candidate, and for a
//! directory its whole subtree, from the scan.

use glob::Pattern;
use pollwatch_core::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::trace;

const REGEX_PREFIX: &str = "re:";
const GLOB_PREFIX: &str = "glob:";

/// A single ignore rule
#[derive(Debug, Clone)]
pub enum IgnoreRule {
    /// Matches when the text contains the string
    Literal(String),
    /// Matches when the whole text matches the glob
    Glob(Pattern),
    /// Matches when the regex finds a match anywhere in the text
    Regex(Regex),
}

impl IgnoreRule {
    /// Create a substring rule
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    /// Compile a glob rule
    pub fn glob(pattern: &str) -> Result<Self> {
        Pattern::new(pattern)
            .map(Self::Glob)
            .map_err(|e| Error::invalid_ignore_rule(format!("glob '{pattern}': {e}")))
    }

    /// Compile a regex rule
    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|e| Error::invalid_ignore_rule(format!("regex '{pattern}': {e}")))
    }

    /// Test the rule against a name or path string
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Literal(literal) => text.contains(literal.as_str()),
            Self::Glob(pattern) => pattern.matches(text),
            Self::Regex(regex) => regex.is_match(text),
        }
    }
}

impl FromStr for IgnoreRule {
    type Err = Error;

    /// `re:<regex>` and `glob:<pattern>` select the rule type; anything else
    /// is a literal substring
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::invalid_ignore_rule("empty rule"));
        }
        if let Some(pattern) = s.strip_prefix(REGEX_PREFIX) {
            return Self::regex(pattern);
        }
        if let Some(pattern) = s.strip_prefix(GLOB_PREFIX) {
            return Self::glob(pattern);
        }
        Ok(Self::literal(s))
    }
}

impl fmt::Display for IgnoreRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => write!(f, "{literal}"),
            Self::Glob(pattern) => write!(f, "{GLOB_PREFIX}{}", pattern.as_str()),
            Self::Regex(regex) => write!(f, "{REGEX_PREFIX}{}", regex.as_str()),
        }
    }
}

/// The ignore rules owned by one watcher
///
/// Ignores nothing by default.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    rules: Vec<IgnoreRule>,
}

impl IgnoreSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a set from rule strings
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let rules = patterns
            .iter()
            .map(|p| p.as_ref().parse())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Add a rule
    pub fn push(&mut self, rule: IgnoreRule) {
        self.rules.push(rule);
    }

    /// Rules in insertion order
    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check whether a child named `name` inside `parent` should be skipped
    pub fn should_ignore(&self, name: &str, parent: &Path) -> bool {
        if self.rules.is_empty() {
            return false;
        }

        let parent = parent.to_string_lossy();
        let matched = self
            .rules
            .iter()
            .find(|rule| rule.matches(name) || rule.matches(&parent));

        if let Some(rule) = matched {
            trace!("Ignoring {:?} in {:?} (rule: {})", name, parent, rule);
            return true;
        }
        false
    }
}

impl From<Vec<IgnoreRule>> for IgnoreSet {
    fn from(rules: Vec<IgnoreRule>) -> Self {
        Self { rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule_kinds() {
        assert!(matches!(
            "node_modules".parse::<IgnoreRule>(),
            Ok(IgnoreRule::Literal(_))
        ));
        assert!(matches!(
            "glob:*.log".parse::<IgnoreRule>(),
            Ok(IgnoreRule::Glob(_))
        ));
        assert!(matches!(
            "re:^\\.git$".parse::<IgnoreRule>(),
            Ok(IgnoreRule::Regex(_))
        ));
    }

    #[test]
    fn test_parse_invalid_rules() {
        assert!(matches!(
            "re:(unclosed".parse::<IgnoreRule>(),
            Err(Error::InvalidIgnoreRule(_))
        ));
        assert!(matches!(
            "glob:[".parse::<IgnoreRule>(),
            Err(Error::InvalidIgnoreRule(_))
        ));
        assert!("".parse::<IgnoreRule>().is_err());
    }

    #[test]
    fn test_display_round_trips_prefix() {
        let rule: IgnoreRule = "re:\\.tmp$".parse().expect("test setup failed");
        assert_eq!(rule.to_string(), "re:\\.tmp$");
        let rule: IgnoreRule = "glob:*.bak".parse().expect("test setup failed");
        assert_eq!(rule.to_string(), "glob:*.bak");
    }

    #[test]
    fn test_literal_is_substring() {
        let rule = IgnoreRule::literal("node_modules");
        assert!(rule.matches("node_modules"));
        assert!(rule.matches("/project/node_modules/lodash"));
        assert!(!rule.matches("src"));
    }

    #[test]
    fn test_should_ignore_by_name() {
        let set = IgnoreSet::from_patterns(&["glob:*.log", "re:^\\.git$"]).expect("test setup failed");

        assert!(set.should_ignore("debug.log", Path::new("/project")));
        assert!(set.should_ignore(".git", Path::new("/project")));
        assert!(!set.should_ignore(".github", Path::new("/project")));
        assert!(!set.should_ignore("main.rs", Path::new("/project/src")));
    }

    #[test]
    fn test_should_ignore_by_parent_path() {
        let set = IgnoreSet::from_patterns(&["vendor"]).expect("test setup failed");

        assert!(set.should_ignore("lib.rs", Path::new("/project/vendor/dep")));
        assert!(!set.should_ignore("lib.rs", Path::new("/project/src")));
    }

    #[test]
    fn test_empty_set_ignores_nothing() {
        let set = IgnoreSet::new();
        assert!(set.is_empty());
        assert!(!set.should_ignore("anything", Path::new("/")));
    }
}
