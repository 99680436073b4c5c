//! Retention rules and rule sets.
//!
//! A [`RetentionRule`] pairs a tag pattern with a keep budget and a priority.
//! Rules are grouped into a [`RuleSet`], which can be built in code, taken
//! from [`RuleSet::builtin`], or loaded from a YAML or JSON file.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Pattern for images built from the default branch, release tags and custom builds.
const MAINLINE_PATTERN: &str = "merge-commit-[a-z0-9]{40}|tag-[a-z0-9]{40}|custom-[a-z0-9]{40}";

/// Pattern for images built from any other branch commit.
const BRANCH_PATTERN: &str = "commit-[a-z0-9]{40}";

/// A named tag-pattern rule with a keep budget.
///
/// The pattern is matched (unanchored) against an image's tags joined by a
/// single space. Lower `priority` values are evaluated first.
#[derive(Debug, Clone)]
pub struct RetentionRule {
    /// Label used in logs and reports.
    pub name: String,

    /// Compiled tag pattern.
    pub pattern: Regex,

    /// Number of matching images to keep, newest first.
    pub keep: u32,

    /// Evaluation order; lower values are tried first.
    pub priority: i32,
}

impl RetentionRule {
    /// Creates a rule, compiling its pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the pattern is not a valid
    /// regular expression.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagprune_core::RetentionRule;
    ///
    /// let rule = RetentionRule::new("commits", "commit-[a-z0-9]{40}", 10, 2).unwrap();
    /// assert!(rule.matches(&format!("commit-{}", "a".repeat(40))));
    /// assert!(RetentionRule::new("broken", "commit-(", 10, 2).is_err());
    /// ```
    pub fn new(name: impl Into<String>, pattern: &str, keep: u32, priority: i32) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidRule {
                reason: "rule name cannot be empty".to_string(),
            });
        }

        let pattern = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            rule: name.clone(),
            source,
        })?;

        Ok(Self {
            name,
            pattern,
            keep,
            priority,
        })
    }

    /// Returns true if the rule's pattern matches the joined tag string.
    #[must_use]
    pub fn matches(&self, joined_tags: &str) -> bool {
        self.pattern.is_match(joined_tags)
    }

    /// Returns the serializable form of this rule.
    #[must_use]
    pub fn to_spec(&self) -> RuleSpec {
        RuleSpec {
            name: self.name.clone(),
            pattern: self.pattern.as_str().to_string(),
            keep: self.keep,
            priority: self.priority,
        }
    }
}

impl fmt::Display for RetentionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (priority {}, keep {}): /{}/",
            self.name,
            self.priority,
            self.keep,
            self.pattern.as_str()
        )
    }
}

/// Serializable rule definition, as written in rule files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Rule label.
    pub name: String,

    /// Regular expression source.
    pub pattern: String,

    /// Number of matching images to keep.
    pub keep: u32,

    /// Evaluation order; lower values are tried first.
    #[serde(default)]
    pub priority: i32,
}

impl TryFrom<RuleSpec> for RetentionRule {
    type Error = Error;

    fn try_from(spec: RuleSpec) -> Result<Self> {
        Self::new(spec.name, &spec.pattern, spec.keep, spec.priority)
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<RuleSpec>,
}

/// An ordered collection of retention rules.
///
/// Classification never mutates a rule set, so one set can drive any
/// number of passes.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<RetentionRule>,
}

impl RuleSet {
    /// Creates a rule set from rules in configured order.
    #[must_use]
    pub const fn new(rules: Vec<RetentionRule>) -> Self {
        Self { rules }
    }

    /// The built-in rule set.
    ///
    /// Keeps the 50 newest merge-commit, tag and custom images, and the 849
    /// newest images of any other commit.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the built-in patterns are static.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(vec![
            RetentionRule::new("mainline", MAINLINE_PATTERN, 50, 1)?,
            RetentionRule::new("branch", BRANCH_PATTERN, 849, 2)?,
        ]))
    }

    /// Loads a rule set from a YAML or JSON file.
    ///
    /// Files ending in `.json` are decoded as JSON, everything else as YAML.
    /// The file holds a top-level `rules` list of `{ name, pattern, keep, priority }`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded, defines no
    /// rules, repeats a rule name, or contains an invalid pattern.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::RuleFile {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let file: RuleFile = if is_json {
            serde_json::from_str(&content).map_err(|e| Error::RuleParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|e| Error::RuleParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };

        let set = Self::from_specs(file.rules)?;
        tracing::debug!(path = %path.display(), rules = set.len(), "Loaded rule file");
        Ok(set)
    }

    /// Builds a rule set from serializable definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if `specs` is empty, repeats a name, or contains an
    /// invalid rule.
    pub fn from_specs(specs: Vec<RuleSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::InvalidRule {
                reason: "rule set defines no rules".to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(specs.len());
        for spec in specs {
            if !seen.insert(spec.name.clone()) {
                return Err(Error::InvalidRule {
                    reason: format!("duplicate rule name '{}'", spec.name),
                });
            }
            rules.push(RetentionRule::try_from(spec)?);
        }

        Ok(Self::new(rules))
    }

    /// Returns the rules ordered by ascending priority.
    ///
    /// The sort is stable: rules sharing a priority keep their configured order.
    #[must_use]
    pub fn by_priority(&self) -> Vec<&RetentionRule> {
        let mut ordered: Vec<&RetentionRule> = self.rules.iter().collect();
        ordered.sort_by_key(|rule| rule.priority);
        ordered
    }

    /// Returns the rules in configured order.
    #[must_use]
    pub fn rules(&self) -> &[RetentionRule] {
        &self.rules
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sha(c: char) -> String {
        c.to_string().repeat(40)
    }

    #[test]
    fn test_rule_rejects_empty_name() {
        let result = RetentionRule::new("  ", "x", 1, 1);
        assert!(matches!(result, Err(Error::InvalidRule { .. })));
    }

    #[test]
    fn test_rule_rejects_bad_pattern() {
        let result = RetentionRule::new("bad", "[a-z", 1, 1);
        match result {
            Err(Error::InvalidPattern { rule, .. }) => assert_eq!(rule, "bad"),
            other => panic!("Expected InvalidPattern, got {other:?}"),
        }
    }

    #[test]
    fn test_rule_match_is_unanchored() {
        let rule = RetentionRule::new("commits", "commit-[a-z0-9]{40}", 1, 1).unwrap();
        assert!(rule.matches(&format!("latest commit-{}", sha('a'))));
        assert!(!rule.matches("commit-short"));
        assert!(!rule.matches(""));
    }

    #[test]
    fn test_builtin_rules() {
        let rules = RuleSet::builtin().unwrap();
        assert_eq!(rules.len(), 2);

        let ordered = rules.by_priority();
        assert_eq!(ordered[0].name, "mainline");
        assert_eq!(ordered[0].keep, 50);
        assert_eq!(ordered[1].name, "branch");
        assert_eq!(ordered[1].keep, 849);

        // merge-commit tags also contain "commit-", mainline must win on priority
        let merge = format!("merge-commit-{}", sha('b'));
        assert!(ordered[0].matches(&merge));
        assert!(ordered[1].matches(&merge));
        assert!(!ordered[0].matches(&format!("commit-{}", sha('c'))));
    }

    #[test]
    fn test_by_priority_is_stable() {
        let rules = RuleSet::new(vec![
            RetentionRule::new("c", "c", 1, 5).unwrap(),
            RetentionRule::new("a", "a", 1, 1).unwrap(),
            RetentionRule::new("d", "d", 1, 5).unwrap(),
            RetentionRule::new("b", "b", 1, -3).unwrap(),
        ]);
        let names: Vec<&str> = rules.by_priority().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_from_specs_rejects_empty_and_duplicates() {
        assert!(matches!(
            RuleSet::from_specs(Vec::new()),
            Err(Error::InvalidRule { .. })
        ));

        let spec = RuleSpec {
            name: "dup".to_string(),
            pattern: "x".to_string(),
            keep: 1,
            priority: 1,
        };
        let result = RuleSet::from_specs(vec![spec.clone(), spec]);
        match result {
            Err(Error::InvalidRule { reason }) => assert!(reason.contains("dup")),
            other => panic!("Expected InvalidRule, got {other:?}"),
        }
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"rules:
  - name: releases
    pattern: "^v[0-9]+"
    keep: 5
    priority: 1
  - name: everything
    pattern: ".*"
    keep: 0"#
        )
        .unwrap();

        let rules = RuleSet::from_file(file.path()).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.rules()[0].name, "releases");
        assert_eq!(rules.rules()[1].keep, 0);
        assert_eq!(rules.rules()[1].priority, 0);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"rules":[{{"name":"all","pattern":".","keep":3,"priority":7}}]}}"#
        )
        .unwrap();

        let rules = RuleSet::from_file(file.path()).unwrap();
        assert_eq!(rules.rules()[0].to_spec().priority, 7);
        assert_eq!(rules.rules()[0].keep, 3);
    }

    #[test]
    fn test_from_file_missing() {
        let result = RuleSet::from_file("/nonexistent/rules.yaml");
        assert!(matches!(result, Err(Error::RuleFile { .. })));
    }

    #[test]
    fn test_from_file_malformed() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "rules:\n  - name: no-pattern\n    keep: 1").unwrap();

        let result = RuleSet::from_file(file.path());
        assert!(matches!(result, Err(Error::RuleParse { .. })));
    }

    #[test]
    fn test_display() {
        let rule = RetentionRule::new("commits", "commit-", 3, 2).unwrap();
        assert_eq!(rule.to_string(), "commits (priority 2, keep 3): /commit-/");
    }
}
