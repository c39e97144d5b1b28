//! Rule-set file loading and validation.
//!
//! The rule set is a YAML document:
//!
//! ```yaml
//! default_destination: https://hooks.slack.com/services/T000/B000/XXXX
//! rules:
//!   - name: Waiting for review
//!     query: project = X AND status = "In Review"
//!   - query: project = Y AND priority = Blocker
//!     destination: https://hooks.slack.com/services/T000/B111/YYYY
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::types::Rule;

/// The parsed rule-set file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    /// Destination for rules that do not name one; overrides the environment default
    #[serde(default)]
    pub default_destination: Option<String>,

    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Read and parse a rule-set file. Does not validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("failed to read rule set {}: {e}", path.display()))
        })?;
        let set = Self::from_yaml_str(&raw).map_err(|e| match e {
            AppError::Config(msg) => AppError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })?;

        tracing::debug!(path = %path.display(), rules = set.rules.len(), "Loaded rule set");
        Ok(set)
    }

    /// Parse a rule set from YAML text. Does not validate.
    pub fn from_yaml_str(raw: &str) -> Result<Self, AppError> {
        serde_yaml::from_str(raw)
            .map_err(|e| AppError::Config(format!("malformed rule set: {e}")))
    }

    /// The destination used for rules with an empty `destination`.
    ///
    /// The file's `default_destination` wins over `env_default`.
    pub fn resolve_default(&self, env_default: Option<&str>) -> Option<String> {
        [self.default_destination.as_deref(), env_default]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|d| !d.is_empty())
            .map(str::to_string)
    }

    /// Check every rule, reporting all problems at once.
    ///
    /// `default_destination` is the already-resolved fallback destination.
    pub fn validate(&self, default_destination: Option<&str>) -> Result<(), AppError> {
        if self.rules.is_empty() {
            return Err(AppError::Config("rule set contains no rules".to_string()));
        }

        let has_default = default_destination.is_some_and(|d| !d.trim().is_empty());
        let mut problems = Vec::new();

        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.query.trim().is_empty() {
                problems.push(format!("rule #{} has an empty query", idx + 1));
            }
            if rule.destination.trim().is_empty() && !has_default {
                problems.push(format!(
                    "rule #{} ({}) has no destination and no default destination is configured",
                    idx + 1,
                    rule.label()
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(problems.join("; ")))
        }
    }
}
