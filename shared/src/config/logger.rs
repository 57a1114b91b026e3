//! Pattern-based logger configuration.
//!
//! A [`LoggerConfigurator`] is built once from an ordered list of
//! [`LoggerPattern`] rules and answers "how should records from this logger
//! be treated?" for any instrumentation scope. The first rule whose pattern
//! matches the scope name wins; its partial config is completed from the
//! fixed default, never from another rule.

use crate::models::{InstrumentationScope, SeverityNumber};
use serde::{Deserialize, Serialize};

/// A partial logger configuration. Absent fields fall back to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Drop every record from the logger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    /// Drop records whose severity is below this threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_severity: Option<SeverityNumber>,

    /// Drop records whose valid span context is not sampled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_based: Option<bool>,
}

impl LoggerConfig {
    /// Creates an empty partial config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `disabled` flag.
    #[must_use]
    pub const fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    /// Sets the minimum severity.
    #[must_use]
    pub const fn with_minimum_severity(mut self, severity: SeverityNumber) -> Self {
        self.minimum_severity = Some(severity);
        self
    }

    /// Sets the `trace_based` flag.
    #[must_use]
    pub const fn with_trace_based(mut self, trace_based: bool) -> Self {
        self.trace_based = Some(trace_based);
        self
    }

    /// Completes the config from the fixed default.
    #[must_use]
    pub fn resolve(&self) -> ResolvedLoggerConfig {
        let default = ResolvedLoggerConfig::default();
        ResolvedLoggerConfig {
            disabled: self.disabled.unwrap_or(default.disabled),
            minimum_severity: self.minimum_severity.unwrap_or(default.minimum_severity),
            trace_based: self.trace_based.unwrap_or(default.trace_based),
        }
    }
}

/// A fully populated logger configuration.
///
/// The default is `{ disabled: false, minimum_severity: UNSPECIFIED, trace_based: false }`,
/// which lets every record through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolvedLoggerConfig {
    /// Drop every record from the logger.
    pub disabled: bool,
    /// Drop records below this severity. `UNSPECIFIED` disables the check.
    pub minimum_severity: SeverityNumber,
    /// Drop records whose valid span context is not sampled.
    pub trace_based: bool,
}

/// One configuration rule: a logger name pattern and the config it applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerPattern {
    /// Exact logger name, or a glob where `*` matches any run of characters.
    pub pattern: String,
    /// The partial config applied to matching loggers.
    #[serde(default)]
    pub config: LoggerConfig,
}

impl LoggerPattern {
    /// Creates a rule.
    #[must_use]
    pub fn new(pattern: impl Into<String>, config: LoggerConfig) -> Self {
        Self {
            pattern: pattern.into(),
            config,
        }
    }
}

/// A compiled logger name pattern.
///
/// Only `*` is special; every other character, including `?`, `.`, `[` and
/// `\`, matches itself. Matching is anchored at both ends.
///
/// # Examples
///
/// ```
/// use shared::config::NamePattern;
///
/// let pattern = NamePattern::compile("svc.*.db");
/// assert!(pattern.matches("svc.orders.db"));
/// assert!(!pattern.matches("svc.orders.db.pool"));
/// assert!(!NamePattern::compile("a.c").matches("abc"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    /// No wildcard: the name must be equal.
    Exact(String),
    /// At least one wildcard.
    Wildcard {
        /// Literal text before the first `*`.
        prefix: String,
        /// Non-empty literal runs between wildcards, in order.
        middle: Vec<String>,
        /// Literal text after the last `*`.
        suffix: String,
    },
}

impl NamePattern {
    /// Compiles a pattern string.
    #[must_use]
    pub fn compile(pattern: &str) -> Self {
        if !pattern.contains('*') {
            return Self::Exact(pattern.to_string());
        }

        let mut parts: Vec<&str> = pattern.split('*').collect();
        // split on a string containing '*' always yields at least two parts
        let suffix = parts.pop().unwrap_or_default().to_string();
        let prefix = if parts.is_empty() {
            String::new()
        } else {
            parts.remove(0).to_string()
        };
        let middle = parts
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();

        Self::Wildcard {
            prefix,
            middle,
            suffix,
        }
    }

    /// Returns `true` if `name` matches the whole pattern.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == name,
            Self::Wildcard {
                prefix,
                middle,
                suffix,
            } => {
                if name.len() < prefix.len() + suffix.len()
                    || !name.starts_with(prefix.as_str())
                    || !name.ends_with(suffix.as_str())
                {
                    return false;
                }

                let mut rest = &name[prefix.len()..name.len() - suffix.len()];
                for part in middle {
                    match rest.find(part.as_str()) {
                        Some(at) => rest = &rest[at + part.len()..],
                        None => return false,
                    }
                }
                true
            }
        }
    }
}

/// Resolves logger configs from an ordered rule list.
///
/// Rules are compiled at construction and never change afterwards, so
/// resolution is a pure read and safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct LoggerConfigurator {
    rules: Vec<(NamePattern, LoggerConfig)>,
}

impl LoggerConfigurator {
    /// Compiles the rules, preserving their order.
    #[must_use]
    pub fn new(patterns: Vec<LoggerPattern>) -> Self {
        let rules = patterns
            .into_iter()
            .map(|rule| (NamePattern::compile(&rule.pattern), rule.config))
            .collect();
        Self { rules }
    }

    /// Resolves the config for a scope, keyed by its name.
    #[must_use]
    pub fn resolve(&self, scope: &InstrumentationScope) -> ResolvedLoggerConfig {
        self.resolve_name(&scope.name)
    }

    /// Resolves the config for a logger name.
    #[must_use]
    pub fn resolve_name(&self, name: &str) -> ResolvedLoggerConfig {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.matches(name))
            .map(|(_, config)| config.resolve())
            .unwrap_or_default()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
