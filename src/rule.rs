//! Rule strings and their compiled form.
//!
//! A rule is a `|`-separated chain of filter calls, each optionally followed
//! by `:` and a comma-separated argument list:
//!
//! ```text
//! trim|ucFirst
//! substr:0,2
//! str2arr:;|unique
//! ```
//!
//! Rules can also be loaded in bulk from YAML or JSON via [`RuleSet`].

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RuleError};
use crate::filter_registry::{self, FilterRegistry};

/// One step of a compiled chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCall {
    /// Canonical filter name
    pub name: String,
    pub args: Vec<String>,
}

/// Ordered filter calls compiled from one rule string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompiledChain {
    calls: Vec<FilterCall>,
}

impl CompiledChain {
    pub fn calls(&self) -> &[FilterCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Canonical names in call order.
    pub fn names(&self) -> Vec<&str> {
        self.calls.iter().map(|call| call.name.as_str()).collect()
    }
}

/// Compile a rule string into a chain of filter calls.
///
/// Names are normalized through [`filter_registry::name`]. The name ends at
/// the first `:`, so arguments may contain further colons (time layouts do).
///
/// # Errors
/// Returns [`RuleError::Parse`] if any call segment is empty.
///
/// # Example
/// ```
/// use filtration::rule::parse;
///
/// let chain = parse("trim | substr:0,2").unwrap();
/// assert_eq!(chain.names(), vec!["trim", "substr"]);
/// assert_eq!(chain.calls()[1].args, vec!["0", "2"]);
/// ```
pub fn parse(rule: &str) -> Result<CompiledChain, RuleError> {
    let mut calls = Vec::new();

    for (index, segment) in rule.split('|').enumerate() {
        let (raw_name, raw_args) = match segment.split_once(':') {
            Some((name, args)) => (name.trim(), Some(args.trim())),
            None => (segment.trim(), None),
        };

        if raw_name.is_empty() {
            return Err(RuleError::parse(
                rule,
                format!("empty filter name in call #{}", index + 1),
            ));
        }

        let args = match raw_args {
            Some(args) if !args.is_empty() => {
                args.split(',').map(|arg| arg.trim().to_string()).collect()
            }
            _ => Vec::new(),
        };

        calls.push(FilterCall {
            name: filter_registry::name(raw_name).to_string(),
            args,
        });
    }

    Ok(CompiledChain { calls })
}

/// Parse a rule and check each call's argument count against `registry`.
///
/// Filters the registry doesn't know are accepted here; the engine passes
/// their values through unchanged.
///
/// # Errors
/// Returns [`RuleError::Parse`] for a malformed rule or a filter called with
/// fewer arguments than it requires.
pub fn compile(registry: &FilterRegistry, rule: &str) -> Result<CompiledChain, RuleError> {
    let chain = parse(rule)?;

    for call in chain.calls() {
        if let Some(filter) = registry.lookup(&call.name) {
            if call.args.len() < filter.min_args() {
                return Err(RuleError::parse(
                    rule,
                    format!(
                        "filter '{}' needs {} argument(s), got {}",
                        call.name,
                        filter.min_args(),
                        call.args.len()
                    ),
                ));
            }
        }
    }

    Ok(chain)
}

/// Field rules loaded from configuration.
///
/// ```yaml
/// rules:
///   name: trim|ucFirst
///   age: int
///   tags: "str2arr:;"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// field -> rule string, in file order
    #[serde(default)]
    pub rules: IndexMap<String, String>,
}

impl RuleSet {
    /// Load a rule set from a YAML (or JSON) file.
    ///
    /// # Errors
    /// Returns error if the file can't be read or doesn't have a `rules` mapping
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_yaml_str(&contents)
    }

    /// Parse a rule set from YAML text. JSON is valid YAML, so it works too.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Compile every rule against `registry` without applying it, reporting
    /// the first bad one. Accepts exactly the rules a run would accept.
    pub fn validate(&self, registry: &FilterRegistry) -> Result<(), RuleError> {
        for rule in self.rules.values() {
            compile(registry, rule)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
