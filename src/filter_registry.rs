//! Filter registry for registering and looking up named transformations.
//!
//! Built-in filters live in a process-wide table that is initialized once and
//! never changes afterwards. Every [`FilterRegistry`] created with
//! [`FilterRegistry::new`] is layered over that table, so callers can add or
//! override filters per instance without touching the shared defaults.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::RuleError;
use crate::value::Value;

/// Trait for filter functions
///
/// A filter receives the current value of a field plus the string arguments
/// from the rule (`substr:0,2` passes `["0", "2"]`) and returns the new value.
pub trait FilterFn: Send + Sync {
    fn apply(&self, value: &Value, args: &[String]) -> Result<Value, RuleError>;
}

impl<F> FilterFn for F
where
    F: Fn(&Value, &[String]) -> Result<Value, RuleError> + Send + Sync,
{
    fn apply(&self, value: &Value, args: &[String]) -> Result<Value, RuleError> {
        self(value, args)
    }
}

/// A registered filter: the function plus the number of arguments it requires.
#[derive(Clone)]
pub struct Filter {
    func: Arc<dyn FilterFn>,
    min_args: usize,
}

impl Filter {
    /// Wrap a closure or function item.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value, &[String]) -> Result<Value, RuleError> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            min_args: 0,
        }
    }

    /// Wrap any [`FilterFn`] implementation.
    pub fn from_impl(func: impl FilterFn + 'static) -> Self {
        Self {
            func: Arc::new(func),
            min_args: 0,
        }
    }

    /// Require at least `min_args` rule arguments. Rules that pass fewer are
    /// rejected when the chain is compiled.
    pub fn with_min_args(mut self, min_args: usize) -> Self {
        self.min_args = min_args;
        self
    }

    pub fn min_args(&self) -> usize {
        self.min_args
    }

    pub fn apply(&self, value: &Value, args: &[String]) -> Result<Value, RuleError> {
        self.func.apply(value, args)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("min_args", &self.min_args)
            .finish_non_exhaustive()
    }
}

/// Alternate spellings accepted in rule strings, mapped to canonical names.
static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("toInt", "int"),
        ("toUint", "uint"),
        ("toInt64", "int64"),
        ("toFloat", "float"),
        ("toBool", "bool"),
        ("trimSpace", "trim"),
        ("lowercase", "lower"),
        ("uppercase", "upper"),
        ("upperFirst", "ucFirst"),
        ("lowerFirst", "lcFirst"),
        ("upperWord", "ucWord"),
        ("camelCase", "camel"),
        ("snakeCase", "snake"),
        ("str2arr", "strToArray"),
        ("toArray", "strToArray"),
        ("toSlice", "strToArray"),
        ("strings2ints", "stringsToInts"),
        ("toInts", "stringsToInts"),
        ("str2time", "strToTime"),
        ("encodeUrl", "urlEncode"),
        ("decodeUrl", "urlDecode"),
    ])
});

/// Normalize a rule token to its canonical registry name.
///
/// Unknown tokens come back unchanged, so this never fails and
/// `name(name(x)) == name(x)` holds for every input.
///
/// ```
/// assert_eq!(filtration::name("str2time"), "strToTime");
/// assert_eq!(filtration::name("some"), "some");
/// ```
pub fn name(raw: &str) -> &str {
    ALIASES.get(raw).copied().unwrap_or(raw)
}

static BUILTINS: Lazy<FilterRegistry> = Lazy::new(|| {
    let mut registry = FilterRegistry::empty();
    crate::builtins::register_all(&mut registry);
    registry
});

/// The shared table of built-in filters.
pub fn builtins() -> &'static FilterRegistry {
    &BUILTINS
}

/// Registry for storing and looking up filters by canonical name
pub struct FilterRegistry {
    filters: HashMap<String, Filter>,
    parent: Option<&'static FilterRegistry>,
}

impl FilterRegistry {
    /// Create a registry layered over the built-in filters
    pub fn new() -> Self {
        Self {
            filters: HashMap::new(),
            parent: Some(builtins()),
        }
    }

    /// Create a registry with no filters and no fallback table
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
            parent: None,
        }
    }

    /// Register a filter function, replacing any filter with the same
    /// canonical name in this registry.
    ///
    /// # Example
    ///
    /// ```
    /// use filtration::{FilterRegistry, Value};
    ///
    /// let mut registry = FilterRegistry::new();
    /// registry.register("double", |value: &Value, _args: &[String]| {
    ///     Ok(value.to_i64().map(|i| Value::Int(i * 2)).unwrap_or_else(|| value.clone()))
    /// });
    /// assert!(registry.has_filter("double"));
    /// ```
    pub fn register<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&Value, &[String]) -> Result<Value, RuleError> + Send + Sync + 'static,
    {
        self.register_filter(name, Filter::new(func));
    }

    /// Register a prepared [`Filter`], e.g. one that requires arguments.
    pub fn register_filter(&mut self, name: &str, filter: Filter) {
        self.filters.insert(self::name(name).to_string(), filter);
    }

    /// Look up a filter, falling back to the table this registry is layered over.
    pub fn lookup(&self, name: &str) -> Option<&Filter> {
        let name = self::name(name);
        self.filters
            .get(name)
            .or_else(|| self.parent.and_then(|parent| parent.lookup(name)))
    }

    /// Check if a filter is registered
    pub fn has_filter(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Get a sorted list of all reachable filter names
    pub fn list_filters(&self) -> Vec<String> {
        let mut names: Vec<String> = self.filters.keys().cloned().collect();
        if let Some(parent) = self.parent {
            names.extend(parent.list_filters());
        }
        names.sort();
        names.dedup();
        names
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut local: Vec<&String> = self.filters.keys().collect();
        local.sort();
        f.debug_struct("FilterRegistry")
            .field("filters", &local)
            .field("layered", &self.parent.is_some())
            .finish()
    }
}
