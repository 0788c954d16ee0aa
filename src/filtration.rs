//! The filtering engine.
//!
//! [`Filtration`] borrows a raw data bag, collects per-field rules, applies
//! them once and keeps the transformed values in a separate result bag. The
//! raw bag is never modified.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{FieldError, RuleError};
use crate::extraction;
use crate::filter_registry::{Filter, FilterRegistry};
use crate::rule::{self, CompiledChain, RuleSet};
use crate::value::{Bag, Value};

/// Whether the rules have been applied yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotRun,
    Ran,
}

/// Applies field rules to a borrowed data bag.
///
/// # Example
///
/// ```
/// use filtration::{Bag, Filtration, Value};
///
/// let mut data = Bag::new();
/// data.insert("name".to_string(), Value::from(" inhere "));
/// data.insert("age".to_string(), Value::from("50"));
///
/// let mut f = Filtration::new(&data);
/// f.attach_rules([("name", "trim|ucFirst"), ("age", "int")]);
///
/// assert!(f.sanitize().is_ok());
/// assert_eq!(f.string("name"), "Inhere");
/// assert_eq!(f.int("age"), 50);
/// assert_eq!(f.raw("name"), Some(&Value::from(" inhere ")));
/// ```
#[derive(Debug)]
pub struct Filtration<'a> {
    /// Raw input, read-only
    data: &'a Bag,

    /// field -> rule string, in attach order
    rules: IndexMap<String, String>,

    /// field -> compiled chain (or the reason it didn't compile)
    chains: HashMap<String, Result<CompiledChain, RuleError>>,

    /// Local filters layered over the built-ins
    registry: FilterRegistry,

    filtered: Bag,
    errors: IndexMap<String, FieldError>,
    state: RunState,
    outcome: Result<(), FieldError>,
}

impl<'a> Filtration<'a> {
    /// Create an engine over `data` using the built-in filters.
    pub fn new(data: &'a Bag) -> Self {
        Self::with_registry(data, FilterRegistry::new())
    }

    /// Create an engine over `data` that looks filters up in `registry`.
    pub fn with_registry(data: &'a Bag, registry: FilterRegistry) -> Self {
        Self {
            data,
            rules: IndexMap::new(),
            chains: HashMap::new(),
            registry,
            filtered: Bag::new(),
            errors: IndexMap::new(),
            state: RunState::NotRun,
            outcome: Ok(()),
        }
    }

    /// Attach a rule to a field.
    ///
    /// `field` may list several fields separated by commas (`"name,email"`).
    /// Setting a rule on a field that already has one replaces it and drops
    /// the result the old rule produced.
    pub fn attach_rule(&mut self, field: &str, rule: &str) -> &mut Self {
        for field in field.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            self.chains.remove(field);
            if let Some(previous) = self.rules.insert(field.to_string(), rule.to_string()) {
                if previous != rule {
                    self.filtered.shift_remove(field);
                }
            }
        }
        self
    }

    /// Attach many `(field, rule)` pairs, e.g. from a map.
    pub fn attach_rules<I, K, R>(&mut self, rules: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, R)>,
        K: AsRef<str>,
        R: AsRef<str>,
    {
        for (field, rule) in rules {
            self.attach_rule(field.as_ref(), rule.as_ref());
        }
        self
    }

    /// Attach every rule from a loaded [`RuleSet`].
    pub fn attach_rule_set(&mut self, rule_set: &RuleSet) -> &mut Self {
        self.attach_rules(&rule_set.rules)
    }

    /// Register a filter for this engine only, overriding any built-in with
    /// the same canonical name.
    pub fn register<F>(&mut self, name: &str, func: F) -> &mut Self
    where
        F: Fn(&Value, &[String]) -> Result<Value, RuleError> + Send + Sync + 'static,
    {
        self.registry.register(name, func);
        // argument checks depend on the registry
        self.chains.clear();
        self
    }

    /// Register a prepared [`Filter`] for this engine only, e.g. one built
    /// with [`Filter::with_min_args`].
    pub fn register_filter(&mut self, name: &str, filter: Filter) -> &mut Self {
        self.registry.register_filter(name, filter);
        self.chains.clear();
        self
    }

    /// Apply all rules.
    ///
    /// Every field is processed even when an earlier one fails; a failing
    /// field keeps no result. Returns the first failure in field order.
    /// Calling this again after a run returns the same outcome without
    /// applying anything.
    pub fn filtering(&mut self) -> Result<(), FieldError> {
        if self.state == RunState::Ran {
            return self.outcome.clone();
        }

        self.compile_pending();

        let mut first_error: Option<FieldError> = None;

        for (field, rule) in &self.rules {
            let result = match &self.chains[field] {
                Ok(chain) => match extraction::resolve(self.data, field) {
                    Some(start) => apply_chain(&self.registry, field, chain, start),
                    None => {
                        tracing::debug!("Skipping '{}': not present in data", field);
                        continue;
                    }
                },
                Err(cause) => Err(FieldError {
                    field: field.clone(),
                    rule: rule.clone(),
                    cause: cause.clone(),
                }),
            };

            match result {
                Ok(value) => {
                    self.filtered.insert(field.clone(), value);
                }
                Err(err) => {
                    tracing::warn!("{}", err);
                    if first_error.is_none() {
                        first_error = Some(err.clone());
                    }
                    self.errors.entry(field.clone()).or_insert(err);
                }
            }
        }

        tracing::debug!(
            "Filtered {} of {} ruled fields, {} error(s)",
            self.filtered.len(),
            self.rules.len(),
            self.errors.len()
        );

        self.outcome = first_error.map_or(Ok(()), Err);
        self.state = RunState::Ran;
        self.outcome.clone()
    }

    /// Same as [`filtering`](Self::filtering).
    pub fn sanitize(&mut self) -> Result<(), FieldError> {
        self.filtering()
    }

    /// Compile rules that have no cached chain yet.
    fn compile_pending(&mut self) {
        for (field, rule) in &self.rules {
            if !self.chains.contains_key(field) {
                self.chains
                    .insert(field.clone(), rule::compile(&self.registry, rule));
            }
        }
    }

    /// Forget results and errors so the rules can run again.
    pub fn reset(&mut self) -> &mut Self {
        self.filtered.clear();
        self.errors.clear();
        self.state = RunState::NotRun;
        self.outcome = Ok(());
        self
    }

    /// Drop all rules and compiled chains, along with the results they
    /// produced.
    pub fn reset_rules(&mut self) -> &mut Self {
        self.rules.clear();
        self.chains.clear();
        self.reset()
    }

    /// Reset results and rules.
    pub fn clear(&mut self) -> &mut Self {
        self.reset_rules()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// True if no field failed.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// First failure of the last run, if any.
    pub fn error(&self) -> Option<&FieldError> {
        self.outcome.as_ref().err()
    }

    /// Failures by field, at most one per field.
    pub fn errors(&self) -> &IndexMap<String, FieldError> {
        &self.errors
    }

    pub fn data(&self) -> &'a Bag {
        self.data
    }

    pub fn rules(&self) -> &IndexMap<String, String> {
        &self.rules
    }

    /// Compiled chain for `field`, once it has been compiled successfully.
    pub fn chain(&self, field: &str) -> Option<&CompiledChain> {
        self.chains.get(field).and_then(|chain| chain.as_ref().ok())
    }

    /// Copy of all transformed values.
    pub fn filtered_data(&self) -> Bag {
        self.filtered.clone()
    }

    /// Transformed value if there is one, raw value otherwise.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.filtered
            .get(field)
            .or_else(|| extraction::resolve(self.data, field))
    }

    /// Like [`get`](Self::get) but returns [`Value::Null`] when absent.
    pub fn must_get(&self, field: &str) -> Value {
        self.get(field).cloned().unwrap_or_default()
    }

    /// Untransformed value from the raw data.
    pub fn raw(&self, field: &str) -> Option<&'a Value> {
        extraction::resolve(self.data, field)
    }

    /// Transformed value only; `None` for fields that were never filtered.
    pub fn safe(&self, field: &str) -> Option<&Value> {
        self.filtered.get(field)
    }

    /// Text form of the value, empty string if absent or not a scalar.
    pub fn string(&self, field: &str) -> String {
        self.get(field).and_then(Value::to_text).unwrap_or_default()
    }

    /// 0 if absent, not numeric or out of range.
    pub fn int(&self, field: &str) -> i32 {
        self.int64(field).try_into().unwrap_or(0)
    }

    pub fn int64(&self, field: &str) -> i64 {
        self.get(field).and_then(Value::to_i64).unwrap_or(0)
    }

    pub fn uint(&self, field: &str) -> u64 {
        self.get(field).and_then(Value::to_u64).unwrap_or(0)
    }

    pub fn float(&self, field: &str) -> f64 {
        self.get(field).and_then(Value::to_f64).unwrap_or(0.0)
    }

    /// false if absent or not a recognized boolean token.
    pub fn bool(&self, field: &str) -> bool {
        self.get(field).and_then(Value::to_bool).unwrap_or(false)
    }
}

/// Run `start` through every call of `chain`, feeding each output into the
/// next call. Unknown filters leave the value unchanged.
fn apply_chain(
    registry: &FilterRegistry,
    field: &str,
    chain: &CompiledChain,
    start: &Value,
) -> Result<Value, FieldError> {
    let mut value = start.clone();

    for call in chain.calls() {
        match registry.lookup(&call.name) {
            Some(filter) => {
                value = filter.apply(&value, &call.args).map_err(|cause| FieldError {
                    field: field.to_string(),
                    rule: call.name.clone(),
                    cause,
                })?;
            }
            None => {
                tracing::warn!(
                    "Unknown filter '{}' on field '{}', value passed through",
                    call.name,
                    field
                );
            }
        }
    }

    Ok(value)
}
