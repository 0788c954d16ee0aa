//! Field lookup by plain or dotted key.
//!
//! `"name"` looks up a top-level key. `"sub.k0"` descends through nested
//! mappings one segment at a time. Lookups never modify the bag and report a
//! miss instead of failing on type mismatches. [`assign`] writes a value back
//! along the same path.

use std::fmt;

use crate::value::{Bag, Value};

/// A dotted path to a field in a bag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    /// The raw path string
    pub raw: String,
    /// Path segments, split on `.`
    pub segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path
    ///
    /// # Example
    ///
    /// ```
    /// use filtration::FieldPath;
    ///
    /// let path = FieldPath::from_dotted("user.address.city");
    /// assert_eq!(path.segments.len(), 3);
    /// ```
    pub fn from_dotted(path: &str) -> Self {
        Self {
            raw: path.to_string(),
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }

    /// Walk the path through `bag`.
    ///
    /// Returns `None` if a segment is absent or an intermediate value is not
    /// a mapping.
    pub fn lookup<'a>(&self, bag: &'a Bag) -> Option<&'a Value> {
        let (first, rest) = self.segments.split_first()?;
        let mut current = bag.get(first)?;
        for segment in rest {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// Store `value` at the path, creating missing intermediate mappings.
    ///
    /// Returns `false` and leaves `bag` unchanged if an intermediate value
    /// exists but is not a mapping.
    pub fn assign(&self, bag: &mut Bag, value: Value) -> bool {
        let Some((last, parents)) = self.segments.split_last() else {
            return false;
        };

        // check the whole walk before creating anything
        let mut walked = Some(&*bag);
        for segment in parents {
            match walked.and_then(|map| map.get(segment)) {
                Some(Value::Map(map)) => walked = Some(map),
                Some(_) => return false,
                None => walked = None,
            }
        }

        let mut current = bag;
        for segment in parents {
            let entry = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Map(Bag::new()));
            current = match entry {
                Value::Map(map) => map,
                _ => return false,
            };
        }
        current.insert(last.clone(), value);
        true
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Resolve `key` against `bag`.
///
/// A key that exists literally wins, so top-level keys containing dots stay
/// reachable. Otherwise dotted keys descend through nested mappings.
pub fn resolve<'a>(bag: &'a Bag, key: &str) -> Option<&'a Value> {
    if let Some(value) = bag.get(key) {
        return Some(value);
    }

    if !key.contains('.') {
        return None;
    }

    FieldPath::from_dotted(key).lookup(bag)
}

/// Write `value` back under `key`, the counterpart of [`resolve`].
///
/// A literal top-level key (or a key without dots) is replaced in place.
/// A dotted key is written into the nested mapping it resolves through;
/// if the path is blocked by a non-mapping value the key is stored
/// literally at the top level instead.
pub fn assign(bag: &mut Bag, key: &str, value: Value) {
    if bag.contains_key(key) || !key.contains('.') {
        bag.insert(key.to_string(), value);
        return;
    }

    let path = FieldPath::from_dotted(key);
    if !path.assign(bag, value.clone()) {
        bag.insert(key.to_string(), value);
    }
}
