//! # Filtration: rule-driven field filtering
//!
//! Filtration applies short, declarative rule strings to the fields of a
//! loosely-typed data bag and stores the results in a separate bag, leaving
//! the input untouched.
//!
//! ## Features
//!
//! - **Rule mini-language**: `"trim|ucFirst"`, `"substr:0,2"`, `"str2arr:;|unique"`
//! - **Dotted keys**: `"sub.k0"` reaches into nested mappings
//! - **Filter registry**: shared built-ins plus per-instance overrides
//! - **Run once**: repeated runs return the first outcome without redoing work
//! - **Typed accessors**: `string`, `int`, `int64`, `bool` with zero-value fallbacks
//!
//! ## Example
//!
//! ```
//! use filtration::{Filtration, Value};
//! use serde_json::json;
//!
//! let data = Value::from(json!({
//!     "name": " inhere ",
//!     "tags": "go;lib",
//!     "sub": {"k0": "v0"}
//! }))
//! .into_map()
//! .unwrap();
//!
//! let mut f = Filtration::new(&data);
//! f.attach_rule("name", "trim|ucFirst")
//!     .attach_rule("tags", "str2arr:;");
//!
//! f.filtering().unwrap();
//! assert_eq!(f.string("name"), "Inhere");
//! assert_eq!(f.must_get("tags"), Value::from(vec!["go", "lib"]));
//! assert_eq!(f.get("sub.k0"), Some(&Value::from("v0")));
//! ```

pub mod builtins;
pub mod error;
pub mod extraction;
pub mod filter_registry;
pub mod filtration;
pub mod rule;
pub mod value;

// Re-export key types
pub use error::{ConfigError, FieldError, RuleError};
pub use extraction::{assign, resolve, FieldPath};
pub use filter_registry::{builtins as builtin_filters, name, Filter, FilterFn, FilterRegistry};
pub use filtration::{Filtration, RunState};
pub use rule::{compile, parse, CompiledChain, FilterCall, RuleSet};
pub use value::{Bag, Value};
