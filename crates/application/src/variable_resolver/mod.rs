//! Variable resolution module
//!
//! Provides scanning and resolution of `{{placeholder}}` syntax in strings.
//!
//! # Usage
//!
//! ```
//! use relay_application::variable_resolver::interpolate;
//! use relay_domain::environment::VariableScopes;
//!
//! let mut scopes = VariableScopes::new();
//! scopes.runtime.insert("host".to_string(), "localhost".into());
//!
//! assert_eq!(interpolate("http://{{host}}/api", &scopes), "http://localhost/api");
//! ```

pub mod engine;
pub mod parser;

pub use engine::{
    InterpolationOptions, ResolutionResult, VariableResolver, find_unresolved, interpolate,
    interpolate_opt, interpolate_with,
};
pub use parser::{Placeholder, has_placeholders, parse_placeholders};
