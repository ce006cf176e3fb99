//! Variable groups, precedence and flattening

mod flatten;
mod process;
mod scopes;
mod variable;

pub use flatten::{FlatScope, flatten, flatten_into, value_to_text};
pub use process::{PROCESS_ENV_PREFIX, ProcessEnvironment};
pub use scopes::VariableScopes;
pub use variable::{VariableMap, VariableScope, validate_variable_name};
