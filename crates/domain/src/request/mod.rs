//! Request item types

mod body;
mod header;
mod item;
mod method;
mod query;

pub use body::{MultipartField, RequestBody};
pub use header::{Header, Headers};
pub use item::{RequestItem, RequestScripts, RequestSettings, RequestVars};
pub use method::HttpMethod;
pub use query::{KeyValue, QueryParam};
