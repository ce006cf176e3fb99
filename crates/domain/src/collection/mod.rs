//! Collection and folder types

mod item;

pub use item::{Collection, CollectionConfig, CollectionItem, Folder, ScriptingConfig};
