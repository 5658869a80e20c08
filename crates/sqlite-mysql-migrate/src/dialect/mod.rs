//! Target dialect rules: type translation, default values, INSERT shapes
//! and server capability detection.

pub mod defaults;
pub mod functions;
pub mod insert;
pub mod typemap;
pub mod version;

pub use defaults::translate_default;
pub use insert::InsertStatement;
pub use typemap::{length_suffix, translate, TypeDefaults};
pub use version::{parse_version, Capabilities, Version};
