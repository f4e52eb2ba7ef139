//! BIOS Attribute Registry (spec §4.5): JSON-backed enum/string/integer
//! attribute descriptors, exposed for current/default value lookup.

pub mod json;
pub mod registry;
pub mod types;

pub use registry::{BiosAttributeRegistry, BiosPropertySource, NoProperties};
pub use types::{EnumAttribute, IntegerAttribute, StringAttribute, StringEncoding};
