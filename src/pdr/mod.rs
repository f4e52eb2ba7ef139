//! PDR (Platform Descriptor Record) Repository (spec §4.3): typed records
//! persisted by handle, enumerable in insertion order, filterable by type.

pub mod json;
pub mod record;
pub mod repository;
pub mod types;

pub use record::{Entry, PdrRecord, PdrType};
pub use repository::PdrRepository;
