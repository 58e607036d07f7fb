//! Core data model types for pathtrie

mod entry;
mod reference;

pub use entry::{Metadata, NodeEntry};
pub use reference::{Reference, REFERENCE_SIZE};
