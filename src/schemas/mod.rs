//! Shared Schemas
//!
//! The normalized item record and the response envelope returned to callers.
//! Field names on the wire are kept stable for existing consumers.

pub mod envelope;
pub mod item;

pub use envelope::*;
pub use item::*;
