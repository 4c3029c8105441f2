//! Provider type schemas

mod structural;

pub use structural::{navigate, SchemaKind, SchemaLookup, SchemaNode};
