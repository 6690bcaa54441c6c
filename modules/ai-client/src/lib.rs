//! Minimal Claude client.
//!
//! One capability: force the model to answer through a single
//! `structured_response` tool whose input schema is derived from a Rust
//! type, and deserialize the tool call back into that type.

pub mod claude;
pub mod schema;

pub use claude::Claude;
pub use schema::StructuredOutput;
