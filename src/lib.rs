//! w2m: multilingual WXR export migration
//!
//! Streams an extended WXR export and re-creates its content in a target
//! installation:
//! - Streaming XML reading with quick-xml (no full-document load)
//! - Typed value objects for users, terms, posts and comments
//! - Origin → local id remapping with resumable mapping checkpoints
//! - Deferred resolution of parent, author, term and comment relations
//! - Configurable custom field filters
//! - Per-item failure isolation with a JSON run report

pub mod config;
pub mod import;
pub mod types;

pub use config::Config;
pub use types::*;
