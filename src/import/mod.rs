//! WXR export import pipeline
//!
//! Re-creates the users, terms, posts and comments of an extended WXR export
//! in a target installation reached through [`ImportHost`]. Origin ids are
//! remapped to the ids the host assigns, and cross-entity relations are
//! restored even when the referenced entity is imported later.
//!
//! # Example Usage
//!
//! ```no_run
//! use w2m::import::{ImportCoordinatorBuilder, MemoryHost};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = ImportCoordinatorBuilder::new()
//!     .with_mapping("mapping.json")
//!     .with_quiet(true)
//!     .build()?;
//!
//! let mut host = MemoryHost::new();
//! let report = coordinator.process_elements("export.xml", &mut host)?;
//! println!("Imported {} entities", report.total_imported());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Import Coordinator                          │
//! │         (pass order, flushes, mapping checkpoint, report)           │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │  users → terms → posts → comments
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │   XmlNodeReader ──▶ Item ──▶ EntityParser ──▶ value object          │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   ImportHost    │    │    IdMapper     │    │ AncestorResolver│
//! │ - create        │    │ - register      │    │ - resolve/defer │
//! │ - meta          │◀───│ - resolve       │───▶│ - flush         │
//! │ - translations  │    │ - checkpoint    │    │                 │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```

pub mod coordinator;
pub mod entity;
pub mod filter;
pub mod host;
pub mod id_mapper;
pub mod item;
pub mod parser;
pub mod processor;
pub mod progress;
pub mod reader;
pub mod report;
pub mod resolver;
pub mod sanitize;
pub mod source;

// Re-export main types
pub use coordinator::{ImportCoordinator, ImportCoordinatorBuilder};
pub use entity::{
    ImportComment, ImportEntity, ImportMeta, ImportPost, ImportTerm, ImportUser, LocaleRelation,
    MetaValue, TermReference,
};
pub use filter::{FilterKind, FilterRegistry, FilterRule, MetaFilter, MetaFilterList, ValueFilter};
pub use host::{ImportHost, MemoryHost};
pub use id_mapper::{IdMapper, IdMapping, MappingCheckpoint, Registration};
pub use item::Item;
pub use parser::{EntityParser, WpCommentParser, WpPostParser, WpTermParser, WpUserParser};
pub use processor::{
    CommentProcessor, ElementProcessor, EntityProcessor, ImportContext, PostProcessor,
    TermProcessor, UserProcessor,
};
pub use progress::PassProgress;
pub use reader::{XmlNode, XmlNodeReader};
pub use report::{ItemFailure, PassReport, RunReport};
pub use resolver::{AncestorResolver, DeferredRelation, FlushReport, Resolution};
pub use sanitize::{Attributes, ParameterSanitizer, TypeCastSanitizer};
pub use source::{AlreadyAssigned, HostError, ImportConfig, ImportError};
