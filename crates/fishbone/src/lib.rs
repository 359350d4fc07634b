#![doc = include_str!("../README.md")]

pub mod attrs;
pub mod error;
pub mod import;
mod migrate;
pub mod types;
pub mod update;
pub mod visit;

pub use attrs::{merge_attributes, Attribute};
pub use error::{Error, Result};
pub use import::{resolve_imports, ImportHost};
pub use types::{
    Category, Effect, FishboneDocument, ImportCause, NestedCause, RootCause, SchemaVersion,
    SimpleCause, DOC_KIND,
};
pub use update::{apply_update, DocumentUpdate};
pub use visit::{for_each_root_cause, CauseVisitor, VisitOutcome};
