//! Entity schema model
//!
//! Loads declarative entity definitions from registered source locations,
//! validates and annotates them into the compiled model consumed by the
//! projection engine and the mutation orchestrator.

pub mod compile;
pub mod core;
pub mod hooks;
pub mod revisions;
pub mod system;
pub mod types;
pub mod validation;

pub use self::core::{EntitySchemaCore, SaveResult, SourceLocation};
pub use types::{EntityField, EntityType, EntityTypeDef, FieldDef, FieldKind, FieldList};
