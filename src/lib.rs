//! Schemaforge
//!
//! Describe data declaratively and have a complete CRUD API materialize:
//! entity type definitions compile into a validated in-memory schema model,
//! project into an API description (types, inputs, unions, queries and
//! mutations) and drive rollback-capable create transactions, all derived
//! from the same declarative source and extensible through hooks.

pub mod error;
pub mod mutation;
pub mod projection;
pub mod registry;
pub mod schema;
pub mod storage;
pub mod testing_utils;
pub mod transaction;

pub use error::{SchemaError, SchemaResult};
pub use mutation::{MutationError, MutationOrchestrator};
pub use projection::{project, ApiDescription};
pub use registry::{FieldTypeDescriptor, FieldTypeRegistry};
pub use schema::{EntitySchemaCore, EntityType, EntityTypeDef, SaveResult, SourceLocation};
pub use storage::{EntityStorage, StorageError};
pub use transaction::{Transaction, TransactionError, TransactionHandler, TransactionStatus};

use schema::{revisions, system};

/// Assemble a compiler with the stock extensions wired in: core field
/// types, system fields, revision shadow types and the create handlers.
/// This mirrors how a bootstrap layer would compose plugins; tests and
/// embedders that want a bare compiler can use [`EntitySchemaCore::new`]
/// and register hooks themselves.
pub fn build_core(
    locations: Vec<SourceLocation>,
    default_location: &str,
) -> EntitySchemaCore {
    let mut core = EntitySchemaCore::new(locations, default_location);
    system::register(&mut core);
    revisions::register(&mut core);
    mutation::register_create_handlers(&mut core);
    core
}
