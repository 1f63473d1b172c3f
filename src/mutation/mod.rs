//! Mutation orchestration
//!
//! Binds an incoming create/delete call to a concrete transaction:
//! assembles the hook-contributed handler list and the shared context,
//! executes it, and translates the outcome into a result or a structured
//! error. Transaction failures come back as values, never as panics.

pub mod handlers;

use crate::error::SchemaError;
use crate::schema::types::{FieldKind, FieldList};
use crate::schema::{EntitySchemaCore, EntityType};
use crate::storage::{EntityStorage, StorageError};
use crate::transaction::{Transaction, TransactionStatus};
use log::info;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("{0}")]
    Schema(SchemaError),
    #[error("Entity type '{0}' has definition errors: {1}")]
    InvalidEntityType(String, String),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Failed(String),
}

impl From<SchemaError> for MutationError {
    fn from(err: SchemaError) -> Self {
        MutationError::Schema(err)
    }
}

/// Shared mutable context of one create transaction. This is the only
/// communication channel between independently contributed handlers.
pub struct CreateContext {
    pub entity_type: EntityType,
    /// Field values for the new record. Handlers may rewrite these
    /// (defaults, system timestamps) before the record is persisted.
    pub args: Map<String, Value>,
    pub storage: Arc<dyn EntityStorage>,
    /// Identity of the persisted base record, set by the base handler.
    pub created_id: Option<String>,
    /// Identity of the persisted revision snapshot, if any.
    pub revision_id: Option<String>,
}

/// Wire the stock create handlers into a compiler instance. The base
/// handler and the revision handler are independent contributions; their
/// registration order is their execution order.
pub fn register_create_handlers(core: &mut EntitySchemaCore) {
    core.hooks_mut()
        .on_create_handlers(|list| list.push(Arc::new(handlers::CreateEntityHandler)));
    core.hooks_mut()
        .on_create_handlers(|list| list.push(Arc::new(handlers::CreateRevisionHandler)));
}

/// Executes create/delete calls against the compiled schema model.
pub struct MutationOrchestrator {
    schema: Arc<EntitySchemaCore>,
    storage: Arc<dyn EntityStorage>,
}

impl MutationOrchestrator {
    pub fn new(schema: Arc<EntitySchemaCore>, storage: Arc<dyn EntityStorage>) -> Self {
        Self { schema, storage }
    }

    /// Create a record of the named entity type. On success returns the
    /// new record's identity; on failure returns the captured transaction
    /// error.
    pub async fn create(
        &self,
        type_name: &str,
        args: Map<String, Value>,
    ) -> Result<String, MutationError> {
        let entity_type = self.usable_entity_type(type_name)?;

        let handler_list = self.schema.hooks().collect_create_handlers();
        let mut cx = CreateContext {
            entity_type,
            args,
            storage: Arc::clone(&self.storage),
            created_id: None,
            revision_id: None,
        };

        let mut tx = Transaction::new(handler_list);
        match tx.execute(&mut cx).await {
            TransactionStatus::Complete => {
                let id = cx.created_id.ok_or_else(|| {
                    MutationError::Failed(
                        "create transaction completed without a record identity".to_string(),
                    )
                })?;
                info!("Created '{}' record {}", type_name, id);
                Ok(id)
            }
            _ => Err(MutationError::Failed(
                tx.error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "create transaction failed".to_string()),
            )),
        }
    }

    /// Delete a record by id. Lookup failure, missing record and success
    /// are three distinct outcomes; success returns the deleted id.
    pub async fn delete(&self, type_name: &str, id: &str) -> Result<String, MutationError> {
        let entity_type = self.usable_entity_type(type_name)?;
        let collection = entity_type.collection();

        match self.storage.find_by_id(collection, id).await? {
            None => Err(MutationError::NotFound(format!("{} {}", type_name, id))),
            Some(_) => {
                self.storage.remove(collection, id).await?;
                info!("Deleted '{}' record {}", type_name, id);
                Ok(id.to_string())
            }
        }
    }

    /// Load a record by id with field defaults resolved against the
    /// *current* entity type: fields made required-with-default after the
    /// record was written still read back with their configured defaults.
    pub async fn load(
        &self,
        type_name: &str,
        id: &str,
    ) -> Result<Option<Value>, MutationError> {
        let entity_type = self.usable_entity_type(type_name)?;
        let record = self
            .storage
            .find_by_id(entity_type.collection(), id)
            .await?;
        Ok(record.map(|mut value| {
            if let Value::Object(map) = &mut value {
                apply_defaults(&entity_type.fields, map);
            }
            value
        }))
    }

    fn usable_entity_type(&self, type_name: &str) -> Result<EntityType, MutationError> {
        let entity_type = self.schema.get_entity_type(type_name)?;
        if !entity_type.is_valid() {
            return Err(MutationError::InvalidEntityType(
                type_name.to_string(),
                entity_type.errors.join("; "),
            ));
        }
        Ok(entity_type)
    }
}

/// Fill missing or null field values with their configured defaults,
/// recursing through nested object fields and arrays of them.
pub fn apply_defaults(fields: &FieldList, values: &mut Map<String, Value>) {
    for field in fields.iter() {
        if let Some(default) = &field.default {
            let missing = matches!(values.get(&field.name), None | Some(Value::Null));
            if missing {
                values.insert(field.name.clone(), default.clone());
            }
        }

        if let FieldKind::Object { fields: nested } = &field.kind {
            match values.get_mut(&field.name) {
                Some(Value::Object(inner)) => apply_defaults(nested, inner),
                Some(Value::Array(items)) => {
                    for item in items {
                        if let Value::Object(inner) = item {
                            apply_defaults(nested, inner);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}
