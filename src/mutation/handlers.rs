//! Create operation transaction handlers
//!
//! The base handler persists the record; the revision handler maintains
//! the append-only shadow copy for types that opt in. Both are contributed
//! through the create-handler hook, so the orchestrator never learns about
//! revisioning. Handlers communicate exclusively through [`CreateContext`].

use super::{apply_defaults, CreateContext};
use crate::schema::system;
use crate::transaction::{TransactionError, TransactionHandler};
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;

/// Key on the base record linking it to its revision snapshot.
pub const REVISION_KEY: &str = "_revision";

/// Persists the base record for every entity create.
pub struct CreateEntityHandler;

#[async_trait]
impl TransactionHandler<CreateContext> for CreateEntityHandler {
    async fn prepare(&self, cx: &mut CreateContext) -> Result<(), TransactionError> {
        apply_defaults(&cx.entity_type.fields, &mut cx.args);

        for field in cx.entity_type.fields.iter() {
            if field.required && !field.is_internal() && !cx.args.contains_key(&field.name) {
                return Err(TransactionError::new(format!(
                    "Missing required field '{}' on '{}'",
                    field.name, cx.entity_type.name
                )));
            }
        }

        let now = system::now();
        cx.args.insert(system::CREATED_FIELD.to_string(), now.clone());
        cx.args.insert(system::UPDATED_FIELD.to_string(), now);
        Ok(())
    }

    async fn operation(&self, cx: &mut CreateContext) -> Result<(), TransactionError> {
        let mut record = cx.args.clone();
        if let Some(revision_id) = &cx.revision_id {
            record.insert(
                REVISION_KEY.to_string(),
                Value::String(revision_id.clone()),
            );
        }

        let collection = cx.entity_type.collection().to_string();
        let id = cx.storage.create(&collection, Value::Object(record)).await?;
        debug!("Created {} record {}", cx.entity_type.name, id);
        cx.created_id = Some(id);
        Ok(())
    }

    async fn rollback(&self, cx: &mut CreateContext) -> Result<(), TransactionError> {
        // The base write may never have happened; the context decides.
        if let Some(id) = cx.created_id.take() {
            let collection = cx.entity_type.collection().to_string();
            if let Err(e) = cx.storage.remove(&collection, &id).await {
                warn!("Failed to remove {} record {}: {}", collection, id, e);
            }
        }
        Ok(())
    }

    async fn complete(&self, cx: &mut CreateContext, failed: bool) -> Result<(), TransactionError> {
        debug!(
            "Create transaction for '{}' finished (failed: {})",
            cx.entity_type.name, failed
        );
        Ok(())
    }
}

/// Persists a revision snapshot ahead of the base record for entity types
/// with `revisions: true`.
pub struct CreateRevisionHandler;

impl CreateRevisionHandler {
    fn revision_collection(cx: &CreateContext) -> String {
        // Shadow type plural is `<Name>Revisions`, so its collection is
        // the camelCase base name plus the suffix.
        format!("{}Revisions", cx.entity_type.meta.camel)
    }
}

#[async_trait]
impl TransactionHandler<CreateContext> for CreateRevisionHandler {
    async fn prepare(&self, cx: &mut CreateContext) -> Result<(), TransactionError> {
        if !cx.entity_type.revisions {
            return Ok(());
        }

        let snapshot = Value::Object(cx.args.clone());
        let collection = Self::revision_collection(cx);
        let id = cx.storage.create(&collection, snapshot).await?;
        debug!("Created revision record {} in {}", id, collection);
        cx.revision_id = Some(id);
        Ok(())
    }

    async fn rollback(&self, cx: &mut CreateContext) -> Result<(), TransactionError> {
        // Runs on every failure, even when this handler's own prepare
        // never did; only an actually written snapshot gets undone.
        if let Some(id) = cx.revision_id.take() {
            let collection = Self::revision_collection(cx);
            if let Err(e) = cx.storage.remove(&collection, &id).await {
                warn!("Failed to remove orphaned revision {}: {}", id, e);
            }
        }
        Ok(())
    }
}
