//! Extension points
//!
//! Ordered lists of typed callbacks, invoked synchronously with a mutable
//! argument. Timing differs per hook and is load-bearing: field-type
//! contributions fire on every registry rebuild, definition-rewrite
//! contributions fire exactly once per cache generation, create-handler
//! contributions fire per create operation, and reload listeners fire when
//! a definition is saved back to durable storage.

use super::types::EntityTypeDef;
use crate::mutation::CreateContext;
use crate::registry::FieldTypeRegistry;
use crate::transaction::TransactionHandler;
use std::collections::HashMap;
use std::sync::Arc;

pub type FieldTypeHook = Box<dyn Fn(&mut FieldTypeRegistry) + Send + Sync>;
pub type DefinitionHook = Box<dyn Fn(&mut HashMap<String, EntityTypeDef>) + Send + Sync>;
pub type CreateHandlerHook =
    Box<dyn Fn(&mut Vec<Arc<dyn TransactionHandler<CreateContext>>>) + Send + Sync>;
pub type ReloadListener = Box<dyn Fn() + Send + Sync>;

/// Registered extension callbacks, owned by one compiler instance.
#[derive(Default)]
pub struct SchemaHooks {
    field_types: Vec<FieldTypeHook>,
    definitions: Vec<DefinitionHook>,
    create_handlers: Vec<CreateHandlerHook>,
    reload: Vec<ReloadListener>,
}

impl SchemaHooks {
    /// Contribute field types to the registry. Replayed on every registry
    /// rebuild.
    pub fn on_field_types(&mut self, hook: impl Fn(&mut FieldTypeRegistry) + Send + Sync + 'static) {
        self.field_types.push(Box::new(hook));
    }

    /// Rewrite the raw definition set in place before validation. Fires
    /// once per cache generation.
    pub fn on_definitions(
        &mut self,
        hook: impl Fn(&mut HashMap<String, EntityTypeDef>) + Send + Sync + 'static,
    ) {
        self.definitions.push(Box::new(hook));
    }

    /// Contribute transaction handlers to every entity create operation.
    pub fn on_create_handlers(
        &mut self,
        hook: impl Fn(&mut Vec<Arc<dyn TransactionHandler<CreateContext>>>) + Send + Sync + 'static,
    ) {
        self.create_handlers.push(Box::new(hook));
    }

    /// Run after a definition is saved, once dependent caches have been
    /// invalidated.
    pub fn on_reload(&mut self, listener: impl Fn() + Send + Sync + 'static) {
        self.reload.push(Box::new(listener));
    }

    pub(crate) fn fire_field_types(&self, registry: &mut FieldTypeRegistry) {
        for hook in &self.field_types {
            hook(registry);
        }
    }

    pub(crate) fn fire_definitions(&self, defs: &mut HashMap<String, EntityTypeDef>) {
        for hook in &self.definitions {
            hook(defs);
        }
    }

    /// Assemble the handler list for one create operation, in registration
    /// order.
    pub(crate) fn collect_create_handlers(
        &self,
    ) -> Vec<Arc<dyn TransactionHandler<CreateContext>>> {
        let mut handlers = Vec::new();
        for hook in &self.create_handlers {
            hook(&mut handlers);
        }
        handlers
    }

    pub(crate) fn fire_reload(&self) {
        for listener in &self.reload {
            listener();
        }
    }
}
