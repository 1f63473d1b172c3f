//! Field type registry
//!
//! A static table mapping declared field type names to their storage and
//! API scalar representations. Lookups are fail-fast: an unregistered name
//! indicates a registry/validator desynchronization, not bad user input.

use crate::error::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One recognized field primitive type and its two target representations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldTypeDescriptor {
    pub name: String,
    pub storage_type: String,
    pub api_type: String,
}

impl FieldTypeDescriptor {
    pub fn new(name: &str, storage_type: &str, api_type: &str) -> Self {
        Self {
            name: name.to_string(),
            storage_type: storage_type.to_string(),
            api_type: api_type.to_string(),
        }
    }
}

/// Registry of recognized field primitive types.
///
/// Populated once per schema-compiler lifecycle through field-type
/// contribution hooks and rebuilt whenever the entity-type cache is
/// cleared, so extensions contributing new field types stay consistent
/// with a fresh entity load.
#[derive(Debug, Clone, Default)]
pub struct FieldTypeRegistry {
    descriptors: HashMap<String, FieldTypeDescriptor>,
}

impl FieldTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field type. Later registrations replace earlier ones
    /// under the same name.
    pub fn register(&mut self, descriptor: FieldTypeDescriptor) {
        self.descriptors.insert(descriptor.name.clone(), descriptor);
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// Resolve a field type name to its storage representation.
    pub fn to_storage_type(&self, name: &str) -> SchemaResult<&str> {
        self.lookup(name).map(|d| d.storage_type.as_str())
    }

    /// Resolve a field type name to its API scalar representation.
    pub fn to_api_type(&self, name: &str) -> SchemaResult<&str> {
        self.lookup(name).map(|d| d.api_type.as_str())
    }

    fn lookup(&self, name: &str) -> SchemaResult<&FieldTypeDescriptor> {
        if name.is_empty() {
            return Err(SchemaError::UnknownFieldType(
                "empty field type name".to_string(),
            ));
        }
        self.descriptors
            .get(name)
            .ok_or_else(|| SchemaError::UnknownFieldType(name.to_string()))
    }
}

/// Register the built-in primitive set.
///
/// Wired as the first field-type contribution hook so extensions can
/// shadow or extend the stock table before the first entity load.
pub fn register_core_field_types(registry: &mut FieldTypeRegistry) {
    let core = [
        ("id", "String", "ID"),
        ("string", "String", "String"),
        ("text", "String", "String"),
        ("email", "String", "String"),
        ("password", "String", "String"),
        ("int", "Number", "Int"),
        ("float", "Number", "Float"),
        ("bool", "Boolean", "Boolean"),
        ("date", "Date", "String"),
    ];
    for (name, storage, api) in core {
        registry.register(FieldTypeDescriptor::new(name, storage, api));
    }
}
