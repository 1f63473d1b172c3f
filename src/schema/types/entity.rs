//! Entity type definitions, raw and compiled

use super::field::{FieldDefMap, FieldList};
use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};

/// Raw declarative shape of one entity type, as loaded from a definition
/// document. The document is keyed by its type name externally (file stem),
/// so the name is not part of the serialized body.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EntityTypeDef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub plural: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub revisions: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exclude_from_api: bool,
    #[serde(default)]
    pub fields: FieldDefMap,
    /// Key of the source location this definition was loaded from.
    /// Assigned by the loader, never serialized.
    #[serde(skip)]
    pub location_key: Option<String>,
}

/// Derived naming metadata, computed once per load cycle.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntityMeta {
    /// camelCase singular name, e.g. `cat`.
    pub camel: String,
    /// camelCase plural name, e.g. `cats`.
    pub camel_plural: String,
    /// PascalCase type name, e.g. `Cat`.
    pub pascal: String,
}

impl EntityMeta {
    pub fn derive(name: &str, plural: &str) -> Self {
        Self {
            camel: name.to_case(Case::Camel),
            camel_plural: plural.to_case(Case::Camel),
            pascal: name.to_case(Case::Pascal),
        }
    }
}

/// Compiled, validated, metadata-annotated entity type.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntityType {
    pub name: String,
    pub description: String,
    pub plural: String,
    pub storage: String,
    pub revisions: bool,
    pub exclude_from_api: bool,
    pub fields: FieldList,
    /// Validation errors accumulated during compilation. A non-empty list
    /// marks the type unusable without aborting the rest of the load.
    pub errors: Vec<String>,
    pub meta: EntityMeta,
}

impl EntityType {
    /// Storage collection this type's records live in.
    pub fn collection(&self) -> &str {
        &self.meta.camel_plural
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
