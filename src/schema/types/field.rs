//! Field definitions, raw and compiled
//!
//! `FieldDef` is the declarative, serde-facing shape of one field as it
//! appears in an entity definition document. `EntityField` is its compiled
//! counterpart with derived metadata attached. Both sides keep fields in
//! declaration order: generated type names depend on a stable ordering, so
//! the maps here are Vec-backed rather than hashed.

use convert_case::{Case, Casing};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Reserved leading marker for internal bookkeeping fields and keys.
pub const INTERNAL_PREFIX: char = '_';

/// Raw declarative shape of a single field.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FieldDef {
    /// Field type name: a registered primitive, `"object"` or `"reference"`.
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub many: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub index: bool,
    /// Target entity type names for `reference` fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    /// Nested fields, present only for `object` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldDefMap>,
}

impl FieldDef {
    pub fn primitive(field_type: &str, label: &str) -> Self {
        Self {
            field_type: field_type.to_string(),
            label: label.to_string(),
            ..Self::default()
        }
    }
}

/// Insertion-ordered map of field name to [`FieldDef`].
///
/// Serde round-trips preserve document order; `insert` on an existing name
/// replaces the definition in place without moving it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDefMap(Vec<(String, FieldDef)>);

impl FieldDefMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldDef> {
        self.0.iter_mut().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn insert(&mut self, name: &str, def: FieldDef) {
        match self.get_mut(name) {
            Some(existing) => *existing = def,
            None => self.0.push((name.to_string(), def)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldDef> {
        let idx = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(idx).1)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldDef)> {
        self.0.iter().map(|(n, f)| (n, f))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut FieldDef)> {
        self.0.iter_mut().map(|(n, f)| (&*n, f))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldDef)> for FieldDefMap {
    fn from_iter<I: IntoIterator<Item = (String, FieldDef)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, def) in iter {
            map.insert(&name, def);
        }
        map
    }
}

impl Serialize for FieldDefMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, def) in &self.0 {
            map.serialize_entry(name, def)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldDefMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldDefMapVisitor;

        impl<'de> Visitor<'de> for FieldDefMapVisitor {
            type Value = FieldDefMap;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of field name to field definition")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = FieldDefMap::new();
                while let Some((name, def)) = access.next_entry::<String, FieldDef>()? {
                    map.insert(&name, def);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(FieldDefMapVisitor)
    }
}

/// Derived per-field metadata, computed once per load cycle.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldMeta {
    /// Identifier safe for use as an API field name. Fields whose declared
    /// name carries the internal prefix keep it verbatim.
    pub camel_name: String,
}

impl FieldMeta {
    pub fn derive(field_name: &str) -> Self {
        let camel_name = if field_name.starts_with(INTERNAL_PREFIX) {
            field_name.to_string()
        } else {
            field_name.to_case(Case::Camel)
        };
        Self { camel_name }
    }
}

/// Compiled field kind: the closed part of the type system. Custom primitive
/// types stay open-ended through the field type registry.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum FieldKind {
    Primitive {
        type_name: String,
    },
    Object {
        fields: FieldList,
    },
    Reference {
        /// Target entity type names, deterministically sorted.
        targets: Vec<String>,
    },
}

/// Compiled representation of one entity field.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntityField {
    pub name: String,
    pub label: String,
    pub description: String,
    pub required: bool,
    pub many: bool,
    pub default: Option<Value>,
    pub index: bool,
    pub kind: FieldKind,
    pub meta: FieldMeta,
}

impl EntityField {
    /// Whether the field is internal bookkeeping rather than user data.
    pub fn is_internal(&self) -> bool {
        self.name.starts_with(INTERNAL_PREFIX)
    }
}

/// Declaration-ordered list of compiled fields.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct FieldList(pub Vec<EntityField>);

impl FieldList {
    pub fn get(&self, name: &str) -> Option<&EntityField> {
        self.0.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityField> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when at least one non-internal field is present.
    pub fn has_user_fields(&self) -> bool {
        self.0.iter().any(|f| !f.is_internal())
    }
}
