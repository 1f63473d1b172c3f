//! Data structures for the entity schema model.

pub mod entity;
pub mod field;

pub use entity::{EntityMeta, EntityType, EntityTypeDef};
pub use field::{
    EntityField, FieldDef, FieldDefMap, FieldKind, FieldList, FieldMeta, INTERNAL_PREFIX,
};
