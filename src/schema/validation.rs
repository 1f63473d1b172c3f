//! Pluggable entity definition validation
//!
//! Validators accumulate human-readable messages onto the entity type being
//! compiled instead of failing the load, so one broken definition cannot
//! prevent the rest of the set from loading. The compiler ships two
//! built-ins; extensions may contribute more through
//! [`EntitySchemaCore::add_validator`](super::core::EntitySchemaCore::add_validator).

use super::types::{EntityTypeDef, FieldDefMap, INTERNAL_PREFIX};
use crate::registry::FieldTypeRegistry;

/// A validation rule over one raw entity definition. Returns the list of
/// violations found; an empty list means the rule passed.
pub type Validator =
    Box<dyn Fn(&str, &EntityTypeDef, &FieldTypeRegistry) -> Vec<String> + Send + Sync>;

/// Field type names with dedicated structural handling rather than a
/// registry entry.
pub const OBJECT_TYPE: &str = "object";
pub const REFERENCE_TYPE: &str = "reference";

/// Built-in rule: entity types must declare `fields`, `plural` and
/// `storage`.
pub fn validate_required_properties(
    name: &str,
    def: &EntityTypeDef,
    _registry: &FieldTypeRegistry,
) -> Vec<String> {
    let mut errors = Vec::new();
    // Injected bookkeeping fields don't count: the author must declare at
    // least one field of their own.
    let has_user_fields = def
        .fields
        .iter()
        .any(|(name, _)| !name.starts_with(INTERNAL_PREFIX));
    if !has_user_fields {
        errors.push(format!(
            "Entity type '{}' is missing required property 'fields'",
            name
        ));
    }
    if def.plural.is_empty() {
        errors.push(format!(
            "Entity type '{}' is missing required property 'plural'",
            name
        ));
    }
    if def.storage.is_empty() {
        errors.push(format!(
            "Entity type '{}' is missing required property 'storage'",
            name
        ));
    }
    errors
}

/// Built-in rule: every field declares a `type` that resolves against the
/// field type registry (or is `object`/`reference`) and a `label`.
/// Recurses into nested `object` fields.
pub fn validate_fields(
    name: &str,
    def: &EntityTypeDef,
    registry: &FieldTypeRegistry,
) -> Vec<String> {
    let mut errors = Vec::new();
    validate_field_map(name, "", &def.fields, registry, &mut errors);
    errors
}

fn validate_field_map(
    entity_name: &str,
    path: &str,
    fields: &FieldDefMap,
    registry: &FieldTypeRegistry,
    errors: &mut Vec<String>,
) {
    for (field_name, field) in fields.iter() {
        let field_path = if path.is_empty() {
            field_name.clone()
        } else {
            format!("{}.{}", path, field_name)
        };

        if field.field_type.is_empty() {
            errors.push(format!(
                "Field '{}' of '{}' is missing a type",
                field_path, entity_name
            ));
        } else if field.field_type == REFERENCE_TYPE {
            if field.references.is_empty() {
                errors.push(format!(
                    "Reference field '{}' of '{}' declares no target entity types",
                    field_path, entity_name
                ));
            }
        } else if field.field_type != OBJECT_TYPE && !registry.contains(&field.field_type) {
            errors.push(format!(
                "Field '{}' of '{}' has unregistered type '{}'",
                field_path, entity_name, field.field_type
            ));
        }

        if field.label.is_empty() {
            errors.push(format!(
                "Field '{}' of '{}' is missing a label",
                field_path, entity_name
            ));
        }

        if field.field_type == OBJECT_TYPE {
            if let Some(nested) = &field.fields {
                validate_field_map(entity_name, &field_path, nested, registry, errors);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::register_core_field_types;
    use crate::schema::types::FieldDef;

    fn registry() -> FieldTypeRegistry {
        let mut registry = FieldTypeRegistry::new();
        register_core_field_types(&mut registry);
        registry
    }

    #[test]
    fn reports_every_missing_top_level_property() {
        let def = EntityTypeDef::default();
        let errors = validate_required_properties("Cat", &def, &registry());
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("'fields'"));
        assert!(errors[1].contains("'plural'"));
        assert!(errors[2].contains("'storage'"));
    }

    #[test]
    fn reports_nested_field_problems_with_full_path() {
        let mut def = EntityTypeDef::default();
        let mut nested = crate::schema::types::FieldDefMap::new();
        nested.insert(
            "title",
            FieldDef {
                field_type: "nope".to_string(),
                ..FieldDef::default()
            },
        );
        def.fields.insert(
            "stories",
            FieldDef {
                field_type: "object".to_string(),
                label: "Stories".to_string(),
                fields: Some(nested),
                ..FieldDef::default()
            },
        );

        let errors = validate_fields("Cat", &def, &registry());
        assert!(errors
            .iter()
            .any(|e| e.contains("'stories.title'") && e.contains("unregistered type 'nope'")));
        assert!(errors
            .iter()
            .any(|e| e.contains("'stories.title'") && e.contains("missing a label")));
    }

    #[test]
    fn reference_without_targets_is_flagged() {
        let mut def = EntityTypeDef::default();
        def.fields.insert(
            "owner",
            FieldDef {
                field_type: "reference".to_string(),
                label: "Owner".to_string(),
                ..FieldDef::default()
            },
        );
        let errors = validate_fields("Cat", &def, &registry());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("declares no target entity types"));
    }
}
