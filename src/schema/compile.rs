//! Raw definition to compiled entity type conversion

use super::types::{
    EntityField, EntityMeta, EntityType, EntityTypeDef, FieldDefMap, FieldKind, FieldList,
    FieldMeta,
};
use super::validation::{Validator, OBJECT_TYPE, REFERENCE_TYPE};
use crate::registry::FieldTypeRegistry;
use log::warn;

/// Compile one raw definition into a validated, metadata-complete entity
/// type. Validation errors accumulate on the result; they never abort the
/// compilation.
pub fn compile_entity_type(
    name: &str,
    def: &EntityTypeDef,
    validators: &[Validator],
    registry: &FieldTypeRegistry,
) -> EntityType {
    let mut errors = Vec::new();
    for validator in validators {
        errors.extend(validator(name, def, registry));
    }

    EntityType {
        name: name.to_string(),
        description: def.description.clone(),
        plural: def.plural.clone(),
        storage: def.storage.clone(),
        revisions: def.revisions,
        exclude_from_api: def.exclude_from_api,
        fields: compile_fields(name, &def.fields),
        errors,
        meta: EntityMeta::derive(name, &def.plural),
    }
}

fn compile_fields(entity_name: &str, fields: &FieldDefMap) -> FieldList {
    let mut compiled = Vec::with_capacity(fields.len());
    for (field_name, def) in fields.iter() {
        let kind = match def.field_type.as_str() {
            OBJECT_TYPE => {
                // Soft validation: an object field with nothing inside it
                // is dropped, not rejected.
                match &def.fields {
                    Some(nested) if !nested.is_empty() => FieldKind::Object {
                        fields: compile_fields(entity_name, nested),
                    },
                    _ => {
                        warn!(
                            "Dropping object field '{}' of '{}': no nested fields",
                            field_name, entity_name
                        );
                        continue;
                    }
                }
            }
            REFERENCE_TYPE => {
                let mut targets = def.references.clone();
                targets.sort();
                targets.dedup();
                FieldKind::Reference { targets }
            }
            other => FieldKind::Primitive {
                type_name: other.to_string(),
            },
        };

        let label = if def.label.is_empty() {
            field_name.clone()
        } else {
            def.label.clone()
        };

        compiled.push(EntityField {
            name: field_name.clone(),
            label,
            description: def.description.clone(),
            required: def.required,
            many: def.many,
            default: def.default.clone(),
            index: def.index,
            kind,
            meta: FieldMeta::derive(field_name),
        });
    }
    FieldList(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::FieldDef;

    fn no_validators() -> Vec<Validator> {
        Vec::new()
    }

    #[test]
    fn empty_object_field_is_pruned_and_siblings_survive() {
        let mut def = EntityTypeDef {
            plural: "Cats".to_string(),
            storage: "db".to_string(),
            ..EntityTypeDef::default()
        };
        def.fields
            .insert("name", FieldDef::primitive("string", "Name"));
        def.fields.insert(
            "stories",
            FieldDef {
                field_type: "object".to_string(),
                label: "Stories".to_string(),
                fields: Some(FieldDefMap::new()),
                ..FieldDef::default()
            },
        );

        let registry = FieldTypeRegistry::new();
        let et = compile_entity_type("Cat", &def, &no_validators(), &registry);
        assert!(et.fields.get("stories").is_none());
        assert!(et.fields.get("name").is_some());
    }

    #[test]
    fn reference_targets_are_sorted() {
        let mut def = EntityTypeDef::default();
        def.fields.insert(
            "owner",
            FieldDef {
                field_type: "reference".to_string(),
                label: "Owner".to_string(),
                references: vec!["Human".to_string(), "Dog".to_string()],
                ..FieldDef::default()
            },
        );

        let registry = FieldTypeRegistry::new();
        let et = compile_entity_type("Cat", &def, &no_validators(), &registry);
        match &et.fields.get("owner").unwrap().kind {
            FieldKind::Reference { targets } => assert_eq!(targets, &["Dog", "Human"]),
            other => panic!("expected reference, got {:?}", other),
        }
    }

    #[test]
    fn label_falls_back_to_field_name() {
        let mut def = EntityTypeDef::default();
        def.fields.insert(
            "name",
            FieldDef {
                field_type: "string".to_string(),
                ..FieldDef::default()
            },
        );
        let registry = FieldTypeRegistry::new();
        let et = compile_entity_type("Cat", &def, &no_validators(), &registry);
        assert_eq!(et.fields.get("name").unwrap().label, "name");
    }
}
