//! Schema projection engine
//!
//! A pure function of the compiled entity schema model. Per entity type,
//! every field gets two parallel projections: the model form used for
//! output object types (references resolve to type or union names) and
//! the input form used for mutations (references resolve to synthesized
//! attach-or-create input types). Nested object fields flatten into
//! uniquely named synthetic types, since the target API representation
//! has no native nested-object literal.

use super::types::{
    ApiArgument, ApiDescription, ApiField, ApiInputType, ApiObjectType, ApiOperation,
    ApiUnionType,
};
use crate::error::SchemaResult;
use crate::registry::FieldTypeRegistry;
use crate::schema::types::{EntityType, FieldKind, FieldList};
use convert_case::{Case, Casing};
use log::warn;
use std::collections::HashMap;

/// Shared input type for attaching an existing entity to a reference.
const EXISTING_INPUT: &str = "_ExistingReferenceInput";

/// Project the compiled model into an API description.
///
/// Deterministic: entity types are walked in sorted name order, fields in
/// declaration order, and reference target lists were sorted at compile
/// time, so synthesized names never depend on declaration order of their
/// targets. Types carrying validation errors are skipped with a warning.
pub fn project(
    entity_types: &HashMap<String, EntityType>,
    registry: &FieldTypeRegistry,
) -> SchemaResult<ApiDescription> {
    let mut projector = Projector {
        entity_types,
        registry,
        api: ApiDescription::default(),
    };

    let mut names: Vec<&String> = entity_types.keys().collect();
    names.sort();
    for name in names {
        let entity_type = &entity_types[name];
        if !entity_type.is_valid() {
            warn!(
                "Skipping '{}' during projection: {} definition error(s)",
                name,
                entity_type.errors.len()
            );
            continue;
        }
        projector.project_entity_type(entity_type)?;
    }
    Ok(projector.api)
}

/// Render non-null/list wrappers: `required` decorates the element type
/// before `many` wraps it in a list.
fn wrap(base: &str, required: bool, many: bool) -> String {
    let element = if required {
        format!("{}!", base)
    } else {
        base.to_string()
    };
    if many {
        format!("[{}]", element)
    } else {
        element
    }
}

fn union_name(targets: &[String]) -> String {
    format!("_{}", targets.join("_"))
}

struct Projector<'a> {
    entity_types: &'a HashMap<String, EntityType>,
    registry: &'a FieldTypeRegistry,
    api: ApiDescription,
}

impl<'a> Projector<'a> {
    fn project_entity_type(&mut self, entity_type: &EntityType) -> SchemaResult<()> {
        let name = &entity_type.name;
        let include_input = !entity_type.exclude_from_api && entity_type.fields.has_user_fields();

        let (mut model_fields, input_fields) =
            self.project_fields(name, &entity_type.fields, include_input)?;
        model_fields.insert(
            0,
            ApiField {
                name: "id".to_string(),
                field_type: "ID!".to_string(),
                description: "Record identity".to_string(),
            },
        );

        // Excluded types still get a model-form type so other types may
        // reference them, but no API surface beyond that.
        self.api.types.insert(
            name.clone(),
            ApiObjectType {
                name: name.clone(),
                description: entity_type.description.clone(),
                fields: model_fields,
            },
        );
        if entity_type.exclude_from_api {
            return Ok(());
        }

        if include_input {
            self.api.inputs.insert(
                format!("{}Input", name),
                ApiInputType {
                    name: format!("{}Input", name),
                    fields: input_fields,
                },
            );
        }

        self.project_queries(entity_type);
        if include_input {
            self.project_mutations(entity_type);
        }
        Ok(())
    }

    /// Walk a field list once, producing the model-form and (optionally)
    /// input-form field vectors and registering every synthetic type
    /// encountered along the way. `type_name` accumulates the
    /// `Parent_child_grandchild` prefix for nested object fields.
    fn project_fields(
        &mut self,
        type_name: &str,
        fields: &FieldList,
        include_input: bool,
    ) -> SchemaResult<(Vec<ApiField>, Vec<ApiField>)> {
        let mut model = Vec::new();
        let mut input = Vec::new();

        for field in fields.iter() {
            // Internal bookkeeping fields stay readable under their verbatim
            // names but are never writable through inputs.
            let in_input = include_input && !field.is_internal();
            let (model_base, input_base) = match &field.kind {
                FieldKind::Primitive { type_name: primitive } => {
                    let scalar = self.registry.to_api_type(primitive)?.to_string();
                    (scalar.clone(), scalar)
                }
                FieldKind::Object { fields: nested } => {
                    let synthetic = format!("{}_{}", type_name, field.name);
                    let (nested_model, nested_input) =
                        self.project_fields(&synthetic, nested, in_input)?;
                    self.api.types.insert(
                        synthetic.clone(),
                        ApiObjectType {
                            name: synthetic.clone(),
                            description: field.description.clone(),
                            fields: nested_model,
                        },
                    );
                    let input_name = format!("{}Input", synthetic);
                    if in_input {
                        self.api.inputs.insert(
                            input_name.clone(),
                            ApiInputType {
                                name: input_name.clone(),
                                fields: nested_input,
                            },
                        );
                    }
                    (synthetic, input_name)
                }
                FieldKind::Reference { targets } => {
                    let model_name = if targets.len() == 1 {
                        targets[0].clone()
                    } else {
                        self.ensure_union(targets)
                    };
                    let input_name = if in_input {
                        self.ensure_reference_input(targets)
                    } else {
                        String::new()
                    };
                    (model_name, input_name)
                }
            };

            model.push(ApiField {
                name: field.meta.camel_name.clone(),
                field_type: wrap(&model_base, field.required, field.many),
                description: field.description.clone(),
            });
            if in_input {
                input.push(ApiField {
                    name: field.meta.camel_name.clone(),
                    field_type: wrap(&input_base, field.required, field.many),
                    description: field.description.clone(),
                });
            }
        }
        Ok((model, input))
    }

    fn ensure_union(&mut self, targets: &[String]) -> String {
        let name = union_name(targets);
        self.api.union_types.entry(name.clone()).or_insert_with(|| ApiUnionType {
            name: name.clone(),
            members: targets.to_vec(),
        });
        name
    }

    /// Synthesize the attach-or-create input for a reference field. The
    /// existing-vs-create choice is modeled as alternative optional
    /// fields, since inputs cannot be polymorphic the way outputs can.
    fn ensure_reference_input(&mut self, targets: &[String]) -> String {
        self.api
            .inputs
            .entry(EXISTING_INPUT.to_string())
            .or_insert_with(|| ApiInputType {
                name: EXISTING_INPUT.to_string(),
                fields: vec![
                    ApiField {
                        name: "entityType".to_string(),
                        field_type: "String!".to_string(),
                        description: String::new(),
                    },
                    ApiField {
                        name: "entityId".to_string(),
                        field_type: "ID!".to_string(),
                        description: String::new(),
                    },
                ],
            });

        let name = format!("{}Input", union_name(targets));
        if !self.api.inputs.contains_key(&name) {
            let mut fields = vec![ApiField {
                name: "existing".to_string(),
                field_type: EXISTING_INPUT.to_string(),
                description: "Attach an existing entity".to_string(),
            }];
            for target in targets {
                let creatable = self
                    .entity_types
                    .get(target)
                    .map(|t| !t.exclude_from_api && t.fields.has_user_fields())
                    .unwrap_or(false);
                if creatable {
                    fields.push(ApiField {
                        name: format!("create{}", target.to_case(Case::Pascal)),
                        field_type: format!("{}Input", target),
                        description: format!("Create a new {} inline", target),
                    });
                }
            }
            self.api.inputs.insert(
                name.clone(),
                ApiInputType {
                    name: name.clone(),
                    fields,
                },
            );
        }
        name
    }

    fn project_queries(&mut self, entity_type: &EntityType) {
        let name = &entity_type.name;
        let single = &entity_type.meta.camel;
        let plural = &entity_type.meta.camel_plural;

        self.api.queries.insert(
            single.clone(),
            ApiOperation {
                name: single.clone(),
                arguments: vec![ApiArgument {
                    name: "id".to_string(),
                    arg_type: "ID!".to_string(),
                }],
                return_type: name.clone(),
                description: format!("Get a single {} by its id", name),
            },
        );
        self.api.queries.insert(
            plural.clone(),
            ApiOperation {
                name: plural.clone(),
                arguments: vec![
                    ApiArgument {
                        name: "limit".to_string(),
                        arg_type: "Int".to_string(),
                    },
                    ApiArgument {
                        name: "offset".to_string(),
                        arg_type: "Int".to_string(),
                    },
                    ApiArgument {
                        name: "sort".to_string(),
                        arg_type: "String".to_string(),
                    },
                ],
                return_type: format!("[{}!]", name),
                description: format!("Get paginated {}", entity_type.plural),
            },
        );
    }

    fn project_mutations(&mut self, entity_type: &EntityType) {
        let name = &entity_type.name;
        let pascal = &entity_type.meta.pascal;
        let input_type = format!("{}Input", name);
        let id_arg = ApiArgument {
            name: "id".to_string(),
            arg_type: "ID!".to_string(),
        };
        let fields_arg = ApiArgument {
            name: "fields".to_string(),
            arg_type: format!("{}!", input_type),
        };

        let ops = [
            (
                format!("create{}", pascal),
                vec![fields_arg.clone()],
                name.clone(),
            ),
            (
                format!("update{}", pascal),
                vec![id_arg.clone(), fields_arg.clone()],
                name.clone(),
            ),
            (
                format!("replace{}", pascal),
                vec![id_arg.clone(), fields_arg],
                name.clone(),
            ),
            (format!("delete{}", pascal), vec![id_arg], "ID".to_string()),
        ];
        for (op_name, arguments, return_type) in ops {
            self.api.mutations.insert(
                op_name.clone(),
                ApiOperation {
                    name: op_name,
                    arguments,
                    return_type,
                    description: String::new(),
                },
            );
        }
    }
}
