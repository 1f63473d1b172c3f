//! Revision shadow types
//!
//! Every entity type that opts into revisioning gets an automatically
//! maintained, append-only shadow type holding snapshots of its fields.
//! The shadow type is injected through the definition-rewrite hook, so it
//! happens exactly once per cache generation and the compiler itself never
//! learns about revisioning.

use super::core::EntitySchemaCore;
use super::types::{EntityTypeDef, FieldDef};

/// Suffix appended to the base type name to form the shadow type name.
pub const REVISION_SUFFIX: &str = "Revision";

/// Internal reference field linking a revision back to its base type.
pub const REVISION_OF_FIELD: &str = "_revision_of";

/// Name of the shadow type for a revisioned entity type.
pub fn revision_type_name(base: &str) -> String {
    format!("{}{}", base, REVISION_SUFFIX)
}

/// Wire revision shadow type injection into a compiler instance.
pub fn register(core: &mut EntitySchemaCore) {
    core.hooks_mut().on_definitions(|defs| {
        let revisioned: Vec<String> = defs
            .iter()
            .filter(|(name, def)| def.revisions && !is_revision_def(name, def))
            .map(|(name, _)| name.clone())
            .collect();

        for base in revisioned {
            let shadow_name = revision_type_name(&base);
            let mut shadow = defs[&base].clone();
            shadow.revisions = false;
            shadow.exclude_from_api = true;
            shadow.description = format!("Automatic revisions of {}", base);
            shadow.plural = format!("{}s", shadow_name);
            shadow.fields.insert(
                REVISION_OF_FIELD,
                FieldDef {
                    field_type: "reference".to_string(),
                    label: "Revision of".to_string(),
                    references: vec![base.clone()],
                    ..FieldDef::default()
                },
            );
            defs.insert(shadow_name, shadow);
        }
    });
}

/// True when the definition looks like an injected shadow type. Used to
/// avoid revisioning the revisions themselves if a caller saves one back.
pub fn is_revision_def(name: &str, def: &EntityTypeDef) -> bool {
    name.ends_with(REVISION_SUFFIX) && def.fields.contains_key(REVISION_OF_FIELD)
}
