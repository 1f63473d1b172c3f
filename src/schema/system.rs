//! System field injection
//!
//! Creation/update timestamps are bookkeeping, not part of any authored
//! definition, so they are injected through the definition-rewrite hook
//! rather than hard-coded in the compiler.

use super::core::EntitySchemaCore;
use super::types::FieldDef;
use serde_json::Value;

pub const CREATED_FIELD: &str = "_created";
pub const UPDATED_FIELD: &str = "_updated";

/// Wire the system field injection into a compiler instance.
pub fn register(core: &mut EntitySchemaCore) {
    core.hooks_mut().on_definitions(|defs| {
        for def in defs.values_mut() {
            def.fields.insert(CREATED_FIELD, timestamp_field("Created"));
            def.fields.insert(UPDATED_FIELD, timestamp_field("Updated"));
        }
    });
}

fn timestamp_field(label: &str) -> FieldDef {
    FieldDef {
        field_type: "date".to_string(),
        label: label.to_string(),
        index: true,
        ..FieldDef::default()
    }
}

/// Current timestamp in the representation stored on records.
pub fn now() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339())
}
