//! Entity schema compiler core
//!
//! `EntitySchemaCore` owns the field type registry, the compiled entity
//! type cache and the extension points. Both caches rebuild lazily on the
//! next access after an explicit `clear_cache`; there is no background
//! refresh.

use super::compile::compile_entity_type;
use super::hooks::SchemaHooks;
use super::types::{EntityType, EntityTypeDef, INTERNAL_PREFIX};
use super::validation::{self, Validator};
use crate::error::{SchemaError, SchemaResult};
use crate::registry::{self, FieldTypeRegistry};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// One registered source of entity definition documents. Locations are
/// ordered by priority upstream; during a load, later locations shadow
/// earlier ones for the same type name.
#[derive(Debug, Clone)]
pub struct SourceLocation {
    pub key: String,
    /// Locations without a resolved path are registered but unusable as a
    /// save target.
    pub path: Option<PathBuf>,
}

impl SourceLocation {
    pub fn new(key: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.to_string(),
            path: Some(path.into()),
        }
    }

    pub fn unresolved(key: &str) -> Self {
        Self {
            key: key.to_string(),
            path: None,
        }
    }
}

/// Structured outcome of a `save` call. Save failures are data, not
/// errors: callers turn them into typed API responses without a try/catch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveResult {
    pub success: bool,
    pub error_message: Option<String>,
}

impl SaveResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error_message: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
        }
    }
}

/// The entity schema compiler.
pub struct EntitySchemaCore {
    registry: Mutex<FieldTypeRegistry>,
    cache: Mutex<Option<HashMap<String, EntityType>>>,
    raw_cache: Mutex<Option<HashMap<String, EntityTypeDef>>>,
    locations: Vec<SourceLocation>,
    default_location: String,
    validators: Vec<Validator>,
    hooks: SchemaHooks,
}

impl EntitySchemaCore {
    /// Create a compiler over the given ordered source locations.
    /// `default_location` names the location `save` falls back to when the
    /// caller passes an empty key.
    ///
    /// The two built-in validators and the core field type contribution are
    /// pre-registered; revision shadow types, system fields and create
    /// handlers are wired separately (see [`crate::build_core`]).
    pub fn new(locations: Vec<SourceLocation>, default_location: &str) -> Self {
        let mut hooks = SchemaHooks::default();
        hooks.on_field_types(registry::register_core_field_types);

        Self {
            registry: Mutex::new(FieldTypeRegistry::new()),
            cache: Mutex::new(None),
            raw_cache: Mutex::new(None),
            locations,
            default_location: default_location.to_string(),
            validators: vec![
                Box::new(validation::validate_required_properties),
                Box::new(validation::validate_fields),
            ],
            hooks,
        }
    }

    pub fn hooks(&self) -> &SchemaHooks {
        &self.hooks
    }

    /// Register extensions before the core is shared. Intended for
    /// composition time, ahead of the first `get_data` call.
    pub fn hooks_mut(&mut self) -> &mut SchemaHooks {
        &mut self.hooks
    }

    /// Contribute an additional validation rule.
    pub fn add_validator(&mut self, validator: Validator) {
        self.validators.push(validator);
    }

    /// Compiled entity types, keyed by name. Rebuilds the registry and the
    /// cache lazily when either is empty; always returns the full set,
    /// including types whose `errors` list is non-empty.
    pub fn get_data(&self) -> SchemaResult<HashMap<String, EntityType>> {
        self.ensure_registry()?;

        let mut cache = self
            .cache
            .lock()
            .map_err(|_| SchemaError::InvalidData("Failed to acquire schema cache lock".to_string()))?;
        if let Some(compiled) = cache.as_ref() {
            return Ok(compiled.clone());
        }

        let mut raw = self.load_raw_definitions()?;
        // Fires exactly once per cache generation: this is where revision
        // shadow types and system fields get injected.
        self.hooks.fire_definitions(&mut raw);

        let registry = self
            .registry
            .lock()
            .map_err(|_| SchemaError::InvalidData("Failed to acquire registry lock".to_string()))?;
        let compiled: HashMap<String, EntityType> = raw
            .iter()
            .map(|(name, def)| {
                (
                    name.clone(),
                    compile_entity_type(name, def, &self.validators, &registry),
                )
            })
            .collect();
        drop(registry);

        info!("Compiled {} entity types", compiled.len());

        let mut raw_cache = self
            .raw_cache
            .lock()
            .map_err(|_| SchemaError::InvalidData("Failed to acquire raw cache lock".to_string()))?;
        *raw_cache = Some(raw);
        *cache = Some(compiled.clone());
        Ok(compiled)
    }

    /// The raw definition set behind the current cache generation, after
    /// definition-rewrite hooks ran.
    pub fn get_definitions(&self) -> SchemaResult<HashMap<String, EntityTypeDef>> {
        self.get_data()?;
        let raw_cache = self
            .raw_cache
            .lock()
            .map_err(|_| SchemaError::InvalidData("Failed to acquire raw cache lock".to_string()))?;
        Ok(raw_cache.clone().unwrap_or_default())
    }

    /// One compiled entity type by name.
    pub fn get_entity_type(&self, name: &str) -> SchemaResult<EntityType> {
        self.get_data()?
            .remove(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    /// Snapshot of the populated field type registry, for consumers that
    /// resolve conversions outside the compiler (e.g. projection).
    pub fn registry_snapshot(&self) -> SchemaResult<FieldTypeRegistry> {
        self.ensure_registry()?;
        let registry = self
            .registry
            .lock()
            .map_err(|_| SchemaError::InvalidData("Failed to acquire registry lock".to_string()))?;
        Ok(registry.clone())
    }

    /// Drop the compiled cache and the field type registry. Both rebuild
    /// on the next access, replaying every contribution hook.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
        if let Ok(mut raw_cache) = self.raw_cache.lock() {
            *raw_cache = None;
        }
        if let Ok(mut registry) = self.registry.lock() {
            *registry = FieldTypeRegistry::new();
        }
        debug!("Entity schema cache invalidated");
    }

    /// Round-trip a caller-supplied definition back to durable storage.
    ///
    /// Runs the same validators used on load and refuses to write anything
    /// when they fail; strips every internal key before serializing; the
    /// write is atomic from the caller's point of view.
    pub fn save(&self, name: &str, def: &EntityTypeDef, location_key: &str) -> SaveResult {
        let def = def.clone();

        if let Err(e) = self.ensure_registry() {
            return SaveResult::err(e.to_string());
        }
        let errors = {
            let registry = match self.registry.lock() {
                Ok(registry) => registry,
                Err(_) => return SaveResult::err("Failed to acquire registry lock"),
            };
            let mut errors = Vec::new();
            for validator in &self.validators {
                errors.extend(validator(name, &def, &registry));
            }
            errors
        };
        if !errors.is_empty() {
            return SaveResult::err(errors.join("\n"));
        }

        let key = if location_key.is_empty() {
            self.default_location.as_str()
        } else {
            location_key
        };
        let location = match self.locations.iter().find(|l| l.key == key) {
            Some(location) => location,
            None => return SaveResult::err(format!("Unknown source location '{}'", key)),
        };
        let dir = match &location.path {
            Some(path) => path.clone(),
            None => {
                return SaveResult::err(format!("Source location '{}' has no valid path", key))
            }
        };

        let mut doc = match serde_json::to_value(&def) {
            Ok(doc) => doc,
            Err(e) => return SaveResult::err(e.to_string()),
        };
        strip_internal_keys(&mut doc);

        let body = match serde_json::to_string_pretty(&doc) {
            Ok(body) => body,
            Err(e) => return SaveResult::err(e.to_string()),
        };

        // Atomic from the caller's point of view: write to a temp file in
        // the same directory, then rename over the target.
        let target = dir.join(format!("{}.json", name));
        let tmp = dir.join(format!(".{}.json.tmp", name));
        if let Err(e) = fs::write(&tmp, body) {
            return SaveResult::err(format!("Failed to write '{}': {}", tmp.display(), e));
        }
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return SaveResult::err(format!("Failed to write '{}': {}", target.display(), e));
        }

        info!("Saved entity type '{}' to location '{}'", name, key);
        self.clear_cache();
        self.hooks.fire_reload();
        SaveResult::ok()
    }

    fn ensure_registry(&self) -> SchemaResult<()> {
        let mut registry = self
            .registry
            .lock()
            .map_err(|_| SchemaError::InvalidData("Failed to acquire registry lock".to_string()))?;
        if registry.is_empty() {
            self.hooks.fire_field_types(&mut registry);
            debug!("Field type registry rebuilt");
        }
        Ok(())
    }

    /// Load raw definitions from every registered location in order.
    /// Later locations shadow earlier ones for the same type name.
    fn load_raw_definitions(&self) -> SchemaResult<HashMap<String, EntityTypeDef>> {
        let mut defs: HashMap<String, EntityTypeDef> = HashMap::new();
        for location in &self.locations {
            let Some(dir) = &location.path else {
                continue;
            };
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        "Skipping source location '{}' ({}): {}",
                        location.key,
                        dir.display(),
                        e
                    );
                    continue;
                }
            };
            for entry in entries {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                // Skip leftover temp files from interrupted saves.
                if name.starts_with('.') {
                    continue;
                }
                let body = fs::read_to_string(&path)?;
                match serde_json::from_str::<EntityTypeDef>(&body) {
                    Ok(mut def) => {
                        def.location_key = Some(location.key.clone());
                        defs.insert(name.to_string(), def);
                    }
                    Err(e) => {
                        warn!("Skipping unparseable definition '{}': {}", path.display(), e);
                    }
                }
            }
        }
        Ok(defs)
    }
}

/// Recursively remove every object key carrying the reserved internal
/// marker.
fn strip_internal_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !key.starts_with(INTERNAL_PREFIX));
            for nested in map.values_mut() {
                strip_internal_keys(nested);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_internal_keys(item);
            }
        }
        _ => {}
    }
}
