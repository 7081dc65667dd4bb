//! Schema snapshots sent in the init-response

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use super::registry::{ObjectRegistry, RegisteredObject};
use crate::protocol::ObjectSchema;

/// Snapshot one object with the current value of every property
pub fn build_schema(name: &str, entry: &RegisteredObject) -> ObjectSchema {
    let interface = &entry.interface;

    let mut properties = BTreeMap::new();
    let mut notify = BTreeMap::new();
    for property in &interface.properties {
        let value = entry.object.property(&property.name).unwrap_or_else(|| {
            tracing::warn!("{}.{} has no value, sending null", name, property.name);
            JsonValue::Null
        });
        properties.insert(property.name.clone(), value);

        if let Some(signal) = &property.notify {
            notify.insert(property.name.clone(), signal.clone());
        }
    }

    ObjectSchema {
        properties,
        methods: interface.methods.clone(),
        signals: interface.signals.clone(),
        notify,
    }
}

/// Snapshot every registered object
pub fn build_schemas(registry: &ObjectRegistry) -> BTreeMap<String, ObjectSchema> {
    registry
        .iter()
        .map(|(name, entry)| (name.to_string(), build_schema(name, entry)))
        .collect()
}
