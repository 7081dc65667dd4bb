//! Host-side object registry

use std::collections::BTreeMap;
use std::sync::Arc;

use super::object::{Interface, NativeObject};
use crate::{Error, Result};

/// A registered object together with its interface
#[derive(Clone)]
pub struct RegisteredObject {
    pub object: Arc<dyn NativeObject>,
    pub interface: Arc<Interface>,
}

/// Name -> native object mapping, filled during setup
#[derive(Default)]
pub struct ObjectRegistry {
    entries: BTreeMap<String, RegisteredObject>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` under `name`; the interface is read here, once
    pub fn register(&mut self, name: &str, object: Arc<dyn NativeObject>) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }

        let interface = Arc::new(object.interface());
        tracing::debug!(
            "Registered object {} ({} properties, {} methods, {} signals)",
            name,
            interface.properties.len(),
            interface.methods.len(),
            interface.signals.len()
        );

        self.entries
            .insert(name.to_string(), RegisteredObject { object, interface });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&RegisteredObject> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::UnknownObject(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegisteredObject)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JsonValue;

    struct Constant;

    impl NativeObject for Constant {
        fn interface(&self) -> Interface {
            Interface::new().constant("answer")
        }

        fn property(&self, name: &str) -> Option<JsonValue> {
            (name == "answer").then(|| JsonValue::from(42))
        }

        fn invoke(&self, _method: &str, _args: &[JsonValue]) -> Result<JsonValue> {
            Ok(JsonValue::Null)
        }
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ObjectRegistry::new();
        registry.register("answer", Arc::new(Constant)).unwrap();

        let err = registry.register("answer", Arc::new(Constant)).unwrap_err();
        assert!(matches!(err, Error::DuplicateName(name) if name == "answer"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup() {
        let mut registry = ObjectRegistry::new();
        registry.register("answer", Arc::new(Constant)).unwrap();

        let entry = registry.lookup("answer").unwrap();
        assert_eq!(entry.interface.properties[0].name, "answer");
        assert!(matches!(
            registry.lookup("question"),
            Err(Error::UnknownObject(name)) if name == "question"
        ));
    }

    #[test]
    fn test_empty_registry() {
        let mut registry = ObjectRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(registry.lookup("answer"), Err(Error::UnknownObject(_))));

        registry.register("answer", Arc::new(Constant)).unwrap();
        assert!(!registry.is_empty());
        assert!(registry.contains("answer"));
    }
}
