//! Native objects exposed to the renderer

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::protocol::MethodDescriptor;
use crate::{Error, Result};

/// A host object published on the bridge
///
/// Implementors keep their state private and mutate it only through their own
/// setters, which report changes through an [`Emitter`](super::Emitter).
pub trait NativeObject: Send + Sync {
    /// Properties, methods and signals this object exposes; read once at
    /// registration
    fn interface(&self) -> Interface;

    /// Current value of a property
    fn property(&self, name: &str) -> Option<JsonValue>;

    /// Invoke a method; void methods return `JsonValue::Null`
    ///
    /// The dispatcher has already checked that `method` exists and that the
    /// argument count matches its arity.
    fn invoke(&self, method: &str, args: &[JsonValue]) -> Result<JsonValue>;
}

/// Property name and the signal announcing its changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub notify: Option<String>,
}

/// Static description of a native object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interface {
    pub properties: Vec<PropertyDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    pub signals: Vec<String>,
}

impl Interface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property whose changes are announced by `notify`
    pub fn property(mut self, name: &str, notify: &str) -> Self {
        self.properties.push(PropertyDescriptor {
            name: name.to_string(),
            notify: Some(notify.to_string()),
        });
        self
    }

    /// Add a property without a change signal
    pub fn constant(mut self, name: &str) -> Self {
        self.properties.push(PropertyDescriptor {
            name: name.to_string(),
            notify: None,
        });
        self
    }

    pub fn method(mut self, name: &str, arity: usize) -> Self {
        self.methods.push(MethodDescriptor {
            name: name.to_string(),
            arity,
        });
        self
    }

    pub fn signal(mut self, name: &str) -> Self {
        self.signals.push(name.to_string());
        self
    }

    pub fn find_method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Decode argument `index` as `T`
///
/// Conversion follows serde_json: integers widen to floats, but strings are
/// never parsed into numbers and fractional numbers never narrow to integers.
pub fn argument<T: DeserializeOwned>(args: &[JsonValue], index: usize) -> Result<T> {
    let value = args
        .get(index)
        .ok_or_else(|| Error::Argument(format!("missing argument {}", index)))?;

    serde_json::from_value(value.clone())
        .map_err(|e| Error::Argument(format!("argument {}: {}", index, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interface_builder() {
        let interface = Interface::new()
            .property("count", "countChanged")
            .constant("version")
            .method("incrementCount", 0)
            .signal("countChanged");

        assert_eq!(interface.properties.len(), 2);
        assert_eq!(interface.properties[1].notify, None);
        assert_eq!(interface.find_method("incrementCount").unwrap().arity, 0);
        assert!(interface.find_method("decrementCount").is_none());
    }

    #[test]
    fn test_argument_coercion_rules() {
        let args = vec![json!("text"), json!(5), json!(2.5), json!("7")];

        assert_eq!(argument::<String>(&args, 0).unwrap(), "text");
        assert_eq!(argument::<i64>(&args, 1).unwrap(), 5);
        assert_eq!(argument::<f64>(&args, 1).unwrap(), 5.0);
        assert_eq!(argument::<f64>(&args, 2).unwrap(), 2.5);

        assert!(matches!(argument::<i64>(&args, 2), Err(Error::Argument(_))));
        assert!(matches!(argument::<i64>(&args, 3), Err(Error::Argument(_))));
        assert!(matches!(argument::<String>(&args, 1), Err(Error::Argument(_))));
        assert!(matches!(argument::<String>(&args, 9), Err(Error::Argument(_))));
    }
}
