//! Host-side invocation engine

use serde_json::Value as JsonValue;

use super::registry::RegisteredObject;
use crate::{Error, Result};

/// Check `method` and its argument count against the interface, then invoke
pub fn dispatch(
    object: &str,
    entry: &RegisteredObject,
    method: &str,
    args: &[JsonValue],
) -> Result<JsonValue> {
    let descriptor = entry
        .interface
        .find_method(method)
        .ok_or_else(|| Error::UnknownMethod {
            object: object.to_string(),
            method: method.to_string(),
        })?;

    if descriptor.arity != args.len() {
        return Err(Error::Argument(format!(
            "{}.{} expects {} argument(s), got {}",
            object,
            method,
            descriptor.arity,
            args.len()
        )));
    }

    entry.object.invoke(method, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::object::{argument, Interface, NativeObject};
    use crate::host::registry::ObjectRegistry;
    use serde_json::json;
    use std::sync::Arc;

    struct Calculator;

    impl NativeObject for Calculator {
        fn interface(&self) -> Interface {
            Interface::new().method("add", 2).method("secret", 0)
        }

        fn property(&self, _name: &str) -> Option<JsonValue> {
            None
        }

        fn invoke(&self, method: &str, args: &[JsonValue]) -> Result<JsonValue> {
            match method {
                "add" => {
                    let a: f64 = argument(args, 0)?;
                    let b: f64 = argument(args, 1)?;
                    Ok(json!(a + b))
                }
                other => Err(Error::UnknownMethod {
                    object: "calculator".to_string(),
                    method: other.to_string(),
                }),
            }
        }
    }

    fn registry() -> ObjectRegistry {
        let mut registry = ObjectRegistry::new();
        registry.register("calculator", Arc::new(Calculator)).unwrap();
        registry
    }

    #[test]
    fn test_dispatch_success() {
        let registry = registry();
        let entry = registry.lookup("calculator").unwrap();
        let result = dispatch("calculator", entry, "add", &[json!(1), json!(2.5)]).unwrap();
        assert_eq!(result, json!(3.5));
    }

    #[test]
    fn test_dispatch_unknown_method() {
        let registry = registry();
        let entry = registry.lookup("calculator").unwrap();
        let err = dispatch("calculator", entry, "divide", &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownMethod { method, .. } if method == "divide"));
    }

    #[test]
    fn test_dispatch_arity_mismatch() {
        let registry = registry();
        let entry = registry.lookup("calculator").unwrap();
        let err = dispatch("calculator", entry, "add", &[json!(1)]).unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn test_dispatch_type_mismatch() {
        let registry = registry();
        let entry = registry.lookup("calculator").unwrap();
        let err = dispatch("calculator", entry, "add", &[json!("1"), json!(2)]).unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }
}
