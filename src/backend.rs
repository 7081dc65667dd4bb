//! Example `backend` object
//!
//! Holds a message and a counter, and echoes text sent from the frontend back
//! through the `sendToFrontend` signal.

use serde_json::{json, Value as JsonValue};

use crate::host::{argument, Emitter, Interface, NativeObject, Property};
use crate::{Error, Result};

pub struct Backend {
    emitter: Emitter,
    message: Property<String>,
    count: Property<i64>,
}

impl Backend {
    /// Name the demo registers the object under
    pub const NAME: &'static str = "backend";

    pub fn new(emitter: Emitter) -> Self {
        Self {
            emitter,
            message: Property::new("message", "Hello from C++ backend!".to_string()),
            count: Property::new("count", 0),
        }
    }

    pub fn message(&self) -> String {
        self.message.get()
    }

    pub fn set_message(&self, message: impl Into<String>) -> Result<()> {
        self.message.set(&self.emitter, message.into())?;
        Ok(())
    }

    pub fn count(&self) -> i64 {
        self.count.get()
    }

    pub fn set_count(&self, count: i64) -> Result<()> {
        self.count.set(&self.emitter, count)?;
        Ok(())
    }

    pub fn increment_count(&self) -> Result<()> {
        self.count.try_update(&self.emitter, |count| {
            count
                .checked_add(1)
                .ok_or_else(|| Error::Argument(format!("count {} cannot be incremented", count)))
        })?;
        Ok(())
    }

    pub fn send_to_backend(&self, text: &str) {
        self.emitter.emit(
            "sendToFrontend",
            vec![json!(format!("Backend received: {}", text))],
        );
    }
}

impl NativeObject for Backend {
    fn interface(&self) -> Interface {
        Interface::new()
            .property("message", "messageChanged")
            .property("count", "countChanged")
            .method("incrementCount", 0)
            .method("sendToBackend", 1)
            .signal("messageChanged")
            .signal("countChanged")
            .signal("sendToFrontend")
    }

    fn property(&self, name: &str) -> Option<JsonValue> {
        match name {
            "message" => self.message.to_json().ok(),
            "count" => self.count.to_json().ok(),
            _ => None,
        }
    }

    fn invoke(&self, method: &str, args: &[JsonValue]) -> Result<JsonValue> {
        match method {
            "incrementCount" => {
                self.increment_count()?;
                Ok(JsonValue::Null)
            }
            "sendToBackend" => {
                let text: String = argument(args, 0)?;
                self.send_to_backend(&text);
                Ok(JsonValue::Null)
            }
            other => Err(Error::UnknownMethod {
                object: Self::NAME.to_string(),
                method: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Host;

    #[test]
    fn test_initial_state() {
        let host = Host::new();
        let backend = host.register(Backend::NAME, Backend::new).unwrap();

        assert_eq!(backend.message(), "Hello from C++ backend!");
        assert_eq!(backend.count(), 0);
        assert_eq!(backend.property("count"), Some(json!(0)));
        assert_eq!(backend.property("missing"), None);
    }

    #[test]
    fn test_invoke_increments() {
        let host = Host::new();
        let backend = host.register(Backend::NAME, Backend::new).unwrap();

        backend.invoke("incrementCount", &[]).unwrap();
        backend.invoke("incrementCount", &[]).unwrap();
        assert_eq!(backend.count(), 2);

        backend.set_message("updated").unwrap();
        assert_eq!(backend.property("message"), Some(json!("updated")));
    }

    #[test]
    fn test_send_to_backend_requires_text() {
        let host = Host::new();
        let backend = host.register(Backend::NAME, Backend::new).unwrap();

        let err = backend.invoke("sendToBackend", &[json!(false)]).unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn test_increment_at_max_is_rejected() {
        let host = Host::new();
        let backend = host.register(Backend::NAME, Backend::new).unwrap();
        backend.set_count(i64::MAX).unwrap();

        let err = backend.invoke("incrementCount", &[]).unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
        assert_eq!(backend.count(), i64::MAX);
    }
}
