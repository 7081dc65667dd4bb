//! Wire protocol shared by host and renderer
//!
//! Every message is a JSON object tagged by `kind`. The transport layer frames
//! one message per line.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ErrorInfo;

/// Message envelope exchanged between host and renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Message {
    /// Renderer asks for the schemas of every registered object
    InitRequest,

    /// Host answers with all schemas at once
    InitResponse {
        schemas: BTreeMap<String, ObjectSchema>,
    },

    /// Renderer calls a method on a host object
    InvokeRequest {
        object: String,
        method: String,
        #[serde(default)]
        args: Vec<JsonValue>,
        id: String,
    },

    /// Host answers a call; exactly one of `result` / `error` is meaningful
    InvokeResponse {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<JsonValue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorInfo>,
    },

    /// A host property now holds a different value
    PropertyChanged {
        object: String,
        property: String,
        value: JsonValue,
    },

    /// A host object emitted a signal
    SignalEmitted {
        object: String,
        signal: String,
        #[serde(default)]
        args: Vec<JsonValue>,
    },
}

impl Message {
    /// Build an invoke-response from the outcome of a dispatched call
    pub fn response(id: impl Into<String>, outcome: crate::Result<JsonValue>) -> Self {
        match outcome {
            Ok(value) => Message::InvokeResponse {
                id: id.into(),
                result: Some(value),
                error: None,
            },
            Err(e) => Message::InvokeResponse {
                id: id.into(),
                result: None,
                error: Some(e.to_info()),
            },
        }
    }

    /// The `kind` tag, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Message::InitRequest => "init-request",
            Message::InitResponse { .. } => "init-response",
            Message::InvokeRequest { .. } => "invoke-request",
            Message::InvokeResponse { .. } => "invoke-response",
            Message::PropertyChanged { .. } => "property-changed",
            Message::SignalEmitted { .. } => "signal-emitted",
        }
    }
}

/// Method name and the number of arguments it takes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub arity: usize,
}

/// Snapshot of one object taken when the renderer initializes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectSchema {
    /// Property name -> value at snapshot time
    #[serde(default)]
    pub properties: BTreeMap<String, JsonValue>,

    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,

    #[serde(default)]
    pub signals: Vec<String>,

    /// Property name -> signal fired when the property changes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub notify: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_init_request_shape() {
        let json = serde_json::to_value(&Message::InitRequest).unwrap();
        assert_eq!(json, json!({ "kind": "init-request" }));
    }

    #[test]
    fn test_invoke_request_shape() {
        let message = Message::InvokeRequest {
            object: "backend".to_string(),
            method: "sendToBackend".to_string(),
            args: vec![json!("hi")],
            id: "7".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "kind": "invoke-request",
                "object": "backend",
                "method": "sendToBackend",
                "args": ["hi"],
                "id": "7"
            })
        );
    }

    #[test]
    fn test_response_carries_result_or_error() {
        let ok = serde_json::to_value(Message::response("1", Ok(json!(3)))).unwrap();
        assert_eq!(ok, json!({ "kind": "invoke-response", "id": "1", "result": 3 }));

        let void = serde_json::to_value(Message::response("2", Ok(JsonValue::Null))).unwrap();
        assert_eq!(void, json!({ "kind": "invoke-response", "id": "2", "result": null }));

        let err = Message::response("3", Err(crate::Error::UnknownObject("nope".to_string())));
        let err = serde_json::to_value(err).unwrap();
        assert_eq!(err["error"]["code"], "unknown-object");
        assert_eq!(err["error"]["message"], "Unknown object: nope");
        assert!(err.get("result").is_none());
    }

    #[test]
    fn test_parse_error_response() {
        let line = r#"{"kind":"invoke-response","id":"9","error":{"code":"argument","message":"bad"}}"#;
        let message: Message = serde_json::from_str(line).unwrap();
        match message {
            Message::InvokeResponse { id, result, error } => {
                assert_eq!(id, "9");
                assert!(result.is_none());
                assert_eq!(error.unwrap().code, ErrorCode::Argument);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_parse_init_response_without_notify() {
        let line = r#"{"kind":"init-response","schemas":{"backend":{
            "properties":{"count":0},
            "methods":[{"name":"incrementCount","arity":0}],
            "signals":["countChanged"]}}}"#;
        let message: Message = serde_json::from_str(line).unwrap();
        let Message::InitResponse { schemas } = message else {
            panic!("expected init-response");
        };
        let schema = &schemas["backend"];
        assert_eq!(schema.properties["count"], json!(0));
        assert_eq!(schema.methods[0].arity, 0);
        assert!(schema.notify.is_empty());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let parsed = serde_json::from_str::<Message>(r#"{"kind":"cancel-request","id":"1"}"#);
        assert!(parsed.is_err());
    }
}
