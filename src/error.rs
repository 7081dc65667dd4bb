//! Error types for the object bridge

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bridge-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Object already registered: {0}")]
    DuplicateName(String),

    #[error("Unknown object: {0}")]
    UnknownObject(String),

    #[error("Unknown method: {object}.{method}")]
    UnknownMethod { object: String, method: String },

    #[error("Invalid arguments: {0}")]
    Argument(String),

    #[error("Transport closed")]
    TransportClosed,

    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Remote error ({code}): {message}")]
    Remote { code: ErrorCode, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Channel error: {0}")]
    Channel(String),
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wire code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::DuplicateName(_) => ErrorCode::DuplicateName,
            Error::UnknownObject(_) => ErrorCode::UnknownObject,
            Error::UnknownMethod { .. } => ErrorCode::UnknownMethod,
            Error::Argument(_) => ErrorCode::Argument,
            Error::TransportClosed => ErrorCode::TransportClosed,
            Error::Timeout(_) => ErrorCode::Timeout,
            Error::Serialization(_) => ErrorCode::Serialization,
            Error::Remote { code, .. } => *code,
            Error::Io(_) | Error::Config(_) | Error::Channel(_) => ErrorCode::Internal,
        }
    }

    /// Serializable description sent in an error invoke-response
    pub fn to_info(&self) -> ErrorInfo {
        let message = match self {
            // Forward the remote text verbatim instead of nesting prefixes
            Error::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        };
        ErrorInfo {
            code: self.code(),
            message,
        }
    }
}

impl From<ErrorInfo> for Error {
    fn from(info: ErrorInfo) -> Self {
        Error::Remote {
            code: info.code,
            message: info.message,
        }
    }
}

// Frontends receive errors as plain strings
impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Error code carried in an invoke-response
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    DuplicateName,
    UnknownObject,
    UnknownMethod,
    Argument,
    TransportClosed,
    Timeout,
    Serialization,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DuplicateName => "duplicate-name",
            ErrorCode::UnknownObject => "unknown-object",
            ErrorCode::UnknownMethod => "unknown-method",
            ErrorCode::Argument => "argument",
            ErrorCode::TransportClosed => "transport-closed",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Serialization => "serialization",
            ErrorCode::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{code, message}` error payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_round_trips_code() {
        let err = Error::UnknownMethod {
            object: "backend".to_string(),
            method: "explode".to_string(),
        };
        let info = err.to_info();
        assert_eq!(info.code, ErrorCode::UnknownMethod);
        assert_eq!(info.message, "Unknown method: backend.explode");

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["code"], "unknown-method");

        let remote: Error = info.into();
        assert_eq!(remote.code(), ErrorCode::UnknownMethod);
        assert_eq!(remote.to_info().message, "Unknown method: backend.explode");
    }

    #[test]
    fn test_error_serializes_as_string() {
        let json = serde_json::to_value(Error::TransportClosed).unwrap();
        assert_eq!(json, serde_json::json!("Transport closed"));
    }

    #[test]
    fn test_code_names_match_wire_format() {
        let codes = [
            ErrorCode::DuplicateName,
            ErrorCode::UnknownObject,
            ErrorCode::UnknownMethod,
            ErrorCode::Argument,
            ErrorCode::TransportClosed,
            ErrorCode::Timeout,
            ErrorCode::Serialization,
            ErrorCode::Internal,
        ];
        for code in codes {
            assert_eq!(serde_json::to_value(code).unwrap(), code.as_str());
            assert_eq!(code.to_string(), code.as_str());
        }
    }
}
