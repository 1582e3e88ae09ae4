use thiserror::Error;

/// Core error types for rulegate
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A schema document could not be compiled
    #[error("Schema error: {0}")]
    Schema(String),

    /// Input validation failed
    #[error("Validation error in {field}: {message}")]
    Validation { field: String, message: String },

    /// PAN-OS XML API body could not be decoded
    #[error("Wire format error: {0}")]
    Wire(String),

    /// Internal logic error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Message suitable for a root-level entry in a validation report.
    ///
    /// Type errors from serde carry their own position; everything else is
    /// rendered through `Display`.
    pub fn root_message(&self) -> String {
        match self {
            Error::Validation { message, .. } => message.clone(),
            Error::Serialization(e) => format!("Malformed rule document: {e}"),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = Error::validation("rule_name", "cannot be empty");
        assert_eq!(
            err.to_string(),
            "Validation error in rule_name: cannot be empty"
        );
        assert_eq!(err.root_message(), "cannot be empty");
    }

    #[test]
    fn test_serialization_root_message() {
        let err: Error = serde_json::from_str::<Vec<String>>("{")
            .map_err(Error::from)
            .unwrap_err();
        assert!(err.root_message().starts_with("Malformed rule document"));
    }

    #[test]
    fn test_wire_display() {
        let err = Error::Wire("unterminated element <response>".to_string());
        assert!(err.to_string().contains("unterminated element"));
    }
}
