use thiserror::Error;

/// Review error taxonomy. Validation and configuration errors abort before any
/// side effect; analyzer, storage, and timeout errors are recovered at the
/// level they occur and never abort sibling analyzers or the run.
#[derive(Error, Debug, Clone)]
pub enum ReviewError {
    #[error("validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("storage error ({backend}): {message}")]
    Storage { backend: String, message: String },

    #[error("analyzer {component} failed: {message}")]
    Analyzer { component: String, message: String },

    #[error("{operation} timed out after {timeout_seconds}s")]
    Timeout {
        operation: String,
        timeout_seconds: u64,
    },

    #[error("serialization error: {message}")]
    Serialization { message: String },

    #[error("network error: {message}")]
    Network { message: String, url: Option<String> },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ReviewError {
    pub fn validation(message: impl Into<String>, field: Option<String>) -> Self {
        ReviewError::Validation {
            message: message.into(),
            field,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ReviewError::Configuration {
            message: message.into(),
        }
    }

    pub fn storage(backend: impl Into<String>, message: impl Into<String>) -> Self {
        ReviewError::Storage {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn analyzer(component: impl Into<String>, message: impl Into<String>) -> Self {
        ReviewError::Analyzer {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_seconds: u64) -> Self {
        ReviewError::Timeout {
            operation: operation.into(),
            timeout_seconds,
        }
    }

    /// Whether a retry (by a new review run) could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReviewError::Storage { .. }
                | ReviewError::Network { .. }
                | ReviewError::Timeout { .. }
                | ReviewError::Analyzer { .. }
        )
    }
}

impl From<serde_json::Error> for ReviewError {
    fn from(error: serde_json::Error) -> Self {
        ReviewError::Serialization {
            message: error.to_string(),
        }
    }
}

impl From<std::io::Error> for ReviewError {
    fn from(error: std::io::Error) -> Self {
        ReviewError::Internal {
            message: error.to_string(),
        }
    }
}

impl From<sqlx::Error> for ReviewError {
    fn from(error: sqlx::Error) -> Self {
        ReviewError::Storage {
            backend: "key-value-table".to_string(),
            message: error.to_string(),
        }
    }
}

impl From<reqwest::Error> for ReviewError {
    fn from(error: reqwest::Error) -> Self {
        ReviewError::Network {
            message: error.to_string(),
            url: error.url().map(|u| u.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ReviewError::storage("object-store", "throttled").is_retryable());
        assert!(ReviewError::timeout("review run", 300).is_retryable());
        assert!(!ReviewError::validation("daysBack must be positive", None).is_retryable());
        assert!(!ReviewError::config("missing instance ARN").is_retryable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ReviewError::analyzer("quota", "upstream 503");
        assert_eq!(err.to_string(), "analyzer quota failed: upstream 503");

        let err = ReviewError::timeout("review run", 300);
        assert_eq!(err.to_string(), "review run timed out after 300s");
    }
}
