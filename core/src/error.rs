use serde::Serialize;

/// Structured error body printed by front ends.
/// Carries enough context for a caller to decide whether to retry,
/// fix its input, or give up.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (see [`codes`])
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Which field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Hint about how to fix the problem
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

impl ErrorBody {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            field: None,
            docs_hint: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.docs_hint = Some(hint.into());
        self
    }
}

/// Error codes shared by the client library and the CLI
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const NOT_FOUND: &str = "not_found";
    pub const REMOTE_FAILURE: &str = "remote_failure";
    pub const REJECTED: &str = "rejected";
    pub const CONNECTION_ERROR: &str = "connection_error";
    pub const DECODE_FAILED: &str = "decode_failed";
    pub const CONFIG_ERROR: &str = "config_error";
    pub const ALERTS_UNAVAILABLE: &str = "alerts_unavailable";
    pub const CLI_ERROR: &str = "cli_error";
}
