use crmdesk_core::error::{ErrorBody, codes};
use crmdesk_core::records::ValidationError;
use crmdesk_core::table::FieldError;

/// A record the table store refused inside a batch write.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub message: Option<String>,
    pub errors: Vec<FieldError>,
}

impl RecordFailure {
    /// Every user-facing line for this failure: field errors first, then the
    /// record-level message.
    pub fn notices(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(ToString::to_string)
            .chain(self.message.clone())
            .collect()
    }
}

/// Failure at the entity-service boundary.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("request to {table} failed: {source}")]
    Transport {
        table: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{message}")]
    Remote { table: String, message: String },

    #[error("{table} rejected {} record(s)", .failures.len())]
    Rejected {
        table: String,
        failures: Vec<RecordFailure>,
    },

    #[error("{table} record {id} not found")]
    NotFound { table: String, id: i64 },

    #[error("could not decode {table} response: {source}")]
    Decode {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ServiceError {
    pub fn remote(table: &str, message: Option<String>) -> Self {
        ServiceError::Remote {
            table: table.to_string(),
            message: message.unwrap_or_else(|| format!("{table} request was not successful")),
        }
    }

    pub fn decode(table: &str, source: serde_json::Error) -> Self {
        ServiceError::Decode {
            table: table.to_string(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Transport { .. } => codes::CONNECTION_ERROR,
            ServiceError::Remote { .. } => codes::REMOTE_FAILURE,
            ServiceError::Rejected { .. } => codes::REJECTED,
            ServiceError::NotFound { .. } => codes::NOT_FOUND,
            ServiceError::Decode { .. } => codes::DECODE_FAILED,
            ServiceError::Validation(_) => codes::VALIDATION_FAILED,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ServiceError::Transport { .. })
    }

    pub fn to_body(&self) -> ErrorBody {
        let body = ErrorBody::new(self.code(), self.to_string());
        match self {
            ServiceError::Validation(err) => body.with_field(err.field),
            ServiceError::Transport { .. } => {
                body.with_hint("Is the table API reachable? Check CRMDESK_API_URL.")
            }
            ServiceError::Rejected { failures, .. } => {
                let details: Vec<String> = failures.iter().flat_map(RecordFailure::notices).collect();
                if details.is_empty() {
                    body
                } else {
                    body.with_hint(details.join("; "))
                }
            }
            _ => body,
        }
    }
}

/// Failure of the alert view as a whole.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("Failed to load alerts")]
    Load(#[source] ServiceError),

    #[error("Failed to complete task {task_id}")]
    Complete {
        task_id: i64,
        #[source]
        source: ServiceError,
    },
}

impl AlertError {
    pub fn service_error(&self) -> &ServiceError {
        match self {
            AlertError::Load(source) => source,
            AlertError::Complete { source, .. } => source,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody::new(codes::ALERTS_UNAVAILABLE, self.to_string())
            .with_hint(self.service_error().to_string())
    }
}

/// Client settings could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing {setting}; set {env} or run `crmdesk config init`")]
    Missing {
        setting: &'static str,
        env: &'static str,
    },

    #[error("invalid API URL '{value}': {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid timeout '{0}': expected whole seconds")]
    InvalidTimeout(String),

    #[error("could not read or write config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("could not build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ConfigError {
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody::new(codes::CONFIG_ERROR, self.to_string())
    }
}
