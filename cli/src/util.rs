use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crmdesk_client::{AlertError, NoticeLevel, Notifier, ServiceError};
use crmdesk_core::error::{ErrorBody, codes};

/// Exit codes: 0=success, 1=remote/validation/not found, 3=connection error,
///             4=usage or config error
pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONNECTION: i32 = 3;
pub const EXIT_USAGE: i32 = 4;

pub fn print_error(body: &ErrorBody) {
    eprintln!(
        "{}",
        serde_json::to_string_pretty(body).unwrap_or_else(|_| body.message.clone())
    );
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut body = ErrorBody::new(codes::CLI_ERROR, message);
    if let Some(hint) = docs_hint {
        body = body.with_hint(hint);
    }
    print_error(&body);
    std::process::exit(EXIT_USAGE);
}

pub fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(out) => {
            println!("{out}");
            EXIT_OK
        }
        Err(e) => {
            print_error(&ErrorBody::new(
                codes::CLI_ERROR,
                format!("Failed to render output: {e}"),
            ));
            EXIT_FAILURE
        }
    }
}

pub fn exit_code(err: &ServiceError) -> i32 {
    if err.is_transport() {
        EXIT_CONNECTION
    } else {
        EXIT_FAILURE
    }
}

/// Print a service failure and return its exit code.
pub fn service_failure(err: &ServiceError) -> i32 {
    print_error(&err.to_body());
    exit_code(err)
}

pub fn alert_failure(err: &AlertError) -> i32 {
    print_error(&err.to_body());
    exit_code(err.service_error())
}

/// Record payload from `--data` or `--data-file`, decoded into the entity's
/// input type.
pub fn read_input<T: DeserializeOwned>(
    data: Option<&str>,
    data_file: Option<&str>,
) -> Result<T, String> {
    let value = match (data, data_file) {
        (Some(d), _) => {
            serde_json::from_str(d).map_err(|e| format!("Invalid JSON in --data: {e}"))?
        }
        (None, Some(path)) => read_json_from_file(path)?,
        (None, None) => return Err("Provide --data or --data-file".to_string()),
    };
    serde_json::from_value(value).map_err(|e| format!("Invalid record fields: {e}"))
}

/// Read JSON from a file path or stdin (when path is "-").
pub fn read_json_from_file(path: &str) -> Result<serde_json::Value, String> {
    let raw = if path == "-" {
        std::io::read_to_string(std::io::stdin())
            .map_err(|e| format!("Failed to read stdin: {e}"))?
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))?
    };
    serde_json::from_str(&raw).map_err(|e| format!("Invalid JSON in '{path}': {e}"))
}

/// Show only the first few characters of a secret.
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(6).collect();
    if prefix.len() < key.len() {
        format!("{prefix}...")
    } else {
        "***".to_string()
    }
}

/// Notices go to stderr as one JSON object per line, keeping stdout for
/// command output.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        eprintln!("{}", json!({"notice": level.as_str(), "message": message}));
    }
}
