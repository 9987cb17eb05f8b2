pub mod config;
pub mod history;
pub mod recommend;
pub mod session;

use browsetrail_core::errors::ApplicationError;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Converts a command outcome, classifying failures by their [`ApplicationError`] cause.
    pub fn from_outcome(command: &str, outcome: anyhow::Result<(String, Option<Value>)>) -> Self {
        match outcome {
            Ok((message, data)) => Self::success_with_data(command, message, data),
            Err(error) => {
                let message = format!("{error:#}");
                match error.downcast_ref::<ApplicationError>() {
                    Some(cause) => {
                        Self::failure(command, cause.error_class(), message, cause.exit_code())
                    }
                    None => Self::failure(command, "internal", message, 1),
                }
            }
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use anyhow::Context;
    use browsetrail_core::errors::{ApplicationError, StorageError};
    use serde_json::{json, Value};

    use super::CommandResult;

    fn parse(output: &str) -> Value {
        serde_json::from_str(output).expect("valid JSON")
    }

    #[test]
    fn success_omits_data_when_absent() {
        let payload = parse(&CommandResult::success("gc", "evicted 0 pages").output);

        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["error_class"], Value::Null);
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn application_errors_keep_class_through_context() {
        let outcome: anyhow::Result<(String, Option<Value>)> =
            Err(ApplicationError::from(StorageError::Unavailable("disk gone".to_string())))
                .context("opening session");

        let result = CommandResult::from_outcome("report", outcome);
        let payload = parse(&result.output);

        assert_eq!(result.exit_code, 4);
        assert_eq!(payload["error_class"], "storage");
        assert!(payload["message"].as_str().unwrap_or_default().contains("disk gone"));
    }

    #[test]
    fn unclassified_errors_are_internal() {
        let outcome = Err(anyhow::anyhow!("boom"));
        let result = CommandResult::from_outcome("report", outcome);

        assert_eq!(result.exit_code, 1);
        assert_eq!(parse(&result.output)["error_class"], "internal");
    }

    #[test]
    fn data_is_embedded_verbatim() {
        let result = CommandResult::from_outcome(
            "recent",
            Ok(("1 product".to_string(), Some(json!([{ "id": "p-1" }])))),
        );

        assert_eq!(parse(&result.output)["data"][0]["id"], "p-1");
    }
}
