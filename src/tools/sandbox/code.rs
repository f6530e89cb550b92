//! `code_execute` tool: run a snippet in one of the supported languages.

use crate::sandbox::StatelessClient;
use crate::security::ValidationError;
use crate::tools::traits::{Tool, ToolResult};
use crate::tools::{respond, session_id_arg};
use async_trait::async_trait;
use serde_json::json;

const TOOL_NAME: &str = crate::tools::TOOL_CODE_EXECUTE;

pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "python",
    "javascript",
    "java",
    "go",
    "bash",
    "cpp",
    "c",
    "php",
    "ruby",
    "rust",
];

pub struct CodeExecuteTool {
    client: StatelessClient,
}

impl CodeExecuteTool {
    pub fn new(client: StatelessClient) -> Self {
        Self { client }
    }
}

fn parse(args: &serde_json::Value) -> Result<(String, String, String), ValidationError> {
    let session_id = session_id_arg(args)?;
    let code = args["code"]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .ok_or(ValidationError::Missing("code"))?;
    let language = args["language"].as_str().unwrap_or("python");
    if !SUPPORTED_LANGUAGES.contains(&language) {
        return Err(ValidationError::Unsupported {
            param: "language",
            value: language.to_string(),
            supported: SUPPORTED_LANGUAGES.join(", "),
        });
    }
    Ok((session_id, code.to_string(), language.to_string()))
}

#[async_trait]
impl Tool for CodeExecuteTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Execute a code snippet inside a session (use a code_latest session). \
         Returns the result and any error output."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Target session"
                },
                "code": {
                    "type": "string",
                    "description": "Source code to run"
                },
                "language": {
                    "type": "string",
                    "enum": SUPPORTED_LANGUAGES,
                    "description": "Programming language. Default: python."
                }
            },
            "required": ["session_id", "code"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let (session_id, code, language) = match parse(&args) {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ToolResult::fail(e.to_string())),
        };

        respond(
            json!({"session_id": session_id}),
            self.client.run_code(&session_id, &code, &language).await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::mock::{Call, MockBackend};
    use std::sync::Arc;

    #[test]
    fn language_defaults_to_python() {
        let (_, _, language) = parse(&json!({"session_id": "abc12345", "code": "1+1"})).unwrap();
        assert_eq!(language, "python");
    }

    #[test]
    fn rejects_unknown_language_and_empty_code() {
        let err = parse(&json!({"session_id": "abc12345", "code": "x", "language": "cobol"}))
            .unwrap_err();
        assert!(err.to_string().contains("cobol"));
        assert_eq!(
            parse(&json!({"session_id": "abc12345", "code": "  "})).unwrap_err(),
            ValidationError::Missing("code")
        );
    }

    #[tokio::test]
    async fn runs_code() {
        let mock = Arc::new(MockBackend::with_sessions(["abc12345"]));
        let tool = CodeExecuteTool::new(StatelessClient::with_backend(mock.clone()));

        let result = tool
            .execute(json!({"session_id": "abc12345", "code": "print(1)", "language": "rust"}))
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.error);
        assert!(mock.calls().contains(&Call::RunCode {
            session_id: "abc12345".into(),
            language: "rust".into()
        }));
    }
}
