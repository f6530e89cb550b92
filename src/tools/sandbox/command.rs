//! `command_execute` tool: run a shell command inside a session.

use crate::sandbox::StatelessClient;
use crate::security::{require_command, require_timeout_value, validate_command, ValidationError};
use crate::tools::traits::{Tool, ToolResult};
use crate::tools::{respond, session_id_arg};
use async_trait::async_trait;
use serde_json::json;

const TOOL_NAME: &str = crate::tools::TOOL_COMMAND_EXECUTE;

pub struct CommandExecuteTool {
    client: StatelessClient,
    default_timeout_ms: u64,
}

#[derive(Debug, PartialEq, Eq)]
struct CommandRequest {
    session_id: String,
    command: String,
    timeout_ms: u64,
}

impl CommandExecuteTool {
    pub fn new(client: StatelessClient, default_timeout_ms: u64) -> Self {
        Self {
            client,
            default_timeout_ms,
        }
    }

    /// The deny-list runs on the command as given and again once the
    /// `working_directory` prefix is added.
    fn parse(&self, args: &serde_json::Value) -> Result<CommandRequest, ValidationError> {
        let session_id = session_id_arg(args)?;
        let command = require_command(args["command"].as_str())?;
        let timeout_ms = require_timeout_value(&args["timeout_ms"], self.default_timeout_ms)?;

        let command = match args["working_directory"].as_str().map(str::trim) {
            Some(dir) if !dir.is_empty() => {
                let prefixed = format!("cd {dir} && {command}");
                if !validate_command(&prefixed) {
                    return Err(ValidationError::UnsafeCommand);
                }
                prefixed
            }
            _ => command.to_string(),
        };

        Ok(CommandRequest {
            session_id,
            command,
            timeout_ms,
        })
    }
}

#[async_trait]
impl Tool for CommandExecuteTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Run a shell command inside a session. Returns output and exit_code. \
         Destructive commands (rm -rf /, mkfs, dd, curl | sh, ...) are refused."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Target session"
                },
                "command": {
                    "type": "string",
                    "description": "Shell command to execute"
                },
                "timeout_ms": {
                    "type": "integer",
                    "minimum": 1000,
                    "maximum": 300000,
                    "description": "Timeout in milliseconds. Default: 30000."
                },
                "working_directory": {
                    "type": "string",
                    "description": "Directory to cd into before running the command"
                }
            },
            "required": ["session_id", "command"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let req = match self.parse(&args) {
            Ok(req) => req,
            Err(e) => return Ok(ToolResult::fail(e.to_string())),
        };

        let result = self
            .client
            .execute_command(&req.session_id, &req.command, req.timeout_ms)
            .await;
        let exit_code = result.data().and_then(|out| out.exit_code);

        let mut rendered = respond(
            json!({"session_id": req.session_id, "command": req.command}),
            result,
        )?;
        if let Some(code) = exit_code.filter(|c| *c != 0) {
            rendered.success = false;
            rendered.error = Some(format!("Command exited with code {code}"));
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::mock::{Call, MockBackend};
    use std::sync::Arc;

    fn tool(mock: &Arc<MockBackend>) -> CommandExecuteTool {
        CommandExecuteTool::new(StatelessClient::with_backend(mock.clone()), 30_000)
    }

    #[test]
    fn tool_name() {
        assert_eq!(tool(&Arc::new(MockBackend::new())).name(), TOOL_NAME);
    }

    #[test]
    fn working_directory_prefixes_command() {
        let req = tool(&Arc::new(MockBackend::new()))
            .parse(&json!({
                "session_id": "abc12345",
                "command": "ls -la",
                "working_directory": "/tmp/work"
            }))
            .unwrap();
        assert_eq!(req.command, "cd /tmp/work && ls -la");
        assert_eq!(req.timeout_ms, 30_000);
    }

    #[test]
    fn validation_order_and_messages() {
        let t = tool(&Arc::new(MockBackend::new()));
        assert_eq!(
            t.parse(&json!({"command": "ls"})).unwrap_err(),
            ValidationError::Missing("session_id")
        );
        assert_eq!(
            t.parse(&json!({"session_id": "abc12345", "command": "sudo rm -r x"}))
                .unwrap_err(),
            ValidationError::UnsafeCommand
        );
        assert_eq!(
            t.parse(&json!({"session_id": "abc12345", "command": "ls", "timeout_ms": 999}))
                .unwrap_err(),
            ValidationError::Timeout("999".into())
        );
        for raw in [json!("abc"), json!(999.5), json!(300_000.5), json!(true)] {
            let err = t
                .parse(&json!({"session_id": "abc12345", "command": "ls", "timeout_ms": raw}))
                .unwrap_err();
            assert!(matches!(err, ValidationError::Timeout(_)), "{raw} gave {err:?}");
        }
        let req = t
            .parse(&json!({"session_id": "abc12345", "command": "ls", "timeout_ms": 2000.0}))
            .unwrap();
        assert_eq!(req.timeout_ms, 2000);
    }

    #[tokio::test]
    async fn working_directory_cannot_smuggle_unsafe_command() {
        let mock = Arc::new(MockBackend::with_sessions(["abc12345"]));
        let t = tool(&mock);
        let args = json!({
            "session_id": "abc12345",
            "command": "ls",
            "working_directory": "/ && rm -rf /"
        });

        assert_eq!(t.parse(&args).unwrap_err(), ValidationError::UnsafeCommand);
        let result = t.execute(args).await.unwrap();
        assert!(!result.success);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn unsafe_command_never_reaches_backend() {
        let mock = Arc::new(MockBackend::with_sessions(["abc12345"]));
        let result = tool(&mock)
            .execute(json!({"session_id": "abc12345", "command": "RM  -RF  /"}))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn runs_command_with_timeout() {
        let mock = Arc::new(MockBackend::with_sessions(["abc12345"]));
        let result = tool(&mock)
            .execute(json!({"session_id": "abc12345", "command": "echo hi", "timeout_ms": 5000}))
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.error);
        let body: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(body["output"], "ran: echo hi");
        assert_eq!(body["exit_code"], 0);
        assert!(mock.calls().contains(&Call::Exec {
            session_id: "abc12345".into(),
            command: "echo hi".into(),
            timeout_ms: 5000
        }));
    }
}
