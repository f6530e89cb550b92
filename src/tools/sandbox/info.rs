//! `session_get` tool: look up an existing session.

use crate::sandbox::StatelessClient;
use crate::tools::traits::{Tool, ToolResult};
use crate::tools::{respond, session_id_arg};
use async_trait::async_trait;
use serde_json::json;

const TOOL_NAME: &str = crate::tools::TOOL_SESSION_GET;

pub struct SessionGetTool {
    client: StatelessClient,
}

impl SessionGetTool {
    pub fn new(client: StatelessClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SessionGetTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Connect to an existing session and return its current information. \
         Fails when the session no longer exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Session ID returned by session_create"
                }
            },
            "required": ["session_id"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let session_id = match session_id_arg(&args) {
            Ok(id) => id,
            Err(e) => return Ok(ToolResult::fail(e.to_string())),
        };

        respond(
            json!({"session_id": session_id}),
            self.client
                .get_session_info(&session_id)
                .await
                .map(|info| json!({"session": info})),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::mock::MockBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn returns_session_data() {
        let mock = Arc::new(MockBackend::with_sessions(["abc12345"]));
        let tool = SessionGetTool::new(StatelessClient::with_backend(mock));

        let result = tool.execute(json!({"session_id": "abc12345"})).await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(body["session"]["status"], "RUNNING");
    }

    #[tokio::test]
    async fn missing_session_fails() {
        let tool = SessionGetTool::new(StatelessClient::with_backend(Arc::new(MockBackend::new())));
        let result = tool.execute(json!({"session_id": "abc12345"})).await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("does not exist"));
    }

    #[tokio::test]
    async fn malformed_id_is_rejected() {
        let tool = SessionGetTool::new(StatelessClient::with_backend(Arc::new(MockBackend::new())));
        let result = tool.execute(json!({"session_id": "a b"})).await.unwrap();
        assert!(result.error.unwrap().contains("Invalid session ID"));
    }
}
