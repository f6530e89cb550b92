//! `session_delete` tool: release a session and its resources.

use crate::sandbox::StatelessClient;
use crate::tools::traits::{Tool, ToolResult};
use crate::tools::{respond, session_id_arg};
use async_trait::async_trait;
use serde_json::json;

const TOOL_NAME: &str = crate::tools::TOOL_SESSION_DELETE;

pub struct SessionDeleteTool {
    client: StatelessClient,
}

impl SessionDeleteTool {
    pub fn new(client: StatelessClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SessionDeleteTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Permanently delete a session. Pass sync_context=true to upload the \
         session's persistent context before it is released."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Session to delete"
                },
                "sync_context": {
                    "type": "boolean",
                    "description": "Sync persistent context before deletion. Default: false."
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
        let sync_context = args["sync_context"].as_bool().unwrap_or(false);

        respond(
            json!({"sync_context": sync_context}),
            self.client.delete_session(&session_id, sync_context).await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::mock::{Call, MockBackend};
    use std::sync::Arc;

    #[tokio::test]
    async fn forwards_sync_flag() {
        let mock = Arc::new(MockBackend::with_sessions(["abc12345"]));
        let tool = SessionDeleteTool::new(StatelessClient::with_backend(mock.clone()));

        let result = tool
            .execute(json!({"session_id": "abc12345", "sync_context": true}))
            .await
            .unwrap();

        assert!(result.success);
        assert!(mock.calls().contains(&Call::Delete {
            session_id: "abc12345".into(),
            sync_context: true
        }));
    }
}
