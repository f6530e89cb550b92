//! `session_list` tool: sessions created by this plugin.

use crate::sandbox::StatelessClient;
use crate::tools::respond;
use crate::tools::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;

const TOOL_NAME: &str = crate::tools::TOOL_SESSION_LIST;

pub struct SessionListTool {
    client: StatelessClient,
}

impl SessionListTool {
    pub fn new(client: StatelessClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SessionListTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "List the active sessions created through this plugin."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _args: serde_json::Value) -> anyhow::Result<ToolResult> {
        respond(json!({}), self.client.list_sessions().await)
    }
}
