//! `session_create` tool: create a new remote session from an image.

use crate::sandbox::StatelessClient;
use crate::security::{require_image_id, ALLOWED_IMAGE_IDS};
use crate::tools::respond;
use crate::tools::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;

const TOOL_NAME: &str = crate::tools::TOOL_SESSION_CREATE;

pub struct SessionCreateTool {
    client: StatelessClient,
    default_image_id: String,
}

impl SessionCreateTool {
    pub fn new(client: StatelessClient, default_image_id: impl Into<String>) -> Self {
        Self {
            client,
            default_image_id: default_image_id.into(),
        }
    }
}

#[async_trait]
impl Tool for SessionCreateTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Create a new cloud session. The image decides the environment: \
         linux_latest, browser_latest, code_latest, windows_latest or mobile_latest. \
         Returns the session_id every other tool needs."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "image_id": {
                    "type": "string",
                    "enum": ALLOWED_IMAGE_IDS,
                    "description": "Environment image. Default: the configured default image."
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let image_id = args["image_id"]
            .as_str()
            .filter(|s| !s.is_empty())
            .unwrap_or(self.default_image_id.as_str());

        let image_id = match require_image_id(image_id) {
            Ok(id) => id,
            Err(e) => return Ok(ToolResult::fail(e.to_string())),
        };

        respond(json!({}), self.client.create_session(image_id).await)
    }
}
