//! `browser_automation` tool: drive the session's browser one step at a time.

use crate::browser::steps::{self, BROWSER_ACTIONS};
use crate::browser::{BrowserBridge, BrowserStep, BrowserStepOutput};
use crate::sandbox::{SimpleResult, StatelessClient};
use crate::tools::traits::{Attachment, Tool, ToolResult};
use crate::tools::{respond, session_id_arg};
use async_trait::async_trait;
use serde_json::json;

const TOOL_NAME: &str = crate::tools::TOOL_BROWSER_AUTOMATION;

pub struct BrowserAutomationTool {
    client: StatelessClient,
    bridge: BrowserBridge,
}

impl BrowserAutomationTool {
    pub fn new(client: StatelessClient, bridge: BrowserBridge) -> Self {
        Self { client, bridge }
    }

    async fn run(&self, session_id: &str, step: BrowserStep) -> SimpleResult<BrowserStepOutput> {
        if let BrowserStep::Wait { seconds } = step {
            return SimpleResult::ok(steps::wait(seconds).await);
        }

        let endpoint = match self.client.browser_initialize(session_id).await.into_result() {
            Ok(browser) => browser.endpoint_url,
            Err(e) => return SimpleResult::fail(e),
        };
        self.bridge.run(&endpoint, step).await
    }
}

#[async_trait]
impl Tool for BrowserAutomationTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Automate the browser of a browser_latest session: navigate, click, type, \
         scroll, screenshot, get_content, analyze_elements, wait_element or wait. \
         Each call performs one step; screenshots are returned as PNG attachments."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {"type": "string", "description": "Target session"},
                "action": {
                    "type": "string",
                    "enum": BROWSER_ACTIONS,
                    "description": "Step to perform. Default: navigate."
                },
                "url": {"type": "string", "description": "URL for navigate (https:// is added when missing)"},
                "selector": {"type": "string", "description": "CSS selector for click, type and wait_element"},
                "text": {"type": "string", "description": "Text for type"},
                "direction": {
                    "type": "string",
                    "enum": steps::PAGE_SCROLL_DIRECTIONS,
                    "description": "Scroll direction. Default: down."
                },
                "distance": {"type": "integer", "description": "Scroll distance in pixels. Default: 500."},
                "full_page": {"type": "boolean", "description": "Capture the full page. Default: true."},
                "element_types": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Tags for analyze_elements. Default: input, button, a, form."
                },
                "wait_time": {
                    "type": "integer",
                    "description": "Seconds to settle after navigate, to wait for an element, or to pause. Default: 3."
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
        let action = args["action"].as_str().unwrap_or("navigate");
        let step = match BrowserStep::from_params(action, &args) {
            Ok(step) => step,
            Err(e) => return Ok(ToolResult::fail(e.to_string())),
        };

        tracing::info!(session_id = %session_id, action = step.name(), "browser automation");
        let mut result = self.run(&session_id, step).await;

        let screenshot = result.data_mut().and_then(|out| out.screenshot.take());
        let rendered = respond(json!({"session_id": session_id, "action": action}), result)?;

        Ok(match screenshot {
            Some(bytes) => rendered.with_attachment(Attachment {
                filename: "screenshot.png".into(),
                mime_type: "image/png".into(),
                bytes,
            }),
            None => rendered,
        })
    }
}
