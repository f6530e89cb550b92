//! Tool adapters over the stateless client and the browser bridge.
//!
//! Every tool follows the same shape: validate the flat JSON arguments, call
//! one client or bridge operation, and render the envelope as a
//! [`ToolResult`]. No tool keeps state between calls.

pub mod browser;
pub mod desktop;
pub mod sandbox;
pub mod traits;

pub use traits::{Attachment, Tool, ToolResult};

use crate::browser::BrowserBridge;
use crate::config::Config;
use crate::sandbox::{SimpleResult, StatelessClient};
use crate::security::{require_session_id, ValidationError};
use serde::Serialize;
use serde_json::{Map, Value};

/// Tool name constants for reference.
pub const TOOL_SESSION_CREATE: &str = "session_create";
pub const TOOL_SESSION_GET: &str = "session_get";
pub const TOOL_SESSION_DELETE: &str = "session_delete";
pub const TOOL_SESSION_LIST: &str = "session_list";
pub const TOOL_COMMAND_EXECUTE: &str = "command_execute";
pub const TOOL_CODE_EXECUTE: &str = "code_execute";
pub const TOOL_FILE_OPERATIONS: &str = "file_operations";
pub const TOOL_BROWSER_AUTOMATION: &str = "browser_automation";
pub const TOOL_DESKTOP_APPS: &str = "desktop_apps";
pub const TOOL_COMPUTER_OPERATIONS: &str = "computer_operations";
pub const TOOL_MOBILE_OPERATIONS: &str = "mobile_operations";

/// Build every tool, sharing one client and one bridge.
pub fn all_tools(client: &StatelessClient, bridge: &BrowserBridge, config: &Config) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(sandbox::SessionCreateTool::new(
            client.clone(),
            config.default_image_id.clone(),
        )),
        Box::new(sandbox::SessionGetTool::new(client.clone())),
        Box::new(sandbox::SessionDeleteTool::new(client.clone())),
        Box::new(sandbox::SessionListTool::new(client.clone())),
        Box::new(sandbox::CommandExecuteTool::new(
            client.clone(),
            config.command_timeout_ms,
        )),
        Box::new(sandbox::CodeExecuteTool::new(client.clone())),
        Box::new(sandbox::FileOperationsTool::new(client.clone())),
        Box::new(browser::BrowserAutomationTool::new(
            client.clone(),
            bridge.clone(),
        )),
        Box::new(desktop::DesktopAppsTool::new(client.clone())),
        Box::new(desktop::ComputerOperationsTool::new(client.clone())),
        Box::new(desktop::MobileOperationsTool::new(client.clone())),
    ]
}

pub fn find_tool<'a>(tools: &'a [Box<dyn Tool>], name: &str) -> Option<&'a dyn Tool> {
    tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
}

/// `session_id` argument, validated.
pub(crate) fn session_id_arg(args: &Value) -> Result<String, ValidationError> {
    require_session_id(args["session_id"].as_str()).map(str::to_string)
}

/// Render an envelope: on success, `context` merged with the payload fields
/// and `"success": true`; on failure, the envelope's error.
pub(crate) fn respond<T: Serialize>(context: Value, result: SimpleResult<T>) -> anyhow::Result<ToolResult> {
    match result.into_result() {
        Ok(data) => ToolResult::json(&merge(context, serde_json::to_value(data)?)),
        Err(e) => Ok(ToolResult::fail(e)),
    }
}

fn merge(context: Value, data: Value) -> Map<String, Value> {
    let mut body = match context {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    match data {
        Value::Object(fields) => body.extend(fields),
        other => {
            body.insert("data".into(), other);
        }
    }
    body.insert("success".into(), Value::Bool(true));
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::mock::MockBackend;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn registry_names_are_unique_and_complete() {
        let client = StatelessClient::with_backend(Arc::new(MockBackend::new()));
        let tools = all_tools(&client, &BrowserBridge::cdp(), &Config::default());

        let names: HashSet<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), tools.len());
        for name in [
            TOOL_SESSION_CREATE,
            TOOL_SESSION_GET,
            TOOL_SESSION_DELETE,
            TOOL_SESSION_LIST,
            TOOL_COMMAND_EXECUTE,
            TOOL_CODE_EXECUTE,
            TOOL_FILE_OPERATIONS,
            TOOL_BROWSER_AUTOMATION,
            TOOL_DESKTOP_APPS,
            TOOL_COMPUTER_OPERATIONS,
            TOOL_MOBILE_OPERATIONS,
        ] {
            assert!(find_tool(&tools, name).is_some(), "{name} missing");
        }
    }

    #[test]
    fn schemas_are_objects() {
        let client = StatelessClient::with_backend(Arc::new(MockBackend::new()));
        for tool in all_tools(&client, &BrowserBridge::cdp(), &Config::default()) {
            assert_eq!(tool.parameters_schema()["type"], "object", "{}", tool.name());
        }
    }

    #[test]
    fn respond_merges_payload() {
        let ok = respond(json!({"session_id": "abc123"}), SimpleResult::ok(json!({"count": 2})))
            .unwrap();
        let body: Value = serde_json::from_str(&ok.output).unwrap();
        assert_eq!(body, json!({"session_id": "abc123", "count": 2, "success": true}));

        let failed = respond(json!({}), SimpleResult::<Value>::fail("boom")).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }
}
