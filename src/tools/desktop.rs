//! Desktop and mobile UI tools: application discovery, mouse/keyboard
//! control and touch control.

use crate::sandbox::ui::{COMPUTER_ACTIONS, MOBILE_ACTIONS, MOUSE_BUTTONS, SCROLL_DIRECTIONS};
use crate::sandbox::{AppFilter, StatelessClient, UiAction};
use crate::security::ValidationError;
use crate::tools::traits::{Tool, ToolResult};
use crate::tools::{respond, session_id_arg};
use async_trait::async_trait;
use serde_json::json;

// ── desktop_apps ────────────────────────────────────────────────────────────

pub const APP_ACTIONS: &[&str] = &["installed_apps", "windows"];

pub struct DesktopAppsTool {
    client: StatelessClient,
}

impl DesktopAppsTool {
    pub fn new(client: StatelessClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for DesktopAppsTool {
    fn name(&self) -> &str {
        crate::tools::TOOL_DESKTOP_APPS
    }

    fn description(&self) -> &str {
        "List installed applications or open windows on a windows_latest or \
         linux_latest desktop session."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {"type": "string", "description": "Target session"},
                "action": {
                    "type": "string",
                    "enum": APP_ACTIONS,
                    "description": "What to list. Default: installed_apps."
                },
                "start_menu": {"type": "boolean", "description": "Include start menu entries. Default: true."},
                "desktop": {"type": "boolean", "description": "Include desktop shortcuts. Default: false."},
                "ignore_system_apps": {"type": "boolean", "description": "Hide system applications. Default: true."}
            },
            "required": ["session_id"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let session_id = match session_id_arg(&args) {
            Ok(id) => id,
            Err(e) => return Ok(ToolResult::fail(e.to_string())),
        };
        let context = json!({"session_id": session_id});

        match args["action"].as_str().unwrap_or("installed_apps") {
            "installed_apps" => {
                let defaults = AppFilter::default();
                let filter = AppFilter {
                    start_menu: args["start_menu"].as_bool().unwrap_or(defaults.start_menu),
                    desktop: args["desktop"].as_bool().unwrap_or(defaults.desktop),
                    ignore_system_apps: args["ignore_system_apps"]
                        .as_bool()
                        .unwrap_or(defaults.ignore_system_apps),
                };
                respond(context, self.client.get_installed_apps(&session_id, filter).await)
            }
            "windows" => respond(context, self.client.list_windows(&session_id).await),
            other => Ok(ToolResult::fail(
                ValidationError::Unsupported {
                    param: "action",
                    value: other.to_string(),
                    supported: APP_ACTIONS.join(", "),
                }
                .to_string(),
            )),
        }
    }
}

// ── computer_operations / mobile_operations ─────────────────────────────────

/// Which UI surface a [`UiTool`] drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    Computer,
    Mobile,
}

struct UiTool {
    client: StatelessClient,
    surface: Surface,
}

impl UiTool {
    fn parse(&self, args: &serde_json::Value) -> Result<(String, UiAction), ValidationError> {
        let session_id = session_id_arg(args)?;
        let action = match self.surface {
            Surface::Computer => UiAction::from_computer_params(
                args["action"].as_str().unwrap_or("click_mouse"),
                args,
            )?,
            Surface::Mobile => {
                UiAction::from_mobile_params(args["action"].as_str().unwrap_or("tap"), args)?
            }
        };
        Ok((session_id, action))
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let (session_id, action) = match self.parse(&args) {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ToolResult::fail(e.to_string())),
        };
        respond(
            json!({"session_id": session_id}),
            self.client.ui_action(&session_id, &action).await,
        )
    }
}

pub struct ComputerOperationsTool(UiTool);

impl ComputerOperationsTool {
    pub fn new(client: StatelessClient) -> Self {
        Self(UiTool {
            client,
            surface: Surface::Computer,
        })
    }
}

#[async_trait]
impl Tool for ComputerOperationsTool {
    fn name(&self) -> &str {
        crate::tools::TOOL_COMPUTER_OPERATIONS
    }

    fn description(&self) -> &str {
        "Control a desktop session: click, move or drag the mouse, scroll, type text, \
         press key combinations, take a screenshot, or read the screen size and cursor position."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {"type": "string", "description": "Target session"},
                "action": {
                    "type": "string",
                    "enum": COMPUTER_ACTIONS,
                    "description": "Operation. Default: click_mouse."
                },
                "x": {"type": "integer"},
                "y": {"type": "integer"},
                "from_x": {"type": "integer"},
                "from_y": {"type": "integer"},
                "to_x": {"type": "integer"},
                "to_y": {"type": "integer"},
                "button": {"type": "string", "enum": MOUSE_BUTTONS, "description": "Default: left."},
                "direction": {"type": "string", "enum": SCROLL_DIRECTIONS, "description": "Default: up."},
                "amount": {"type": "integer", "description": "Scroll amount. Default: 1."},
                "text": {"type": "string", "description": "Text for input_text"},
                "keys": {"type": "string", "description": "Comma-separated keys for press_keys (e.g. Ctrl,a)"},
                "hold": {"type": "boolean", "description": "Keep keys pressed. Default: false."}
            },
            "required": ["session_id"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        self.0.execute(args).await
    }
}

pub struct MobileOperationsTool(UiTool);

impl MobileOperationsTool {
    pub fn new(client: StatelessClient) -> Self {
        Self(UiTool {
            client,
            surface: Surface::Mobile,
        })
    }
}

#[async_trait]
impl Tool for MobileOperationsTool {
    fn name(&self) -> &str {
        crate::tools::TOOL_MOBILE_OPERATIONS
    }

    fn description(&self) -> &str {
        "Control a mobile_latest session: tap, swipe, type text, send a key \
         (home, back, volume_up, volume_down, power, menu or a key code), \
         take a screenshot, or list clickable/all UI elements."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {"type": "string", "description": "Target session"},
                "action": {
                    "type": "string",
                    "enum": MOBILE_ACTIONS,
                    "description": "Operation. Default: tap."
                },
                "x": {"type": "integer"},
                "y": {"type": "integer"},
                "start_x": {"type": "integer"},
                "start_y": {"type": "integer"},
                "end_x": {"type": "integer"},
                "end_y": {"type": "integer"},
                "duration_ms": {"type": "integer", "description": "Swipe duration. Default: 300."},
                "text": {"type": "string", "description": "Text for input_text"},
                "key": {"type": "string", "description": "Key name or numeric key code for send_key"},
                "timeout_ms": {"type": "integer", "description": "Element query timeout. Default: 2000."}
            },
            "required": ["session_id"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        self.0.execute(args).await
    }
}
