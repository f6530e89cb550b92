//! Desktop and mobile UI actions forwarded to a session.

use crate::security::ValidationError;
use serde_json::{json, Value};

pub const COMPUTER_ACTIONS: &[&str] = &[
    "click_mouse",
    "move_mouse",
    "drag_mouse",
    "scroll",
    "input_text",
    "press_keys",
    "screenshot",
    "get_screen_size",
    "get_cursor_position",
];

pub const MOBILE_ACTIONS: &[&str] = &[
    "tap",
    "swipe",
    "input_text",
    "send_key",
    "screenshot",
    "get_clickable_elements",
    "get_all_elements",
];

pub const MOUSE_BUTTONS: &[&str] = &["left", "right", "middle", "double_left"];
pub const SCROLL_DIRECTIONS: &[&str] = &["up", "down", "left", "right"];

/// Named Android key codes accepted by `send_key`.
pub const KEY_CODES: &[(&str, i64)] = &[
    ("home", 3),
    ("back", 4),
    ("volume_up", 24),
    ("volume_down", 25),
    ("power", 26),
    ("menu", 82),
];

/// A single UI interaction on a desktop or mobile session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    ClickMouse { x: i64, y: i64, button: String },
    MoveMouse { x: i64, y: i64 },
    DragMouse { from_x: i64, from_y: i64, to_x: i64, to_y: i64, button: String },
    ScrollAt { x: i64, y: i64, direction: String, amount: i64 },
    PressKeys { keys: Vec<String>, hold: bool },
    DesktopScreenshot,
    ScreenSize,
    CursorPosition,
    Tap { x: i64, y: i64 },
    Swipe { start_x: i64, start_y: i64, end_x: i64, end_y: i64, duration_ms: i64 },
    SendKey { key_code: i64 },
    MobileScreenshot,
    ClickableElements { timeout_ms: i64 },
    AllElements { timeout_ms: i64 },
    /// Typing is identical on both platforms.
    InputText { text: String },
}

impl UiAction {
    /// Remote tool that implements this action.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::ClickMouse { .. } => "click_mouse",
            Self::MoveMouse { .. } => "move_mouse",
            Self::DragMouse { .. } => "drag_mouse",
            Self::ScrollAt { .. } => "scroll",
            Self::PressKeys { .. } => "press_keys",
            Self::DesktopScreenshot | Self::MobileScreenshot => "system_screenshot",
            Self::ScreenSize => "get_screen_size",
            Self::CursorPosition => "get_cursor_position",
            Self::Tap { .. } => "tap",
            Self::Swipe { .. } => "swipe",
            Self::SendKey { .. } => "send_key",
            Self::ClickableElements { .. } => "get_clickable_ui_elements",
            Self::AllElements { .. } => "get_all_ui_elements",
            Self::InputText { .. } => "input_text",
        }
    }

    /// Arguments passed to [`Self::tool_name`].
    pub fn args(&self) -> Value {
        match self {
            Self::ClickMouse { x, y, button } => json!({"x": x, "y": y, "button": button}),
            Self::MoveMouse { x, y } => json!({"x": x, "y": y}),
            Self::DragMouse { from_x, from_y, to_x, to_y, button } => json!({
                "from_x": from_x, "from_y": from_y, "to_x": to_x, "to_y": to_y, "button": button
            }),
            Self::ScrollAt { x, y, direction, amount } => {
                json!({"x": x, "y": y, "direction": direction, "amount": amount})
            }
            Self::PressKeys { keys, hold } => json!({"keys": keys, "hold": hold}),
            Self::Tap { x, y } => json!({"x": x, "y": y}),
            Self::Swipe { start_x, start_y, end_x, end_y, duration_ms } => json!({
                "start_x": start_x, "start_y": start_y, "end_x": end_x, "end_y": end_y,
                "duration_ms": duration_ms
            }),
            Self::SendKey { key_code } => json!({"key": key_code}),
            Self::ClickableElements { timeout_ms } | Self::AllElements { timeout_ms } => {
                json!({"timeout_ms": timeout_ms})
            }
            Self::InputText { text } => json!({"text": text}),
            Self::DesktopScreenshot
            | Self::MobileScreenshot
            | Self::ScreenSize
            | Self::CursorPosition => json!({}),
        }
    }

    /// Build a desktop action from flat tool parameters.
    pub fn from_computer_params(action: &str, params: &Value) -> Result<Self, ValidationError> {
        match action {
            "click_mouse" => Ok(Self::ClickMouse {
                x: int_param(params, "x")?,
                y: int_param(params, "y")?,
                button: choice(params, "button", "left", MOUSE_BUTTONS)?,
            }),
            "move_mouse" => Ok(Self::MoveMouse {
                x: int_param(params, "x")?,
                y: int_param(params, "y")?,
            }),
            "drag_mouse" => Ok(Self::DragMouse {
                from_x: int_param(params, "from_x")?,
                from_y: int_param(params, "from_y")?,
                to_x: int_param(params, "to_x")?,
                to_y: int_param(params, "to_y")?,
                button: choice(params, "button", "left", MOUSE_BUTTONS)?,
            }),
            "scroll" => Ok(Self::ScrollAt {
                x: int_param(params, "x")?,
                y: int_param(params, "y")?,
                direction: choice(params, "direction", "up", SCROLL_DIRECTIONS)?,
                amount: params["amount"].as_i64().unwrap_or(1),
            }),
            "input_text" => Ok(Self::InputText {
                text: text_param(params, "text")?,
            }),
            "press_keys" => Ok(Self::PressKeys {
                keys: keys_param(params)?,
                hold: params["hold"].as_bool().unwrap_or(false),
            }),
            "screenshot" => Ok(Self::DesktopScreenshot),
            "get_screen_size" => Ok(Self::ScreenSize),
            "get_cursor_position" => Ok(Self::CursorPosition),
            other => Err(unsupported("action", other, COMPUTER_ACTIONS)),
        }
    }

    /// Build a mobile action from flat tool parameters.
    pub fn from_mobile_params(action: &str, params: &Value) -> Result<Self, ValidationError> {
        match action {
            "tap" => Ok(Self::Tap {
                x: int_param(params, "x")?,
                y: int_param(params, "y")?,
            }),
            "swipe" => Ok(Self::Swipe {
                start_x: int_param(params, "start_x")?,
                start_y: int_param(params, "start_y")?,
                end_x: int_param(params, "end_x")?,
                end_y: int_param(params, "end_y")?,
                duration_ms: params["duration_ms"].as_i64().unwrap_or(300),
            }),
            "input_text" => Ok(Self::InputText {
                text: text_param(params, "text")?,
            }),
            "send_key" => Ok(Self::SendKey {
                key_code: key_code_param(params)?,
            }),
            "screenshot" => Ok(Self::MobileScreenshot),
            "get_clickable_elements" => Ok(Self::ClickableElements {
                timeout_ms: params["timeout_ms"].as_i64().unwrap_or(2000),
            }),
            "get_all_elements" => Ok(Self::AllElements {
                timeout_ms: params["timeout_ms"].as_i64().unwrap_or(2000),
            }),
            other => Err(unsupported("action", other, MOBILE_ACTIONS)),
        }
    }
}

fn unsupported(param: &'static str, value: &str, supported: &[&str]) -> ValidationError {
    ValidationError::Unsupported {
        param,
        value: value.to_string(),
        supported: supported.join(", "),
    }
}

fn int_param(params: &Value, name: &'static str) -> Result<i64, ValidationError> {
    let value = &params[name];
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or(ValidationError::Missing(name))
}

fn text_param(params: &Value, name: &'static str) -> Result<String, ValidationError> {
    params[name]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::Missing(name))
}

fn choice(
    params: &Value,
    name: &'static str,
    default: &str,
    allowed: &[&str],
) -> Result<String, ValidationError> {
    let value = params[name].as_str().unwrap_or(default);
    if allowed.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(unsupported(name, value, allowed))
    }
}

/// Accepts a JSON string array or a comma-separated string.
fn keys_param(params: &Value) -> Result<Vec<String>, ValidationError> {
    let keys: Vec<String> = match &params["keys"] {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|k| k.trim().to_string())
            .collect(),
        Value::String(s) => s.split(',').map(|k| k.trim().to_string()).collect(),
        _ => Vec::new(),
    };
    let keys: Vec<String> = keys.into_iter().filter(|k| !k.is_empty()).collect();
    if keys.is_empty() {
        Err(ValidationError::Missing("keys"))
    } else {
        Ok(keys)
    }
}

/// Accepts a named key (`home`, `back`, …) or a numeric key code.
fn key_code_param(params: &Value) -> Result<i64, ValidationError> {
    let key = &params["key"];
    if let Some(code) = key.as_i64() {
        return Ok(code);
    }
    let name = key
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::Missing("key"))?;
    if let Ok(code) = name.trim().parse::<i64>() {
        return Ok(code);
    }
    let lower = name.to_lowercase();
    KEY_CODES
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|(_, code)| *code)
        .ok_or_else(|| {
            let names: Vec<&str> = KEY_CODES.iter().map(|(n, _)| *n).collect();
            unsupported("key", name, &names)
        })
}
