//! The automation steps a bridge call can perform.

use super::BrowserSession;
use crate::security::ValidationError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};

pub const BROWSER_ACTIONS: &[&str] = &[
    "navigate",
    "click",
    "type",
    "scroll",
    "screenshot",
    "get_content",
    "analyze_elements",
    "wait_element",
    "wait",
];

pub const PAGE_SCROLL_DIRECTIONS: &[&str] = &["down", "up", "top", "bottom"];

pub const DEFAULT_ELEMENT_TYPES: &[&str] = &["input", "button", "a", "form"];

const DEFAULT_WAIT_SECONDS: u64 = 3;
const DEFAULT_SCROLL_DISTANCE: i64 = 500;

/// How long click/type wait for their target to be attached.
const ATTACH_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserStep {
    Navigate { url: String, wait_seconds: u64 },
    Click { selector: String },
    Type { selector: String, text: String },
    Screenshot { full_page: bool },
    GetContent,
    AnalyzeElements { types: Vec<String> },
    WaitForElement { selector: String, timeout_ms: u64 },
    Scroll { direction: String, distance: i64 },
    /// Plain pause; needs no page.
    Wait { seconds: u64 },
}

impl BrowserStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::Click { .. } => "click",
            Self::Type { .. } => "type",
            Self::Screenshot { .. } => "screenshot",
            Self::GetContent => "get_content",
            Self::AnalyzeElements { .. } => "analyze_elements",
            Self::WaitForElement { .. } => "wait_element",
            Self::Scroll { .. } => "scroll",
            Self::Wait { .. } => "wait",
        }
    }

    /// Build a step from flat tool parameters.
    ///
    /// `wait_time` (seconds, default 3) doubles as the navigation settle time,
    /// the `wait_element` timeout and the `wait` duration. URLs without a
    /// scheme get `https://`.
    pub fn from_params(action: &str, params: &Value) -> Result<Self, ValidationError> {
        let wait_seconds = params["wait_time"]
            .as_u64()
            .or_else(|| params["wait_time"].as_f64().map(|f| f.max(0.0) as u64))
            .unwrap_or(DEFAULT_WAIT_SECONDS);

        match action {
            "navigate" => {
                let url = required(params, "url")?;
                let url = if url.starts_with("http://") || url.starts_with("https://") {
                    url
                } else {
                    format!("https://{url}")
                };
                Ok(Self::Navigate { url, wait_seconds })
            }
            "click" => Ok(Self::Click {
                selector: required(params, "selector")?,
            }),
            "type" => Ok(Self::Type {
                selector: required(params, "selector")?,
                text: required(params, "text")?,
            }),
            "wait_element" => Ok(Self::WaitForElement {
                selector: required(params, "selector")?,
                timeout_ms: wait_seconds.saturating_mul(1000),
            }),
            "scroll" => {
                let direction = params["direction"].as_str().unwrap_or("down");
                if !PAGE_SCROLL_DIRECTIONS.contains(&direction) {
                    return Err(ValidationError::Unsupported {
                        param: "direction",
                        value: direction.to_string(),
                        supported: PAGE_SCROLL_DIRECTIONS.join(", "),
                    });
                }
                Ok(Self::Scroll {
                    direction: direction.to_string(),
                    distance: params["distance"].as_i64().unwrap_or(DEFAULT_SCROLL_DISTANCE),
                })
            }
            "screenshot" => Ok(Self::Screenshot {
                full_page: params["full_page"].as_bool().unwrap_or(true),
            }),
            "get_content" => Ok(Self::GetContent),
            "analyze_elements" => Ok(Self::AnalyzeElements {
                types: element_types(&params["element_types"]),
            }),
            "wait" => Ok(Self::Wait {
                seconds: wait_seconds,
            }),
            other => Err(ValidationError::Unsupported {
                param: "action",
                value: other.to_string(),
                supported: BROWSER_ACTIONS.join(", "),
            }),
        }
    }
}

fn required(params: &Value, name: &'static str) -> Result<String, ValidationError> {
    params[name]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::Missing(name))
}

fn element_types(value: &Value) -> Vec<String> {
    let types: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    let types: Vec<String> = types
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if types.is_empty() {
        DEFAULT_ELEMENT_TYPES.iter().map(|t| t.to_string()).collect()
    } else {
        types
    }
}

/// Result of one step. Screenshot bytes travel beside the JSON, never in it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BrowserStepOutput {
    #[serde(flatten)]
    pub data: Map<String, Value>,
    #[serde(skip)]
    pub screenshot: Option<Vec<u8>>,
}

impl BrowserStepOutput {
    fn from_json(value: Value) -> Self {
        let data = match value {
            Value::Object(map) => map,
            other => Map::from_iter([("result".to_string(), other)]),
        };
        Self {
            data,
            screenshot: None,
        }
    }
}

/// Element description gathered in the page.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
struct ElementInfo {
    tag: String,
    id: Option<String>,
    class: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    value: Option<String>,
    placeholder: Option<String>,
    text: Option<String>,
    visible: bool,
}

/// Selectors for an element, most specific first.
fn possible_selectors(info: &ElementInfo, index: usize) -> Vec<String> {
    let mut selectors = Vec::new();
    if let Some(id) = info.id.as_deref().filter(|s| !s.is_empty()) {
        selectors.push(format!("#{id}"));
    }
    if let Some(name) = info.name.as_deref().filter(|s| !s.is_empty()) {
        selectors.push(format!("[name='{name}']"));
    }
    if let Some(class) = info.class.as_deref().filter(|s| !s.trim().is_empty()) {
        let classes: Vec<&str> = class.split_whitespace().collect();
        selectors.push(format!(".{}", classes.join(".")));
    }
    selectors.push(format!("{}:nth-child({})", info.tag, index + 1));
    selectors
}

fn js_string(s: &str) -> anyhow::Result<String> {
    Ok(serde_json::to_string(s)?)
}

/// Poll until `selector` is attached to the DOM.
async fn wait_for(page: &dyn BrowserSession, selector: &str, timeout: Duration) -> anyhow::Result<()> {
    let check = format!("document.querySelector({}) !== null", js_string(selector)?);
    // No deadline when the timeout runs past what `Instant` can represent.
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if page.evaluate(&check).await?.as_bool().unwrap_or(false) {
            return Ok(());
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            anyhow::bail!("element {selector} not found after {}ms", timeout.as_millis());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Click without visibility or actionability checks.
async fn force_click(page: &dyn BrowserSession, selector: &str) -> anyhow::Result<()> {
    let script = format!(
        "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
        js_string(selector)?
    );
    anyhow::ensure!(
        page.evaluate(&script).await?.as_bool().unwrap_or(false),
        "element {selector} detached before click"
    );
    Ok(())
}

/// Replace an element's value and fire the input/change events.
async fn force_fill(page: &dyn BrowserSession, selector: &str, text: &str) -> anyhow::Result<()> {
    let script = format!(
        "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
         el.focus(); if ('value' in el) {{ el.value = {text}; }} else {{ el.textContent = {text}; }} \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
        sel = js_string(selector)?,
        text = js_string(text)?
    );
    anyhow::ensure!(
        page.evaluate(&script).await?.as_bool().unwrap_or(false),
        "element {selector} detached before typing"
    );
    Ok(())
}

async fn collect_elements(page: &dyn BrowserSession, tag: &str) -> anyhow::Result<Vec<Value>> {
    let script = format!(
        "Array.from(document.querySelectorAll({})).map(el => ({{ \
         tag: el.tagName.toLowerCase(), id: el.getAttribute('id'), class: el.getAttribute('class'), \
         name: el.getAttribute('name'), type: el.getAttribute('type'), value: el.getAttribute('value'), \
         placeholder: el.getAttribute('placeholder'), text: el.textContent, \
         visible: !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length) }}))",
        js_string(tag)?
    );
    let raw = page.evaluate(&script).await?;
    let mut out = Vec::new();
    for (index, item) in raw.as_array().into_iter().flatten().enumerate() {
        // Elements that fail to describe themselves are skipped.
        let Ok(info) = serde_json::from_value::<ElementInfo>(item.clone()) else {
            continue;
        };
        let selectors = possible_selectors(&info, index);
        let mut entry = serde_json::to_value(&info)?;
        entry["index"] = json!(index);
        entry["possible_selectors"] = json!(selectors);
        out.push(entry);
    }
    Ok(out)
}

/// Perform `step` on an attached page.
pub async fn execute(page: &dyn BrowserSession, step: &BrowserStep) -> anyhow::Result<BrowserStepOutput> {
    match step {
        BrowserStep::Navigate { url, wait_seconds } => {
            page.goto(url).await.context("Navigation failed")?;
            tokio::time::sleep(Duration::from_secs(*wait_seconds)).await;
            let title = page.title().await.context("Navigation failed")?;
            let current = page.url().await.context("Navigation failed")?;
            Ok(BrowserStepOutput::from_json(json!({
                "url": current,
                "title": title,
                "navigation_time": wait_seconds,
            })))
        }
        BrowserStep::Click { selector } => {
            async {
                wait_for(page, selector, ATTACH_TIMEOUT).await?;
                force_click(page, selector).await
            }
            .await
            .context("Failed to click element")?;
            Ok(BrowserStepOutput::from_json(json!({"action": "click", "selector": selector})))
        }
        BrowserStep::Type { selector, text } => {
            async {
                wait_for(page, selector, ATTACH_TIMEOUT).await?;
                force_fill(page, selector, text).await
            }
            .await
            .context("Failed to type text")?;
            Ok(BrowserStepOutput::from_json(json!({
                "action": "type",
                "selector": selector,
                "text": text,
            })))
        }
        BrowserStep::Screenshot { full_page } => {
            let bytes = page.screenshot(*full_page).await.context("Screenshot failed")?;
            let mut out = BrowserStepOutput::from_json(json!({
                "format": "png",
                "full_page": full_page,
                "size": bytes.len(),
            }));
            out.screenshot = Some(bytes);
            Ok(out)
        }
        BrowserStep::GetContent => {
            let title = page.title().await.context("Failed to get page content")?;
            let url = page.url().await.context("Failed to get page content")?;
            let content = page.content().await.context("Failed to get page content")?;
            Ok(BrowserStepOutput::from_json(json!({
                "title": title,
                "url": url,
                "content_length": content.chars().count(),
                "content": content,
            })))
        }
        BrowserStep::AnalyzeElements { types } => {
            let mut elements = Map::new();
            let mut total = 0;
            for tag in types {
                let found = collect_elements(page, tag)
                    .await
                    .context("Failed to analyze page elements")?;
                total += found.len();
                elements.insert(tag.clone(), Value::Array(found));
            }
            Ok(BrowserStepOutput::from_json(json!({
                "elements": elements,
                "total_elements": total,
            })))
        }
        BrowserStep::WaitForElement { selector, timeout_ms } => {
            wait_for(page, selector, Duration::from_millis(*timeout_ms))
                .await
                .context("Failed to wait for element")?;
            Ok(BrowserStepOutput::from_json(json!({
                "action": "wait_for_element",
                "selector": selector,
                "timeout": timeout_ms,
            })))
        }
        BrowserStep::Scroll { direction, distance } => {
            let script = match direction.as_str() {
                "down" => format!("window.scrollBy(0, {distance})"),
                "up" => format!("window.scrollBy(0, {})", distance.saturating_neg()),
                "top" => "window.scrollTo(0, 0)".to_string(),
                "bottom" => "window.scrollTo(0, document.body.scrollHeight)".to_string(),
                other => anyhow::bail!("Failed to scroll page: unknown direction {other}"),
            };
            page.evaluate(&script).await.context("Failed to scroll page")?;
            Ok(BrowserStepOutput::from_json(json!({
                "action": "scroll",
                "direction": direction,
                "distance": distance,
            })))
        }
        BrowserStep::Wait { seconds } => Ok(wait(*seconds).await),
    }
}

/// The `wait` step; usable without a browser.
pub async fn wait(seconds: u64) -> BrowserStepOutput {
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    BrowserStepOutput::from_json(json!({
        "action": "wait",
        "wait_time": seconds,
        "message": format!("Waited for {seconds} seconds"),
    }))
}
