//! AgentBay session provider: HTTP client for the action-style REST API.
//!
//! Every request is `POST {endpoint}/?Action=<Name>` with a JSON body and a
//! bearer token. Responses share one envelope:
//!
//! ```json
//! {"Success": true, "Code": "ok", "Message": "", "RequestId": "…", "Data": …}
//! ```
//!
//! Session-scoped capabilities (shell, files, code, UI) are reached through
//! the `CallMcpTool` action, whose `Data` carries `{IsError, Content: [{text}]}`.

use super::{
    AppFilter, BackendError, CodeOutput, CommandOutput, DirectoryEntry, Labels, RemoteSession,
    SessionBackend, SessionPage, UiAction,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Default API endpoint.
pub const AGENTBAY_API_BASE: &str = "https://wuyingai.cn-shanghai.aliyuncs.com";

/// API version sent with every action.
pub const AGENTBAY_API_VERSION: &str = "2025-05-06";

/// Common response envelope.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ApiResponse {
    success: Option<bool>,
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
    data: Option<Value>,
    total_count: Option<u64>,
}

/// Shared HTTP client for AgentBay API calls.
pub struct AgentBayApi {
    api_key: String,
    endpoint: String,
    http: reqwest::Client,
}

impl AgentBayApi {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            api_key: api_key.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Issue one action and unwrap the envelope. A response whose `Success`
    /// is `false` becomes [`BackendError::Api`].
    async fn call(&self, action: &str, body: Value) -> Result<ApiResponse, BackendError> {
        let url = format!("{}/", self.endpoint);
        tracing::debug!(action, "AgentBay request");

        let resp = self
            .http
            .post(&url)
            .query(&[("Action", action), ("Version", AGENTBAY_API_VERSION)])
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Network(format!("{action} request failed: {e}")))?;

        let status = resp.status();
        let body_text = resp
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable>".to_string());

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(BackendError::Api {
                code: Some(status.as_u16().to_string()),
                message: format!("Unauthorized (HTTP {status}): {body_text}"),
                request_id: None,
            });
        }

        let parsed: ApiResponse = match serde_json::from_str(&body_text) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                return Err(BackendError::Decode(format!(
                    "{action}: {e}. Body: {body_text}"
                )))
            }
            Err(_) => {
                return Err(BackendError::Api {
                    code: Some(status.as_u16().to_string()),
                    message: format!("AgentBay API returned {status}: {body_text}"),
                    request_id: None,
                })
            }
        };

        if !status.is_success() || parsed.success == Some(false) {
            let message = parsed
                .message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("AgentBay API returned {status} for {action}"));
            return Err(BackendError::Api {
                code: parsed.code,
                message,
                request_id: parsed.request_id,
            });
        }

        Ok(parsed)
    }

    /// Run a session-scoped tool and return its text content.
    async fn call_tool(
        &self,
        session_id: &str,
        name: &str,
        args: Value,
    ) -> Result<String, BackendError> {
        let resp = self
            .call(
                "CallMcpTool",
                json!({
                    "SessionId": session_id,
                    "Name": name,
                    "Args": args.to_string(),
                }),
            )
            .await?;

        let data = resp.data.unwrap_or(Value::Null);
        let text = tool_text(&data);
        if data["IsError"].as_bool().unwrap_or(false) {
            let message = if text.is_empty() {
                format!("tool {name} reported an error")
            } else {
                text
            };
            return Err(BackendError::Api {
                code: None,
                message,
                request_id: resp.request_id,
            });
        }
        Ok(text)
    }
}

/// Concatenate the `text` items of a tool result.
fn tool_text(data: &Value) -> String {
    match &data["Content"] {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item["text"].as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

/// Parse a `list_directory` listing: one `[DIR] name` / `[FILE] name` per line.
fn parse_directory_listing(text: &str) -> Vec<DirectoryEntry> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if let Some(name) = line.strip_prefix("[DIR]") {
                Some(DirectoryEntry {
                    name: name.trim().to_string(),
                    is_directory: true,
                })
            } else if let Some(name) = line.strip_prefix("[FILE]") {
                Some(DirectoryEntry {
                    name: name.trim().to_string(),
                    is_directory: false,
                })
            } else {
                None
            }
        })
        .filter(|entry| !entry.name.is_empty())
        .collect()
}

/// Tool output that should be a JSON array; anything else is wrapped.
fn parse_items(text: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Null) => Vec::new(),
        Ok(other) => vec![other],
        Err(_) if text.trim().is_empty() => Vec::new(),
        Err(_) => vec![Value::String(text.to_string())],
    }
}

fn parse_session_ids(data: &Value) -> Vec<String> {
    data.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item["SessionId"]
                        .as_str()
                        .or_else(|| item.as_str())
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl SessionBackend for AgentBayApi {
    async fn create_session(
        &self,
        image_id: &str,
        labels: &Labels,
    ) -> Result<RemoteSession, BackendError> {
        let labels_json = serde_json::to_string(labels)
            .map_err(|e| BackendError::Decode(format!("labels: {e}")))?;
        let resp = self
            .call(
                "CreateMcpSession",
                json!({"ImageId": image_id, "Labels": labels_json}),
            )
            .await?;

        let data = resp.data.unwrap_or(Value::Null);
        let session_id = data["SessionId"].as_str().unwrap_or("").to_string();
        if session_id.is_empty() {
            return Err(BackendError::Decode(format!(
                "CreateMcpSession returned no SessionId: {data}"
            )));
        }

        Ok(RemoteSession {
            session_id,
            request_id: resp.request_id,
            resource_url: data["ResourceUrl"].as_str().map(str::to_string),
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Value>, BackendError> {
        let resp = self.call("GetSession", json!({"SessionId": session_id})).await?;
        Ok(resp.data.filter(|d| !d.is_null()))
    }

    async fn delete_session(&self, session_id: &str, sync_context: bool) -> Result<(), BackendError> {
        if sync_context {
            self.call("SyncContext", json!({"SessionId": session_id, "Mode": "upload"}))
                .await?;
        }
        self.call("ReleaseMcpSession", json!({"SessionId": session_id}))
            .await?;
        Ok(())
    }

    async fn list_sessions(
        &self,
        labels: &Labels,
        page: u32,
        limit: u32,
    ) -> Result<SessionPage, BackendError> {
        let labels_json = serde_json::to_string(labels)
            .map_err(|e| BackendError::Decode(format!("labels: {e}")))?;
        let resp = self
            .call(
                "ListSession",
                json!({"Labels": labels_json, "PageNumber": page, "MaxResults": limit}),
            )
            .await?;

        Ok(SessionPage {
            session_ids: resp.data.as_ref().map(parse_session_ids).unwrap_or_default(),
            total: resp.total_count,
        })
    }

    async fn execute_command(
        &self,
        session_id: &str,
        command: &str,
        timeout_ms: u64,
    ) -> Result<CommandOutput, BackendError> {
        let output = self
            .call_tool(
                session_id,
                "shell",
                json!({"command": command, "timeout_ms": timeout_ms}),
            )
            .await?;
        Ok(CommandOutput {
            output,
            error: None,
            exit_code: Some(0),
        })
    }

    async fn run_code(
        &self,
        session_id: &str,
        code: &str,
        language: &str,
    ) -> Result<CodeOutput, BackendError> {
        let result = self
            .call_tool(
                session_id,
                "run_code",
                json!({"code": code, "language": language, "timeout_s": 60}),
            )
            .await?;
        Ok(CodeOutput {
            result,
            output: None,
            error: None,
        })
    }

    async fn read_file(&self, session_id: &str, path: &str) -> Result<String, BackendError> {
        self.call_tool(session_id, "read_file", json!({"path": path}))
            .await
    }

    async fn write_file(
        &self,
        session_id: &str,
        path: &str,
        content: &str,
    ) -> Result<(), BackendError> {
        self.call_tool(
            session_id,
            "write_file",
            json!({"path": path, "content": content, "mode": "overwrite"}),
        )
        .await?;
        Ok(())
    }

    async fn list_directory(
        &self,
        session_id: &str,
        path: &str,
    ) -> Result<Vec<DirectoryEntry>, BackendError> {
        let listing = self
            .call_tool(session_id, "list_directory", json!({"path": path}))
            .await?;
        Ok(parse_directory_listing(&listing))
    }

    async fn initialize_browser(&self, session_id: &str) -> Result<Option<String>, BackendError> {
        self.call(
            "InitBrowser",
            json!({"SessionId": session_id, "PersistentPath": "/tmp/agentbay_browser"}),
        )
        .await?;

        let resp = self.call("GetCdpLink", json!({"SessionId": session_id})).await?;
        Ok(resp
            .data
            .as_ref()
            .and_then(|d| d["Url"].as_str())
            .map(str::to_string))
    }

    async fn installed_apps(
        &self,
        session_id: &str,
        filter: AppFilter,
    ) -> Result<Vec<Value>, BackendError> {
        let text = self
            .call_tool(
                session_id,
                "get_installed_apps",
                json!({
                    "start_menu": filter.start_menu,
                    "desktop": filter.desktop,
                    "ignore_system_apps": filter.ignore_system_apps,
                }),
            )
            .await?;
        Ok(parse_items(&text))
    }

    async fn list_windows(&self, session_id: &str) -> Result<Vec<Value>, BackendError> {
        let text = self
            .call_tool(session_id, "list_root_windows", json!({}))
            .await?;
        Ok(parse_items(&text))
    }

    async fn ui_action(&self, session_id: &str, action: &UiAction) -> Result<Value, BackendError> {
        let text = self
            .call_tool(session_id, action.tool_name(), action.args())
            .await?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_text_joins_text_items() {
        let data = json!({"IsError": false, "Content": [{"type": "text", "text": "a"}, {"text": "b"}]});
        assert_eq!(tool_text(&data), "a\nb");
        assert_eq!(tool_text(&json!({})), "");
    }

    #[test]
    fn directory_listing_parses_markers() {
        let entries = parse_directory_listing("[DIR] src\n[FILE] main.rs\nnoise\n[FILE] \n");
        assert_eq!(
            entries,
            vec![
                DirectoryEntry { name: "src".into(), is_directory: true },
                DirectoryEntry { name: "main.rs".into(), is_directory: false },
            ]
        );
    }

    #[test]
    fn items_accept_arrays_objects_and_text() {
        assert_eq!(parse_items("[1,2]").len(), 2);
        assert_eq!(parse_items("{\"a\":1}"), vec![json!({"a": 1})]);
        assert_eq!(parse_items("plain"), vec![json!("plain")]);
        assert!(parse_items("  ").is_empty());
    }

    #[test]
    fn session_ids_from_objects_or_strings() {
        let ids = parse_session_ids(&json!([{"SessionId": "s-1"}, "s-2", {"Other": 1}]));
        assert_eq!(ids, vec!["s-1".to_string(), "s-2".to_string()]);
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let api = AgentBayApi::new("key", "https://api.example/", Duration::from_secs(5)).unwrap();
        assert_eq!(api.endpoint, "https://api.example");
    }
}
