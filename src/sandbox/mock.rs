//! In-memory [`SessionBackend`] that records every call, for tests.

use super::{
    AppFilter, BackendError, CodeOutput, CommandOutput, DirectoryEntry, Labels, RemoteSession,
    SessionBackend, SessionPage, UiAction,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { image_id: String, labels: Labels },
    Get { session_id: String },
    Delete { session_id: String, sync_context: bool },
    List { labels: Labels, page: u32, limit: u32 },
    Exec { session_id: String, command: String, timeout_ms: u64 },
    RunCode { session_id: String, language: String },
    Read { session_id: String, path: String },
    Write { session_id: String, path: String, content: String },
    ListDir { session_id: String, path: String },
    InitBrowser { session_id: String },
    Apps { session_id: String },
    Windows { session_id: String },
    Ui { session_id: String, tool: String },
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    sessions: HashSet<String>,
    files: HashMap<String, String>,
    pages: VecDeque<SessionPage>,
    repeat_page: Option<SessionPage>,
    browser_endpoint: Option<Option<String>>,
    create_error: Option<BackendError>,
    lookup_error: Option<BackendError>,
    list_error: Option<BackendError>,
    action_error: Option<BackendError>,
}

#[derive(Default)]
pub struct MockBackend {
    state: Mutex<State>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions<const N: usize>(ids: [&str; N]) -> Self {
        let mock = Self::new();
        mock.state
            .lock()
            .sessions
            .extend(ids.iter().map(|s| s.to_string()));
        mock
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn set_pages(&self, pages: Vec<SessionPage>) {
        self.state.lock().pages = pages.into();
    }

    pub fn repeat_page(&self, page: SessionPage) {
        self.state.lock().repeat_page = Some(page);
    }

    pub fn set_file(&self, path: &str, content: &str) {
        self.state
            .lock()
            .files
            .insert(path.to_string(), content.to_string());
    }

    pub fn set_browser_endpoint(&self, endpoint: Option<String>) {
        self.state.lock().browser_endpoint = Some(endpoint);
    }

    pub fn fail_create(&self, e: BackendError) {
        self.state.lock().create_error = Some(e);
    }

    pub fn fail_lookup(&self, e: BackendError) {
        self.state.lock().lookup_error = Some(e);
    }

    pub fn fail_list(&self, e: BackendError) {
        self.state.lock().list_error = Some(e);
    }

    pub fn fail_actions(&self, e: BackendError) {
        self.state.lock().action_error = Some(e);
    }

    fn record(&self, call: Call) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        match &state.action_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SessionBackend for MockBackend {
    async fn create_session(
        &self,
        image_id: &str,
        labels: &Labels,
    ) -> Result<RemoteSession, BackendError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Create {
            image_id: image_id.to_string(),
            labels: labels.clone(),
        });
        if let Some(e) = &state.create_error {
            return Err(e.clone());
        }
        let session_id = format!("session-{}", state.sessions.len() + 1);
        state.sessions.insert(session_id.clone());
        Ok(RemoteSession {
            session_id,
            request_id: Some("req-1".to_string()),
            resource_url: Some("https://console.example/resource".to_string()),
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Value>, BackendError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Get {
            session_id: session_id.to_string(),
        });
        if let Some(e) = &state.lookup_error {
            return Err(e.clone());
        }
        Ok(state
            .sessions
            .contains(session_id)
            .then(|| json!({"session_id": session_id, "status": "RUNNING"})))
    }

    async fn delete_session(&self, session_id: &str, sync_context: bool) -> Result<(), BackendError> {
        self.record(Call::Delete {
            session_id: session_id.to_string(),
            sync_context,
        })?;
        self.state.lock().sessions.remove(session_id);
        Ok(())
    }

    async fn list_sessions(
        &self,
        labels: &Labels,
        page: u32,
        limit: u32,
    ) -> Result<SessionPage, BackendError> {
        let mut state = self.state.lock();
        state.calls.push(Call::List {
            labels: labels.clone(),
            page,
            limit,
        });
        if let Some(e) = &state.list_error {
            return Err(e.clone());
        }
        if let Some(page) = state.pages.pop_front() {
            return Ok(page);
        }
        Ok(state.repeat_page.clone().unwrap_or_default())
    }

    async fn execute_command(
        &self,
        session_id: &str,
        command: &str,
        timeout_ms: u64,
    ) -> Result<CommandOutput, BackendError> {
        self.record(Call::Exec {
            session_id: session_id.to_string(),
            command: command.to_string(),
            timeout_ms,
        })?;
        Ok(CommandOutput {
            output: format!("ran: {command}"),
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
        self.record(Call::RunCode {
            session_id: session_id.to_string(),
            language: language.to_string(),
        })?;
        Ok(CodeOutput {
            result: format!("evaluated {} chars", code.len()),
            output: None,
            error: None,
        })
    }

    async fn read_file(&self, session_id: &str, path: &str) -> Result<String, BackendError> {
        self.record(Call::Read {
            session_id: session_id.to_string(),
            path: path.to_string(),
        })?;
        self.state
            .lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::api(format!("file not found: {path}")))
    }

    async fn write_file(
        &self,
        session_id: &str,
        path: &str,
        content: &str,
    ) -> Result<(), BackendError> {
        self.record(Call::Write {
            session_id: session_id.to_string(),
            path: path.to_string(),
            content: content.to_string(),
        })?;
        self.set_file(path, content);
        Ok(())
    }

    async fn list_directory(
        &self,
        session_id: &str,
        path: &str,
    ) -> Result<Vec<DirectoryEntry>, BackendError> {
        self.record(Call::ListDir {
            session_id: session_id.to_string(),
            path: path.to_string(),
        })?;
        Ok(vec![
            DirectoryEntry { name: "src".into(), is_directory: true },
            DirectoryEntry { name: "README.md".into(), is_directory: false },
        ])
    }

    async fn initialize_browser(&self, session_id: &str) -> Result<Option<String>, BackendError> {
        self.record(Call::InitBrowser {
            session_id: session_id.to_string(),
        })?;
        Ok(self
            .state
            .lock()
            .browser_endpoint
            .clone()
            .unwrap_or_else(|| Some("ws://mock/devtools/browser/1".to_string())))
    }

    async fn installed_apps(
        &self,
        session_id: &str,
        _filter: AppFilter,
    ) -> Result<Vec<Value>, BackendError> {
        self.record(Call::Apps {
            session_id: session_id.to_string(),
        })?;
        Ok(vec![json!({"name": "Terminal"}), json!({"name": "Browser"})])
    }

    async fn list_windows(&self, session_id: &str) -> Result<Vec<Value>, BackendError> {
        self.record(Call::Windows {
            session_id: session_id.to_string(),
        })?;
        Ok(vec![json!({"title": "Terminal"})])
    }

    async fn ui_action(&self, session_id: &str, action: &UiAction) -> Result<Value, BackendError> {
        self.record(Call::Ui {
            session_id: session_id.to_string(),
            tool: action.tool_name().to_string(),
        })?;
        Ok(json!({"ok": true}))
    }
}
