//! Stateless session client.
//!
//! [`StatelessClient`] holds nothing but the backend (and, through it, the
//! credential). It never caches a session: every operation that acts on a
//! session first asks the service whether that session exists, then issues
//! the action addressed by the raw id. The two calls are not atomic; another
//! actor may delete the session between them, in which case the action itself
//! fails and that failure is returned.
//!
//! Every public method returns a [`SimpleResult`] and never panics or
//! propagates an error.

use super::agentbay::AgentBayApi;
use super::{
    ownership_labels, AppFilter, BackendError, CommandOutput, DirectoryEntry, SessionBackend,
    SimpleResult, UiAction,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Sessions requested per listing page.
pub const LIST_PAGE_SIZE: u32 = 100;

/// Upper bound on listing pages, guarding against a service that keeps
/// reporting a larger total without ever returning an empty page.
pub const MAX_LIST_PAGES: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedSession {
    pub session_id: String,
    pub image_id: String,
    pub status: String,
    pub request_id: Option<String>,
    pub resource_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionList {
    pub sessions: Vec<SessionSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedSession {
    pub session_id: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    pub file_path: String,
    pub content: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileWritten {
    pub file_path: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub directory_path: String,
    pub files: Vec<DirectoryEntry>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeRun {
    pub language: String,
    pub result: String,
    pub output: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserEndpoint {
    pub initialized: bool,
    pub endpoint_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemList {
    pub items: Vec<Value>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiActionOutput {
    pub action: String,
    pub result: Value,
}

/// Envelope-returning facade over a [`SessionBackend`].
#[derive(Clone)]
pub struct StatelessClient {
    backend: Arc<dyn SessionBackend>,
}

impl StatelessClient {
    /// Build a client talking to the HTTP service at `endpoint`.
    pub fn new(api_key: &str, endpoint: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "API key is required");
        tracing::info!(endpoint, "initializing stateless session client");
        let api = AgentBayApi::new(api_key, endpoint, request_timeout)?;
        Ok(Self::with_backend(Arc::new(api)))
    }

    pub fn with_backend(backend: Arc<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    /// Create a session tagged with the ownership label. The caller validates
    /// `image_id`.
    pub async fn create_session(&self, image_id: &str) -> SimpleResult<CreatedSession> {
        tracing::info!(image_id, "creating session");
        match self
            .backend
            .create_session(image_id, &ownership_labels())
            .await
        {
            Ok(session) => {
                tracing::info!(session_id = %session.session_id, image_id, "session created");
                SimpleResult::ok(CreatedSession {
                    session_id: session.session_id,
                    image_id: image_id.to_string(),
                    status: "created".to_string(),
                    request_id: session.request_id,
                    resource_url: session.resource_url,
                })
            }
            Err(e) => {
                tracing::error!(image_id, error = %e, "session creation failed");
                SimpleResult::fail(e.describe("Failed to create session"))
            }
        }
    }

    /// Real-time lookup of a session's metadata.
    pub async fn get_session_info(&self, session_id: &str) -> SimpleResult<Value> {
        tracing::debug!(session_id, "querying session info");
        match self.backend.get_session(session_id).await {
            Ok(Some(data)) if !data.is_null() => SimpleResult::ok(data),
            Ok(_) => {
                tracing::warn!(session_id, "session does not exist or is inaccessible");
                SimpleResult::fail(format!(
                    "Session {session_id} does not exist or is inaccessible"
                ))
            }
            Err(BackendError::Api { message, .. }) => {
                tracing::error!(session_id, error = %message, "session lookup rejected");
                SimpleResult::fail(format!("Failed to query session info: {message}"))
            }
            Err(e) => {
                tracing::error!(session_id, error = %e, "session lookup failed");
                SimpleResult::fail(format!("Failed to get session info: {e}"))
            }
        }
    }

    pub async fn execute_command(
        &self,
        session_id: &str,
        command: &str,
        timeout_ms: u64,
    ) -> SimpleResult<CommandOutput> {
        tracing::info!(
            session_id,
            timeout_ms,
            command = %preview(command, 100),
            "executing command"
        );
        if let Err(e) = self.ensure_session(session_id).await {
            return SimpleResult::fail(e);
        }
        let result = self
            .backend
            .execute_command(session_id, command, timeout_ms)
            .await;
        if let Ok(out) = &result {
            tracing::info!(session_id, exit_code = ?out.exit_code, "command finished");
        }
        settle("Command execution failed", session_id, result)
    }

    pub async fn delete_session(
        &self,
        session_id: &str,
        sync_context: bool,
    ) -> SimpleResult<DeletedSession> {
        tracing::info!(session_id, sync_context, "deleting session");
        if let Err(e) = self.ensure_session(session_id).await {
            return SimpleResult::fail(e);
        }
        let result = self
            .backend
            .delete_session(session_id, sync_context)
            .await
            .map(|()| DeletedSession {
                session_id: session_id.to_string(),
                deleted: true,
            });
        settle("Session deletion failed", session_id, result)
    }

    /// List every session carrying the ownership label, walking pages until
    /// the reported total is reached or a page comes back empty.
    pub async fn list_sessions(&self) -> SimpleResult<SessionList> {
        tracing::info!("listing sessions");
        let labels = ownership_labels();
        let mut session_ids: Vec<String> = Vec::new();

        for page in 1..=MAX_LIST_PAGES {
            let batch = match self
                .backend
                .list_sessions(&labels, page, LIST_PAGE_SIZE)
                .await
            {
                Ok(batch) => batch,
                Err(BackendError::Api { message, .. }) => {
                    tracing::error!(page, error = %message, "session listing rejected");
                    return SimpleResult::fail(format!("Failed to query session list: {message}"));
                }
                Err(e) => {
                    tracing::error!(page, error = %e, "session listing failed");
                    return SimpleResult::fail(format!("Failed to list sessions: {e}"));
                }
            };

            let page_len = batch.session_ids.len() as u64;
            let total = batch.total.unwrap_or(page_len);
            session_ids.extend(batch.session_ids);

            if session_ids.len() as u64 >= total || page_len == 0 {
                let sessions: Vec<SessionSummary> = session_ids
                    .into_iter()
                    .map(|session_id| SessionSummary {
                        session_id,
                        status: "active".to_string(),
                    })
                    .collect();
                tracing::info!(count = sessions.len(), pages = page, "listed sessions");
                return SimpleResult::ok(SessionList {
                    count: sessions.len(),
                    sessions,
                });
            }
        }

        tracing::error!(
            pages = MAX_LIST_PAGES,
            collected = session_ids.len(),
            "session listing did not terminate"
        );
        SimpleResult::fail(format!(
            "Failed to list sessions: listing aborted after {MAX_LIST_PAGES} pages \
             ({} sessions collected, service total never reached)",
            session_ids.len()
        ))
    }

    pub async fn read_file(&self, session_id: &str, file_path: &str) -> SimpleResult<FileContent> {
        tracing::info!(session_id, file_path, "reading file");
        if let Err(e) = self.ensure_session(session_id).await {
            return SimpleResult::fail(e);
        }
        let result = self
            .backend
            .read_file(session_id, file_path)
            .await
            .map(|content| FileContent {
                file_path: file_path.to_string(),
                size: content.chars().count(),
                content,
            });
        settle("Failed to read file", session_id, result)
    }

    pub async fn write_file(
        &self,
        session_id: &str,
        file_path: &str,
        content: &str,
    ) -> SimpleResult<FileWritten> {
        tracing::info!(session_id, file_path, bytes = content.len(), "writing file");
        if let Err(e) = self.ensure_session(session_id).await {
            return SimpleResult::fail(e);
        }
        let result = self
            .backend
            .write_file(session_id, file_path, content)
            .await
            .map(|()| FileWritten {
                file_path: file_path.to_string(),
                size: content.chars().count(),
            });
        settle("Failed to write file", session_id, result)
    }

    pub async fn list_directory(
        &self,
        session_id: &str,
        directory_path: &str,
    ) -> SimpleResult<DirectoryListing> {
        tracing::info!(session_id, directory_path, "listing directory");
        if let Err(e) = self.ensure_session(session_id).await {
            return SimpleResult::fail(e);
        }
        let result = self
            .backend
            .list_directory(session_id, directory_path)
            .await
            .map(|files| DirectoryListing {
                directory_path: directory_path.to_string(),
                count: files.len(),
                files,
            });
        settle("Failed to list directory", session_id, result)
    }

    pub async fn run_code(
        &self,
        session_id: &str,
        code: &str,
        language: &str,
    ) -> SimpleResult<CodeRun> {
        tracing::info!(session_id, language, code_len = code.len(), "running code");
        if let Err(e) = self.ensure_session(session_id).await {
            return SimpleResult::fail(e);
        }
        let result = self
            .backend
            .run_code(session_id, code, language)
            .await
            .map(|out| CodeRun {
                language: language.to_string(),
                output: out.output.unwrap_or_else(|| out.result.clone()),
                result: out.result,
                error: out.error,
            });
        settle("Code execution failed", session_id, result)
    }

    /// Start the session's browser and fetch its control endpoint.
    pub async fn browser_initialize(&self, session_id: &str) -> SimpleResult<BrowserEndpoint> {
        tracing::info!(session_id, "initializing browser");
        if let Err(e) = self.ensure_session(session_id).await {
            return SimpleResult::fail(e);
        }
        match self.backend.initialize_browser(session_id).await {
            Ok(Some(endpoint_url)) if !endpoint_url.trim().is_empty() => {
                tracing::info!(session_id, endpoint_url = %endpoint_url, "browser initialized");
                SimpleResult::ok(BrowserEndpoint {
                    initialized: true,
                    endpoint_url,
                })
            }
            Ok(_) => {
                tracing::error!(session_id, "browser initialized without an endpoint");
                SimpleResult::fail("Browser initialization failed: no endpoint URL returned")
            }
            Err(e) => {
                tracing::error!(session_id, error = %e, "browser initialization failed");
                SimpleResult::fail(format!("Browser initialization failed: {e}"))
            }
        }
    }

    pub async fn get_installed_apps(
        &self,
        session_id: &str,
        filter: AppFilter,
    ) -> SimpleResult<ItemList> {
        tracing::info!(session_id, ?filter, "listing installed apps");
        if let Err(e) = self.ensure_session(session_id).await {
            return SimpleResult::fail(e);
        }
        let result = self
            .backend
            .installed_apps(session_id, filter)
            .await
            .map(item_list);
        settle("Failed to get app list", session_id, result)
    }

    pub async fn list_windows(&self, session_id: &str) -> SimpleResult<ItemList> {
        tracing::info!(session_id, "listing windows");
        if let Err(e) = self.ensure_session(session_id).await {
            return SimpleResult::fail(e);
        }
        let result = self.backend.list_windows(session_id).await.map(item_list);
        settle("Failed to list windows", session_id, result)
    }

    /// Forward one desktop/mobile UI action.
    pub async fn ui_action(&self, session_id: &str, action: &UiAction) -> SimpleResult<UiActionOutput> {
        tracing::info!(session_id, action = action.tool_name(), "performing UI action");
        if let Err(e) = self.ensure_session(session_id).await {
            return SimpleResult::fail(e);
        }
        let result = self
            .backend
            .ui_action(session_id, action)
            .await
            .map(|result| UiActionOutput {
                action: action.tool_name().to_string(),
                result,
            });
        settle("UI action failed", session_id, result)
    }

    async fn ensure_session(&self, session_id: &str) -> Result<(), String> {
        self.get_session_info(session_id).await.into_result().map(|_| ())
    }
}

fn settle<T>(operation: &str, session_id: &str, result: Result<T, BackendError>) -> SimpleResult<T> {
    match result {
        Ok(data) => SimpleResult::ok(data),
        Err(e) => {
            tracing::error!(session_id, error = %e, "{operation}");
            SimpleResult::fail(e.describe(operation))
        }
    }
}

fn item_list(items: Vec<Value>) -> ItemList {
    ItemList {
        count: items.len(),
        items,
    }
}

fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
