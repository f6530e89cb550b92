//! Remote sandbox access for the plugin.
//!
//! Defines the [`SessionBackend`] trait that every remote provider implements
//! and the typed values it exchanges. Two layers sit on top:
//!
//! - [`agentbay::AgentBayApi`]: HTTP implementation of the backend
//! - [`client::StatelessClient`]: envelope-returning facade used by tools
//!
//! The backend is a pure transport: it never remembers which sessions exist.
//! All existence checks happen in the client, on every call.

pub mod agentbay;
pub mod client;
pub mod envelope;
pub mod ui;

#[cfg(test)]
pub(crate) mod mock;

pub use client::StatelessClient;
pub use envelope::{classify_error, ErrorClass, SimpleResult};
pub use ui::UiAction;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Key/value tags attached to a remote session.
pub type Labels = BTreeMap<String, String>;

/// Label key marking sessions created by this plugin.
pub const OWNERSHIP_LABEL_KEY: &str = "plugin";
/// Label value paired with [`OWNERSHIP_LABEL_KEY`].
pub const OWNERSHIP_LABEL_VALUE: &str = "true";

/// The fixed label set used to create and later list owned sessions.
pub fn ownership_labels() -> Labels {
    Labels::from([(
        OWNERSHIP_LABEL_KEY.to_string(),
        OWNERSHIP_LABEL_VALUE.to_string(),
    )])
}

/// Failure reported by a [`SessionBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The service answered and refused the request.
    #[error("{message}")]
    Api {
        code: Option<String>,
        message: String,
        request_id: Option<String>,
    },

    /// The request never produced a usable HTTP exchange.
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with something we could not interpret.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            code: None,
            message: message.into(),
            request_id: None,
        }
    }

    /// Rejections carry the service's own message; every other failure is
    /// prefixed with the operation that hit it.
    pub fn describe(&self, operation: &str) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => format!("{operation}: {other}"),
        }
    }
}

/// Session returned by a successful create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSession {
    pub session_id: String,
    pub request_id: Option<String>,
    pub resource_url: Option<String>,
}

/// One page of a label-filtered session listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPage {
    pub session_ids: Vec<String>,
    /// Total matching sessions as reported by the service, when it reports one.
    pub total: Option<u64>,
}

/// Result of a shell command inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub output: String,
    pub error: Option<String>,
    pub exit_code: Option<i64>,
}

/// Result of running a code snippet inside a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeOutput {
    pub result: String,
    pub output: Option<String>,
    pub error: Option<String>,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_directory: bool,
}

/// Which installed applications to enumerate on a desktop session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppFilter {
    pub start_menu: bool,
    pub desktop: bool,
    pub ignore_system_apps: bool,
}

impl Default for AppFilter {
    fn default() -> Self {
        Self {
            start_menu: true,
            desktop: false,
            ignore_system_apps: true,
        }
    }
}

/// Transport-level interface to the remote session service.
///
/// Each method is one remote call authenticated by the implementation's
/// credential. Implementations hold no per-session state; the session is
/// always addressed by its raw id.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Create a session from `image_id`, tagged with `labels`.
    async fn create_session(
        &self,
        image_id: &str,
        labels: &Labels,
    ) -> Result<RemoteSession, BackendError>;

    /// Look up a session. `Ok(None)` means the service returned no data for it.
    async fn get_session(
        &self,
        session_id: &str,
    ) -> Result<Option<serde_json::Value>, BackendError>;

    /// Release a session, syncing its persistent context first when asked.
    async fn delete_session(&self, session_id: &str, sync_context: bool)
        -> Result<(), BackendError>;

    /// Fetch page `page` (1-based) of sessions matching `labels`.
    async fn list_sessions(
        &self,
        labels: &Labels,
        page: u32,
        limit: u32,
    ) -> Result<SessionPage, BackendError>;

    async fn execute_command(
        &self,
        session_id: &str,
        command: &str,
        timeout_ms: u64,
    ) -> Result<CommandOutput, BackendError>;

    async fn run_code(
        &self,
        session_id: &str,
        code: &str,
        language: &str,
    ) -> Result<CodeOutput, BackendError>;

    async fn read_file(&self, session_id: &str, path: &str) -> Result<String, BackendError>;

    async fn write_file(
        &self,
        session_id: &str,
        path: &str,
        content: &str,
    ) -> Result<(), BackendError>;

    async fn list_directory(
        &self,
        session_id: &str,
        path: &str,
    ) -> Result<Vec<DirectoryEntry>, BackendError>;

    /// Start the session's browser and return its control endpoint, if the
    /// service produced one.
    async fn initialize_browser(&self, session_id: &str) -> Result<Option<String>, BackendError>;

    async fn installed_apps(
        &self,
        session_id: &str,
        filter: AppFilter,
    ) -> Result<Vec<serde_json::Value>, BackendError>;

    async fn list_windows(&self, session_id: &str)
        -> Result<Vec<serde_json::Value>, BackendError>;

    /// Perform one desktop or mobile UI action.
    async fn ui_action(
        &self,
        session_id: &str,
        action: &UiAction,
    ) -> Result<serde_json::Value, BackendError>;
}
