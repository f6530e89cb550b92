//! `file_operations` tool: read, write and list files in a session.

use crate::sandbox::StatelessClient;
use crate::security::{require_file_path, sanitize_content, ValidationError};
use crate::tools::traits::{Tool, ToolResult};
use crate::tools::{respond, session_id_arg};
use async_trait::async_trait;
use serde_json::json;

const TOOL_NAME: &str = crate::tools::TOOL_FILE_OPERATIONS;

pub const FILE_ACTIONS: &[&str] = &["read", "write", "list"];

pub struct FileOperationsTool {
    client: StatelessClient,
}

impl FileOperationsTool {
    pub fn new(client: StatelessClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum FileAction {
    Read { file_path: String },
    Write { file_path: String, content: String },
    List { directory_path: String },
}

fn parse(args: &serde_json::Value) -> Result<(String, FileAction), ValidationError> {
    let session_id = session_id_arg(args)?;
    let action = match args["action"].as_str().unwrap_or("read") {
        "read" => FileAction::Read {
            file_path: require_file_path(args["file_path"].as_str())?.to_string(),
        },
        // Empty content is a legitimate write.
        "write" => FileAction::Write {
            file_path: require_file_path(args["file_path"].as_str())?.to_string(),
            content: sanitize_content(args["content"].as_str().unwrap_or_default()),
        },
        "list" => FileAction::List {
            directory_path: args["directory_path"]
                .as_str()
                .filter(|s| !s.is_empty())
                .unwrap_or(".")
                .to_string(),
        },
        other => {
            return Err(ValidationError::Unsupported {
                param: "action",
                value: other.to_string(),
                supported: FILE_ACTIONS.join(", "),
            })
        }
    };
    Ok((session_id, action))
}

#[async_trait]
impl Tool for FileOperationsTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Read a file, write a file or list a directory inside a session. \
         Paths must stay inside the workspace (no '..'); written content has \
         inline scripts stripped."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Target session"
                },
                "action": {
                    "type": "string",
                    "enum": FILE_ACTIONS,
                    "description": "Operation. Default: read."
                },
                "file_path": {
                    "type": "string",
                    "description": "File path for read/write (e.g. /tmp/notes.txt)"
                },
                "content": {
                    "type": "string",
                    "description": "Content for write"
                },
                "directory_path": {
                    "type": "string",
                    "description": "Directory for list. Default: ."
                }
            },
            "required": ["session_id"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let (session_id, action) = match parse(&args) {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ToolResult::fail(e.to_string())),
        };

        match action {
            FileAction::Read { file_path } => respond(
                json!({"session_id": session_id, "action": "read"}),
                self.client.read_file(&session_id, &file_path).await,
            ),
            FileAction::Write { file_path, content } => respond(
                json!({"session_id": session_id, "action": "write"}),
                self.client.write_file(&session_id, &file_path, &content).await,
            ),
            FileAction::List { directory_path } => respond(
                json!({"session_id": session_id, "action": "list"}),
                self.client.list_directory(&session_id, &directory_path).await,
            ),
        }
    }
}
