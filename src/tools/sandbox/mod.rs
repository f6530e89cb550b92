//! Session, command, code and file tools.
//!
//! Thin delegators to [`StatelessClient`](crate::sandbox::StatelessClient);
//! all remote logic lives in [`crate::sandbox`].

pub mod code;
pub mod command;
pub mod create;
pub mod delete;
pub mod files;
pub mod info;
pub mod list;

pub use code::CodeExecuteTool;
pub use command::CommandExecuteTool;
pub use create::SessionCreateTool;
pub use delete::SessionDeleteTool;
pub use files::FileOperationsTool;
pub use info::SessionGetTool;
pub use list::SessionListTool;
