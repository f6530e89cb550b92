//! Cloud sandbox sessions exposed as callable tools.
//!
//! - [`sandbox`]: stateless client over the remote session service
//! - [`browser`]: one-step browser automation over CDP, isolated per call
//! - [`security`]: parameter validators shared by every tool
//! - [`tools`]: the tool adapters and their registry
//! - [`provider`]: API key validation
//! - [`config`]: file and environment configuration

pub mod browser;
pub mod config;
pub mod provider;
pub mod sandbox;
pub mod security;
pub mod tools;

pub use browser::{BrowserBridge, BrowserStep};
pub use config::Config;
pub use sandbox::{SimpleResult, StatelessClient};
pub use tools::{all_tools, Tool, ToolResult};
