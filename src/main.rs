use agentbay_plugin::provider::{self, Validation};
use agentbay_plugin::sandbox::agentbay::AgentBayApi;
use agentbay_plugin::tools::{all_tools, find_tool, Tool};
use agentbay_plugin::{BrowserBridge, Config, StatelessClient};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "agentbay", version, about = "Cloud sandbox sessions as callable tools")]
struct Cli {
    /// Config file (default: the user config dir's config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available tools
    Tools {
        /// Print names, descriptions and parameter schemas as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one tool with a JSON object of arguments
    Call {
        tool: String,

        #[arg(long, default_value = "{}")]
        args: String,

        /// Directory for binary attachments such as screenshots
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Check the configured API key against the service
    Validate,

    /// Print the config file's JSON schema
    ConfigSchema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::ConfigSchema => {
            println!("{}", serde_json::to_string_pretty(&Config::json_schema())?);
            Ok(())
        }
        Command::Tools { json } => {
            let config = Config::load(cli.config.as_deref())?;
            // Listing makes no remote calls, so the key may be absent.
            let api = AgentBayApi::new(
                config.api_key.clone().unwrap_or_default(),
                config.endpoint.clone(),
                config.request_timeout(),
            )?;
            let client = StatelessClient::with_backend(Arc::new(api));
            let tools = all_tools(&client, &BrowserBridge::cdp(), &config);
            print_tools(&tools, json)
        }
        Command::Call {
            tool,
            args,
            out_dir,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            call(&config, &tool, &args, &out_dir).await
        }
        Command::Validate => {
            let config = Config::load(cli.config.as_deref())?;
            match provider::validate_credentials(
                config.api_key.as_deref(),
                &config.endpoint,
                config.request_timeout(),
            )
            .await?
            {
                Validation::Verified => println!("API key verified"),
                Validation::Unverified { reason } => {
                    println!("API key accepted but not verified: {reason}")
                }
            }
            Ok(())
        }
    }
}

fn print_tools(tools: &[Box<dyn Tool>], json: bool) -> anyhow::Result<()> {
    if json {
        let listing: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name(),
                    "description": t.description(),
                    "parameters": t.parameters_schema(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for tool in tools {
            println!("{:<22} {}", tool.name(), tool.description());
        }
    }
    Ok(())
}

async fn call(config: &Config, name: &str, raw_args: &str, out_dir: &std::path::Path) -> anyhow::Result<()> {
    let key = provider::check_api_key(config.api_key.as_deref())?;
    let client = StatelessClient::new(key, &config.endpoint, config.request_timeout())?;
    let tools = all_tools(&client, &BrowserBridge::cdp(), config);

    let tool = find_tool(&tools, name).with_context(|| format!("unknown tool: {name}"))?;
    let args: serde_json::Value =
        serde_json::from_str(raw_args).context("--args must be a JSON object")?;
    anyhow::ensure!(args.is_object(), "--args must be a JSON object");

    let result = tool.execute(args).await?;

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    for attachment in &result.attachments {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;
        let path = out_dir.join(&attachment.filename);
        std::fs::write(&path, &attachment.bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), bytes = attachment.bytes.len(), "attachment saved");
    }

    match result.error {
        Some(error) if !result.success => anyhow::bail!(error),
        _ => Ok(()),
    }
}
