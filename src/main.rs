//! Sitelens MCP server binary
//!
//! Speaks MCP over stdio; all logging goes to stderr.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sitelens::browser::BrowserConfig;
use sitelens::mcp::{McpServer, ToolRegistry};

/// Sitelens MCP Server
#[derive(Parser, Debug)]
#[command(name = "sitelens")]
#[command(version)]
#[command(about = "MCP server for browser-driven web scraping with network capture")]
struct Args {
    /// Run the browser headless
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    headless: bool,

    /// Path to a Chrome/Chromium executable (auto-detected when omitted)
    #[arg(long)]
    chrome_path: Option<String>,

    /// Browser window width
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Browser window height
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Disable the Chromium sandbox
    #[arg(long)]
    no_sandbox: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("sitelens MCP server starting (stdio)");

    let mut config = BrowserConfig::builder()
        .headless(args.headless)
        .viewport(args.width, args.height)
        .sandbox(!args.no_sandbox);
    if let Some(path) = args.chrome_path {
        config = config.chrome_path(path);
    }

    let registry = ToolRegistry::with_config(config.build());
    let server = McpServer::with_registry(registry);
    server.run().await?;

    Ok(())
}
