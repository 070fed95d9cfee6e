use clap::Parser;
use code_exec::SandboxConfig;
use code_exec_server::{create_app, run_server};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to listen on
    #[arg(short, long, env = "CODE_EXEC_ADDR", default_value = "0.0.0.0:3001")]
    addr: SocketAddr,

    /// TOML file with sandbox settings; flags below override it
    #[arg(short, long, env = "CODE_EXEC_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum number of concurrent executions
    #[arg(short, long, env = "CODE_EXEC_MAX_CONCURRENT")]
    max_concurrent: Option<usize>,

    /// Deadline for each compile or run phase, in seconds
    #[arg(short, long, env = "CODE_EXEC_TIMEOUT")]
    timeout: Option<u64>,

    /// Directory under which per-request workspaces are created
    #[arg(long, env = "CODE_EXEC_WORKSPACE_ROOT")]
    workspace_root: Option<PathBuf>,
}

impl Args {
    fn sandbox_config(&self) -> anyhow::Result<SandboxConfig> {
        let mut config = match &self.config {
            Some(path) => SandboxConfig::load(path)?,
            None => SandboxConfig::default(),
        };
        if let Some(max_concurrent) = self.max_concurrent {
            config.max_concurrent_executions = max_concurrent;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = Duration::from_secs(timeout);
        }
        if let Some(root) = &self.workspace_root {
            config.workspace_root = root.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.sandbox_config()?;
    info!(
        "Sandbox settings: timeout {:?}, {} concurrent executions, workspaces under {}",
        config.timeout,
        config.max_concurrent_executions,
        config.workspace_root.display()
    );

    let app = create_app(config)?;
    run_server(app, args.addr).await?;

    Ok(())
}
