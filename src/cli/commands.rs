use crate::apis::MemoryLedger;
use crate::app::{build_dispatcher, token_manager};
use crate::config::AppConfig;
use crate::logging::{init_logging, LogConfig};
use crate::runtime_config::RuntimeConfig;
use crate::security::UserRef;
use crate::server::{AppService, HttpServer};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Command-line interface of the object router.
#[derive(Parser)]
#[command(name = "objrouter", version)]
#[command(about = "Path-addressable object dispatch server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// YAML configuration file
        #[arg(short, long, env = "OBJR_CONFIG")]
        config: Option<PathBuf>,

        /// Listen address; overrides `server.addr`
        #[arg(long)]
        addr: Option<String>,

        /// Token secret; overrides `security.secret`
        #[arg(long, env = "OBJR_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },
    /// Print a freshly issued security token
    IssueToken {
        /// YAML configuration file (for the token secret and lifetime)
        #[arg(short, long, env = "OBJR_CONFIG")]
        config: Option<PathBuf>,

        /// User object address, e.g. `name://Users/alice`; anonymous if omitted
        #[arg(long)]
        user: Option<String>,

        /// Role carried by the token
        #[arg(long, requires = "user")]
        role: Option<String>,
    },
}

/// Parse arguments and run the chosen command.
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve {
            config,
            addr,
            secret,
        } => serve(config, addr, secret),
        Commands::IssueToken { config, user, role } => {
            let config = AppConfig::load(config.as_deref())?;
            println!("{}", issue_token(&config, user, role)?);
            Ok(())
        }
    }
}

fn serve(
    config_path: Option<PathBuf>,
    addr: Option<String>,
    secret: Option<String>,
) -> Result<()> {
    init_logging(&LogConfig::from_env())?;
    let runtime = RuntimeConfig::from_env();
    runtime.apply();
    info!(stack_size = runtime.stack_size, "Coroutine runtime configured");

    let config = serve_config(config_path.as_deref(), addr, secret)?;
    let store = config.store.open()?;
    let dispatcher = build_dispatcher(&config, store, Arc::new(MemoryLedger::new()))?;
    let service = AppService::new(Arc::new(dispatcher));

    let handle = HttpServer(service)
        .start(config.server.addr.as_str())
        .with_context(|| format!("failed to bind {}", config.server.addr))?;
    handle
        .join()
        .map_err(|e| anyhow!("server terminated abnormally: {e:?}"))
}

/// Load the configuration and apply command-line overrides, refusing a public
/// listen address while the development secret is in use.
pub(crate) fn serve_config(
    config_path: Option<&Path>,
    addr: Option<String>,
    secret: Option<String>,
) -> Result<AppConfig> {
    let mut config = AppConfig::load(config_path)?;
    if let Some(addr) = addr {
        config.server.addr = addr;
    }
    if let Some(secret) = secret {
        config.security.secret = secret;
    }
    config.check_bind()?;
    Ok(config)
}

/// Issue a token signed with the configured secret.
pub fn issue_token(config: &AppConfig, user: Option<String>, role: Option<String>) -> Result<String> {
    let user = user.map(|path| UserRef { path, role });
    token_manager(config)
        .issue(user.as_ref())
        .context("failed to issue token")
}
