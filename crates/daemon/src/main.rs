//! ftpgate daemon
//!
//! Multi-tenant FTP access layer and credential rotation API.

use std::io::BufRead;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use ftpgate::config::{default_config_path, Config};
use ftpgate::protocol::ChangePasswordRequest;
use ftpgate::{api, rotate_password, Services};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// ftpgate - multi-tenant FTP access layer.
#[derive(Parser, Debug)]
#[command(name = "ftpgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the credential rotation API and publish the FTP settings
    Serve,

    /// Write a configuration file with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Set the FTP password of an identity (e.g. admin_abcd1234)
    Passwd {
        /// Identity whose password is set
        identity: String,

        /// New password (read from stdin when omitted)
        #[arg(long, short)]
        password: Option<String>,
    },

    /// List the active tenants
    Tenants,

    /// Check an FTP login without starting the server
    Check {
        /// Composite username, e.g. admin_abcd1234
        username: String,

        /// Password (read from stdin when omitted)
        #[arg(long, short)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    if let Commands::Init { force } = cli.command {
        write_default_config(&config_path, force)?;
        println!("Wrote default configuration to {}", config_path.display());
        return Ok(());
    }

    // Load configuration
    let mut config = Config::load(&config_path)?;

    // Apply environment variable overrides
    let overrides = config.apply_env_overrides();

    // Validate configuration
    config.validate()?;

    let _log_guard = init_tracing(&config, cli.verbose)?;
    tracing::debug!("Using config file: {:?}", config_path);
    for name in overrides {
        tracing::info!("Configuration overridden from environment: {}", name);
    }

    let services = Services::from_config(&config)?;

    match cli.command {
        Commands::Serve => serve(&config, &services).await?,
        // Handled before the configuration is loaded
        Commands::Init { .. } => {}
        Commands::Passwd { identity, password } => {
            let new_password = password_or_stdin(password)?;
            let request = ChangePasswordRequest {
                username: identity.clone(),
                current_password: None,
                new_password,
            };
            rotate_password(services.credentials.as_ref(), &request)?;
            println!("Password set for {}", identity);
        }
        Commands::Tenants => {
            let tenants = services.registry.tenants();
            if tenants.is_empty() {
                println!("No tenants found.");
            }
            for tenant in tenants {
                println!("{}  {}", tenant.id(), tenant.root().display());
            }
        }
        Commands::Check { username, password } => {
            let password = password_or_stdin(password)?;
            let remote_addr: SocketAddr = ([127, 0, 0, 1], 0).into();
            match services
                .resolver(config.ftp.read_only)
                .authenticate(&username, &password, remote_addr)
            {
                Ok(session) => {
                    println!(
                        "OK: {} -> {} ({})",
                        username,
                        session.tenant().id(),
                        session.tenant().root().display()
                    );
                }
                Err(e) => anyhow::bail!("Login rejected: {}", e),
            }
        }
    }

    Ok(())
}

/// Initialize tracing. Returns the guard of the file writer, if any.
fn init_tracing(config: &Config, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if verbose {
        "debug"
    } else {
        config.daemon.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match &config.daemon.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "ftpgate.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            Ok(None)
        }
    }
}

/// Run the rotation API until a shutdown signal arrives.
async fn serve(config: &Config, services: &Services) -> anyhow::Result<()> {
    let gateway = services.gateway(config)?;
    let settings = gateway.settings();
    tracing::info!(
        listen = %settings.listen_addr,
        passive_start = settings.passive_ports.start,
        passive_end = settings.passive_ports.end,
        read_only = config.ftp.read_only,
        base_path = %config.storage.base_path.display(),
        "FTP gateway ready for engine"
    );

    let api_addr = config.api.listen_addr()?;
    let app = api::create_routes(services.api_state(config));
    let listener = tokio::net::TcpListener::bind(api_addr)
        .await
        .with_context(|| format!("Failed to bind API listener on {}", api_addr))?;

    tracing::info!("Rotation API listening on {}", api_addr);
    if config.api.token.is_none() {
        tracing::warn!("No API token configured; the rotation API is unauthenticated");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("API server error")?;

    tracing::info!("ftpgate stopped");
    Ok(())
}

/// Wait for SIGTERM or SIGINT.
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Failed to register signal handlers: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
}

/// Write the default configuration to `path`. An existing file is kept unless `force` is set.
fn write_default_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    Config::default().save(path)
}

/// Use `password` or read one line from stdin.
fn password_or_stdin(password: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
