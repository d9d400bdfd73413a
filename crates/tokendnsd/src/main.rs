// # tokendnsd - token directory daemon
//
// Thin integration layer: all directory logic lives in tokendns-core.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Provisioning the directory
// 3. Serving the HTTP surface until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Directory
// - `TOKENDNS_STORE`: `file` (durable, default) or `memory`
// - `TOKENDNS_STORE_PATH`: Directory document (default `config.yaml`)
// - `TOKENDNS_AUTH`: `secret` (enforce per-token secrets, default) or `open`
//
// ### Tokens
// - `TOKENDNS_TOKEN_<NAME>`: Defines a token; replaces the stored token set
// - `TOKENDNS_SECRET_<NAME>`: Secret for the token defined under `<NAME>`
//
// ### Server
// - `TOKENDNS_BIND`: Listen address (default `0.0.0.0:8000`)
// - `TOKENDNS_LOG_LEVEL`: trace, debug, info, warn, error (default `info`)
//
// ## Example
//
// ```bash
// export TOKENDNS_STORE=memory
// export TOKENDNS_TOKEN_HOME=7f3c9a
// export TOKENDNS_SECRET_HOME=correct-horse
//
// tokendnsd
// curl 'http://localhost:8000/register/7f3c9a/192.0.2.10?secret=correct-horse'
// curl -i http://localhost:8000/ip/7f3c9a
// ```

mod api;

use anyhow::Result;
use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tokendns_core::{AuthMode, DirectoryConfig, ProvisioningMode};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or startup error (including an unreadable store)
/// - 2: Runtime error
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon configuration
struct Config {
    store_type: String,
    store_path: String,
    auth: String,
    bind: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self {
            store_type: env::var("TOKENDNS_STORE").unwrap_or_else(|_| "file".to_string()),
            store_path: env::var("TOKENDNS_STORE_PATH")
                .unwrap_or_else(|_| tokendns_core::config::DEFAULT_STORE_PATH.to_string()),
            auth: env::var("TOKENDNS_AUTH").unwrap_or_else(|_| "secret".to_string()),
            bind: env::var("TOKENDNS_BIND").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            log_level: env::var("TOKENDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "TOKENDNS_STORE '{}' is not supported. Supported types: file, memory",
                self.store_type
            ),
        }

        if self.store_type == "file" && self.store_path.trim().is_empty() {
            anyhow::bail!("TOKENDNS_STORE_PATH cannot be empty when TOKENDNS_STORE=file");
        }

        match self.auth.as_str() {
            "open" | "secret" => {}
            _ => anyhow::bail!(
                "TOKENDNS_AUTH '{}' is not supported. Supported modes: open, secret",
                self.auth
            ),
        }

        if self.bind.parse::<SocketAddr>().is_err() {
            anyhow::bail!(
                "TOKENDNS_BIND '{}' is not a socket address (expected e.g. 0.0.0.0:8000)",
                self.bind
            );
        }

        self.log_level()?;
        Ok(())
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "TOKENDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    /// Core directory configuration
    fn directory_config(&self) -> DirectoryConfig {
        let auth = match self.auth.as_str() {
            "open" => AuthMode::Open,
            _ => AuthMode::Secret,
        };
        let mode = match self.store_type.as_str() {
            "memory" => ProvisioningMode::environment(auth),
            _ => ProvisioningMode::file(&self.store_path, auth),
        };
        DirectoryConfig::new(mode)
    }
}

fn main() -> ExitCode {
    let config = Config::from_env();

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let log_level = config.log_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!("Starting tokendnsd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let directory_config = config.directory_config();
        let directory = match tokendns_core::load_directory_from_env(&directory_config).await {
            Ok(directory) => Arc::new(directory),
            Err(e) => {
                error!("Failed to provision directory: {}", e);
                return DaemonExitCode::ConfigError;
            }
        };

        match run_daemon(&config, directory).await {
            Ok(()) => DaemonExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {}", e);
                DaemonExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Serve the directory until a shutdown signal arrives
async fn run_daemon(config: &Config, directory: Arc<tokendns_core::Directory>) -> Result<()> {
    info!(
        tokens = directory.len(),
        durable = directory.is_durable(),
        auth = ?directory.auth_mode(),
        "Directory ready"
    );

    let app = api::create_router(api::AppState { directory });

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", config.bind, e))?;

    info!("Listening on {}", config.bind);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Shutdown signal error: {}", e),
        }
    })
    .await?;

    info!("Shut down cleanly");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
