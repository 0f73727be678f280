use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use pipeline_dispatch_core::{
    Error, Result,
    config::{Config, FileConfig, Overrides},
    models::Conclusion,
};
use pipeline_dispatch_github::detect_repository;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_RUN_FAILED: u8 = 1;
pub const EXIT_CONFIGURATION: u8 = 2;
pub const EXIT_REMOTE: u8 = 3;
pub const EXIT_CANCELLED: u8 = 4;
pub const EXIT_TIMED_OUT: u8 = 5;

// For argp::FromArgs
pub fn path(value: &str) -> Result<PathBuf, String> { Ok(PathBuf::from(value)) }

/// Log to stderr, leaving stdout to the command output.
pub fn init_logging() {
    let env_filter = EnvFilter::builder()
        // Default to warn level
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_filter(env_filter),
        )
        .init();
}

/// Resolve the configuration from the optional config file, flags and environment.
pub fn load_config(config_path: Option<&Path>, mut overrides: Overrides) -> Result<Config> {
    let file = match config_path {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    if overrides.repository.is_none() && file.github.repository.is_none() {
        overrides.detected_repository = detect_repository();
    }
    let config = Config::resolve(file, overrides, |key| std::env::var(key).ok())?;
    tracing::debug!("Resolved config: {:?}", config);
    Ok(config)
}

/// A token that is cancelled on Ctrl-C or SIGTERM.
pub fn cancel_on_shutdown() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                tracing::warn!("Interrupted, stopping");
                token.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for shutdown signals: {e}"),
        }
    });
    cancel
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => result,
            _ = sigterm.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        signal::ctrl_c().await
    }
}

/// Report a failed command on stderr and pick its exit code.
pub fn report_error(err: &anyhow::Error) -> ExitCode {
    eprintln!("error: {err:#}");
    ExitCode::from(exit_code(err))
}

/// Only a `success` conclusion counts as success. A missing conclusion does not.
pub fn run_exit_code(conclusion: Option<Conclusion>) -> u8 {
    if conclusion.is_some_and(|c| c.is_success()) { EXIT_SUCCESS } else { EXIT_RUN_FAILED }
}

pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>() {
        Some(Error::Configuration(_)) => EXIT_CONFIGURATION,
        Some(Error::Cancelled) => EXIT_CANCELLED,
        Some(Error::TimedOut { .. }) => EXIT_TIMED_OUT,
        _ => EXIT_REMOTE,
    }
}
