//! Command handlers -- one module per subcommand

pub mod analyze;
pub mod config;
pub mod reputation;

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::info;

use logscope_core::config::LogscopeConfig;
use logscope_core::error::{ConfigError, LogscopeError};

use crate::error::CliError;

/// Load the effective configuration.
///
/// A missing file falls back to defaults with environment overrides applied.
/// Any other load or validation failure is returned.
pub async fn load_config(path: &Path) -> Result<LogscopeConfig, CliError> {
    match LogscopeConfig::load(path).await {
        Ok(config) => Ok(config),
        Err(LogscopeError::Config(ConfigError::FileNotFound { .. })) => {
            let mut config = LogscopeConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

/// Returns a token that is cancelled on Ctrl-C.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing in-flight lookup");
            child.cancel();
        }
    });
    token
}
