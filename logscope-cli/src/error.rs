//! CLI-specific error types and exit code mapping

use logscope_core::error::{ErrorClass, LogscopeError};
use logscope_log_analyzer::AnalyzerError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The analysis run failed.
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalyzerError),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from logscope-core.
    #[error("{0}")]
    Core(#[from] LogscopeError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                      |
    /// |------|----------------------------------------------|
    /// | 0    | Success                                      |
    /// | 1    | General / command error                      |
    /// | 2    | Configuration error                          |
    /// | 3    | Input rejected (schema or invalid record)    |
    /// | 10   | IO error                                     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Core(LogscopeError::Config(_)) => 2,
            Self::Analysis(AnalyzerError::Config { .. }) => 2,
            Self::Analysis(e) if e.class() == ErrorClass::Client => 3,
            Self::Core(e) if e.class() == ErrorClass::Client => 3,
            Self::Io(_) | Self::Analysis(AnalyzerError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Analysis(_) | Self::Core(_) => 1,
        }
    }
}
