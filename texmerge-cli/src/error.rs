//! CLI error type.

use texmerge::config::ConfigError;
use texmerge::logging::LoggingError;
use texmerge::MergeError;

/// Errors that end a CLI command with a non-zero exit status.
#[derive(Debug)]
pub enum CliError {
    /// Configuration is missing or invalid.
    Config(String),
    /// The merge could not start.
    Merge(MergeError),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// The Ctrl+C handler could not be installed.
    SignalHandler(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Merge(e) => write!(f, "{}", e),
            Self::Logging(e) => write!(f, "{}", e),
            Self::SignalHandler(msg) => {
                write!(f, "failed to install Ctrl+C handler: {}", msg)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Merge(e) => Some(e),
            Self::Logging(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<MergeError> for CliError {
    fn from(e: MergeError) -> Self {
        Self::Merge(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        Self::Logging(e)
    }
}
