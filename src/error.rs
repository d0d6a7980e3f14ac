//! Custom error types for sigil.
//!
//! Errors never escape a render pass: every failure listed here is either
//! logged and degraded into an absent module, or surfaced by one of the
//! debug subcommands. The taxonomy exists so those two paths can tell the
//! difference between a misconfiguration and a slow tool.

use std::path::PathBuf;
use thiserror::Error;

use crate::format::FormatError;

/// Main error type for sigil operations
#[derive(Error, Debug)]
pub enum SigilError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    /// A format string failed to compile
    #[error("Invalid format in {field}: {source}")]
    Format {
        field: String,
        #[source]
        source: FormatError,
    },

    /// Module name not present in the registry
    #[error("Unknown module: {name}")]
    UnknownModule { name: String },

    // =========================================================================
    // Evaluation Errors
    // =========================================================================
    /// The shared directory scan failed or ran out of time
    #[error("Directory scan of {path} failed: {message}")]
    Detection { path: PathBuf, message: String },

    /// A module probe returned an error
    #[error("Module '{module}' failed: {message}")]
    Probe { module: String, message: String },

    /// A module probe exceeded its time budget
    #[error("Module '{module}' timed out after {timeout_ms}ms")]
    ProbeTimeout { module: String, timeout_ms: u64 },

    // =========================================================================
    // Command Errors
    // =========================================================================
    /// External command could not be started or exited non-zero
    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// External command exceeded the command timeout
    #[error("Command '{command}' timed out after {timeout_ms}ms")]
    CommandTimeout { command: String, timeout_ms: u64 },

    /// Required executable not found on PATH
    #[error("Missing required tool: {tool}")]
    MissingTool { tool: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML parse error wrapper
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SigilError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a format compile error with the config field it came from
    pub fn format(field: impl Into<String>, source: FormatError) -> Self {
        Self::Format {
            field: field.into(),
            source,
        }
    }

    /// Create a probe error
    pub fn probe(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Probe {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Create a probe timeout error
    pub fn probe_timeout(module: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::ProbeTimeout {
            module: module.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Create a command failure error
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error is an expected way for one module to come up
    /// empty, like a tool that is not installed.
    ///
    /// The scheduler logs these at `debug` and everything else at `warn`.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Probe { .. }
                | Self::ProbeTimeout { .. }
                | Self::CommandFailed { .. }
                | Self::CommandTimeout { .. }
                | Self::MissingTool { .. }
                | Self::Detection { .. }
                | Self::Format { .. }
        )
    }

    /// Check if this error is a timeout of any kind
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ProbeTimeout { .. } | Self::CommandTimeout { .. }
        )
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownModule { .. } => 2,
            Self::Format { .. } => 3,
            Self::MissingTool { .. } => 6,
            Self::Config { .. } | Self::InvalidConfig { .. } | Self::Toml(_) => 7,
            _ => 1,
        }
    }
}

/// Type alias for sigil results
pub type Result<T> = std::result::Result<T, SigilError>;

/// Extension trait for converting foreign errors to [`SigilError`]
pub trait IntoSigilError<T> {
    fn into_sigil_config(self) -> Result<T>;
}

impl<T, E: Into<anyhow::Error>> IntoSigilError<T> for std::result::Result<T, E> {
    fn into_sigil_config(self) -> Result<T> {
        self.map_err(|e| SigilError::config(e.into().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::compile;

    #[test]
    fn test_error_display() {
        let err = SigilError::probe_timeout("rust", std::time::Duration::from_millis(500));
        assert!(err.to_string().contains("rust"));
        assert!(err.to_string().contains("500ms"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(SigilError::probe("git_branch", "boom").is_recoverable());
        assert!(SigilError::MissingTool {
            tool: "node".into()
        }
        .is_recoverable());
        assert!(!SigilError::config("bad").is_recoverable());
        assert!(!SigilError::invalid_config("custom.x.command", "empty").is_recoverable());
        assert!(!SigilError::UnknownModule {
            name: "nope".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_is_timeout() {
        assert!(SigilError::CommandTimeout {
            command: "git status".into(),
            timeout_ms: 10
        }
        .is_timeout());
        assert!(SigilError::probe_timeout("git_status", std::time::Duration::from_secs(1)).is_timeout());
        assert!(!SigilError::command_failed("git", "exit 128").is_timeout());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            SigilError::UnknownModule {
                name: "x".into()
            }
            .exit_code(),
            2
        );
        assert_eq!(SigilError::config("test").exit_code(), 7);
        assert_eq!(SigilError::probe("a", "b").exit_code(), 1);
    }

    #[test]
    fn test_format_error_keeps_source() {
        let source = compile("[unclosed").unwrap_err();
        let err = SigilError::format("git_branch.format", source);
        assert!(err.to_string().contains("git_branch.format"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_config_with_path() {
        let path = PathBuf::from("/test/sigil.toml");
        let err = SigilError::config_with_path("failed to parse", path.clone());
        if let SigilError::Config {
            message,
            path: opt_path,
        } = err
        {
            assert_eq!(message, "failed to parse");
            assert_eq!(opt_path, Some(path));
        } else {
            panic!("Wrong error variant");
        }
    }

    #[test]
    fn test_into_sigil_error_trait() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));

        match result.into_sigil_config() {
            Err(SigilError::Config { message, path }) => {
                assert!(message.contains("file not found"));
                assert_eq!(path, None);
            }
            other => panic!("Wrong error variant after conversion: {:?}", other),
        }
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: SigilError = io_err.into();
        assert!(matches!(err, SigilError::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }
}
