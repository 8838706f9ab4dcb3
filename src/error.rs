//! Error handling for rigup
//!
//! Provisioning errors carry recovery suggestions so a failed run tells the
//! user what to do before re-running.

use thiserror::Error;

/// Result type alias for rigup operations
pub type Result<T> = std::result::Result<T, SetupError>;

/// Main error type for rigup operations
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed{}: {command}\n{stderr}", .status.map(|c| format!(" (exit {})", c)).unwrap_or_else(|| " (killed by signal)".to_string()))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Environment manager bootstrap failed: {reason}")]
    Bootstrap { reason: String },

    #[error("Could not query conda environments: {reason}")]
    EnvList { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SetupError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SetupError::Spawn { .. } => "SPAWN_FAILED",
            SetupError::CommandFailed { .. } => "COMMAND_FAILED",
            SetupError::Bootstrap { .. } => "BOOTSTRAP_FAILED",
            SetupError::EnvList { .. } => "ENV_LIST_FAILED",
            SetupError::Io(_) => "IO_ERROR",
            SetupError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SetupError::Spawn { .. } => vec![
                "Check that the tool is installed and on PATH",
                "Re-run after installing the missing tool",
            ],
            SetupError::CommandFailed { .. } => vec![
                "Inspect the stderr output above for the underlying cause",
                "Pinned installs often fail on CUDA/compiler mismatches; check nvcc and gcc versions",
                "Re-running is safe: completed steps are skipped via idempotence checks",
            ],
            SetupError::Bootstrap { .. } => vec![
                "Check network connectivity to repo.anaconda.com",
                "Install Miniconda manually and ensure 'conda' is on PATH",
            ],
            SetupError::EnvList { .. } => vec![
                "Run 'conda env list' manually to verify the conda install",
            ],
            _ => vec![],
        }
    }
}
