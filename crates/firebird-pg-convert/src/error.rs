//! Error types for the translation library.

use thiserror::Error;

/// Exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code when the source cannot be reached.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Exit code for failures while reading or rendering source objects.
pub const EXIT_TRANSLATION_ERROR: u8 = 3;
/// Exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;
/// Exit code after SIGINT/SIGTERM.
pub const EXIT_CANCELLED: u8 = 130;

/// Main error type for translation operations.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Configuration error (invalid YAML, bad values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The schema/data provider cannot be reached at all.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A provider call failed after a successful connect.
    #[error("Provider error: {message}\n  Context: {context}")]
    Provider { message: String, context: String },

    /// A page of rows could not be fetched or rendered.
    #[error("Batch failed for table {table} (rows {first_row} to {last_row}): {message}")]
    Batch {
        table: String,
        first_row: u64,
        last_row: u64,
        message: String,
    },

    /// Script rewriting failed.
    #[error("Transpile error: {0}")]
    Transpile(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Translation was cancelled (SIGINT, etc.)
    #[error("Translation cancelled")]
    Cancelled,
}

impl ConvertError {
    /// Create a Provider error with context about where it occurred
    pub fn provider(message: impl Into<String>, context: impl Into<String>) -> Self {
        ConvertError::Provider {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create a Batch error for the 1-based row range that failed.
    pub fn batch(
        table: impl Into<String>,
        first_row: u64,
        last_row: u64,
        message: impl Into<String>,
    ) -> Self {
        ConvertError::Batch {
            table: table.into(),
            first_row,
            last_row,
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ConvertError::Config(_) | ConvertError::Yaml(_) | ConvertError::Json(_) => {
                EXIT_CONFIG_ERROR
            }
            ConvertError::Connection(_) => EXIT_CONNECTION_ERROR,
            ConvertError::Provider { .. }
            | ConvertError::Batch { .. }
            | ConvertError::Transpile(_) => EXIT_TRANSLATION_ERROR,
            ConvertError::Io(_) => EXIT_IO_ERROR,
            ConvertError::Cancelled => EXIT_CANCELLED,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for translation operations.
pub type Result<T> = std::result::Result<T, ConvertError>;
