//! Error types.
//!
//! - `QcError` is what the threshold engine returns. Each variant is a distinct
//!   failure class so batch drivers can decide to skip, retry or abort.
//! - `AppError` is the binary boundary: a message plus the process exit code.

use crate::domain::DepthBin;

/// Failures raised by the threshold-generation core.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum QcError {
    /// No samples remain after sensor-bound filtering.
    #[error("Insufficient data: {context}")]
    InsufficientData { context: String },

    /// A depth bin has no qualifying samples.
    #[error("Depth bin {bin} has no samples inside the sensor range")]
    DepthBinOutOfRange { bin: DepthBin },

    /// A historical annotation record is missing required fields.
    #[error("Malformed annotation at line {line}: {message}")]
    MalformedAnnotation { line: usize, message: String },

    /// The harmonic design matrix is rank deficient.
    #[error("Singular harmonic fit: rank {rank} < {params} parameters (n={n})")]
    SingularFit { n: usize, rank: usize, params: usize },

    /// Bad configuration or mismatched inputs.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Climatology table text that cannot be parsed.
    #[error("Climatology table format error at line {line}: {message}")]
    TableFormat { line: usize, message: String },
}

impl QcError {
    pub fn insufficient_data(context: impl Into<String>) -> Self {
        Self::InsufficientData {
            context: context.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn table_format(line: usize, message: impl Into<String>) -> Self {
        Self::TableFormat {
            line,
            message: message.into(),
        }
    }

    /// Exit code used when this error terminates the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            QcError::InsufficientData { .. } | QcError::DepthBinOutOfRange { .. } => 3,
            QcError::SingularFit { .. } => 4,
            QcError::MalformedAnnotation { .. }
            | QcError::InvalidInput { .. }
            | QcError::TableFormat { .. } => 2,
        }
    }
}

pub type QcResult<T> = std::result::Result<T, QcError>;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<QcError> for AppError {
    fn from(err: QcError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
