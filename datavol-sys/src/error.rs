// SPDX-License-Identifier: GPL-3.0-only

use datavol_contracts::{StorageError, StorageErrorKind};
use thiserror::Error;

/// Error types for host command operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("command failed: {command} (exit {status}); stderr: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error("required tool not found: {0}")]
    ToolMissing(String),

    #[error("not supported: {0}")]
    NotSupported(String),
}

/// Result type alias for host command operations
pub type Result<T> = std::result::Result<T, SysError>;

impl SysError {
    pub fn parse(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

impl From<SysError> for StorageError {
    fn from(error: SysError) -> Self {
        let kind = match &error {
            SysError::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                StorageErrorKind::PermissionDenied
            }
            SysError::ToolMissing(_) => StorageErrorKind::Unavailable,
            SysError::NotSupported(_) => StorageErrorKind::Unsupported,
            SysError::CommandFailed { stderr, .. } if stderr.contains("Device or resource busy") => {
                StorageErrorKind::Busy
            }
            _ => StorageErrorKind::Internal,
        };
        StorageError::new(kind, error.to_string())
    }
}
