// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for ctrscope.
//!
//! Provides error types for container inspection operations:
//! - Format detection outcomes
//! - Structural validation during open
//! - Digest verification
//! - Rebuild (create) operations

use std::fmt;

/// Errors that can occur while opening, inspecting or rebuilding a container.
#[derive(Debug, Clone)]
pub enum ExplorerError {
    /// No known signature matched the input.
    ///
    /// This is a detection outcome, not a parse failure: the bytes were
    /// never claimed by any format module.
    UnsupportedFormat,

    /// A recognized container failed structural validation.
    Malformed {
        /// What was being parsed (e.g., "NcsdHeader")
        context: String,
        /// Validation error message
        message: String,
    },

    /// A declared region falls outside the container.
    Bounds {
        /// Requested bytes
        requested: u64,
        /// Available bytes
        available: u64,
        /// Offset where the region starts
        offset: u64,
    },

    /// A digest the format mandates did not match the stored value.
    ChecksumMismatch {
        /// Region the digest covers (e.g., "TMD content info records")
        region: String,
        /// Stored digest, hex
        expected: String,
        /// Computed digest, hex
        actual: String,
    },

    /// An operation was invoked on a context that does not support it.
    ///
    /// Calling `create` on a format whose `can_create()` is false, or
    /// passing a foreign selector to `view`/`activate`, is a caller
    /// contract violation reported through this variant.
    UnsupportedOperation {
        /// Operation name (e.g., "create")
        operation: String,
        /// Format the context implements
        format: String,
    },

    /// Read/write error on the underlying byte source.
    Io {
        /// Error message from the I/O layer
        message: String,
    },

    /// Other error
    Other(String),
}

impl ExplorerError {
    /// Create a malformed-container error.
    pub fn malformed(context: impl Into<String>, message: impl Into<String>) -> Self {
        ExplorerError::Malformed {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a bounds error.
    pub fn bounds(requested: u64, available: u64, offset: u64) -> Self {
        ExplorerError::Bounds {
            requested,
            available,
            offset,
        }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(
        region: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        ExplorerError::ChecksumMismatch {
            region: region.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an unsupported-operation error.
    pub fn unsupported_operation(
        operation: impl Into<String>,
        format: impl fmt::Display,
    ) -> Self {
        ExplorerError::UnsupportedOperation {
            operation: operation.into(),
            format: format.to_string(),
        }
    }

    /// Create an I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        ExplorerError::Io {
            message: message.into(),
        }
    }

    /// Whether this error is the "format not recognized" outcome.
    ///
    /// Hosts report this distinctly from malformed-container failures.
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, ExplorerError::UnsupportedFormat)
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            ExplorerError::UnsupportedFormat => vec![],
            ExplorerError::Malformed { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            ExplorerError::Bounds {
                requested,
                available,
                offset,
            } => vec![
                ("requested", requested.to_string()),
                ("available", available.to_string()),
                ("offset", offset.to_string()),
            ],
            ExplorerError::ChecksumMismatch {
                region,
                expected,
                actual,
            } => vec![
                ("region", region.clone()),
                ("expected", expected.clone()),
                ("actual", actual.clone()),
            ],
            ExplorerError::UnsupportedOperation { operation, format } => vec![
                ("operation", operation.clone()),
                ("format", format.clone()),
            ],
            ExplorerError::Io { message } => vec![("message", message.clone())],
            ExplorerError::Other(msg) => vec![("message", msg.clone())],
        }
    }
}

impl fmt::Display for ExplorerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplorerError::UnsupportedFormat => {
                write!(f, "Format not recognized")
            }
            ExplorerError::Malformed { context, message } => {
                write!(f, "Malformed container in {context}: {message}")
            }
            ExplorerError::Bounds {
                requested,
                available,
                offset,
            } => write!(
                f,
                "Region out of bounds: {requested} bytes at offset {offset}, but only {available} bytes available"
            ),
            ExplorerError::ChecksumMismatch {
                region,
                expected,
                actual,
            } => write!(
                f,
                "Checksum mismatch over {region}: stored {expected}, computed {actual}"
            ),
            ExplorerError::UnsupportedOperation { operation, format } => {
                write!(f, "Operation '{operation}' is not supported by {format}")
            }
            ExplorerError::Io { message } => write!(f, "I/O error: {message}"),
            ExplorerError::Other(msg) => write!(f, "Other error: {msg}"),
        }
    }
}

impl std::error::Error for ExplorerError {}

impl From<std::io::Error> for ExplorerError {
    fn from(err: std::io::Error) -> Self {
        ExplorerError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for ctrscope operations.
pub type Result<T> = std::result::Result<T, ExplorerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_error() {
        let err = ExplorerError::malformed("NcsdHeader", "bad magic");
        assert!(matches!(err, ExplorerError::Malformed { .. }));
        assert_eq!(
            err.to_string(),
            "Malformed container in NcsdHeader: bad magic"
        );
    }

    #[test]
    fn test_bounds_error() {
        let err = ExplorerError::bounds(100, 50, 10);
        assert!(matches!(err, ExplorerError::Bounds { .. }));
        assert_eq!(
            err.to_string(),
            "Region out of bounds: 100 bytes at offset 10, but only 50 bytes available"
        );
    }

    #[test]
    fn test_checksum_mismatch_error() {
        let err = ExplorerError::checksum_mismatch("DISA table", "AB", "CD");
        assert_eq!(
            err.to_string(),
            "Checksum mismatch over DISA table: stored AB, computed CD"
        );
    }

    #[test]
    fn test_unsupported_operation_error() {
        let err = ExplorerError::unsupported_operation("create", "NCSD");
        assert_eq!(err.to_string(), "Operation 'create' is not supported by NCSD");
    }

    #[test]
    fn test_unsupported_format_is_distinct() {
        let unsupported = ExplorerError::UnsupportedFormat;
        let malformed = ExplorerError::malformed("CiaHeader", "size mismatch");
        assert!(unsupported.is_unsupported_format());
        assert!(!malformed.is_unsupported_format());
    }

    #[test]
    fn test_log_fields_bounds() {
        let err = ExplorerError::bounds(100, 50, 10);
        let fields = err.log_fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], ("requested", "100".to_string()));
        assert_eq!(fields[1], ("available", "50".to_string()));
        assert_eq!(fields[2], ("offset", "10".to_string()));
    }

    #[test]
    fn test_log_fields_checksum() {
        let err = ExplorerError::checksum_mismatch("region", "00", "FF");
        let fields = err.log_fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].0, "region");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ExplorerError = io_err.into();
        assert!(matches!(err, ExplorerError::Io { .. }));
        assert_eq!(err.to_string(), "I/O error: file not found");
    }

    #[test]
    fn test_error_clone() {
        let err1 = ExplorerError::malformed("Context", "message");
        let err2 = err1.clone();
        assert_eq!(err1.to_string(), err2.to_string());
    }
}
