//! Sink error types
//!
//! This module defines unified error types for all backend operations.
//! Platform-specific errors are mapped to these generic error variants.
//! None of them ever crosses the factory boundary: the `create` and
//! `enumerate` entry points surface only presence or absence, and error
//! detail goes to the log layer.

use std::fmt;

/// Unified error type for sink backend operations
#[derive(Debug, Clone)]
pub enum SinkError {
    /// Device not found or unavailable
    DeviceNotFound(String),
    /// Failed to enumerate devices
    EnumerationFailed(String),
    /// Requested format cannot be satisfied by the device
    UnsupportedFormat(String),
    /// Backend failed to open or configure the device
    InitializationFailed(String),
    /// Native API error
    SystemError { code: i32, message: String },
    /// Operation not supported by this backend
    NotSupported(String),
    /// Generic error
    Other(String),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotFound(name) => write!(f, "Device not found: {}", name),
            Self::EnumerationFailed(e) => write!(f, "Device enumeration failed: {}", e),
            Self::UnsupportedFormat(e) => write!(f, "Unsupported format: {}", e),
            Self::InitializationFailed(e) => write!(f, "Sink initialization failed: {}", e),
            Self::SystemError { code, message } => write!(f, "System error {}: {}", code, message),
            Self::NotSupported(op) => write!(f, "Not supported: {}", op),
            Self::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SinkError {}

/// Result type alias for sink backend operations
pub type Result<T> = std::result::Result<T, SinkError>;
