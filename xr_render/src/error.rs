//! Error types for the XR render core
//!
//! Only conditions that abort an operation are errors. Configuration
//! mistakes inside a running frame (unknown pass, bad target index,
//! stale unbind) are logged and ignored instead.

use std::fmt;

/// Result type for render core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Render core errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (GL, Vulkan, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, framebuffer, material, etc.)
    InvalidResource(String),

    /// Initialization failed (renderer, backend, pipeline)
    InitializationFailed(String),

    /// No unique object identity could be allocated after this many attempts
    IdentityExhausted(u32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::IdentityExhausted(attempts) => {
                write!(f, "Object identity exhausted after {} attempts", attempts)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
