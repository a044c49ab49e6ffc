//! Crate-level error types.

use std::fmt;

/// Errors produced by the orbit-stage crate.
///
/// Only construction and option IO surface errors. The per-frame path
/// degrades to "nothing visible this frame" instead.
#[derive(Debug)]
pub enum OrbitError {
    /// A configuration value failed validation.
    InvalidConfig(String),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Host collaborators do not line up with the configured rings/blob.
    HostMismatch(String),
    /// A render layer failed to draw a frame.
    Render(String),
}

impl OrbitError {
    /// Shorthand for an [`OrbitError::InvalidConfig`] naming `field`.
    pub(crate) fn invalid(field: &str, reason: &str) -> Self {
        Self::InvalidConfig(format!("{field}: {reason}"))
    }
}

impl fmt::Display for OrbitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => {
                write!(f, "invalid configuration: {msg}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::HostMismatch(msg) => write!(f, "host mismatch: {msg}"),
            Self::Render(msg) => write!(f, "render error: {msg}"),
        }
    }
}

impl std::error::Error for OrbitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for OrbitError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
