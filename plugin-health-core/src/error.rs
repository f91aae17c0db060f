//! Error types for plugin health evaluation.

use std::{error::Error, fmt, io};

/// Error type for plugin health operations.
#[derive(Debug)]
pub enum HealthError {
    /// An underlying I/O error.
    Io(io::Error),
    /// A request to a remote service failed or returned an error status.
    Http(String),
    /// A remote service does not know the requested resource.
    NotFound(String),
    /// A git command failed.
    Git(String),
    /// A build descriptor is missing or malformed.
    Descriptor(String),
    /// An external call exceeded its time budget.
    Timeout(String),
    /// A context value was published twice with different values.
    Conflict(String),
    /// Invalid configuration or probe wiring.
    Config(String),
    /// A JSON document could not be read or written.
    Json(serde_json::Error),
    /// A catch-all error with a message.
    Other(String),
}

impl HealthError {
    /// Short category name, stored in ERROR results so the cause survives serialization.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Http(_) => "http",
            Self::NotFound(_) => "not-found",
            Self::Git(_) => "git",
            Self::Descriptor(_) => "descriptor",
            Self::Timeout(_) => "timeout",
            Self::Conflict(_) => "conflict",
            Self::Config(_) => "config",
            Self::Json(_) => "json",
            Self::Other(_) => "other",
        }
    }
}

impl fmt::Display for HealthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Json(err) => write!(f, "json error: {err}"),
            Self::Http(message)
            | Self::NotFound(message)
            | Self::Git(message)
            | Self::Descriptor(message)
            | Self::Timeout(message)
            | Self::Conflict(message)
            | Self::Config(message)
            | Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for HealthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for HealthError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for HealthError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Convenience result type for plugin health operations.
pub type Result<T> = std::result::Result<T, HealthError>;
