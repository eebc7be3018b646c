// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for opcsim.
//!
//! None of these errors are recovered locally: every one of them aborts the
//! enclosing loop and, in the binaries, terminates the process with a
//! diagnostic. The categories exist for structured logging and exit codes.
//!
//! # Error Hierarchy
//!
//! ```text
//! SimError (root)
//! ├── RegistryError   - Tag registry misuse (duplicate, unknown, read-only)
//! ├── TransportError  - Protocol collaborator failures (connect, resolve, read, write)
//! └── ConfigError     - Invalid endpoints, ranges, paths, settings
//! ```
//!
//! # Examples
//!
//! ```
//! use opcsim_core::error::{RegistryError, SimError};
//!
//! let error = RegistryError::unknown_tag("Humidity");
//! assert_eq!(error.to_string(), "Unknown tag: 'Humidity'");
//!
//! let sim_error: SimError = error.into();
//! assert_eq!(sim_error.category(), "registry");
//! ```

use thiserror::Error;

/// Result type alias for opcsim operations.
pub type SimResult<T> = Result<T, SimError>;

// =============================================================================
// SimError - Root Error Type
// =============================================================================

/// The root error type for opcsim.
#[derive(Debug, Error)]
pub enum SimError {
    /// Tag registry error.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Transport collaborator error.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SimError {
    /// Returns the error category as a string for logging.
    pub fn category(&self) -> &'static str {
        match self {
            SimError::Registry(_) => "registry",
            SimError::Transport(e) => e.category(),
            SimError::Config(_) => "config",
        }
    }

    /// Logs this error with its category and the given context.
    pub fn log(&self, context: &str) {
        tracing::error!(category = self.category(), context = context, "{self}");
    }
}

// =============================================================================
// RegistryError
// =============================================================================

/// Errors raised by the tag registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A tag with this name is already registered.
    #[error("Duplicate tag: '{name}'")]
    DuplicateTag {
        /// The duplicated tag name.
        name: String,
    },

    /// No tag with this name is registered.
    #[error("Unknown tag: '{name}'")]
    UnknownTag {
        /// The missing tag name.
        name: String,
    },

    /// The tag exists but its writable flag is false.
    #[error("Tag '{name}' is not writable")]
    NotWritable {
        /// The read-only tag name.
        name: String,
    },
}

impl RegistryError {
    /// Creates a duplicate tag error.
    pub fn duplicate_tag(name: impl Into<String>) -> Self {
        Self::DuplicateTag { name: name.into() }
    }

    /// Creates an unknown tag error.
    pub fn unknown_tag(name: impl Into<String>) -> Self {
        Self::UnknownTag { name: name.into() }
    }

    /// Creates a not writable error.
    pub fn not_writable(name: impl Into<String>) -> Self {
        Self::NotWritable { name: name.into() }
    }

    /// Returns the tag name this error refers to.
    pub fn tag_name(&self) -> &str {
        match self {
            Self::DuplicateTag { name } | Self::UnknownTag { name } | Self::NotWritable { name } => {
                name
            }
        }
    }
}

// =============================================================================
// TransportError
// =============================================================================

/// Errors raised by a transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// A session could not be established.
    #[error("Connection to '{endpoint}' failed: {message}")]
    Connection {
        /// The endpoint URL.
        endpoint: String,
        /// Failure description.
        message: String,
    },

    /// A path or namespace did not resolve.
    #[error("Address not found: {address}")]
    AddressNotFound {
        /// The unresolved path or namespace URI.
        address: String,
    },

    /// Reading a resolved tag failed.
    #[error("Read failed for '{path}': {message}")]
    Read {
        /// The tag path.
        path: String,
        /// Failure description.
        message: String,
    },

    /// Writing a resolved tag failed.
    #[error("Write failed for '{path}': {message}")]
    Write {
        /// The tag path.
        path: String,
        /// Failure description.
        message: String,
    },

    /// An operation needed a session that does not exist.
    #[error("Not connected")]
    NotConnected,

    /// `listen` was called on a transport that is already listening.
    #[error("Already listening on '{endpoint}'")]
    AlreadyListening {
        /// The endpoint being listened on.
        endpoint: String,
    },

    /// An operation needed a listening server.
    #[error("Not listening")]
    NotListening,

    /// A tag could not be published.
    #[error("Publish failed for '{path}': {message}")]
    Publish {
        /// The tag path.
        path: String,
        /// Failure description.
        message: String,
    },
}

impl TransportError {
    /// Creates a connection error.
    pub fn connection(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates an address not found error.
    pub fn address_not_found(address: impl Into<String>) -> Self {
        Self::AddressNotFound {
            address: address.into(),
        }
    }

    /// Creates a read error.
    pub fn read(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a write error.
    pub fn write(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a publish error.
    pub fn publish(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection { .. } | Self::NotConnected => "connection",
            Self::AddressNotFound { .. } => "address",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::AlreadyListening { .. } | Self::NotListening | Self::Publish { .. } => "server",
        }
    }
}

// =============================================================================
// ConfigError
// =============================================================================

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Endpoint URL could not be parsed.
    #[error("Invalid endpoint '{url}': {reason}")]
    InvalidEndpoint {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A tag range is empty or not finite.
    #[error("Invalid range [{min}, {max}): {reason}")]
    InvalidRange {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
        /// Why it was rejected.
        reason: String,
    },

    /// A browse path could not be parsed.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A field failed validation.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid range error.
    pub fn invalid_range(min: f64, max: f64, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            min,
            max,
            reason: reason.into(),
        }
    }

    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
