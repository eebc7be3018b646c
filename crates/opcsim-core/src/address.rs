// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Addressing types shared by servers and clients.
//!
//! - [`Endpoint`]: a parsed `opc.tcp://host:port` URL
//! - [`QualifiedName`]: a browse name qualified by a namespace index
//! - [`TagPath`]: a browse path below the Objects folder
//! - [`TagHandle`]: an opaque, resolved reference to a published tag
//!
//! # Examples
//!
//! ```
//! use opcsim_core::address::{Endpoint, TagPath};
//!
//! let path: TagPath = "0:Objects/2:MockDevice/2:Temperature".parse().unwrap();
//! assert_eq!(path.to_string(), "Objects/2:MockDevice/2:Temperature");
//!
//! let server: Endpoint = "opc.tcp://0.0.0.0:4842".parse().unwrap();
//! let client: Endpoint = "opc.tcp://localhost:4842".parse().unwrap();
//! assert!(server.accepts(&client));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// URL scheme of OPC UA binary TCP endpoints.
pub const OPC_TCP_SCHEME: &str = "opc.tcp";

/// Port used when an endpoint URL does not carry one.
pub const DEFAULT_OPC_TCP_PORT: u16 = 4840;

/// Browse name of the standard Objects folder.
pub const OBJECTS_FOLDER: &str = "Objects";

// =============================================================================
// Endpoint
// =============================================================================

/// A parsed `opc.tcp://host:port[/path]` endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    host: String,
    port: u16,
    path: String,
}

impl Endpoint {
    /// Creates an endpoint from its parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: String::new(),
        }
    }

    /// Returns the host part.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the path part (empty or starting with `/`).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns `true` if the host is the wildcard address.
    pub fn is_wildcard(&self) -> bool {
        self.host == "0.0.0.0" || self.host == "::" || self.host == "[::]"
    }

    /// Returns the URL clients should use to reach this endpoint.
    ///
    /// A wildcard listen address is reported as `localhost`.
    pub fn advertised(&self) -> Endpoint {
        if self.is_wildcard() {
            Endpoint {
                host: "localhost".to_string(),
                ..self.clone()
            }
        } else {
            self.clone()
        }
    }

    /// Returns `true` if a server listening on `self` accepts a session
    /// requested for `requested`.
    pub fn accepts(&self, requested: &Endpoint) -> bool {
        if self.port != requested.port {
            return false;
        }
        self.is_wildcard() || normalize_host(&self.host) == normalize_host(&requested.host)
    }

    /// Returns the full URL.
    pub fn url(&self) -> String {
        format!("{}://{}:{}{}", OPC_TCP_SCHEME, self.host, self.port, self.path)
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    match host.as_str() {
        "localhost" | "127.0.0.1" | "::1" | "[::1]" => "localhost".to_string(),
        _ => host,
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = s.trim();
        let rest = url
            .strip_prefix(OPC_TCP_SCHEME)
            .and_then(|r| r.strip_prefix("://"))
            .ok_or_else(|| ConfigError::invalid_endpoint(url, "Endpoint must start with opc.tcp://"))?;

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };

        if authority.is_empty() {
            return Err(ConfigError::invalid_endpoint(url, "Missing host"));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) if !host.ends_with(':') => {
                let port: u16 = port
                    .parse()
                    .map_err(|_| ConfigError::invalid_endpoint(url, "Invalid port"))?;
                (host, port)
            }
            _ => (authority, DEFAULT_OPC_TCP_PORT),
        };

        if host.is_empty() {
            return Err(ConfigError::invalid_endpoint(url, "Missing host"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.trim_end_matches('/').to_string(),
        })
    }
}

impl TryFrom<String> for Endpoint {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.url()
    }
}

// =============================================================================
// QualifiedName
// =============================================================================

/// A browse name qualified by a namespace index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The name string.
    pub name: String,
}

impl QualifiedName {
    /// Creates a new qualified name.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }

    /// Creates a qualified name in namespace 0.
    pub fn standard(name: impl Into<String>) -> Self {
        Self::new(0, name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.namespace_index, self.name)
        }
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        if let Some((ns, name)) = s.split_once(':') {
            if let Ok(ns_idx) = ns.parse::<u16>() {
                return Self::new(ns_idx, name);
            }
        }
        Self::standard(s)
    }
}

// =============================================================================
// TagPath
// =============================================================================

/// A browse path from the Objects folder to a tag.
///
/// The text form is `Objects/<ns>:<Object>/<ns>:<Tag>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagPath {
    segments: Vec<QualifiedName>,
}

impl TagPath {
    /// Creates a path from its segments.
    pub fn new(segments: Vec<QualifiedName>) -> Result<Self, ConfigError> {
        if segments.is_empty() {
            return Err(ConfigError::invalid_path(OBJECTS_FOLDER, "Empty path"));
        }
        if let Some(bad) = segments.iter().find(|s| s.name.is_empty()) {
            return Err(ConfigError::invalid_path(
                bad.to_string(),
                "Empty segment name",
            ));
        }
        Ok(Self { segments })
    }

    /// Creates the path of a tag organized under an object in one namespace.
    pub fn under_object(namespace_index: u16, object: &str, tag: &str) -> Result<Self, ConfigError> {
        Self::new(vec![
            QualifiedName::new(namespace_index, object),
            QualifiedName::new(namespace_index, tag),
        ])
    }

    /// Returns the segments below the Objects folder.
    pub fn segments(&self) -> &[QualifiedName] {
        &self.segments
    }

    /// Returns the final segment (the tag's browse name).
    pub fn leaf(&self) -> &QualifiedName {
        // Non-empty by construction.
        &self.segments[self.segments.len() - 1]
    }

    /// Returns the segments leading to the leaf.
    pub fn parents(&self) -> &[QualifiedName] {
        &self.segments[..self.segments.len() - 1]
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", OBJECTS_FOLDER)?;
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for TagPath {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<QualifiedName> = s
            .split('/')
            .filter(|p| !p.is_empty())
            .map(QualifiedName::from)
            .collect();

        if parts
            .first()
            .map(|first| first.namespace_index == 0 && first.name == OBJECTS_FOLDER)
            .unwrap_or(false)
        {
            parts.remove(0);
        }

        Self::new(parts).map_err(|e| match e {
            ConfigError::InvalidPath { reason, .. } => ConfigError::invalid_path(s, reason),
            other => other,
        })
    }
}

impl TryFrom<String> for TagPath {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TagPath> for String {
    fn from(path: TagPath) -> Self {
        path.to_string()
    }
}

// =============================================================================
// TagHandle
// =============================================================================

/// An opaque, resolved reference to a published tag.
///
/// Handles are produced by a client transport's `resolve` and are only
/// meaningful to the transport that issued them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagHandle {
    path: TagPath,
    node: String,
}

impl TagHandle {
    /// Creates a handle. Intended for transport implementations.
    pub fn new(path: TagPath, node: impl Into<String>) -> Self {
        Self {
            path,
            node: node.into(),
        }
    }

    /// Returns the path this handle was resolved from.
    pub fn path(&self) -> &TagPath {
        &self.path
    }

    /// Returns the transport-specific node key.
    pub fn node(&self) -> &str {
        &self.node
    }
}

impl fmt::Display for TagHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.node)
    }
}

// =============================================================================
// Tests
// =============================================================================
