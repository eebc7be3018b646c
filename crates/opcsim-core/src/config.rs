// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server and client configuration.
//!
//! The two processes share an implicit contract: endpoint port, namespace
//! URI, device object name and tag names must match exactly. The defaults
//! here are that contract; both binaries run on them unchanged.
//!
//! # Examples
//!
//! ```
//! use opcsim_core::config::{ClientConfig, ServerConfig};
//!
//! let server = ServerConfig::default();
//! let client = ClientConfig::default();
//! assert!(server.validate().is_ok());
//! assert!(server.endpoint.accepts(&client.endpoint));
//! assert_eq!(server.namespace_uri, client.namespace_uri);
//! ```

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::address::{Endpoint, TagPath};
use crate::error::ConfigError;
use crate::types::TagRange;

// =============================================================================
// Constants
// =============================================================================

/// Period between two ticks of the update and poll loops.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Address the server listens on.
pub const DEFAULT_SERVER_ENDPOINT: &str = "opc.tcp://0.0.0.0:4842";

/// Address the client connects to.
pub const DEFAULT_CLIENT_ENDPOINT: &str = "opc.tcp://localhost:4842";

/// Server application name.
pub const DEFAULT_SERVER_NAME: &str = "Mock OPC UA Server";

/// Namespace URI qualifying the device and tag browse names.
pub const DEFAULT_NAMESPACE_URI: &str = "http://example.com/mockopcua";

/// Browse name of the object the tags are organized under.
pub const DEFAULT_DEVICE_NAME: &str = "MockDevice";

// =============================================================================
// TagSpec
// =============================================================================

/// Declaration of one simulated tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSpec {
    /// Tag name (browse name of the published variable).
    pub name: String,

    /// Name used in log lines. Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Value at startup.
    pub initial_value: f64,

    /// Range the update loop draws from.
    pub range: TagRange,

    /// Whether remote clients may write the tag.
    #[serde(default = "default_writable")]
    pub writable: bool,
}

fn default_writable() -> bool {
    true
}

impl TagSpec {
    /// Creates a writable tag declaration.
    pub fn new(name: impl Into<String>, initial_value: f64, range: TagRange) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            initial_value,
            range,
            writable: true,
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Sets the writable flag.
    pub fn with_writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    /// Returns the display name, falling back to the tag name.
    pub fn effective_display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Returns a client-side reference to this tag.
    pub fn to_ref(&self) -> TagRef {
        TagRef {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// The three simulated sensor tags.
pub fn default_tags() -> Vec<TagSpec> {
    vec![
        TagSpec::new("Temperature", 25.0, TagRange::from_static(20.0, 30.0)),
        TagSpec::new("Pressure", 1000.0, TagRange::from_static(950.0, 1050.0)),
        TagSpec::new("FlowRate", 10.0, TagRange::from_static(5.0, 15.0))
            .with_display_name("Flow Rate"),
    ]
}

// =============================================================================
// TagRef
// =============================================================================

/// A client-side reference to a remote tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    /// Tag name (browse name of the remote variable).
    pub name: String,

    /// Name used in log lines. Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl TagRef {
    /// Returns the display name, falling back to the tag name.
    pub fn effective_display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

// =============================================================================
// ServerConfig
// =============================================================================

/// Configuration of the simulated server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen endpoint.
    #[serde(default = "default_server_endpoint")]
    pub endpoint: Endpoint,

    /// Server application name.
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Namespace URI registered for the device and its tags.
    #[serde(default = "default_namespace_uri")]
    pub namespace_uri: String,

    /// Browse name of the device object.
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Simulated tags, in publication and update order.
    #[serde(default = "default_tags")]
    pub tags: Vec<TagSpec>,
}

fn default_server_endpoint() -> Endpoint {
    Endpoint::new("0.0.0.0", 4842)
}

fn default_client_endpoint() -> Endpoint {
    Endpoint::new("localhost", 4842)
}

fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.to_string()
}

fn default_namespace_uri() -> String {
    DEFAULT_NAMESPACE_URI.to_string()
}

fn default_device_name() -> String {
    DEFAULT_DEVICE_NAME.to_string()
}

fn default_client_name() -> String {
    "Mock OPC UA Client".to_string()
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_tag_refs() -> Vec<TagRef> {
    default_tags().iter().map(TagSpec::to_ref).collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_server_endpoint(),
            server_name: default_server_name(),
            namespace_uri: default_namespace_uri(),
            device_name: default_device_name(),
            tags: default_tags(),
        }
    }
}

impl ServerConfig {
    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_common(&self.namespace_uri, &self.device_name)?;
        if self.server_name.trim().is_empty() {
            return Err(ConfigError::validation("server_name", "must not be empty"));
        }
        validate_tag_names(self.tags.iter().map(|t| t.name.as_str()))?;
        if let Some(tag) = self.tags.iter().find(|t| !t.initial_value.is_finite()) {
            return Err(ConfigError::validation(
                "tags",
                format!("initial value of '{}' must be finite", tag.name),
            ));
        }
        Ok(())
    }

    /// Returns the application URI of the server.
    pub fn application_uri(&self) -> String {
        format!("urn:opcsim:{}", self.server_name.replace(' ', ""))
    }

    /// Returns the browse path of a tag given the registered namespace index.
    pub fn tag_path(&self, namespace_index: u16, tag: &str) -> Result<TagPath, ConfigError> {
        TagPath::under_object(namespace_index, &self.device_name, tag)
    }
}

// =============================================================================
// ClientConfig
// =============================================================================

/// Configuration of the polling client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server endpoint to connect to.
    #[serde(default = "default_client_endpoint")]
    pub endpoint: Endpoint,

    /// Client application name.
    #[serde(default = "default_client_name")]
    pub application_name: String,

    /// Requested session timeout.
    #[serde(default = "default_session_timeout", with = "humantime_serde")]
    pub session_timeout: Duration,

    /// Namespace URI of the device and its tags.
    #[serde(default = "default_namespace_uri")]
    pub namespace_uri: String,

    /// Browse name of the device object.
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Tags to poll, in read order.
    #[serde(default = "default_tag_refs")]
    pub tags: Vec<TagRef>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_client_endpoint(),
            application_name: default_client_name(),
            session_timeout: default_session_timeout(),
            namespace_uri: default_namespace_uri(),
            device_name: default_device_name(),
            tags: default_tag_refs(),
        }
    }
}

impl ClientConfig {
    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_common(&self.namespace_uri, &self.device_name)?;
        if self.session_timeout.is_zero() {
            return Err(ConfigError::validation(
                "session_timeout",
                "must be greater than 0",
            ));
        }
        validate_tag_names(self.tags.iter().map(|t| t.name.as_str()))
    }

    /// Returns the browse path of a tag given the resolved namespace index.
    pub fn tag_path(&self, namespace_index: u16, tag: &str) -> Result<TagPath, ConfigError> {
        TagPath::under_object(namespace_index, &self.device_name, tag)
    }
}

// =============================================================================
// Validation helpers
// =============================================================================

fn validate_common(namespace_uri: &str, device_name: &str) -> Result<(), ConfigError> {
    if namespace_uri.trim().is_empty() {
        return Err(ConfigError::validation("namespace_uri", "must not be empty"));
    }
    if device_name.trim().is_empty() || device_name.contains('/') {
        return Err(ConfigError::validation(
            "device_name",
            "must be a non-empty browse name without '/'",
        ));
    }
    Ok(())
}

fn validate_tag_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    let mut count = 0usize;
    for name in names {
        count += 1;
        if name.trim().is_empty() || name.contains('/') {
            return Err(ConfigError::validation(
                "tags",
                format!("invalid tag name '{}'", name),
            ));
        }
        if !seen.insert(name) {
            return Err(ConfigError::validation(
                "tags",
                format!("duplicate tag name '{}'", name),
            ));
        }
    }
    if count == 0 {
        return Err(ConfigError::validation("tags", "at least one tag is required"));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_between_processes() {
        let server = ServerConfig::default();
        let client = ClientConfig::default();

        assert_eq!(server.endpoint.url(), DEFAULT_SERVER_ENDPOINT);
        assert_eq!(client.endpoint.url(), DEFAULT_CLIENT_ENDPOINT);
        assert!(server.endpoint.accepts(&client.endpoint));
        assert_eq!(server.device_name, client.device_name);

        let server_names: Vec<_> = server.tags.iter().map(|t| t.name.clone()).collect();
        let client_names: Vec<_> = client.tags.iter().map(|t| t.name.clone()).collect();
        assert_eq!(server_names, client_names);
        assert_eq!(client.tags[2].effective_display_name(), "Flow Rate");
    }

    #[test]
    fn test_default_tag_table() {
        let tags = default_tags();
        assert_eq!(tags[0].initial_value, 25.0);
        assert_eq!(tags[1].range, TagRange::new(950.0, 1050.0).unwrap());
        assert_eq!(tags[2].effective_display_name(), "Flow Rate");
        assert!(tags.iter().all(|t| t.writable));
    }

    #[test]
    fn test_validation_rejects_duplicates() {
        let mut config = ServerConfig::default();
        config.tags.push(config.tags[0].clone());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "tags"
        ));
    }

    #[test]
    fn test_validation_rejects_empty_tags() {
        let mut config = ClientConfig::default();
        config.tags.clear();
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.session_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"endpoint": "opc.tcp://0.0.0.0:4900"}"#).unwrap();
        assert_eq!(config.endpoint.port(), 4900);
        assert_eq!(config.namespace_uri, DEFAULT_NAMESPACE_URI);
        assert_eq!(config.tags.len(), 3);

        let config: ClientConfig = serde_json::from_str(r#"{"session_timeout": "5s"}"#).unwrap();
        assert_eq!(config.session_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_tag_path() {
        let config = ServerConfig::default();
        let path = config.tag_path(2, "Pressure").unwrap();
        assert_eq!(path.to_string(), "Objects/2:MockDevice/2:Pressure");
        assert_eq!(config.application_uri(), "urn:opcsim:MockOPCUAServer");
    }
}
