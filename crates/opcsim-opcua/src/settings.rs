// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Settings for the OPC UA transports that the core configuration does not
//! carry.

use std::path::PathBuf;
use std::time::Duration;

use opcsim_core::{ClientConfig, ServerConfig};

/// Product URI advertised by both applications.
pub const PRODUCT_URI: &str = "urn:opcsim";

/// Default PKI directory of the server.
pub const DEFAULT_SERVER_PKI_DIR: &str = "./pki-server";

/// Default PKI directory of the client.
pub const DEFAULT_CLIENT_PKI_DIR: &str = "./pki-client";

/// Server transport settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OpcUaServerSettings {
    /// Application URI of the server.
    pub application_uri: String,
    /// Product URI of the server.
    pub product_uri: String,
    /// Certificate store directory.
    pub pki_dir: PathBuf,
}

impl OpcUaServerSettings {
    /// Derives settings from a server configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            application_uri: config.application_uri(),
            ..Self::default()
        }
    }

    /// Overrides the certificate store directory.
    pub fn with_pki_dir(mut self, pki_dir: impl Into<PathBuf>) -> Self {
        self.pki_dir = pki_dir.into();
        self
    }
}

impl Default for OpcUaServerSettings {
    fn default() -> Self {
        Self {
            application_uri: ServerConfig::default().application_uri(),
            product_uri: PRODUCT_URI.to_string(),
            pki_dir: PathBuf::from(DEFAULT_SERVER_PKI_DIR),
        }
    }
}

/// Client transport settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OpcUaClientSettings {
    /// Application name of the client.
    pub application_name: String,
    /// Application URI of the client.
    pub application_uri: String,
    /// Requested session timeout.
    pub session_timeout: Duration,
    /// Certificate store directory.
    pub pki_dir: PathBuf,
}

impl OpcUaClientSettings {
    /// Derives settings from a client configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            application_name: config.application_name.clone(),
            application_uri: format!(
                "urn:opcsim:{}",
                config.application_name.replace(' ', "")
            ),
            session_timeout: config.session_timeout,
            pki_dir: PathBuf::from(DEFAULT_CLIENT_PKI_DIR),
        }
    }

    /// Overrides the certificate store directory.
    pub fn with_pki_dir(mut self, pki_dir: impl Into<PathBuf>) -> Self {
        self.pki_dir = pki_dir.into();
        self
    }

    /// Session timeout in milliseconds, saturated to `u32`.
    pub fn session_timeout_ms(&self) -> u32 {
        u32::try_from(self.session_timeout.as_millis()).unwrap_or(u32::MAX)
    }
}

impl Default for OpcUaClientSettings {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}
