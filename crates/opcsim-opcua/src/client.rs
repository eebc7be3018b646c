// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client transport built on the `opcua` crate.
//!
//! The `opcua` client API is synchronous, so every session call runs on
//! tokio's blocking pool.
//!
//! # Example
//!
//! ```rust,ignore
//! use opcsim_opcua::{OpcUaClientSettings, OpcUaClientTransport};
//!
//! let mut transport = OpcUaClientTransport::new(OpcUaClientSettings::default());
//! transport.connect(&"opc.tcp://localhost:4842".parse()?).await?;
//! ```

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use opcua::client::prelude::*;
use opcua::sync::RwLock as OpcUaRwLock;

use opcsim_core::{
    ClientTransport, Endpoint, TagHandle, TagPath, TransportError, TransportResult,
};

use crate::convert::{namespace_array, to_browse_path, variant_to_f64};
use crate::nodes::find_namespace;
use crate::settings::OpcUaClientSettings;

type SharedSession = Arc<OpcUaRwLock<Session>>;

/// [`ClientTransport`] reading tags over OPC UA binary (`opc.tcp`).
pub struct OpcUaClientTransport {
    settings: OpcUaClientSettings,
    session: Option<SharedSession>,
}

impl OpcUaClientTransport {
    /// Creates a disconnected transport.
    pub fn new(settings: OpcUaClientSettings) -> Self {
        Self {
            settings,
            session: None,
        }
    }

    fn session(&self) -> TransportResult<SharedSession> {
        self.session.clone().ok_or(TransportError::NotConnected)
    }

    /// Runs a blocking session call on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> TransportResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Session) -> TransportResult<T> + Send + 'static,
    {
        let session = self.session()?;
        tokio::task::spawn_blocking(move || {
            let session = session.read();
            f(&session)
        })
        .await
        .map_err(|e| TransportError::connection("session", format!("Session task failed: {}", e)))?
    }
}

impl Default for OpcUaClientTransport {
    fn default() -> Self {
        Self::new(OpcUaClientSettings::default())
    }
}

fn open_session(settings: &OpcUaClientSettings, url: &str) -> TransportResult<SharedSession> {
    let mut client = ClientBuilder::new()
        .application_name(settings.application_name.as_str())
        .application_uri(settings.application_uri.as_str())
        .product_uri(crate::settings::PRODUCT_URI)
        .pki_dir(&settings.pki_dir)
        .create_sample_keypair(true)
        .trust_server_certs(true)
        .session_retry_limit(0)
        .session_timeout(settings.session_timeout_ms())
        .client()
        .ok_or_else(|| TransportError::connection(url, "Failed to build OPC UA client"))?;

    let endpoints = client
        .get_server_endpoints_from_url(url)
        .map_err(|status| TransportError::connection(url, status.to_string()))?;

    let mut endpoint = endpoints
        .into_iter()
        .find(|e| {
            e.security_policy_uri.as_ref() == SecurityPolicy::None.to_uri()
                && e.security_mode == MessageSecurityMode::None
        })
        .ok_or_else(|| TransportError::connection(url, "No unsecured endpoint offered"))?;
    // Keep the host the caller asked for; a wildcard listener advertises 0.0.0.0.
    endpoint.endpoint_url = UAString::from(url);

    client
        .connect_to_endpoint(endpoint, IdentityToken::Anonymous)
        .map_err(|status| TransportError::connection(url, status.to_string()))
}

fn value_read(node_id: NodeId) -> ReadValueId {
    ReadValueId {
        node_id,
        attribute_id: AttributeId::Value as u32,
        index_range: UAString::null(),
        data_encoding: QualifiedName::null(),
    }
}

fn parse_node_id(handle: &TagHandle) -> Option<NodeId> {
    NodeId::from_str(handle.node()).ok()
}

#[async_trait]
impl ClientTransport for OpcUaClientTransport {
    async fn connect(&mut self, endpoint: &Endpoint) -> TransportResult<()> {
        let url = endpoint.url();
        let settings = self.settings.clone();
        let session = {
            let url = url.clone();
            tokio::task::spawn_blocking(move || open_session(&settings, &url))
                .await
                .map_err(|e| TransportError::connection(endpoint.url(), e.to_string()))??
        };
        debug!(endpoint = %url, "OPC UA session established");
        self.session = Some(session);
        Ok(())
    }

    async fn namespace_index(&self, uri: &str) -> TransportResult<u16> {
        let uri = uri.to_string();
        self.blocking(move |session| {
            let values = session
                .read(
                    &[value_read(VariableId::Server_NamespaceArray.into())],
                    TimestampsToReturn::Neither,
                    0.0,
                )
                .map_err(|status| TransportError::read("Server_NamespaceArray", status.to_string()))?;
            let namespaces = values
                .first()
                .and_then(|dv| dv.value.as_ref())
                .and_then(namespace_array)
                .ok_or_else(|| {
                    TransportError::read("Server_NamespaceArray", "Unexpected value type")
                })?;
            find_namespace(&namespaces, &uri).ok_or_else(|| TransportError::address_not_found(uri))
        })
        .await
    }

    async fn resolve(&self, path: &TagPath) -> TransportResult<TagHandle> {
        let path = path.clone();
        self.blocking(move |session| {
            let results = session
                .translate_browse_paths_to_node_ids(&[to_browse_path(&path)])
                .map_err(|_| TransportError::address_not_found(path.to_string()))?;

            let node_id = results
                .first()
                .filter(|r| r.status_code.is_good())
                .and_then(|r| r.targets.as_ref())
                .and_then(|targets| targets.first())
                .map(|target| target.target_id.node_id.clone())
                .ok_or_else(|| TransportError::address_not_found(path.to_string()))?;

            trace!(path = %path, node_id = %node_id, "Resolved browse path");
            Ok(TagHandle::new(path, node_id.to_string()))
        })
        .await
    }

    async fn read_value(&self, handle: &TagHandle) -> TransportResult<f64> {
        let node = handle.node().to_string();
        let node_id = parse_node_id(handle)
            .ok_or_else(|| TransportError::read(node.as_str(), "Invalid node id"))?;
        self.blocking(move |session| {
            let values = session
                .read(&[value_read(node_id)], TimestampsToReturn::Neither, 0.0)
                .map_err(|status| TransportError::read(node.as_str(), status.to_string()))?;
            let data_value = values
                .first()
                .ok_or_else(|| TransportError::read(node.as_str(), "Empty read response"))?;

            if let Some(status) = data_value.status {
                if !status.is_good() {
                    return Err(TransportError::read(node.as_str(), status.to_string()));
                }
            }
            data_value
                .value
                .as_ref()
                .and_then(variant_to_f64)
                .ok_or_else(|| TransportError::read(node.as_str(), "Value is not numeric"))
        })
        .await
    }

    async fn write_value(&self, handle: &TagHandle, value: f64) -> TransportResult<()> {
        let node = handle.node().to_string();
        let node_id = parse_node_id(handle)
            .ok_or_else(|| TransportError::write(node.as_str(), "Invalid node id"))?;
        self.blocking(move |session| {
            let write = WriteValue {
                node_id,
                attribute_id: AttributeId::Value as u32,
                index_range: UAString::null(),
                value: DataValue::new_now(value),
            };
            let results = session
                .write(&[write])
                .map_err(|status| TransportError::write(node.as_str(), status.to_string()))?;
            match results.first() {
                Some(status) if status.is_good() => Ok(()),
                Some(status) => Err(TransportError::write(node.as_str(), status.to_string())),
                None => Err(TransportError::write(node.as_str(), "Empty write response")),
            }
        })
        .await
    }

    async fn disconnect(&mut self) -> TransportResult<()> {
        let session = self.session.take().ok_or(TransportError::NotConnected)?;
        tokio::task::spawn_blocking(move || session.read().disconnect())
            .await
            .map_err(|e| TransportError::connection("session", e.to_string()))?;
        debug!("OPC UA session closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.read().is_connected())
            .unwrap_or(false)
    }
}
