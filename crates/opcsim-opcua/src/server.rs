// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA server transport built on the `opcua` crate.
//!
//! Namespaces and tags are staged until [`listen`](ServerTransport::listen)
//! because the `opcua` server owns its address space and is only created
//! once the endpoint is known. Each tag becomes a `Double` variable whose
//! value getter and setter call the tag's [`TagAccessor`], so remote reads
//! always see the registry's current value.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use opcua::server::prelude::*;
use opcua::sync::RwLock as OpcUaRwLock;

use opcsim_core::{
    Endpoint, ServerTransport, TagAccessor, TagPath, TransportError, TransportResult,
};

use crate::convert::{node_id_for, to_node_id, to_ua_qualified_name, variant_to_f64};
use crate::nodes::{NamespaceTable, StagedTags};
use crate::settings::OpcUaServerSettings;

/// How long `unlisten` waits for the server task after aborting it.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

struct RunningServer {
    server: Arc<OpcUaRwLock<Server>>,
    task: JoinHandle<()>,
    endpoint: Endpoint,
}

/// [`ServerTransport`] serving tags over OPC UA binary (`opc.tcp`).
pub struct OpcUaServerTransport {
    settings: OpcUaServerSettings,
    namespaces: NamespaceTable,
    staged: StagedTags,
    running: Option<RunningServer>,
}

impl OpcUaServerTransport {
    /// Creates a transport with the given settings.
    pub fn new(settings: OpcUaServerSettings) -> Self {
        Self {
            settings,
            namespaces: NamespaceTable::new(),
            staged: StagedTags::new(),
            running: None,
        }
    }

    fn build_server(&self, endpoint: &Endpoint, server_name: &str) -> TransportResult<Server> {
        ServerBuilder::new_anonymous(server_name)
            .application_uri(self.settings.application_uri.as_str())
            .product_uri(self.settings.product_uri.as_str())
            .host_and_port(endpoint.host(), endpoint.port())
            .discovery_urls(vec![endpoint.advertised().url()])
            .pki_dir(&self.settings.pki_dir)
            .create_sample_keypair(true)
            .server()
            .ok_or_else(|| TransportError::connection(endpoint.url(), "Invalid server configuration"))
    }

    fn populate(&self, server: &Server) -> TransportResult<()> {
        let address_space = server.address_space();
        let mut address_space = address_space.write();

        for (predicted, uri) in self.namespaces.iter() {
            let index = address_space
                .register_namespace(uri)
                .map_err(|_| TransportError::publish(uri, "Namespace registration failed"))?;
            if index != predicted {
                return Err(TransportError::publish(
                    uri,
                    format!("Namespace registered at {} instead of {}", index, predicted),
                ));
            }
        }

        for object in self.staged.objects() {
            let node_id = to_node_id(&object.key);
            let builder = ObjectBuilder::new(
                &node_id,
                to_ua_qualified_name(&object.browse_name),
                object.browse_name.name.as_str(),
            );
            let builder = match &object.parent {
                None => builder.organized_by(ObjectId::ObjectsFolder),
                Some(parent) => builder.component_of(to_node_id(parent)),
            };
            if !builder.insert(&mut address_space) {
                return Err(TransportError::publish(
                    object.key.to_string(),
                    "Object node already exists",
                ));
            }
        }

        for (path, accessor) in self.staged.entries() {
            add_variable(&mut address_space, path, accessor)?;
        }
        Ok(())
    }
}

impl Default for OpcUaServerTransport {
    fn default() -> Self {
        Self::new(OpcUaServerSettings::default())
    }
}

fn add_variable(
    address_space: &mut AddressSpace,
    path: &TagPath,
    accessor: &TagAccessor,
) -> TransportResult<()> {
    let leaf = path.leaf();
    let node_id = node_id_for(path.segments());
    let parent_id = node_id_for(path.parents());
    let initial = accessor
        .read()
        .map_err(|e| TransportError::publish(path.to_string(), e.to_string()))?;

    let reader = accessor.clone();
    let getter = AttrFnGetter::new_boxed(
        move |_: &NodeId,
              _: TimestampsToReturn,
              _: AttributeId,
              _: NumericRange,
              _: &QualifiedName,
              _: f64|
              -> Result<Option<DataValue>, StatusCode> {
            reader
                .read()
                .map(|value| Some(DataValue::new_now(value)))
                .map_err(|_| StatusCode::BadNodeIdUnknown)
        },
    );

    let mut builder = VariableBuilder::new(&node_id, to_ua_qualified_name(leaf), leaf.name.as_str())
        .data_type(DataTypeId::Double)
        .value(initial)
        .component_of(parent_id)
        .value_getter(getter);

    if accessor.is_writable() {
        let writer = accessor.clone();
        let setter = AttrFnSetter::new_boxed(
            move |_: &NodeId, _: AttributeId, _: NumericRange, value: DataValue| -> Result<(), StatusCode> {
                let value = value
                    .value
                    .as_ref()
                    .and_then(variant_to_f64)
                    .ok_or(StatusCode::BadTypeMismatch)?;
                writer.write(value).map_err(|_| StatusCode::BadNotWritable)
            },
        );
        builder = builder.writable().value_setter(setter);
    }

    if !builder.insert(address_space) {
        return Err(TransportError::publish(path.to_string(), "Node already exists"));
    }
    debug!(path = %path, node_id = %node_id, "Added variable");
    Ok(())
}

#[async_trait]
impl ServerTransport for OpcUaServerTransport {
    async fn register_namespace(&mut self, uri: &str) -> TransportResult<u16> {
        self.namespaces.register(uri)
    }

    async fn publish(&mut self, path: &TagPath, accessor: TagAccessor) -> TransportResult<()> {
        if self.running.is_some() {
            return Err(TransportError::publish(
                path.to_string(),
                "Tags must be published before listening",
            ));
        }
        self.staged.stage(&self.namespaces, path, accessor)
    }

    async fn listen(&mut self, endpoint: &Endpoint, server_name: &str) -> TransportResult<()> {
        if let Some(running) = &self.running {
            return Err(TransportError::AlreadyListening {
                endpoint: running.endpoint.url(),
            });
        }

        let server = self.build_server(endpoint, server_name)?;
        self.populate(&server)?;

        let server = Arc::new(OpcUaRwLock::new(server));
        let task = tokio::spawn(Server::new_server_task(server.clone()));
        info!(
            endpoint = %endpoint,
            tags = self.staged.len(),
            "OPC UA server listening"
        );

        self.running = Some(RunningServer {
            server,
            task,
            endpoint: endpoint.clone(),
        });
        Ok(())
    }

    async fn unlisten(&mut self) -> TransportResult<()> {
        let running = self.running.take().ok_or(TransportError::NotListening)?;
        running.server.write().abort();

        match tokio::time::timeout(STOP_TIMEOUT, running.task).await {
            Ok(Ok(())) => debug!(endpoint = %running.endpoint, "OPC UA server task finished"),
            Ok(Err(e)) => warn!(error = %e, "OPC UA server task failed"),
            Err(_) => warn!(
                timeout_secs = STOP_TIMEOUT.as_secs(),
                "OPC UA server task did not finish in time"
            ),
        }
        Ok(())
    }

    fn is_listening(&self) -> bool {
        self.running.is_some()
    }
}
