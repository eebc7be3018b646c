// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Round trip of the update and poll loops over a real OPC UA socket.
//!
//! These tests bind a local TCP port and write certificate stores under the
//! system temp directory, so they are ignored by default.
//!
//! ```bash
//! cargo test -p opcsim-opcua --features real-transport --test opcua_roundtrip -- --ignored
//! ```

#![cfg(feature = "real-transport")]

use std::time::Duration;

use opcsim_core::{
    ClientConfig, Endpoint, PollLoop, ServerConfig, ShutdownCoordinator, UniformSource,
    UpdateLoop,
};
use opcsim_opcua::{
    OpcUaClientSettings, OpcUaClientTransport, OpcUaServerSettings, OpcUaServerTransport,
};

/// Port used by the tests; distinct from the default 4842.
const TEST_PORT: u16 = 48420;

fn pki_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("opcsim-test-{}", name))
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "binds a local TCP port"]
async fn test_client_reads_defaults_and_writes() {
    let server_config = ServerConfig {
        endpoint: Endpoint::new("0.0.0.0", TEST_PORT),
        ..ServerConfig::default()
    };
    let server_transport = OpcUaServerTransport::new(
        OpcUaServerSettings::from_config(&server_config).with_pki_dir(pki_dir("server")),
    );
    let mut update =
        UpdateLoop::new(server_config, server_transport, UniformSource::seeded(1)).unwrap();
    let registry = update.registry().clone();

    let coordinator = ShutdownCoordinator::new();
    let token = coordinator.token();
    let server = tokio::spawn(async move { update.run(token).await });
    tokio::time::sleep(Duration::from_millis(300)).await;

    let client_config = ClientConfig {
        endpoint: Endpoint::new("localhost", TEST_PORT),
        ..ClientConfig::default()
    };
    let client_transport = OpcUaClientTransport::new(
        OpcUaClientSettings::from_config(&client_config).with_pki_dir(pki_dir("client")),
    );
    let mut client = PollLoop::new(client_config, client_transport).unwrap();
    client.connect().await.unwrap();

    let report = client.tick().await.unwrap();
    assert_eq!(report.values(), vec![25.0, 1000.0, 10.0]);

    client.write("Pressure", 1001.5).await.unwrap();
    assert_eq!(registry.read().get("Pressure").unwrap(), 1001.5);

    client.disconnect().await.unwrap();
    coordinator.initiate_shutdown();
    let summary = server.await.unwrap().unwrap();
    assert_eq!(summary.ticks, 0);
}
