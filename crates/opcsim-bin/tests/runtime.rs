// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Runtime tests over the in-process loopback transport.

use std::time::Duration;

use opcsim_bin::{ClientRuntime, ServerRuntime};
use opcsim_core::{
    ClientConfig, LoopbackClient, LoopbackNetwork, LoopbackServer, ServerConfig, UniformSource,
};

fn server_runtime(network: &LoopbackNetwork) -> ServerRuntime<LoopbackServer, UniformSource> {
    ServerRuntime::new(
        ServerConfig::default(),
        LoopbackServer::new(network.clone()),
        UniformSource::seeded(42),
    )
    .expect("default config is valid")
}

#[tokio::test(start_paused = true)]
async fn test_server_runtime_stops_on_shutdown_handle() {
    let network = LoopbackNetwork::new();
    let runtime = server_runtime(&network);
    let shutdown = runtime.shutdown_handle();
    let registry = runtime.registry().clone();

    let handle = tokio::spawn(runtime.run());
    tokio::time::sleep(Duration::from_millis(3500)).await;
    shutdown.initiate_shutdown();

    let summary = handle.await.unwrap().unwrap();
    assert_eq!(summary.ticks, 3);
    assert_eq!(network.listener_count(), 0);

    let registry = registry.read();
    for tag in registry.iter() {
        let range = tag.range().expect("default tags are bounded");
        assert!(
            range.contains(tag.value()),
            "{} = {} out of range",
            tag.name(),
            tag.value()
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_client_runtime_polls_server_runtime() {
    let network = LoopbackNetwork::new();
    let server = server_runtime(&network);
    let server_shutdown = server.shutdown_handle();
    let server_handle = tokio::spawn(server.run());
    while network.listener_count() == 0 {
        tokio::task::yield_now().await;
    }

    let client = ClientRuntime::new(ClientConfig::default(), LoopbackClient::new(network.clone()))
        .expect("default config is valid");
    let client_shutdown = client.shutdown_handle();
    let client_handle = tokio::spawn(client.run());

    tokio::time::sleep(Duration::from_millis(2500)).await;
    client_shutdown.initiate_shutdown();
    let client_summary = client_handle.await.unwrap().unwrap();
    assert_eq!(client_summary.ticks, 3);

    server_shutdown.initiate_shutdown();
    let server_summary = server_handle.await.unwrap().unwrap();
    assert_eq!(server_summary.ticks, 2);

    let stats = network.stats();
    assert_eq!(stats.sessions, 1);
    assert_eq!(stats.reads, 9);
}
