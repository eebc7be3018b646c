// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! End-to-end tests of the update loop and poll loop over the loopback
//! transport.
//!
//! All tests run on tokio's paused clock, so ticks are driven by
//! `tokio::time::sleep` in the test body instead of wall-clock time.

mod common;

use std::time::Duration;

use opcsim_core::{default_tags, LoopbackNetwork, SimError, TransportError};

use common::{connected_client, spawn_server};

// =============================================================================
// Defaults
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_defaults_visible_before_first_tick() {
    let network = LoopbackNetwork::new();
    let server = spawn_server(&network, 1).await;
    let mut client = connected_client(&network).await;

    let report = client.tick().await.unwrap();
    assert_eq!(report.values(), vec![25.0, 1000.0, 10.0]);
    assert_eq!(
        report.to_string(),
        "Temperature: 25.00, Pressure: 1000.00, Flow Rate: 10.00"
    );

    let summary = server.stop().await.unwrap();
    assert_eq!(summary.ticks, 0);
}

// =============================================================================
// Ticking
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_reads_stay_in_bounds_after_ticks() {
    let network = LoopbackNetwork::new();
    let server = spawn_server(&network, 42).await;
    let mut client = connected_client(&network).await;
    let specs = default_tags();

    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let report = client.tick().await.unwrap();
        for (spec, value) in specs.iter().zip(report.values()) {
            assert!(
                spec.range.contains(value),
                "{} = {} outside {}",
                spec.name,
                value,
                spec.range
            );
        }
    }

    let summary = server.stop().await.unwrap();
    assert!(summary.ticks >= 9);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_reads_between_ticks_are_identical() {
    let network = LoopbackNetwork::new();
    let server = spawn_server(&network, 7).await;
    let mut client = connected_client(&network).await;

    // Land between the second and third tick.
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let first = client.tick().await.unwrap();
    let second = client.tick().await.unwrap();
    let third = client.tick().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_ne!(first.values(), vec![25.0, 1000.0, 10.0]);

    assert_eq!(server.registry.read().snapshot(), first);
    server.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_client_sees_each_server_tick() {
    let network = LoopbackNetwork::new();
    let server = spawn_server(&network, 11).await;
    let mut client = connected_client(&network).await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let after_one = client.tick().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    let after_two = client.tick().await.unwrap();

    assert_ne!(after_one, after_two);
    assert_eq!(server.stop().await.unwrap().ticks, 2);
}

// =============================================================================
// Writes and failures
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_remote_write_reaches_registry() {
    let network = LoopbackNetwork::new();
    let server = spawn_server(&network, 3).await;
    let client = connected_client(&network).await;

    client.write("FlowRate", 12.25).await.unwrap();
    assert_eq!(server.registry.read().get("FlowRate").unwrap(), 12.25);
    assert_eq!(client.read("FlowRate").await.unwrap(), 12.25);

    // The next tick overwrites the remote write.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let value = client.read("FlowRate").await.unwrap();
    assert_eq!(server.registry.read().get("FlowRate").unwrap(), value);

    server.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reads_fail_after_server_stops() {
    let network = LoopbackNetwork::new();
    let server = spawn_server(&network, 5).await;
    let mut client = connected_client(&network).await;

    client.tick().await.unwrap();
    server.stop().await.unwrap();

    let err = client.tick().await.unwrap_err();
    assert!(matches!(
        err,
        SimError::Transport(TransportError::Read { .. })
    ));
    assert_eq!(err.category(), "read");
}

#[tokio::test(start_paused = true)]
async fn test_client_on_wrong_port_cannot_connect() {
    let network = LoopbackNetwork::new();
    let server = spawn_server(&network, 5).await;

    let config = opcsim_core::ClientConfig {
        endpoint: "opc.tcp://localhost:4841".parse().unwrap(),
        ..Default::default()
    };
    let mut client =
        opcsim_core::PollLoop::new(config, opcsim_core::LoopbackClient::new(network.clone()))
            .unwrap();
    assert!(matches!(
        client.connect().await,
        Err(SimError::Transport(TransportError::Connection { .. }))
    ));

    server.stop().await.unwrap();
}
