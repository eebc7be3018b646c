// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Polling client printing the mock device tags once per second.

use opcsim_bin::{init_logging, report_error_and_exit, BinResult, ClientRuntime, LoggingConfig};
use opcsim_core::ClientConfig;
use opcsim_opcua::{OpcUaClientSettings, OpcUaClientTransport};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        report_error_and_exit(e);
    }
}

async fn run() -> BinResult<()> {
    init_logging(&LoggingConfig::from_env()?)?;

    let config = ClientConfig::default();
    let transport = OpcUaClientTransport::new(OpcUaClientSettings::from_config(&config));
    let runtime = ClientRuntime::new(config, transport)?;

    runtime.run().await?;
    Ok(())
}
