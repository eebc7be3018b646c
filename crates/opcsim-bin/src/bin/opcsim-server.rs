// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Mock OPC UA server publishing three randomly varying device tags.

use opcsim_bin::{init_logging, report_error_and_exit, BinResult, LoggingConfig, ServerRuntime};
use opcsim_core::{ServerConfig, UniformSource};
use opcsim_opcua::{OpcUaServerSettings, OpcUaServerTransport};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        report_error_and_exit(e);
    }
}

async fn run() -> BinResult<()> {
    init_logging(&LoggingConfig::from_env()?)?;

    let config = ServerConfig::default();
    let transport = OpcUaServerTransport::new(OpcUaServerSettings::from_config(&config));
    let runtime = ServerRuntime::new(config, transport, UniformSource::from_entropy())?;

    runtime.run().await?;
    Ok(())
}
