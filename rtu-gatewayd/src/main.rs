/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod config;

use crate::config::GatewayConfig;
use clap::Parser;
use log::info;
use loopback_transport::LoopbackTransport;
use rtu_ipc::{CodecRegistry, CorrelationBroker, RequestCorrelator, RequestIdAllocator};
use rtu_resources::resource_config::{self, ConfigStore};
use rtu_resources::resource_general;
use rtu_router::{
    Dispatcher, ErrorCode, HandlerTable, ProcedureRegistry, ResourceCatalog, Status, Transport,
};
use std::sync::Arc;

#[derive(Parser)]
#[command()]
struct GatewayArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Status> {
    env_logger::init();

    let args = GatewayArgs::parse();
    let config = GatewayConfig::from_file(&args.config)?;
    info!("loaded gateway configuration from '{}'", args.config);

    let transport: Arc<dyn Transport> = Arc::new(LoopbackTransport::new());

    // The broker must be serving before any procedure that reaches the IPC
    // bridge can be invoked.
    let broker = CorrelationBroker::start(transport.clone(), config.ipc.uris()).await?;

    let mut codecs = CodecRegistry::new();
    resource_general::register_codec(&mut codecs)?;
    let allocator = Arc::new(RequestIdAllocator::new());
    let correlator = Arc::new(RequestCorrelator::new(
        transport.clone(),
        config.ipc.uris(),
        codecs,
        allocator,
        &config.ipc.source_identity,
        config.ipc.reply_timeout(),
    ));

    let store = ConfigStore::new(serde_json::Map::new());
    let mut table = HandlerTable::new();
    resource_config::register_handlers(&mut table, store)?;
    resource_general::register_handlers(&mut table, correlator)?;

    let catalog = ResourceCatalog::from_config(&config.rpc);
    table.validate_against(&catalog)?;

    let dispatcher = Arc::new(Dispatcher::new(catalog, table));
    let registry = ProcedureRegistry::new(&config.rpc, dispatcher);
    registry.register_all(transport.as_ref()).await?;

    info!(
        "gateway is serving {} procedures; press ctrl-c to stop",
        registry.procedures().len()
    );

    tokio::signal::ctrl_c().await.map_err(|e| {
        Status::fail_with_code(
            ErrorCode::Internal,
            format!("unable to listen for shutdown signal: {e}"),
        )
    })?;

    info!("shutting down");
    broker.shutdown().await;
    Ok(())
}
