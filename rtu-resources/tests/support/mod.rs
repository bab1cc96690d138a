/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Shared bootstrap for the end-to-end tests: a full gateway wired onto a
//! loopback transport, with the broker echoing outbound IPC messages back
//! on the reply topic in place of the rest of the system.

use loopback_transport::LoopbackTransport;
use rtu_ipc::{BrokerHandle, CodecRegistry, CorrelationBroker, IpcUris, RequestCorrelator, RequestIdAllocator};
use rtu_resources::resource_config::{self, ConfigStore};
use rtu_resources::resource_general;
use rtu_router::{Dispatcher, HandlerTable, ProcedureRegistry, ResourceCatalog, RpcConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub const REFERENCE_CONFIG: &str = r#"
{
    proc_uri_prefix: "com.example.rtu.proc",
    procs: {
        v1: ["create", "read", "update", "delete", "shutdown", "restart", "flush"],
    },
    data_uri_prefix: "com.example.rtu.data",
    data_procs: {
        v1: {
            config: {
                procs: { v1: ["read", "update"] },
            },
            general: {
                sub_resources: ["site_id", "site_description", "slot_length", "slots"],
                procs: { v1: ["read"] },
            },
        },
    },
}
"#;

pub struct Gateway {
    pub transport: Arc<LoopbackTransport>,
    pub store: Arc<ConfigStore>,
    pub allocator: Arc<RequestIdAllocator>,
    pub broker: BrokerHandle,
}

pub async fn start_gateway() -> Gateway {
    let _ = env_logger::try_init();

    let config = RpcConfig::from_json5_str(REFERENCE_CONFIG).expect("reference config parses");
    let transport = Arc::new(LoopbackTransport::new());
    let transport_dyn: Arc<dyn rtu_router::Transport> = transport.clone();

    let broker = CorrelationBroker::start(transport_dyn.clone(), IpcUris::default())
        .await
        .expect("broker starts");

    let mut codecs = CodecRegistry::new();
    resource_general::register_codec(&mut codecs).expect("general codec registers");
    let allocator = Arc::new(RequestIdAllocator::new());
    let correlator = Arc::new(RequestCorrelator::new(
        transport_dyn.clone(),
        IpcUris::default(),
        codecs,
        allocator.clone(),
        "www_api",
        Duration::from_secs(1),
    ));

    let mut initial = serde_json::Map::new();
    initial.insert("poll_interval".to_string(), json!(60));
    let store = ConfigStore::new(initial);

    let mut table = HandlerTable::new();
    resource_config::register_handlers(&mut table, store.clone()).expect("config registers");
    resource_general::register_handlers(&mut table, correlator).expect("general registers");

    let catalog = ResourceCatalog::from_config(&config);
    table.validate_against(&catalog).expect("table is complete");

    let dispatcher = Arc::new(Dispatcher::new(catalog, table));
    let registry = ProcedureRegistry::new(&config, dispatcher);
    registry
        .register_all(transport.as_ref())
        .await
        .expect("all procedures register");

    Gateway {
        transport,
        store,
        allocator,
        broker,
    }
}
