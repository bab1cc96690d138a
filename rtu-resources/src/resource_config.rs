/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! The `config` data resource: device configuration kept in an in-memory
//! store, supporting `read` and `update` (interface v1, data v1).

use async_trait::async_trait;
use log::debug;
use rtu_router::{
    DispatchRequest, ErrorCode, HandlerRef, HandlerTable, ProgressSink, ResourceHandler, Status,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration store. Handlers hold the store behind an `Arc`;
/// readers take the read lock, `update` is the only writer.
pub struct ConfigStore {
    values: RwLock<Map<String, Value>>,
}

impl ConfigStore {
    pub fn new(initial: Map<String, Value>) -> Arc<Self> {
        Arc::new(Self {
            values: RwLock::new(initial),
        })
    }

    pub async fn snapshot(&self) -> Map<String, Value> {
        self.values.read().await.clone()
    }
}

/// `resource_config.data_v1_proc_v1_read`
struct ConfigRead {
    store: Arc<ConfigStore>,
}

#[async_trait]
impl ResourceHandler for ConfigRead {
    async fn handle(
        &self,
        request: DispatchRequest,
        _progress: Option<ProgressSink>,
    ) -> Result<Value, Status> {
        let values = self.store.values.read().await;
        // An optional "keys" field narrows the read; unknown keys fail
        // rather than silently vanish from the result.
        match request.fields.get("keys") {
            None => Ok(Value::Object(values.clone())),
            Some(Value::Array(keys)) => {
                let mut selected = Map::new();
                for key in keys {
                    let Value::String(key) = key else {
                        return Err(Status::fail_with_code(
                            ErrorCode::InvalidArgument,
                            format!("'keys' entries must be strings, got {key}"),
                        ));
                    };
                    let Some(value) = values.get(key) else {
                        return Err(Status::fail_with_code(
                            ErrorCode::NotFound,
                            format!("configuration key '{key}' does not exist"),
                        ));
                    };
                    selected.insert(key.clone(), value.clone());
                }
                Ok(Value::Object(selected))
            }
            Some(other) => Err(Status::fail_with_code(
                ErrorCode::InvalidArgument,
                format!("'keys' must be an array of strings, got {other}"),
            )),
        }
    }
}

/// `resource_config.data_v1_proc_v1_update`
struct ConfigUpdate {
    store: Arc<ConfigStore>,
}

#[async_trait]
impl ResourceHandler for ConfigUpdate {
    async fn handle(
        &self,
        request: DispatchRequest,
        progress: Option<ProgressSink>,
    ) -> Result<Value, Status> {
        if request.fields.is_empty() {
            return Err(Status::fail_with_code(
                ErrorCode::InvalidArgument,
                format!(
                    "update of '{}' requires at least one configuration field",
                    request.data_uri
                ),
            ));
        }
        let mut values = self.store.values.write().await;
        for (key, value) in &request.fields {
            values.insert(key.clone(), value.clone());
            debug!("configuration key '{key}' updated");
            if let Some(progress) = &progress {
                progress.report(json!({ "updated": key }));
            }
        }
        Ok(json!({ "updated": request.fields.len() }))
    }
}

/// Registers the `config` handlers for data v1 / interface v1.
pub fn register_handlers(table: &mut HandlerTable, store: Arc<ConfigStore>) -> Result<(), Status> {
    table.register(
        HandlerRef::new("config", "v1", "v1", "read"),
        Arc::new(ConfigRead {
            store: store.clone(),
        }),
    )?;
    table.register(
        HandlerRef::new("config", "v1", "v1", "update"),
        Arc::new(ConfigUpdate { store }),
    )?;
    Ok(())
}
