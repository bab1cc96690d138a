/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Resource-kind-specific IPC message construction and reply
//! post-processing, registered per resource name at startup.

use crate::message::InboundEvent;
use rtu_router::{DispatchRequest, ErrorCode, Status};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// The resource-specific half of an outbound message: where it goes and
/// what it carries. The correlator stamps `source` and `request_id`.
#[derive(Clone, Debug, PartialEq)]
pub struct IpcRequest {
    pub destination: String,
    pub payload: Map<String, Value>,
}

/// Builds outbound messages and post-processes replies for one resource
/// kind.
pub trait IpcCodec: Send + Sync {
    fn build_request(&self, request: &DispatchRequest) -> Result<IpcRequest, Status>;

    /// Turns a matched (and already readdressed) reply into the final RPC
    /// result.
    fn process_reply(&self, event: InboundEvent) -> Result<Value, Status>;
}

/// Codecs keyed by resource name. Populated during bootstrap, read-only
/// afterwards.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn IpcCodec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resource: &str, codec: Arc<dyn IpcCodec>) -> Result<(), Status> {
        if self.codecs.contains_key(resource) {
            return Err(Status::fail_with_code(
                ErrorCode::HandlerModuleLoadError,
                format!("an IPC codec is already registered for resource '{resource}'"),
            ));
        }
        self.codecs.insert(resource.to_string(), codec);
        Ok(())
    }

    pub fn get(&self, resource: &str) -> Option<Arc<dyn IpcCodec>> {
        self.codecs.get(resource).cloned()
    }
}
