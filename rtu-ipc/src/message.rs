/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Wire shapes of the IPC boundary. The `destination`, `source` and
//! `request_id` field names are fixed across the boundary; everything else
//! is verb-specific payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A one-shot outbound request handed to the broker's `send` procedure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub destination: String,
    pub source: String,
    pub request_id: u32,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// A reply published on the shared receive topic. Arrives asynchronously
/// and unordered; may belong to any concurrently pending request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub request_id: u32,
    pub source: String,
    pub destination: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl InboundEvent {
    /// Readdresses the event to where it logically originated.
    pub fn swap_addressing(&mut self) {
        std::mem::swap(&mut self.source, &mut self.destination);
    }
}

/// URIs of the IPC boundary: the broker's `send` procedure and the shared
/// reply topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcUris {
    pub send_proc: String,
    pub receive_topic: String,
}

impl Default for IpcUris {
    fn default() -> Self {
        Self {
            send_proc: "com.example.ipc.proc.v1.send".to_string(),
            receive_topic: "com.example.ipc.topic.v1.receive".to_string(),
        }
    }
}
