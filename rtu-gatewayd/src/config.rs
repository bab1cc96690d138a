/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use rtu_ipc::IpcUris;
use rtu_router::{ErrorCode, RpcConfig, Status};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub(crate) rpc: RpcConfig,
    #[serde(default)]
    pub(crate) ipc: IpcConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct IpcConfig {
    #[serde(default = "default_send_proc_uri")]
    pub(crate) send_proc_uri: String,
    #[serde(default = "default_receive_topic_uri")]
    pub(crate) receive_topic_uri: String,
    #[serde(default = "default_source_identity")]
    pub(crate) source_identity: String,
    #[serde(default = "default_reply_timeout_ms")]
    pub(crate) reply_timeout_ms: u64,
}

fn default_send_proc_uri() -> String {
    IpcUris::default().send_proc
}

fn default_receive_topic_uri() -> String {
    IpcUris::default().receive_topic
}

fn default_source_identity() -> String {
    "www_api".to_string()
}

fn default_reply_timeout_ms() -> u64 {
    5000
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            send_proc_uri: default_send_proc_uri(),
            receive_topic_uri: default_receive_topic_uri(),
            source_identity: default_source_identity(),
            reply_timeout_ms: default_reply_timeout_ms(),
        }
    }
}

impl IpcConfig {
    pub(crate) fn uris(&self) -> IpcUris {
        IpcUris {
            send_proc: self.send_proc_uri.clone(),
            receive_topic: self.receive_topic_uri.clone(),
        }
    }

    pub(crate) fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

impl GatewayConfig {
    pub(crate) fn from_json5_str(contents: &str) -> Result<Self, Status> {
        json5::from_str(contents).map_err(|e| {
            Status::fail_with_code(
                ErrorCode::InvalidArgument,
                format!("unable to parse gateway configuration: {e}"),
            )
        })
    }

    pub(crate) fn from_file(path: impl AsRef<Path>) -> Result<Self, Status> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Status::fail_with_code(
                ErrorCode::NotFound,
                format!(
                    "unable to read gateway configuration '{}': {e}",
                    path.display()
                ),
            )
        })?;
        Self::from_json5_str(&contents)
    }
}
