/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! The `general` data resource: general system information owned by the
//! system monitor process, reached over the IPC bridge. Supports `read`
//! (interface v1, data v1) with sub-resources for the individual fields.

use async_trait::async_trait;
use rtu_ipc::{CodecRegistry, InboundEvent, IpcCodec, IpcRequest, RequestCorrelator};
use rtu_router::{
    DispatchRequest, ErrorCode, HandlerRef, HandlerTable, ProgressSink, ResourceHandler, Status,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// IPC destination answering `general` requests.
pub const GENERAL_DESTINATION: &str = "system_monitor";

/// Builds `general` requests for the system monitor and passes its replies
/// through. A matched sub-resource travels as the `sub` payload field so the
/// monitor can answer just that field.
pub struct GeneralCodec;

impl IpcCodec for GeneralCodec {
    fn build_request(&self, request: &DispatchRequest) -> Result<IpcRequest, Status> {
        let mut payload = serde_json::Map::new();
        if let Some(sub) = &request.sub_resource {
            payload.insert("sub".to_string(), json!(sub));
        }
        Ok(IpcRequest {
            destination: GENERAL_DESTINATION.to_string(),
            payload,
        })
    }

    fn process_reply(&self, event: InboundEvent) -> Result<Value, Status> {
        serde_json::to_value(&event).map_err(|e| {
            Status::fail_with_code(
                ErrorCode::Internal,
                format!("could not encode reply {}: {e}", event.request_id),
            )
        })
    }
}

/// `resource_general.data_v1_proc_v1_read`
struct GeneralRead {
    correlator: Arc<RequestCorrelator>,
}

#[async_trait]
impl ResourceHandler for GeneralRead {
    async fn handle(
        &self,
        request: DispatchRequest,
        _progress: Option<ProgressSink>,
    ) -> Result<Value, Status> {
        self.correlator.process(&request).await
    }
}

/// Registers the `general` read handler for data v1 / interface v1.
pub fn register_handlers(
    table: &mut HandlerTable,
    correlator: Arc<RequestCorrelator>,
) -> Result<(), Status> {
    table.register(
        HandlerRef::new("general", "v1", "v1", "read"),
        Arc::new(GeneralRead { correlator }),
    )
}

/// Registers the `general` IPC codec.
pub fn register_codec(codecs: &mut CodecRegistry) -> Result<(), Status> {
    codecs.register("general", Arc::new(GeneralCodec))
}

#[cfg(test)]
mod tests {
    use super::{GeneralCodec, GENERAL_DESTINATION};
    use rtu_ipc::{InboundEvent, IpcCodec};
    use rtu_router::DispatchRequest;
    use serde_json::json;

    fn request(sub_resource: Option<&str>) -> DispatchRequest {
        DispatchRequest {
            data_uri: "com.example.rtu.data.v1.general".to_string(),
            resource: "general".to_string(),
            data_version: "v1".to_string(),
            sub_resource: sub_resource.map(str::to_string),
            fields: serde_json::Map::new(),
        }
    }

    #[test]
    fn request_targets_the_system_monitor() {
        let built = GeneralCodec.build_request(&request(None)).unwrap();
        assert_eq!(built.destination, GENERAL_DESTINATION);
        assert!(built.payload.is_empty());
    }

    #[test]
    fn sub_resource_travels_in_the_payload() {
        let built = GeneralCodec
            .build_request(&request(Some("slot_length")))
            .unwrap();
        assert_eq!(built.payload["sub"], json!("slot_length"));
    }

    #[test]
    fn reply_passes_through_as_a_json_object() {
        let mut payload = serde_json::Map::new();
        payload.insert("site_id".to_string(), json!("A7"));
        let event = InboundEvent {
            request_id: 12,
            source: GENERAL_DESTINATION.to_string(),
            destination: "www_api".to_string(),
            payload,
        };

        let result = GeneralCodec.process_reply(event).unwrap();
        assert_eq!(result["request_id"], json!(12));
        assert_eq!(result["site_id"], json!("A7"));
    }
}
