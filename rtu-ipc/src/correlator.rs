/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Client half of the IPC bridge: sends one outbound message and completes
//! with exactly the one reply whose correlation id matches.

use crate::codec::CodecRegistry;
use crate::id_allocator::RequestIdAllocator;
use crate::message::{InboundEvent, IpcUris, OutboundMessage};
use async_trait::async_trait;
use log::debug;
use rtu_router::{DispatchRequest, ErrorCode, Status, TopicListener, Transport};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;

/// Default identity stamped as `source` on outbound messages.
pub const DEFAULT_SOURCE_IDENTITY: &str = "www_api";

/// Matches replies by correlation id and delivers the first match through a
/// write-once slot. Events with other ids are ignored and left for the
/// correlators they belong to.
struct ReplyListener {
    request_id: u32,
    slot: Mutex<Option<oneshot::Sender<InboundEvent>>>,
}

#[async_trait]
impl TopicListener for ReplyListener {
    async fn on_event(&self, _topic: &str, event: Value) {
        // Events that do not parse as replies are someone else's traffic.
        let Ok(event) = serde_json::from_value::<InboundEvent>(event) else {
            return;
        };
        if event.request_id != self.request_id {
            return;
        }
        if let Some(slot) = self.slot.lock().await.take() {
            let _ = slot.send(event);
        }
    }
}

pub struct RequestCorrelator {
    transport: Arc<dyn Transport>,
    uris: IpcUris,
    codecs: CodecRegistry,
    allocator: Arc<RequestIdAllocator>,
    source: String,
    reply_timeout: Duration,
}

impl RequestCorrelator {
    pub fn new(
        transport: Arc<dyn Transport>,
        uris: IpcUris,
        codecs: CodecRegistry,
        allocator: Arc<RequestIdAllocator>,
        source: &str,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            uris,
            codecs,
            allocator,
            source: source.to_string(),
            reply_timeout,
        }
    }

    /// Drives one request through the IPC bridge and returns the processed
    /// reply. The correlation id and the topic subscription are released on
    /// every exit path, including timeout.
    pub async fn process(&self, request: &DispatchRequest) -> Result<Value, Status> {
        let Some(codec) = self.codecs.get(&request.resource) else {
            return Err(Status::fail_with_code(
                ErrorCode::HandlerNotImplemented,
                format!(
                    "no IPC message codec is registered for resource '{}'",
                    request.resource
                ),
            ));
        };

        // The guard keeps the id pending; dropping it (any return below, or
        // cancellation of this future) releases the id.
        let pending = self.allocator.allocate()?;
        let request_id = pending.value();

        let ipc_request = codec.build_request(request)?;
        let message = OutboundMessage {
            destination: ipc_request.destination,
            source: self.source.clone(),
            request_id,
            payload: ipc_request.payload,
        };

        let (slot_sender, slot_receiver) = oneshot::channel();
        let listener: Arc<dyn TopicListener> = Arc::new(ReplyListener {
            request_id,
            slot: Mutex::new(Some(slot_sender)),
        });

        // Subscribe before sending so a reply that beats the send's return
        // cannot be missed.
        self.transport
            .subscribe(&self.uris.receive_topic, listener.clone())
            .await?;

        let send_result = self.send(&message).await;
        if let Err(e) = send_result {
            let _ = self
                .transport
                .unsubscribe(&self.uris.receive_topic, listener)
                .await;
            return Err(e);
        }
        debug!(
            "IPC request {request_id} sent to '{}'; awaiting reply",
            message.destination
        );

        let outcome = timeout(self.reply_timeout, slot_receiver).await;
        let _ = self
            .transport
            .unsubscribe(&self.uris.receive_topic, listener)
            .await;

        match outcome {
            Err(_) => Err(Status::fail_with_code(
                ErrorCode::Timeout,
                format!(
                    "no reply for IPC request {request_id} to '{}' within {:?}",
                    message.destination, self.reply_timeout
                ),
            )),
            Ok(Err(_)) => Err(Status::fail_with_code(
                ErrorCode::Internal,
                format!("reply slot for IPC request {request_id} closed before delivery"),
            )),
            Ok(Ok(mut event)) => {
                event.swap_addressing();
                codec.process_reply(event)
            }
        }
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), Status> {
        let args = serde_json::to_value(message).map_err(|e| {
            Status::fail_with_code(
                ErrorCode::Internal,
                format!("could not encode IPC request {}: {e}", message.request_id),
            )
        })?;
        self.transport.call(&self.uris.send_proc, args).await?;
        Ok(())
    }
}
