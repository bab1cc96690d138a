/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Server half of the IPC bridge: a FIFO outbound mailbox fed by a
//! registered `send` procedure, drained by a relay task that publishes each
//! message on the shared reply topic.

use crate::message::{IpcUris, OutboundMessage};
use async_trait::async_trait;
use log::{debug, error, info};
use rtu_router::{
    ErrorCode, ProcedureHandler, ProgressSink, RegisterOptions, Status, Transport,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Enqueues validated send requests into the broker's mailbox. Producers
/// only enqueue; the relay task is the mailbox's sole consumer.
struct SendProcedure {
    mailbox: mpsc::UnboundedSender<OutboundMessage>,
}

#[async_trait]
impl ProcedureHandler for SendProcedure {
    async fn invoke(&self, args: Value, _progress: Option<ProgressSink>) -> Result<Value, Status> {
        let message: OutboundMessage = serde_json::from_value(args).map_err(|e| {
            Status::fail_with_code(
                ErrorCode::InvalidArgument,
                format!(
                    "IPC send payload must be an object with 'destination', 'source' \
                     and 'request_id' fields: {e}"
                ),
            )
        })?;
        self.mailbox.send(message).map_err(|_| {
            Status::fail_with_code(ErrorCode::MailboxReadError, "IPC mailbox is closed")
        })?;
        Ok(Value::Null)
    }
}

pub struct CorrelationBroker;

impl CorrelationBroker {
    /// Registers the `send` procedure and spawns the relay task. A
    /// registration failure is fatal to bootstrap; the broker never serves
    /// a half-wired bridge.
    pub async fn start(
        transport: Arc<dyn Transport>,
        uris: IpcUris,
    ) -> Result<BrokerHandle, Status> {
        let (mailbox_sender, mailbox_receiver) = mpsc::unbounded_channel();
        transport
            .register_procedure(
                &uris.send_proc,
                Arc::new(SendProcedure {
                    mailbox: mailbox_sender,
                }),
                RegisterOptions::default(),
            )
            .await
            .map_err(|e| {
                Status::fail_with_code(
                    ErrorCode::RegistrationFailure,
                    format!("could not register procedure '{}': {e}", uris.send_proc),
                )
            })?;
        info!("registered IPC send procedure '{}'", uris.send_proc);

        let topic = uris.receive_topic.clone();
        let task = tokio::spawn(Self::relay_loop(transport, topic, mailbox_receiver));
        Ok(BrokerHandle { task })
    }

    /// Drains the mailbox in FIFO order, publishing each message to all
    /// current subscribers of the reply topic. A relay failure is confined
    /// to its message; the loop only stops when the mailbox closes.
    async fn relay_loop(
        transport: Arc<dyn Transport>,
        topic: String,
        mut mailbox: mpsc::UnboundedReceiver<OutboundMessage>,
    ) {
        while let Some(message) = mailbox.recv().await {
            let request_id = message.request_id;
            let event = match serde_json::to_value(&message) {
                Ok(event) => event,
                Err(e) => {
                    error!(
                        "{}",
                        Status::fail_with_code(
                            ErrorCode::MailboxReadError,
                            format!("could not encode IPC message {request_id}: {e}"),
                        )
                    );
                    continue;
                }
            };
            if let Err(e) = transport.publish(&topic, event).await {
                error!(
                    "{}",
                    Status::fail_with_code(
                        ErrorCode::MailboxReadError,
                        format!("could not relay IPC message {request_id} on '{topic}': {e}"),
                    )
                );
                continue;
            }
            debug!("relayed IPC message {request_id} on '{topic}'");
        }
        debug!("IPC mailbox closed; relay loop stopping");
    }
}

/// Owner of the spawned relay task.
pub struct BrokerHandle {
    task: JoinHandle<()>,
}

impl BrokerHandle {
    pub async fn shutdown(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}
