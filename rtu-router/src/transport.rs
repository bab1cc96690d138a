/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Boundary traits for the external call/register and publish/subscribe layer.

use crate::status::Status;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Options supplied when registering a procedure with the transport layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegisterOptions {
    /// Whether callers may request in-progress results from this procedure.
    pub supports_progress: bool,
}

/// Handle through which a handler reports intermediate progress values.
///
/// Values are forwarded verbatim; the dispatcher never interprets them.
/// Reporting is fire-and-forget: a caller that stopped listening simply
/// drops the values.
#[derive(Clone, Debug)]
pub struct ProgressSink {
    sender: mpsc::UnboundedSender<Value>,
}

impl ProgressSink {
    /// Creates a sink together with the receiving half the transport layer
    /// drains toward the caller.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn report(&self, value: Value) {
        let _ = self.sender.send(value);
    }
}

/// A procedure registered with the transport layer.
#[async_trait]
pub trait ProcedureHandler: Send + Sync {
    /// Invokes the procedure. `progress` is `Some` only when the caller
    /// requested in-progress results and the registration allowed them.
    async fn invoke(&self, args: Value, progress: Option<ProgressSink>) -> Result<Value, Status>;
}

/// A subscriber to a publish/subscribe topic.
#[async_trait]
pub trait TopicListener: Send + Sync {
    async fn on_event(&self, topic: &str, event: Value);
}

/// The pre-existing call/register and publish/subscribe transport, treated
/// as an external collaborator. Listener identity for `unsubscribe` is the
/// `Arc` itself.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn register_procedure(
        &self,
        uri: &str,
        handler: Arc<dyn ProcedureHandler>,
        options: RegisterOptions,
    ) -> Result<(), Status>;

    async fn call(&self, uri: &str, args: Value) -> Result<Value, Status>;

    async fn publish(&self, topic: &str, event: Value) -> Result<(), Status>;

    async fn subscribe(&self, topic: &str, listener: Arc<dyn TopicListener>)
        -> Result<(), Status>;

    async fn unsubscribe(
        &self,
        topic: &str,
        listener: Arc<dyn TopicListener>,
    ) -> Result<(), Status>;
}
