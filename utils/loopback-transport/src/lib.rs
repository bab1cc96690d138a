/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! In-process [`Transport`] implementation.
//!
//! Procedures are invoked directly and topics fan out to every current
//! subscriber, which is all the gateway needs for integration tests and for
//! the daemon's self-contained demo mode. Listener identity is the `Arc`
//! itself, so `unsubscribe` removes exactly the listener that was passed to
//! `subscribe`.

use async_trait::async_trait;
use futures::future::join_all;
use log::debug;
use rtu_router::{
    ErrorCode, ProcedureHandler, ProgressSink, RegisterOptions, Status, TopicListener, Transport,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

struct RegisteredProcedure {
    handler: Arc<dyn ProcedureHandler>,
    supports_progress: bool,
}

#[derive(Default)]
pub struct LoopbackTransport {
    procedures: Mutex<HashMap<String, RegisteredProcedure>>,
    subscriptions: Mutex<HashMap<String, Vec<Arc<dyn TopicListener>>>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invokes a registered procedure with a progress sink, mirroring a
    /// caller that requested in-progress results. Fails if the procedure was
    /// not registered with progress support.
    pub async fn call_with_progress(
        &self,
        uri: &str,
        args: Value,
        progress: ProgressSink,
    ) -> Result<Value, Status> {
        let (handler, supports_progress) = self.lookup(uri).await?;
        if !supports_progress {
            return Err(Status::fail_with_code(
                ErrorCode::InvalidArgument,
                format!("procedure '{uri}' was not registered with progress support"),
            ));
        }
        handler.invoke(args, Some(progress)).await
    }

    /// Registered procedure URIs, sorted. Test helper.
    pub async fn registered_procedures(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.procedures.lock().await.keys().cloned().collect();
        uris.sort();
        uris
    }

    /// Current subscriber count for a topic. Test helper.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.subscriptions
            .lock()
            .await
            .get(topic)
            .map_or(0, Vec::len)
    }

    async fn lookup(&self, uri: &str) -> Result<(Arc<dyn ProcedureHandler>, bool), Status> {
        let procedures = self.procedures.lock().await;
        let Some(registered) = procedures.get(uri) else {
            return Err(Status::fail_with_code(
                ErrorCode::NotFound,
                format!("no procedure is registered for URI '{uri}'"),
            ));
        };
        Ok((registered.handler.clone(), registered.supports_progress))
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn register_procedure(
        &self,
        uri: &str,
        handler: Arc<dyn ProcedureHandler>,
        options: RegisterOptions,
    ) -> Result<(), Status> {
        let mut procedures = self.procedures.lock().await;
        if procedures.contains_key(uri) {
            return Err(Status::fail_with_code(
                ErrorCode::RegistrationFailure,
                format!("a procedure is already registered for URI '{uri}'"),
            ));
        }
        debug!("registering procedure '{uri}'");
        procedures.insert(
            uri.to_string(),
            RegisteredProcedure {
                handler,
                supports_progress: options.supports_progress,
            },
        );
        Ok(())
    }

    async fn call(&self, uri: &str, args: Value) -> Result<Value, Status> {
        let (handler, _) = self.lookup(uri).await?;
        // The lock is released before invocation so a procedure may call
        // back into the transport.
        handler.invoke(args, None).await
    }

    async fn publish(&self, topic: &str, event: Value) -> Result<(), Status> {
        let listeners: Vec<Arc<dyn TopicListener>> = self
            .subscriptions
            .lock()
            .await
            .get(topic)
            .cloned()
            .unwrap_or_default();
        join_all(
            listeners
                .iter()
                .map(|listener| listener.on_event(topic, event.clone())),
        )
        .await;
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        listener: Arc<dyn TopicListener>,
    ) -> Result<(), Status> {
        self.subscriptions
            .lock()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(listener);
        Ok(())
    }

    async fn unsubscribe(
        &self,
        topic: &str,
        listener: Arc<dyn TopicListener>,
    ) -> Result<(), Status> {
        let mut subscriptions = self.subscriptions.lock().await;
        let Some(listeners) = subscriptions.get_mut(topic) else {
            return Err(Status::fail_with_code(
                ErrorCode::NotFound,
                format!("no subscriptions exist for topic '{topic}'"),
            ));
        };
        let before = listeners.len();
        listeners.retain(|existing| !Arc::ptr_eq(existing, &listener));
        if listeners.len() == before {
            return Err(Status::fail_with_code(
                ErrorCode::NotFound,
                format!("listener is not subscribed to topic '{topic}'"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LoopbackTransport;
    use async_trait::async_trait;
    use rtu_router::{
        ErrorCode, ProcedureHandler, ProgressSink, RegisterOptions, Status, TopicListener,
        Transport,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct Echo;

    #[async_trait]
    impl ProcedureHandler for Echo {
        async fn invoke(
            &self,
            args: Value,
            progress: Option<ProgressSink>,
        ) -> Result<Value, Status> {
            if let Some(progress) = &progress {
                progress.report(json!("echoing"));
            }
            Ok(args)
        }
    }

    struct Collector {
        events: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl TopicListener for Collector {
        async fn on_event(&self, _topic: &str, event: Value) {
            self.events.lock().await.push(event);
        }
    }

    #[tokio::test]
    async fn call_reaches_registered_procedure() {
        let transport = LoopbackTransport::new();
        transport
            .register_procedure("proc.echo", Arc::new(Echo), RegisterOptions::default())
            .await
            .unwrap();

        let result = transport.call("proc.echo", json!({"x": 1})).await.unwrap();
        assert_eq!(result, json!({"x": 1}));
    }

    #[tokio::test]
    async fn duplicate_registration_fails() {
        let transport = LoopbackTransport::new();
        transport
            .register_procedure("proc.echo", Arc::new(Echo), RegisterOptions::default())
            .await
            .unwrap();

        let err = transport
            .register_procedure("proc.echo", Arc::new(Echo), RegisterOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::RegistrationFailure);
    }

    #[tokio::test]
    async fn call_to_unknown_uri_fails() {
        let transport = LoopbackTransport::new();
        let err = transport.call("proc.missing", json!(null)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn progress_requires_registration_with_progress_support() {
        let transport = LoopbackTransport::new();
        transport
            .register_procedure(
                "proc.plain",
                Arc::new(Echo),
                RegisterOptions {
                    supports_progress: false,
                },
            )
            .await
            .unwrap();

        let (sink, _receiver) = ProgressSink::channel();
        let err = transport
            .call_with_progress("proc.plain", json!(null), sink)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn publish_fans_out_to_all_subscribers_until_unsubscribed() {
        let transport = LoopbackTransport::new();
        let first = Arc::new(Collector {
            events: Mutex::new(Vec::new()),
        });
        let second = Arc::new(Collector {
            events: Mutex::new(Vec::new()),
        });

        let first_dyn: Arc<dyn TopicListener> = first.clone();
        let second_dyn: Arc<dyn TopicListener> = second.clone();
        transport.subscribe("topic.t", first_dyn.clone()).await.unwrap();
        transport.subscribe("topic.t", second_dyn).await.unwrap();

        transport.publish("topic.t", json!(1)).await.unwrap();
        transport.unsubscribe("topic.t", first_dyn.clone()).await.unwrap();
        transport.publish("topic.t", json!(2)).await.unwrap();

        assert_eq!(*first.events.lock().await, vec![json!(1)]);
        assert_eq!(*second.events.lock().await, vec![json!(1), json!(2)]);
        assert_eq!(transport.subscriber_count("topic.t").await, 1);

        let err = transport.unsubscribe("topic.t", first_dyn).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
