/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Synthesizes the externally invocable procedure set from configuration and
//! registers each procedure, bound to the shared dispatcher, with the
//! transport layer.

use crate::config::RpcConfig;
use crate::dispatcher::Dispatcher;
use crate::status::{ErrorCode, Status};
use crate::transport::{ProcedureHandler, ProgressSink, RegisterOptions, Transport};
use async_trait::async_trait;
use log::info;
use serde_json::Value;
use std::sync::Arc;

/// One externally invocable procedure, built once per configured
/// (version, verb) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcedureDescriptor {
    pub proc_version: String,
    pub name: String,
    /// `<proc-prefix>.<version>.<name>`
    pub uri: String,
}

/// Generic dispatcher entry point for one registered procedure URI.
struct BoundProcedure {
    descriptor: ProcedureDescriptor,
    dispatcher: Arc<Dispatcher>,
}

#[async_trait]
impl ProcedureHandler for BoundProcedure {
    async fn invoke(&self, args: Value, progress: Option<ProgressSink>) -> Result<Value, Status> {
        self.dispatcher
            .execute(
                &self.descriptor.proc_version,
                &self.descriptor.name,
                &self.descriptor.uri,
                args,
                progress,
            )
            .await
    }
}

pub struct ProcedureRegistry {
    procedures: Vec<ProcedureDescriptor>,
    dispatcher: Arc<Dispatcher>,
}

impl ProcedureRegistry {
    pub fn new(config: &RpcConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let mut procedures = Vec::new();
        for (proc_version, verbs) in &config.procs {
            for verb in verbs {
                procedures.push(ProcedureDescriptor {
                    proc_version: proc_version.clone(),
                    name: verb.clone(),
                    uri: format!("{}.{}.{}", config.proc_uri_prefix, proc_version, verb),
                });
            }
        }
        Self {
            procedures,
            dispatcher,
        }
    }

    pub fn procedures(&self) -> &[ProcedureDescriptor] {
        &self.procedures
    }

    /// Registers every synthesized procedure with the transport layer, all
    /// with in-progress results enabled. The first failure aborts startup:
    /// serving a partially registered procedure set is worse than not
    /// serving at all.
    pub async fn register_all(&self, transport: &dyn Transport) -> Result<(), Status> {
        for descriptor in &self.procedures {
            let handler: Arc<dyn ProcedureHandler> = Arc::new(BoundProcedure {
                descriptor: descriptor.clone(),
                dispatcher: self.dispatcher.clone(),
            });
            transport
                .register_procedure(
                    &descriptor.uri,
                    handler,
                    RegisterOptions {
                        supports_progress: true,
                    },
                )
                .await
                .map_err(|e| {
                    Status::fail_with_code(
                        ErrorCode::RegistrationFailure,
                        format!("could not register procedure '{}': {e}", descriptor.uri),
                    )
                })?;
            info!("registered procedure '{}'", descriptor.uri);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ProcedureRegistry;
    use crate::catalog::ResourceCatalog;
    use crate::config::RpcConfig;
    use crate::dispatcher::Dispatcher;
    use crate::handler_table::HandlerTable;
    use crate::status::{ErrorCode, Status};
    use crate::transport::{
        ProcedureHandler, RegisterOptions, TopicListener, Transport,
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn registry_for(config_str: &str) -> ProcedureRegistry {
        let config = RpcConfig::from_json5_str(config_str).unwrap();
        let catalog = ResourceCatalog::from_config(&config);
        let dispatcher = Arc::new(Dispatcher::new(catalog, HandlerTable::new()));
        ProcedureRegistry::new(&config, dispatcher)
    }

    const TWO_VERSION_CONFIG: &str = r#"
    {
        proc_uri_prefix: "com.example.rtu.proc",
        procs: {
            v1: ["create", "read", "update", "delete"],
            v2: ["read"],
        },
        data_uri_prefix: "com.example.rtu.data",
        data_procs: {},
    }
    "#;

    /// Records registrations; optionally rejects one URI.
    struct RecordingTransport {
        registered: Mutex<Vec<String>>,
        reject_uri: Option<String>,
    }

    impl RecordingTransport {
        fn new(reject_uri: Option<&str>) -> Self {
            Self {
                registered: Mutex::new(Vec::new()),
                reject_uri: reject_uri.map(str::to_string),
            }
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn register_procedure(
            &self,
            uri: &str,
            _handler: Arc<dyn ProcedureHandler>,
            options: RegisterOptions,
        ) -> Result<(), Status> {
            assert!(options.supports_progress);
            if self.reject_uri.as_deref() == Some(uri) {
                return Err(Status::fail_with_code(
                    ErrorCode::Internal,
                    "transport rejected registration",
                ));
            }
            self.registered.lock().await.push(uri.to_string());
            Ok(())
        }

        async fn call(&self, _uri: &str, _args: Value) -> Result<Value, Status> {
            unimplemented!("not used by registration tests")
        }

        async fn publish(&self, _topic: &str, _event: Value) -> Result<(), Status> {
            unimplemented!("not used by registration tests")
        }

        async fn subscribe(
            &self,
            _topic: &str,
            _listener: Arc<dyn TopicListener>,
        ) -> Result<(), Status> {
            unimplemented!("not used by registration tests")
        }

        async fn unsubscribe(
            &self,
            _topic: &str,
            _listener: Arc<dyn TopicListener>,
        ) -> Result<(), Status> {
            unimplemented!("not used by registration tests")
        }
    }

    #[test]
    fn synthesizes_one_descriptor_per_version_verb_pair() {
        let registry = registry_for(TWO_VERSION_CONFIG);

        let mut uris: Vec<_> = registry
            .procedures()
            .iter()
            .map(|p| p.uri.clone())
            .collect();
        uris.sort();
        assert_eq!(
            uris,
            [
                "com.example.rtu.proc.v1.create",
                "com.example.rtu.proc.v1.delete",
                "com.example.rtu.proc.v1.read",
                "com.example.rtu.proc.v1.update",
                "com.example.rtu.proc.v2.read",
            ]
        );
    }

    #[tokio::test]
    async fn registers_every_procedure_exactly_once() {
        let registry = registry_for(TWO_VERSION_CONFIG);
        let transport = RecordingTransport::new(None);

        registry.register_all(&transport).await.unwrap();

        let mut registered = transport.registered.lock().await.clone();
        registered.sort();
        registered.dedup();
        assert_eq!(registered.len(), registry.procedures().len());
    }

    #[tokio::test]
    async fn registration_failure_aborts_and_names_the_uri() {
        let registry = registry_for(TWO_VERSION_CONFIG);
        let transport = RecordingTransport::new(Some("com.example.rtu.proc.v1.read"));

        let err = registry.register_all(&transport).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::RegistrationFailure);
        assert!(err.message().contains("com.example.rtu.proc.v1.read"));
    }
}
