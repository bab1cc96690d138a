/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Resolve-then-invoke state machine: three terminal failures (data URI not
//! found, verb unsupported, handler not implemented) and one success state
//! (handler invoked).

use crate::catalog::ResourceCatalog;
use crate::handler_table::{DispatchRequest, HandlerRef, HandlerTable};
use crate::status::{ErrorCode, Status};
use crate::transport::ProgressSink;
use log::debug;
use serde_json::Value;

pub struct Dispatcher {
    catalog: ResourceCatalog,
    handlers: HandlerTable,
}

impl Dispatcher {
    pub fn new(catalog: ResourceCatalog, handlers: HandlerTable) -> Self {
        Self { catalog, handlers }
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    /// Executes verb `verb` of interface version `proc_version` against the
    /// data URI named in `args`. `proc_uri` is the procedure URI the caller
    /// invoked; it only appears in diagnostics.
    pub async fn execute(
        &self,
        proc_version: &str,
        verb: &str,
        proc_uri: &str,
        args: Value,
        progress: Option<ProgressSink>,
    ) -> Result<Value, Status> {
        let Value::Object(mut fields) = args else {
            return Err(Status::fail_with_code(
                ErrorCode::MissingDataUri,
                format!(
                    "calls to '{proc_uri}' must supply an object with a 'uri' \
                     property naming a data URI"
                ),
            ));
        };
        let data_uri = match fields.get("uri") {
            Some(Value::String(uri)) => uri.clone(),
            _ => {
                return Err(Status::fail_with_code(
                    ErrorCode::MissingDataUri,
                    format!(
                        "calls to '{proc_uri}' must supply an object with a 'uri' \
                         property naming a data URI"
                    ),
                ));
            }
        };

        let Some(resolved) = self.catalog.resolve(&data_uri) else {
            return Err(Status::fail_with_code(
                ErrorCode::DataUriUnsupported,
                format!("data URI '{data_uri}' is not supported by the '{proc_uri}' procedure"),
            ));
        };
        if !self.catalog.supports(resolved.descriptor, proc_version, verb) {
            return Err(Status::fail_with_code(
                ErrorCode::VerbUnsupported,
                format!(
                    "data URI '{data_uri}' does not support the '{verb}' verb of \
                     interface version '{proc_version}'"
                ),
            ));
        }

        let handler_ref = HandlerRef::new(
            resolved.descriptor.name(),
            resolved.descriptor.data_version(),
            proc_version,
            verb,
        );
        let Some(handler) = self.handlers.lookup(&handler_ref) else {
            return Err(Status::fail_with_code(
                ErrorCode::HandlerNotImplemented,
                format!(
                    "could not process data URI '{data_uri}' for the '{proc_uri}' \
                     procedure: no '{}.{}' handler is registered",
                    handler_ref.module_name(),
                    handler_ref.method_name()
                ),
            ));
        };

        // The handler receives every field except the routing `uri`.
        fields.remove("uri");
        let request = DispatchRequest {
            data_uri,
            resource: resolved.descriptor.name().to_string(),
            data_version: resolved.descriptor.data_version().to_string(),
            sub_resource: resolved.sub_resource.map(str::to_string),
            fields,
        };

        debug!(
            "invoking '{}.{}' for data URI '{}'",
            handler_ref.module_name(),
            handler_ref.method_name(),
            request.data_uri
        );
        handler.handle(request, progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::Dispatcher;
    use crate::catalog::ResourceCatalog;
    use crate::config::RpcConfig;
    use crate::handler_table::{DispatchRequest, HandlerRef, HandlerTable, ResourceHandler};
    use crate::status::{ErrorCode, Status};
    use crate::transport::ProgressSink;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct EchoHandler;

    #[async_trait]
    impl ResourceHandler for EchoHandler {
        async fn handle(
            &self,
            request: DispatchRequest,
            progress: Option<ProgressSink>,
        ) -> Result<Value, Status> {
            if let Some(progress) = &progress {
                progress.report(json!("working"));
            }
            Ok(json!({
                "resource": request.resource,
                "sub": request.sub_resource,
                "fields": request.fields,
            }))
        }
    }

    fn reference_dispatcher() -> Dispatcher {
        let config = RpcConfig::from_json5_str(
            r#"
            {
                proc_uri_prefix: "com.example.rtu.proc",
                procs: { v1: ["read", "update", "delete"] },
                data_uri_prefix: "com.example.rtu.data",
                data_procs: {
                    v1: {
                        config: { procs: { v1: ["read", "update"] } },
                        general: {
                            sub_resources: ["site_id", "slots"],
                            procs: { v1: ["read"] },
                        },
                    },
                },
            }
            "#,
        )
        .unwrap();
        let catalog = ResourceCatalog::from_config(&config);

        let mut table = HandlerTable::new();
        for (resource, verb) in [("config", "read"), ("config", "update"), ("general", "read")] {
            table
                .register(HandlerRef::new(resource, "v1", "v1", verb), Arc::new(EchoHandler))
                .unwrap();
        }
        Dispatcher::new(catalog, table)
    }

    #[tokio::test]
    async fn non_object_payload_is_missing_data_uri() {
        let dispatcher = reference_dispatcher();
        let err = dispatcher
            .execute("v1", "read", "com.example.rtu.proc.v1.read", json!(42), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingDataUri);
    }

    #[tokio::test]
    async fn object_without_uri_is_missing_data_uri() {
        let dispatcher = reference_dispatcher();
        let err = dispatcher
            .execute(
                "v1",
                "read",
                "com.example.rtu.proc.v1.read",
                json!({"access_level": "admin"}),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingDataUri);
    }

    #[tokio::test]
    async fn unknown_data_uri_is_unsupported() {
        let dispatcher = reference_dispatcher();
        let err = dispatcher
            .execute(
                "v1",
                "read",
                "com.example.rtu.proc.v1.read",
                json!({"uri": "com.example.rtu.data.v1.unknown"}),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DataUriUnsupported);
        assert!(err.message().contains("com.example.rtu.data.v1.unknown"));
        assert!(err.message().contains("com.example.rtu.proc.v1.read"));
    }

    #[tokio::test]
    async fn undeclared_verb_is_verb_unsupported() {
        let dispatcher = reference_dispatcher();
        let err = dispatcher
            .execute(
                "v1",
                "delete",
                "com.example.rtu.proc.v1.delete",
                json!({"uri": "com.example.rtu.data.v1.config"}),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::VerbUnsupported);
    }

    #[tokio::test]
    async fn handler_receives_sub_resource_and_opaque_fields() {
        let dispatcher = reference_dispatcher();
        let result = dispatcher
            .execute(
                "v1",
                "read",
                "com.example.rtu.proc.v1.read",
                json!({"uri": "com.example.rtu.data.v1.general.site_id", "access_level": "admin"}),
                None,
            )
            .await
            .unwrap();

        assert_eq!(result["resource"], json!("general"));
        assert_eq!(result["sub"], json!("site_id"));
        // The routing `uri` is stripped; other fields pass through verbatim.
        assert_eq!(result["fields"], json!({"access_level": "admin"}));
    }

    #[tokio::test]
    async fn progress_values_are_forwarded_verbatim() {
        let dispatcher = reference_dispatcher();
        let (sink, mut receiver) = ProgressSink::channel();

        dispatcher
            .execute(
                "v1",
                "read",
                "com.example.rtu.proc.v1.read",
                json!({"uri": "com.example.rtu.data.v1.config"}),
                Some(sink),
            )
            .await
            .unwrap();

        assert_eq!(receiver.recv().await, Some(json!("working")));
    }
}
