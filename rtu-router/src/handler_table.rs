/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Startup-populated table mapping resolved resource/verb combinations to
//! their handlers. Dispatch is a table lookup; resource modules register
//! their handlers before serving begins and missing registrations are
//! detected at startup, not at first call.

use crate::catalog::ResourceCatalog;
use crate::status::{ErrorCode, Status};
use crate::transport::ProgressSink;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Identity of one handler: the (resource, data version, proc version, verb)
/// combination it implements.
///
/// The derived module/method names preserve the handler naming contract
/// (`resource_<name>`, `data_<dv>_proc_<pv>_<verb>`) and appear in every
/// diagnostic that names a missing handler.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HandlerRef {
    pub resource: String,
    pub data_version: String,
    pub proc_version: String,
    pub verb: String,
}

impl HandlerRef {
    pub fn new(resource: &str, data_version: &str, proc_version: &str, verb: &str) -> Self {
        Self {
            resource: resource.to_string(),
            data_version: data_version.to_string(),
            proc_version: proc_version.to_string(),
            verb: verb.to_string(),
        }
    }

    pub fn module_name(&self) -> String {
        format!("resource_{}", self.resource)
    }

    pub fn method_name(&self) -> String {
        format!(
            "data_{}_proc_{}_{}",
            self.data_version, self.proc_version, self.verb
        )
    }
}

/// A validated dispatch request as seen by a resource handler.
#[derive(Clone, Debug)]
pub struct DispatchRequest {
    /// The data URI exactly as the caller supplied it.
    pub data_uri: String,
    /// Name of the matched resource.
    pub resource: String,
    /// Data version of the matched resource.
    pub data_version: String,
    /// Matched sub-resource name, if a sub-resource URI was used.
    pub sub_resource: Option<String>,
    /// Verb-specific fields, opaque to the dispatcher (`uri` removed).
    pub fields: Map<String, Value>,
}

/// Implemented by resource modules for each supported verb.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Handles one request. Zero or more progress values may be reported
    /// through `progress` before the final result is returned; `progress` is
    /// `None` when the caller did not request in-progress results.
    async fn handle(
        &self,
        request: DispatchRequest,
        progress: Option<ProgressSink>,
    ) -> Result<Value, Status>;
}

/// Owner of all registered handlers. Populated during bootstrap, then
/// read-only for process lifetime.
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<HandlerRef, Arc<dyn ResourceHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. A second registration for the same combination
    /// is a startup defect, not a silent override.
    pub fn register(
        &mut self,
        handler_ref: HandlerRef,
        handler: Arc<dyn ResourceHandler>,
    ) -> Result<(), Status> {
        if self.handlers.contains_key(&handler_ref) {
            return Err(Status::fail_with_code(
                ErrorCode::HandlerModuleLoadError,
                format!(
                    "handler '{}.{}' is already registered",
                    handler_ref.module_name(),
                    handler_ref.method_name()
                ),
            ));
        }
        self.handlers.insert(handler_ref, handler);
        Ok(())
    }

    pub fn lookup(&self, handler_ref: &HandlerRef) -> Option<Arc<dyn ResourceHandler>> {
        self.handlers.get(handler_ref).cloned()
    }

    /// Verifies every (resource, data version, proc version, verb)
    /// combination the catalog declares has a registered handler. Run before
    /// serving begins so a missing handler aborts bootstrap instead of
    /// failing a caller later.
    pub fn validate_against(&self, catalog: &ResourceCatalog) -> Result<(), Status> {
        for descriptor in catalog.resources() {
            for (proc_version, verb) in descriptor.supported_procs() {
                let handler_ref = HandlerRef::new(
                    descriptor.name(),
                    descriptor.data_version(),
                    proc_version,
                    verb,
                );
                if self.lookup(&handler_ref).is_none() {
                    return Err(Status::fail_with_code(
                        ErrorCode::HandlerNotImplemented,
                        format!(
                            "configuration declares '{}' for data URI '{}' but no \
                             '{}.{}' handler is registered",
                            verb,
                            descriptor.canonical_uri(),
                            handler_ref.module_name(),
                            handler_ref.method_name()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}
