/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! # rtu-router
//!
//! `rtu-router` derives the externally invocable RPC surface of an RTU gateway
//! from declarative configuration and routes each call to the handler backing
//! the requested data resource.
//!
//! The configuration names which procedure verbs exist per interface version
//! (`<prefix>.<version>.<verb>`) and which data resources support which
//! verb/version combinations. At startup a [`ResourceCatalog`] is built from
//! that configuration, resource modules register their handlers into a
//! [`HandlerTable`], and a [`ProcedureRegistry`] registers one bound procedure
//! per configured (version, verb) pair with the [`Transport`] layer. Every
//! call then flows through the [`Dispatcher`]:
//!
//! 1. validate the request payload carries a data URI,
//! 2. resolve the URI against the catalog (with sub-resource fallback),
//! 3. check the verb/version is declared for the matched resource,
//! 4. look up and invoke the registered handler, forwarding any in-progress
//!    values it reports.
//!
//! The transport/session layer itself is an external collaborator reached
//! through the [`Transport`] trait; this crate never opens a socket.
//!
//! Library code emits `log` records and never initializes a global logger;
//! binaries and tests own `env_logger` initialization at process boundaries.

mod catalog;
pub use catalog::{ResolvedResource, ResourceCatalog, ResourceDescriptor};

mod config;
pub use config::{DataResourceConfig, RpcConfig};

mod dispatcher;
pub use dispatcher::Dispatcher;

mod handler_table;
pub use handler_table::{DispatchRequest, HandlerRef, HandlerTable, ResourceHandler};

mod procedure_registry;
pub use procedure_registry::{ProcedureDescriptor, ProcedureRegistry};

mod status;
pub use status::{ErrorCode, Status};

mod transport;
pub use transport::{
    ProcedureHandler, ProgressSink, RegisterOptions, TopicListener, Transport,
};
