/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! # rtu-resources
//!
//! The concrete data-resource modules behind the gateway's RPC surface.
//!
//! Each module is named `resource_<name>` for the data resource it backs
//! and registers one handler per supported verb/version combination into
//! the [`HandlerTable`][rtu_router::HandlerTable] during bootstrap. The
//! table is validated against the catalog before serving begins, so a
//! configured combination without a handler aborts startup instead of
//! failing a caller later.

pub mod resource_config;
pub mod resource_general;
