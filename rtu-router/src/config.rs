/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Declarative RPC configuration: which verbs exist per interface version and
//! which data resources support which verb/version combinations.

use crate::status::{ErrorCode, Status};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// One configured data resource.
///
/// A resource with a non-empty `sub_resources` list additionally matches
/// `<own-uri>.<sub-name>` for each listed sub-name; the matched sub-name is
/// informational and does not change which handler is selected.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct DataResourceConfig {
    #[serde(default)]
    pub sub_resources: Vec<String>,
    /// Supported procedures: interface version to set of verb names.
    pub procs: BTreeMap<String, BTreeSet<String>>,
}

/// Source data for the [`ResourceCatalog`][crate::ResourceCatalog] and the
/// [`ProcedureRegistry`][crate::ProcedureRegistry].
///
/// BTree collections keep iteration order deterministic, which makes URI
/// resolution (first match wins) stable across runs.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RpcConfig {
    /// Prefix of every procedure URI, e.g. `com.example.rtu.proc`.
    pub proc_uri_prefix: String,
    /// Procedure verbs per interface version.
    pub procs: BTreeMap<String, BTreeSet<String>>,
    /// Prefix of every data URI, e.g. `com.example.rtu.data`.
    pub data_uri_prefix: String,
    /// Data resources: data version to resource name to resource config.
    pub data_procs: BTreeMap<String, BTreeMap<String, DataResourceConfig>>,
}

impl RpcConfig {
    pub fn from_json5_str(contents: &str) -> Result<Self, Status> {
        json5::from_str(contents).map_err(|e| {
            Status::fail_with_code(
                ErrorCode::InvalidArgument,
                format!("unable to parse RPC configuration: {e}"),
            )
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Status> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Status::fail_with_code(
                ErrorCode::NotFound,
                format!("unable to read RPC configuration '{}': {e}", path.display()),
            )
        })?;
        Self::from_json5_str(&contents)
    }
}
