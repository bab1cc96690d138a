/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Immutable catalog answering "does verb V of version P exist for URI U".

use crate::config::RpcConfig;

/// One configured data resource, frozen at catalog construction.
#[derive(Clone, Debug)]
pub struct ResourceDescriptor {
    data_version: String,
    name: String,
    canonical_uri: String,
    sub_resources: Vec<String>,
    supported_procs: std::collections::BTreeMap<String, std::collections::BTreeSet<String>>,
}

impl ResourceDescriptor {
    pub fn data_version(&self) -> &str {
        &self.data_version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<data-prefix>.<data-version>.<name>`
    pub fn canonical_uri(&self) -> &str {
        &self.canonical_uri
    }

    pub fn sub_resources(&self) -> &[String] {
        &self.sub_resources
    }

    /// Iterates the declared (proc version, verb) combinations.
    pub fn supported_procs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.supported_procs
            .iter()
            .flat_map(|(version, verbs)| verbs.iter().map(move |verb| (version.as_str(), verb.as_str())))
    }
}

/// Result of a successful URI resolution. When a sub-resource URI matched,
/// the matched sub-name is carried along for the handler; it never changes
/// handler selection.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedResource<'a> {
    pub descriptor: &'a ResourceDescriptor,
    pub sub_resource: Option<&'a str>,
}

/// Built once from configuration at startup; read-only thereafter.
#[derive(Clone, Debug)]
pub struct ResourceCatalog {
    data_uri_prefix: String,
    resources: Vec<ResourceDescriptor>,
}

impl ResourceCatalog {
    pub fn from_config(config: &RpcConfig) -> Self {
        let mut resources = Vec::new();
        for (data_version, resource_configs) in &config.data_procs {
            for (name, resource_config) in resource_configs {
                resources.push(ResourceDescriptor {
                    data_version: data_version.clone(),
                    name: name.clone(),
                    canonical_uri: format!("{}.{}.{}", config.data_uri_prefix, data_version, name),
                    sub_resources: resource_config.sub_resources.clone(),
                    supported_procs: resource_config.procs.clone(),
                });
            }
        }
        Self {
            data_uri_prefix: config.data_uri_prefix.clone(),
            resources,
        }
    }

    pub fn data_uri_prefix(&self) -> &str {
        &self.data_uri_prefix
    }

    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    /// Returns the first descriptor whose canonical URI, or one of its
    /// sub-resource URIs, exactly equals `data_uri`.
    pub fn resolve(&self, data_uri: &str) -> Option<ResolvedResource<'_>> {
        for descriptor in &self.resources {
            if descriptor.canonical_uri == data_uri {
                return Some(ResolvedResource {
                    descriptor,
                    sub_resource: None,
                });
            }
            // Sub-resource fallback: `<canonical>.<sub>` selects the same
            // handler, with the sub-name forwarded as information.
            let Some(suffix) = data_uri
                .strip_prefix(descriptor.canonical_uri.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
            else {
                continue;
            };
            if let Some(sub) = descriptor
                .sub_resources
                .iter()
                .find(|sub| sub.as_str() == suffix)
            {
                return Some(ResolvedResource {
                    descriptor,
                    sub_resource: Some(sub.as_str()),
                });
            }
        }
        None
    }

    /// True iff `verb` of interface version `proc_version` is declared for
    /// the descriptor.
    pub fn supports(&self, descriptor: &ResourceDescriptor, proc_version: &str, verb: &str) -> bool {
        descriptor
            .supported_procs
            .get(proc_version)
            .is_some_and(|verbs| verbs.contains(verb))
    }
}
