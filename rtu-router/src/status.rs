/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes surfaced across the transport boundary.
///
/// Each code maps to a dotted error URI so remote callers can match on it
/// without parsing the human-readable message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request payload is not an object or lacks a `uri` field.
    MissingDataUri,
    /// No configured data resource matches the requested data URI.
    DataUriUnsupported,
    /// The data URI matched, but the verb/version is not declared for it.
    VerbUnsupported,
    /// No handler is registered for the resolved resource/verb combination.
    HandlerNotImplemented,
    /// A resource module failed to register its handlers at startup.
    HandlerModuleLoadError,
    /// The IPC mailbox could not be read from or relayed.
    MailboxReadError,
    /// A procedure could not be registered with the transport layer.
    RegistrationFailure,
    /// No matching IPC reply arrived within the configured bound.
    Timeout,
    /// A transport-level entity (procedure, subscription) does not exist.
    NotFound,
    /// A payload failed boundary validation.
    InvalidArgument,
    /// An invariant the core relies on was violated.
    Internal,
}

impl ErrorCode {
    /// Dotted error URI published alongside the message.
    pub fn error_uri(&self) -> &'static str {
        match self {
            ErrorCode::MissingDataUri => "com.example.rtu.error.rpc_data_uri_missing",
            ErrorCode::DataUriUnsupported => "com.example.rtu.error.rpc_data_uri_unsupported",
            ErrorCode::VerbUnsupported => "com.example.rtu.error.rpc_verb_unsupported",
            ErrorCode::HandlerNotImplemented => "com.example.rtu.error.rpc_not_implemented",
            ErrorCode::HandlerModuleLoadError => "com.example.rtu.error.rpc_module_load",
            ErrorCode::MailboxReadError => "com.example.rtu.error.ipc_mailbox_receive",
            ErrorCode::RegistrationFailure => "com.example.rtu.error.register_proc",
            ErrorCode::Timeout => "com.example.rtu.error.ipc_timeout",
            ErrorCode::NotFound => "com.example.rtu.error.not_found",
            ErrorCode::InvalidArgument => "com.example.rtu.error.invalid_argument",
            ErrorCode::Internal => "com.example.rtu.error.internal",
        }
    }
}

/// Structured application-level error: a stable [`ErrorCode`] plus a message
/// naming the offending URI/verb.
///
/// Nothing in the core retries on a `Status`; retry policy belongs to the
/// caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    code: ErrorCode,
    message: String,
}

impl Status {
    pub fn fail_with_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.error_uri(), self.message)
    }
}

impl std::error::Error for Status {}
