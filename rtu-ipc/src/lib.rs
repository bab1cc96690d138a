/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! # rtu-ipc
//!
//! Request/reply correlation between the RPC gateway and the rest of the
//! system over a publish/subscribe channel.
//!
//! The [`CorrelationBroker`] is the server half: it owns a FIFO outbound
//! mailbox fed by a registered `send` procedure and relays each queued
//! message onto a shared reply topic. The [`RequestCorrelator`] is the
//! client half: per call it allocates a correlation id, subscribes to the
//! reply topic before sending, and completes with exactly the one reply
//! whose `request_id` matches its own. Replies carrying other ids are left
//! untouched for the correlators they belong to.
//!
//! Request ids come from a shared [`RequestIdAllocator`] that wraps at
//! 10^9 and never reissues an id that is still pending. Every wait is
//! bounded: a reply that never arrives surfaces as a
//! [`Timeout`][rtu_router::ErrorCode::Timeout] error, and the id and
//! subscription are released on every exit path.

mod broker;
pub use broker::{BrokerHandle, CorrelationBroker};

mod codec;
pub use codec::{CodecRegistry, IpcCodec, IpcRequest};

mod correlator;
pub use correlator::RequestCorrelator;

mod id_allocator;
pub use id_allocator::{PendingId, RequestIdAllocator, REQUEST_ID_MODULUS};

mod message;
pub use message::{InboundEvent, IpcUris, OutboundMessage};
