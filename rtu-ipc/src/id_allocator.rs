/********************************************************************************
 * Copyright (c) 2024 Contributors to the RTU Gateway project
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Correlation-id allocation shared by all correlator sessions.
//!
//! Ids are drawn from a counter that wraps at [`REQUEST_ID_MODULUS`] back to
//! 0. At any instant the set of in-flight ids is unique: allocation skips
//! ids that are still pending, so a wrapped counter can never reissue an id
//! whose reply is still outstanding.

use rtu_router::{ErrorCode, Status};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

/// The id space: ids are in `0..REQUEST_ID_MODULUS`.
pub const REQUEST_ID_MODULUS: u32 = 1_000_000_000;

struct AllocatorState {
    next: u32,
    pending: HashSet<u32>,
}

pub struct RequestIdAllocator {
    state: Mutex<AllocatorState>,
}

impl Default for RequestIdAllocator {
    fn default() -> Self {
        Self::starting_at(0)
    }
}

impl RequestIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the counter at `next`; used to exercise the wraparound
    /// boundary without allocating through the whole id space.
    pub fn starting_at(next: u32) -> Self {
        Self {
            state: Mutex::new(AllocatorState {
                next: next % REQUEST_ID_MODULUS,
                pending: HashSet::new(),
            }),
        }
    }

    /// Allocates the next free id. The returned guard keeps the id pending
    /// until dropped, so cancellation and timeout paths release ids without
    /// extra bookkeeping.
    pub fn allocate(self: &Arc<Self>) -> Result<PendingId, Status> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Status::fail_with_code(ErrorCode::Internal, "id allocator poisoned"))?;
        if state.pending.len() >= REQUEST_ID_MODULUS as usize {
            return Err(Status::fail_with_code(
                ErrorCode::Internal,
                "request id space exhausted",
            ));
        }
        loop {
            let id = state.next;
            state.next = (state.next + 1) % REQUEST_ID_MODULUS;
            if state.pending.insert(id) {
                return Ok(PendingId {
                    id,
                    allocator: Arc::clone(self),
                });
            }
        }
    }

    /// Number of ids currently in flight.
    pub fn pending_len(&self) -> usize {
        self.state.lock().map_or(0, |state| state.pending.len())
    }

    fn release(&self, id: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.pending.remove(&id);
        }
    }

    #[cfg(test)]
    fn force_next(&self, next: u32) {
        self.state.lock().unwrap().next = next;
    }
}

/// An allocated correlation id, held pending for the lifetime of the guard.
pub struct PendingId {
    id: u32,
    allocator: Arc<RequestIdAllocator>,
}

impl PendingId {
    pub fn value(&self) -> u32 {
        self.id
    }
}

impl Drop for PendingId {
    fn drop(&mut self) {
        self.allocator.release(self.id);
    }
}

impl fmt::Debug for PendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PendingId({})", self.id)
    }
}
