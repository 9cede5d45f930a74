// SPDX-License-Identifier: Apache-2.0

//! Monotonic, process-local id allocation. Two independent counters, one
//! for State handles and one for Transaction handles, each starting at 1
//! and skipping 0 on wrap (0 is reserved to mean "no handle").

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STATE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

fn next(counter: &AtomicU64) -> u64 {
    loop {
        let id = counter.fetch_add(1, Ordering::Relaxed);
        if id != 0 {
            return id;
        }
        // counter wrapped past u64::MAX to 0; 0 is reserved, try again.
    }
}

pub fn next_state_id() -> u64 {
    next(&NEXT_STATE_ID)
}

pub fn next_transaction_id() -> u64 {
    next(&NEXT_TRANSACTION_ID)
}
