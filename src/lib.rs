// SPDX-License-Identifier: Apache-2.0

//! Transactional shared-memory state for cooperating processes on one host.
//!
//! A [`State`] subscribes to a named page of POSIX shared memory and gets a
//! read-only view of whatever was last committed. A [`Transaction`]
//! snapshots the state at `start` and either commits its changes
//! atomically (if nothing else committed in the meantime) or is rejected.
//!
//! ```no_run
//! use kstate::{Permissions, State, Transaction};
//!
//! let mut state = State::new();
//! state.subscribe("example.counter", Permissions::READ | Permissions::WRITE)?;
//!
//! let mut txn = Transaction::new();
//! txn.start(&state, Permissions::READ | Permissions::WRITE)?;
//! unsafe { *(txn.data_ptr().unwrap() as *mut u32) = 1 };
//! txn.commit()?;
//! # Ok::<(), kstate::Error>(())
//! ```
//!
//! `cfg(unix)` only: the primitives wrapped here (`shm_open`, `mmap`,
//! `mprotect`, `shm_unlink`) are POSIX-specific. See `DESIGN.md` for the
//! rest.

#![cfg(unix)]

#[macro_use]
extern crate lazy_static;

mod error;
mod ids;
mod name;
mod permissions;
mod shm;
mod state;
mod transaction;

pub use error::{Error, Result};
pub use name::{unique_name, MAX_NAME_LEN};
pub use permissions::Permissions;
pub use state::State;
pub use transaction::Transaction;
