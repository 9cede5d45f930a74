// SPDX-License-Identifier: Apache-2.0

//! Transaction handle: start/commit/abort and the optimistic
//! concurrency-control algorithm.

use crate::error::{Error, Result};
use crate::ids;
use crate::name;
use crate::permissions::Permissions;
use crate::shm::{self, Mapping};
use crate::state::State;

/// A scoped, snapshot-isolated view of a [`State`].
///
/// `start` copies the state's canonical name and re-opens the shared object
/// independently: a transaction never depends on its originating `State`
/// handle after `start` returns.
pub struct Transaction {
    id: u64,
    name: Option<String>,
    permissions: Permissions,
    active: bool,
    live: Option<Mapping>,
    /// Byte-for-byte copy of the live region at `start`, the optimistic-CC
    /// reference point. Only populated for writable transactions; a
    /// read-only transaction never commits, so it has no use for one.
    snapshot: Vec<u8>,
    working: Option<Mapping>,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            id: ids::next_transaction_id(),
            name: None,
            permissions: Permissions::NONE,
            active: false,
            live: None,
            snapshot: Vec::new(),
            working: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn name(&self) -> Option<&str> {
        if self.active {
            self.name.as_deref()
        } else {
            None
        }
    }

    pub fn permissions(&self) -> Permissions {
        if self.active {
            self.permissions
        } else {
            Permissions::NONE
        }
    }

    pub fn id(&self) -> u64 {
        if self.active {
            self.id
        } else {
            0
        }
    }

    /// Read-only transactions have this downgraded to `PROT_READ` at
    /// `start`, so writes through it trap.
    pub fn data_ptr(&self) -> Option<*mut u8> {
        self.working.as_ref().map(Mapping::data)
    }

    pub fn len(&self) -> usize {
        self.working.as_ref().map(Mapping::len).unwrap_or(0)
    }

    /// `perms` must not request WRITE unless `state` itself is writable.
    pub fn start(&mut self, state: &State, perms: Permissions) -> Result<()> {
        if self.active {
            return Err(Error::InvalidArgument);
        }
        if !state.is_subscribed() {
            return Err(Error::InvalidArgument);
        }
        if perms.is_writable() && !state.permissions().is_writable() {
            return Err(Error::InvalidArgument);
        }

        let user_name = state.name().expect("subscribed state has a name").to_string();
        let len = state.len();
        let canonical = name::canonicalize(&user_name)?;

        let fd = if perms.is_writable() {
            shm::open_existing_read_write(&canonical)?
        } else {
            shm::open_existing(&canonical)?
        };
        let live = match shm::map_shared(fd, len, true, perms.is_writable()) {
            Ok(m) => m,
            Err(e) => {
                shm::close(fd);
                return Err(e);
            }
        };
        shm::close(fd);

        let snapshot = if perms.is_writable() {
            live.as_slice().to_vec()
        } else {
            Vec::new()
        };

        let mut working = shm::map_anonymous(len, true, true)?;
        // SAFETY: just-created private mapping, PROT_WRITE is set.
        unsafe { working.as_mut_slice().copy_from_slice(live.as_slice()) };

        if !perms.is_writable() {
            working.protect(true, false)?;
        }

        self.name = Some(user_name);
        self.permissions = perms;
        self.live = Some(live);
        self.snapshot = snapshot;
        self.working = Some(working);
        self.active = true;
        log::debug!("{self}: started");
        Ok(())
    }

    pub fn abort(&mut self) -> Result<()> {
        if !self.active {
            return Err(Error::InvalidArgument);
        }
        log::debug!("transaction {} aborted", self.id);
        self.teardown();
        Ok(())
    }

    /// If `live` no longer matches `snapshot`, someone else committed first:
    /// fail with [`Error::NotPermitted`] and tear down anyway. Otherwise
    /// copy `working` into `live` if they differ. A commit on a read-only
    /// transaction fails without tearing the transaction down, so the
    /// caller can still `abort` it.
    pub fn commit(&mut self) -> Result<()> {
        if !self.active {
            return Err(Error::InvalidArgument);
        }
        if !self.permissions.is_writable() {
            return Err(Error::NotPermitted);
        }

        let matches_snapshot = {
            let live = self.live.as_ref().expect("active writable txn has a live mapping");
            live.as_slice() == self.snapshot.as_slice()
        };

        if !matches_snapshot {
            log::debug!("transaction {} lost the optimistic-commit race", self.id);
            self.teardown();
            return Err(Error::NotPermitted);
        }

        let needs_copy = {
            let live = self.live.as_ref().unwrap();
            let working = self.working.as_ref().unwrap();
            live.as_slice() != working.as_slice()
        };
        if needs_copy {
            let working_bytes = self.working.as_ref().unwrap().as_slice().to_vec();
            let live = self.live.as_mut().unwrap();
            // SAFETY: this transaction holds the only live PROT_WRITE
            // reference to this region for the duration of this call.
            unsafe { live.as_mut_slice().copy_from_slice(&working_bytes) };
        }

        log::debug!("transaction {} committed", self.id);
        self.teardown();
        Ok(())
    }

    fn teardown(&mut self) {
        self.name = None;
        self.permissions = Permissions::NONE;
        self.live = None;
        self.working = None;
        self.snapshot.clear();
        self.snapshot.shrink_to_fit();
        self.active = false;
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.active {
            let _ = self.abort();
        }
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(n) if self.active => write!(f, "Transaction {} on '{n}' for {}", self.id, self.permissions),
            _ => write!(f, "Transaction {} inactive", self.id),
        }
    }
}
