// SPDX-License-Identifier: Apache-2.0

//! State handle: subscription lifecycle and the read-only direct mapping.

use crate::error::{Error, Result};
use crate::ids;
use crate::name;
use crate::permissions::Permissions;
use crate::shm::{self, Mapping};

/// A subscription to a named, page-sized shared-memory region.
///
/// `subscribe` maps the region **read-only** regardless of the requested
/// permissions; the direct handle pointer is never writable, only a
/// [`crate::Transaction`] started against it can write. Dropping a
/// subscribed `State` unsubscribes it first.
pub struct State {
    id: u64,
    name: Option<String>,
    permissions: Permissions,
    mapping: Option<Mapping>,
}

impl State {
    pub fn new() -> Self {
        Self {
            id: ids::next_state_id(),
            name: None,
            permissions: Permissions::NONE,
            mapping: None,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.mapping.is_some()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn permissions(&self) -> Permissions {
        if self.is_subscribed() {
            self.permissions
        } else {
            Permissions::NONE
        }
    }

    pub fn id(&self) -> u64 {
        if self.is_subscribed() {
            self.id
        } else {
            0
        }
    }

    /// Writing through this pointer traps: the mapping is `PROT_READ`-only.
    pub fn data_ptr(&self) -> Option<*const u8> {
        self.mapping.as_ref().map(|m| m.data() as *const u8)
    }

    pub fn len(&self) -> usize {
        self.mapping.as_ref().map(Mapping::len).unwrap_or(0)
    }

    /// Creates the backing shared object if `perms` includes WRITE and it
    /// does not already exist; a read-only subscribe on a nonexistent name
    /// fails with [`Error::NotFound`]. Creates with an owner-only mode; use
    /// [`State::subscribe_with_mode`] for a different one.
    pub fn subscribe(&mut self, user_name: &str, perms: Permissions) -> Result<()> {
        self.subscribe_with_mode(user_name, perms, shm::DEFAULT_CREATE_MODE)
    }

    pub fn subscribe_with_mode(
        &mut self,
        user_name: &str,
        perms: Permissions,
        mode: libc::mode_t,
    ) -> Result<()> {
        if self.is_subscribed() {
            return Err(Error::InvalidArgument);
        }

        let canonical = name::canonicalize(user_name)?;
        let size = shm::page_size();

        let fd = if perms.is_writable() {
            shm::open_or_create_with_mode(&canonical, size, mode)?
        } else {
            shm::open_existing(&canonical)?
        };

        let mapping = match shm::map_shared(fd, size, true, false) {
            Ok(m) => m,
            Err(e) => {
                shm::close(fd);
                return Err(e);
            }
        };
        shm::close(fd);

        self.name = Some(user_name.to_string());
        self.permissions = perms;
        self.mapping = Some(mapping);
        log::debug!("{self}: subscribed");
        Ok(())
    }

    /// Idempotent and best-effort: adapter failures are logged, never
    /// propagated.
    pub fn unsubscribe(&mut self) {
        let Some(user_name) = self.name.take() else {
            return;
        };
        self.permissions = Permissions::NONE;
        self.mapping = None; // Drop unmaps.

        match name::canonicalize(&user_name) {
            Ok(canonical) => {
                if let Err(e) = shm::unlink(&canonical) {
                    log::warn!("unlink of '{user_name}' failed: {e}");
                }
            }
            Err(e) => log::warn!("could not re-canonicalize '{user_name}' on unsubscribe: {e}"),
        }
        log::debug!("state {} unsubscribed from '{user_name}'", self.id);
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for State {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(n) => write!(f, "State {} on '{n}' for {}", self.id, self.permissions),
            None => write!(f, "State {} unsubscribed", self.id),
        }
    }
}
