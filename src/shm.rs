// SPDX-License-Identifier: Apache-2.0

//! Thin wrapper over `shm_open`, `ftruncate`, `mmap`, `mprotect`, `munmap`
//! and `shm_unlink`. Every other component in this crate goes through here;
//! nothing else touches libc directly.

use std::ffi::CStr;
use std::os::unix::io::RawFd;
use std::ptr;

use crate::error::{Error, Result};

lazy_static::lazy_static! {
    static ref PAGE_SIZE: usize = unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize };
}

pub fn page_size() -> usize {
    *PAGE_SIZE
}

/// Owner read/write only. See DESIGN.md Open Question 2 for why this is
/// stricter than the original's world read/write/execute.
pub const DEFAULT_CREATE_MODE: libc::mode_t = 0o600;

/// Owns a mapped region, either backed by a named shared object or
/// anonymous. Dropping it unmaps.
pub struct Mapping {
    base: *mut u8,
    len: usize,
}

// SAFETY: the mapping is just an address range; handing it to another
// thread is sound as long as access is synchronized by the caller, which is
// exactly what State/Transaction already require of their owners.
unsafe impl Send for Mapping {}

impl Mapping {
    pub fn data(&self) -> *mut u8 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.base, self.len) }
    }

    /// # Safety
    /// The caller must ensure the mapping's current protection includes
    /// `PROT_WRITE`; writing to a read-only mapping traps (SIGSEGV/SIGBUS).
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.base, self.len)
    }

    pub fn protect(&self, readable: bool, writable: bool) -> Result<()> {
        protect(self.base, self.len, prot_flags(readable, writable))
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        if let Err(e) = unmap(self.base, self.len) {
            log::warn!("munmap failed while dropping a mapping: {e}");
        }
    }
}

fn prot_flags(readable: bool, writable: bool) -> libc::c_int {
    (readable as libc::c_int * libc::PROT_READ) | (writable as libc::c_int * libc::PROT_WRITE)
}

/// Fails with [`Error::NotFound`] if the object does not exist.
pub fn open_existing(name: &CStr) -> Result<RawFd> {
    let fd = unsafe { libc::shm_open(name.as_ptr(), libc::O_RDONLY, 0) };
    if fd < 0 {
        let err = std::io::Error::last_os_error();
        return Err(match err.raw_os_error() {
            Some(libc::ENOENT) => Error::NotFound,
            _ => Error::Os { syscall: "shm_open", source: err },
        });
    }
    Ok(fd)
}

pub fn open_existing_read_write(name: &CStr) -> Result<RawFd> {
    let fd = unsafe { libc::shm_open(name.as_ptr(), libc::O_RDWR, 0) };
    if fd < 0 {
        let err = std::io::Error::last_os_error();
        return Err(match err.raw_os_error() {
            Some(libc::ENOENT) => Error::NotFound,
            _ => Error::Os { syscall: "shm_open", source: err },
        });
    }
    Ok(fd)
}

pub fn open_or_create(name: &CStr, size: usize) -> Result<RawFd> {
    open_or_create_with_mode(name, size, DEFAULT_CREATE_MODE)
}

pub fn open_or_create_with_mode(name: &CStr, size: usize, mode: libc::mode_t) -> Result<RawFd> {
    let fd = unsafe { libc::shm_open(name.as_ptr(), libc::O_RDWR | libc::O_CREAT, mode) };
    if fd < 0 {
        return Err(Error::os("shm_open"));
    }
    if unsafe { libc::ftruncate(fd, size as libc::off_t) } != 0 {
        let err = Error::os("ftruncate");
        unsafe { libc::close(fd) };
        return Err(err);
    }
    Ok(fd)
}

pub fn unlink(name: &CStr) -> Result<()> {
    if unsafe { libc::shm_unlink(name.as_ptr()) } != 0 {
        return Err(Error::os("shm_unlink"));
    }
    Ok(())
}

pub fn close(fd: RawFd) {
    if unsafe { libc::close(fd) } != 0 {
        log::warn!("close({fd}) failed: {}", std::io::Error::last_os_error());
    }
}

pub fn map_shared(fd: RawFd, len: usize, readable: bool, writable: bool) -> Result<Mapping> {
    let base = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            prot_flags(readable, writable),
            libc::MAP_SHARED,
            fd,
            0,
        )
    };
    if base == libc::MAP_FAILED {
        return Err(Error::os("mmap"));
    }
    Ok(Mapping { base: base as *mut u8, len })
}

pub fn map_anonymous(len: usize, readable: bool, writable: bool) -> Result<Mapping> {
    let base = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            prot_flags(readable, writable),
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if base == libc::MAP_FAILED {
        return Err(Error::os("mmap"));
    }
    Ok(Mapping { base: base as *mut u8, len })
}

fn unmap(base: *mut u8, len: usize) -> Result<()> {
    if unsafe { libc::munmap(base as *mut libc::c_void, len) } != 0 {
        return Err(Error::os("munmap"));
    }
    Ok(())
}

fn protect(base: *mut u8, len: usize, prot: libc::c_int) -> Result<()> {
    if unsafe { libc::mprotect(base as *mut libc::c_void, len, prot) } != 0 {
        return Err(Error::os("mprotect"));
    }
    Ok(())
}
