// SPDX-License-Identifier: Apache-2.0

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Null/invalid handle, bad permissions bitmask, invalid or oversized
    /// name, or an operation attempted from the wrong lifecycle state
    /// (commit before start, subscribe while already subscribed, ...).
    #[error("invalid argument")]
    InvalidArgument,

    /// Commit of a read-only transaction, or a writable commit that lost
    /// the optimistic-concurrency race.
    #[error("operation not permitted")]
    NotPermitted,

    /// Read-only subscribe on a state that does not exist.
    #[error("state not found")]
    NotFound,

    #[error("out of memory")]
    OutOfMemory,

    #[error("{syscall} failed: {source}")]
    Os { syscall: &'static str, source: io::Error },
}

impl Error {
    pub(crate) fn os(syscall: &'static str) -> Self {
        Self::Os { syscall, source: io::Error::last_os_error() }
    }

    /// The POSIX errno this error corresponds to, negated, for callers
    /// porting code that expects the C ABI's `-errno` convention.
    pub fn to_errno(&self) -> i32 {
        let errno = match self {
            Error::InvalidArgument => libc::EINVAL,
            Error::NotPermitted => libc::EPERM,
            Error::NotFound => libc::ENOENT,
            Error::OutOfMemory => libc::ENOMEM,
            Error::Os { source, .. } => source.raw_os_error().unwrap_or(libc::EIO),
        };
        -errno
    }
}
