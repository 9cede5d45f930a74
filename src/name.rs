// SPDX-License-Identifier: Apache-2.0

//! Name validation and canonicalization.

use std::ffi::CString;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Maximum length of a user-visible state name, in bytes.
pub const MAX_NAME_LEN: usize = 254;

const DEFAULT_PREFIX: &str = "/kstate.";

/// Overridable via `KSTATE_PREFIX`, for tests that need several isolated
/// instances of the library in one process.
pub fn prefix() -> String {
    std::env::var("KSTATE_PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string())
}

pub fn validate(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(Error::InvalidArgument);
    }
    let bytes = name.as_bytes();
    if bytes[0] == b'.' || bytes[bytes.len() - 1] == b'.' {
        return Err(Error::InvalidArgument);
    }

    let mut prev_dot = false;
    for &b in bytes {
        let is_alnum = b.is_ascii_alphanumeric();
        let is_dot = b == b'.';
        if !is_alnum && !is_dot {
            return Err(Error::InvalidArgument);
        }
        if is_dot && prev_dot {
            return Err(Error::InvalidArgument);
        }
        prev_dot = is_dot;
    }

    Ok(())
}

pub fn canonicalize(name: &str) -> Result<CString> {
    validate(name)?;
    CString::new(format!("{}{}", prefix(), name)).map_err(|_| Error::InvalidArgument)
}

static UNIQUE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Builds a name of the form `prefix.<seconds><microseconds>.<pid>.<counter>`.
/// Uniqueness is only as good as wall-clock resolution plus the counter.
pub fn unique_name(prefix: &str) -> String {
    let counter = UNIQUE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    format!(
        "{prefix}.{}{:06}.{}.{}",
        now.as_secs(),
        now.subsec_micros(),
        process::id(),
        counter
    )
}
