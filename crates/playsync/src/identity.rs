// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local participant identity.
//!
//! The identity string `{hostname}_{username}` names the local device on
//! the wire and is the prefix used to discard our own broadcasts.

use crate::{Error, Result};

/// Resolve the local wire identity as `{hostname}_{username}`.
///
/// # Errors
///
/// Returns `Error::InvalidIdentity` if the hostname cannot be read.
pub fn local_identity() -> Result<String> {
    let hostname = get_hostname()
        .ok_or_else(|| Error::InvalidIdentity("hostname unavailable".to_owned()))?;
    Ok(format!("{}_{}", hostname, username()))
}

/// Get system hostname (Unix/Linux).
#[cfg(unix)]
fn get_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY:
    // - buf is a valid mutable buffer with known size (256 bytes)
    // - gethostname writes at most buf.len() bytes including NUL terminator
    // - On success, the buffer contains a NUL-terminated hostname string
    let ret = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };

    if ret != 0 {
        return None;
    }

    // SAFETY:
    // - gethostname succeeded (ret == 0), so buf contains a valid
    //   NUL-terminated string
    // - We immediately convert to an owned String, so no lifetime issues
    let hostname = unsafe { std::ffi::CStr::from_ptr(buf.as_ptr() as *const libc::c_char) }
        .to_string_lossy()
        .into_owned();

    if hostname.is_empty() {
        None
    } else {
        Some(hostname)
    }
}

/// Get system hostname (Windows).
#[cfg(windows)]
fn get_hostname() -> Option<String> {
    let hostname = std::env::var("COMPUTERNAME").ok()?;
    if hostname.is_empty() {
        None
    } else {
        Some(hostname)
    }
}

#[cfg(not(any(unix, windows)))]
fn get_hostname() -> Option<String> {
    None
}

/// Current username from the environment, with an `"unknown"` fallback.
fn username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_shape() {
        let identity = local_identity().expect("identity resolution should succeed");
        assert!(!identity.is_empty());
        assert!(identity.contains('_'));
        assert!(!identity.starts_with('_'));
    }

    #[test]
    fn test_identity_fits_on_wire() {
        let identity = local_identity().expect("identity resolution should succeed");
        assert!(identity.len() <= crate::config::NAME_LEN);
    }

    #[test]
    fn test_username_never_empty() {
        assert!(!username().is_empty());
    }
}
