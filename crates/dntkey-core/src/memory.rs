//! Memory protection for decrypted key material
//!
//! 1. **Core dump prevention**: `setrlimit(RLIMIT_CORE, 0)` so a crash never
//!    writes a decrypted private key to disk.
//! 2. **Memory locking**: `mlock()` keeps plaintext pages out of swap.
//!
//! Both are best-effort. Containers and unprivileged users often forbid
//! them, so failures are logged and the operation continues.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use zeroize::Zeroize;

static CORE_DUMPS_DISABLED: AtomicBool = AtomicBool::new(false);

/// Disable core dumps for the current process. Idempotent.
///
/// Returns `true` if core dumps are (now) disabled.
pub fn disable_core_dumps() -> bool {
    if CORE_DUMPS_DISABLED.swap(true, Ordering::SeqCst) {
        return true;
    }

    #[cfg(unix)]
    let ok = unix::disable_core_dumps();

    #[cfg(not(unix))]
    let ok = {
        log::warn!("core dump prevention not supported on this platform");
        false
    };

    if !ok {
        CORE_DUMPS_DISABLED.store(false, Ordering::SeqCst);
    }
    ok
}

/// A heap buffer that is mlocked while alive and zeroized before release.
///
/// Holds decrypted wallet payloads for the duration of one operation.
pub struct LockedBuffer {
    data: Vec<u8>,
    locked: bool,
}

impl LockedBuffer {
    /// Copy `bytes` into a new locked buffer.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let data = bytes.to_vec();
        let locked = lock_region(&data);
        Self { data, locked }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the pages are actually pinned in RAM.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl fmt::Debug for LockedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LockedBuffer(<redacted>)")
    }
}

impl Drop for LockedBuffer {
    fn drop(&mut self) {
        // Clear contents in place; the allocation stays put so the
        // munlock below still covers the same pages.
        self.data.as_mut_slice().zeroize();
        if self.locked {
            unlock_region(&self.data);
        }
    }
}

fn lock_region(data: &[u8]) -> bool {
    if data.is_empty() {
        return true;
    }

    #[cfg(unix)]
    let ok = unix::mlock(data);

    #[cfg(not(unix))]
    let ok = false;

    if !ok {
        log::debug!("mlock unavailable for {} bytes; plaintext may be swappable", data.len());
    }
    ok
}

fn unlock_region(data: &[u8]) {
    if data.is_empty() {
        return;
    }

    #[cfg(unix)]
    unix::munlock(data);
}

#[cfg(unix)]
mod unix {
    pub fn disable_core_dumps() -> bool {
        let rlim = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: setrlimit reads a fully initialised rlimit struct.
        let result = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &rlim) };
        if result != 0 {
            log::warn!(
                "failed to disable core dumps: {}",
                std::io::Error::last_os_error()
            );
            return false;
        }
        true
    }

    pub fn mlock(data: &[u8]) -> bool {
        // SAFETY: the slice is a live allocation of data.len() bytes.
        unsafe { libc::mlock(data.as_ptr() as *const libc::c_void, data.len()) == 0 }
    }

    pub fn munlock(data: &[u8]) {
        // SAFETY: same region previously passed to mlock.
        unsafe {
            libc::munlock(data.as_ptr() as *const libc::c_void, data.len());
        }
    }
}
