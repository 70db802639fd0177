// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The bcmio authors

//! Scoped capability elevation.
//!
//! Opening the full-access physical-memory device needs two capabilities:
//! `CAP_DAC_OVERRIDE` (the device node is root-owned) and `CAP_SYS_RAWIO`
//! (raw physical memory access). Holding them ambiently would extend the
//! blast radius of every later bug, so [`ScopedCapabilities`] raises them
//! in the effective set immediately before the one syscall that needs them
//! and clears the effective set again when dropped - on every exit path,
//! including when the open itself fails.
//!
//! Capability sets are per-thread; this matches the crate's single-threaded
//! execution model.

use tracing::{debug, warn};

use crate::error::MemoryError;

/// `CAP_DAC_OVERRIDE` capability number.
const CAP_DAC_OVERRIDE: u32 = 1;

/// `CAP_SYS_RAWIO` capability number.
const CAP_SYS_RAWIO: u32 = 17;

/// `_LINUX_CAPABILITY_VERSION_3` from `linux/capability.h`.
const CAPABILITY_VERSION_3: u32 = 0x2008_0522;

// The kernel reads these through the raw pointers handed to the syscalls;
// the compiler cannot see that.
#[repr(C)]
#[allow(dead_code)]
struct CapHeader {
    version: u32,
    pid: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
#[allow(dead_code)]
struct CapData {
    effective: u32,
    permitted: u32,
    inheritable: u32,
}

fn capget(data: &mut [CapData; 2]) -> Result<(), MemoryError> {
    let mut header = CapHeader {
        version: CAPABILITY_VERSION_3,
        pid: 0,
    };
    // SAFETY: header and data are valid, properly sized kernel ABI structs.
    let ret = unsafe { libc::syscall(libc::SYS_capget, &raw mut header, data.as_mut_ptr()) };
    if ret == 0 {
        Ok(())
    } else {
        Err(capability_error())
    }
}

fn capset(data: &[CapData; 2]) -> Result<(), MemoryError> {
    let mut header = CapHeader {
        version: CAPABILITY_VERSION_3,
        pid: 0,
    };
    // SAFETY: header and data are valid, properly sized kernel ABI structs.
    let ret = unsafe { libc::syscall(libc::SYS_capset, &raw mut header, data.as_ptr()) };
    if ret == 0 {
        Ok(())
    } else {
        Err(capability_error())
    }
}

fn capability_error() -> MemoryError {
    MemoryError::Capability {
        detail: std::io::Error::last_os_error().to_string(),
    }
}

/// Guard holding `CAP_DAC_OVERRIDE` and `CAP_SYS_RAWIO` in the effective
/// set of the calling thread.
///
/// Dropping the guard clears the effective set entirely, restoring the
/// permitted and inheritable sets as they were. The drop path cannot
/// report failure; it logs instead.
#[derive(Debug)]
pub struct ScopedCapabilities {
    lowered: [CapData; 2],
}

impl ScopedCapabilities {
    /// Raise the two device-open capabilities in the effective set.
    ///
    /// Fails with a `Capability` resource error if the thread's permitted
    /// set does not include them (running unprivileged without file
    /// capabilities) or if the syscalls themselves fail.
    pub fn raise() -> Result<Self, MemoryError> {
        let mut current = [CapData::default(); 2];
        capget(&mut current)?;

        // What drop restores: everything as-is, effective cleared.
        let mut lowered = current;
        lowered[0].effective = 0;
        lowered[1].effective = 0;

        // Both capabilities live in the low word.
        current[0].effective |= (1 << CAP_DAC_OVERRIDE) | (1 << CAP_SYS_RAWIO);
        capset(&current)?;
        debug!("capabilities raised for device open");
        Ok(Self { lowered })
    }
}

impl Drop for ScopedCapabilities {
    fn drop(&mut self) {
        if let Err(err) = capset(&self.lowered) {
            warn!(%err, "failed to drop capabilities");
        } else {
            debug!("capabilities dropped");
        }
    }
}
