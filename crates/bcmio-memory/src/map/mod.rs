// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The bcmio authors

//! Documented-address translation and block mapping.
//!
//! [`PeripheralMap`] owns the backing device resource and a cache of
//! mapped blocks. Callers hand it datasheet bus addresses; it validates
//! them against the peripheral window and the family block size,
//! translates them against the configured physical base, and maps blocks
//! on demand. Cached pointers are handed out for the rest of the
//! manager's lifetime - the cache is never evicted.

#[cfg(test)]
mod map_test;

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, IntoRawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::ptr::NonNull;

use bcmio_core::soc::{MAX_BLOCK_SIZE, PAGE_SIZE};
use bcmio_core::{BusAddr, PhysAddr, SocFamily};
use tracing::{debug, trace};

use crate::caps::ScopedCapabilities;
use crate::error::MemoryError;
use crate::fake::FakeMemory;

/// Start of the documented peripheral window.
pub const BUS_BASE: BusAddr = BusAddr::new(0x7E00_0000);

/// Size of the documented peripheral window (16 MiB).
pub const BUS_WINDOW_SIZE: u32 = 0x0100_0000;

/// The full-access physical-memory device; requires elevated capabilities.
pub const DEV_MEM: &str = "/dev/mem";

/// The restricted GPIO-only device; openable without privilege on target.
pub const DEV_GPIOMEM: &str = "/dev/gpiomem";

/// Register word size in bytes.
const WORD_SIZE: u32 = 4;

/// Translates documented peripheral addresses into mapped pointers.
///
/// One instance per process; peripheral modules borrow it and must not
/// outlive it. Not internally synchronized - see the crate documentation
/// for the single-threaded execution model.
#[derive(Debug)]
pub struct PeripheralMap {
    phys_base: PhysAddr,
    block_size: usize,
    fallback_to_fake: bool,
    fake: Option<FakeMemory>,
    device: Option<File>,
    blocks: HashMap<u64, NonNull<u32>>,
}

impl PeripheralMap {
    /// Create an unconfigured manager with a one-page block size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phys_base: PhysAddr::null(),
            block_size: PAGE_SIZE,
            fallback_to_fake: true,
            fake: None,
            device: None,
            blocks: HashMap::new(),
        }
    }

    /// Create a manager with the block size and physical base of a family.
    #[must_use]
    pub fn for_soc(family: SocFamily) -> Self {
        let mut map = Self::new();
        map.block_size = family.block_size();
        map.phys_base = family.peripheral_base();
        map
    }

    /// Set the physical base address used for translation.
    ///
    /// Must happen before the resource is opened. A zero base activates
    /// fake memory: there is nowhere real to translate to.
    pub fn configure_base(&mut self, base: PhysAddr) -> Result<(), MemoryError> {
        if self.device.is_some() {
            return Err(MemoryError::Configured);
        }
        self.phys_base = base;
        if base.is_null() {
            self.enable_fake();
        }
        Ok(())
    }

    /// Set the mapping block size.
    ///
    /// Must happen before any block is mapped; the size must be a power of
    /// two no larger than the largest family block size, which is also
    /// what the fake scratch region is sized to.
    pub fn set_block_size(&mut self, size: usize) -> Result<(), MemoryError> {
        if self.device.is_some() || !self.blocks.is_empty() {
            return Err(MemoryError::Configured);
        }
        if !size.is_power_of_two() || size > MAX_BLOCK_SIZE {
            return Err(MemoryError::InvalidBlockSize { size });
        }
        self.block_size = size;
        Ok(())
    }

    /// Control whether an absent device file substitutes fake memory.
    ///
    /// When disabled, opening on a machine without the expected device
    /// files is a hard resource error. Independent of the Unknown identity
    /// outcome; the two are wired together only by [`crate::Board`].
    pub fn allow_fake_fallback(&mut self, allow: bool) {
        self.fallback_to_fake = allow;
    }

    /// Explicitly activate fake memory.
    pub fn force_fake(&mut self) -> Result<(), MemoryError> {
        if self.device.is_some() {
            return Err(MemoryError::AlreadyOpen);
        }
        self.enable_fake();
        Ok(())
    }

    /// Whether the manager serves pointers from the synthetic scratch
    /// region instead of real hardware.
    #[must_use]
    pub const fn is_fake(&self) -> bool {
        self.fake.is_some()
    }

    /// Whether a device resource is currently open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Number of blocks mapped so far.
    #[must_use]
    pub fn mapped_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Open the named device file for mapping.
    ///
    /// No-op if fake memory is active or `path` is empty (which activates
    /// it). If the expected device files are absent - the requested path
    /// and the restricted [`DEV_GPIOMEM`] both missing - the fallback
    /// policy decides between substituting fake memory and a hard error.
    /// Otherwise the file is opened read-write with `O_SYNC`;
    /// `raise_privilege` wraps the open in a [`ScopedCapabilities`] guard,
    /// which releases the capabilities on every exit path.
    pub fn open(&mut self, path: impl AsRef<Path>, raise_privilege: bool) -> Result<(), MemoryError> {
        let path = path.as_ref();
        if self.is_fake() {
            trace!("fake memory active, device open skipped");
            return Ok(());
        }
        if self.device.is_some() {
            return Err(MemoryError::AlreadyOpen);
        }
        if path.as_os_str().is_empty() {
            self.enable_fake();
            return Ok(());
        }
        if !path.exists() && !Path::new(DEV_GPIOMEM).exists() {
            if self.fallback_to_fake {
                debug!(path = %path.display(), "device files absent, substituting fake memory");
                self.enable_fake();
                return Ok(());
            }
            return Err(MemoryError::OffTarget {
                path: path.to_path_buf(),
            });
        }

        let device = {
            let _caps = if raise_privilege {
                Some(ScopedCapabilities::raise()?)
            } else {
                None
            };
            OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags(libc::O_SYNC)
                .open(path)
                .map_err(|err| MemoryError::Open {
                    path: path.to_path_buf(),
                    detail: err.to_string(),
                })?
            // _caps drops here, clearing the effective set whether or not
            // the open succeeded.
        };
        debug!(path = %path.display(), "device opened");
        self.device = Some(device);
        Ok(())
    }

    /// Release the device handle if open. Idempotent.
    pub fn close(&mut self) -> Result<(), MemoryError> {
        let Some(device) = self.device.take() else {
            return Ok(());
        };
        let fd = device.into_raw_fd();
        // SAFETY: into_raw_fd transferred ownership of fd to us.
        if unsafe { libc::close(fd) } != 0 {
            return Err(MemoryError::Close {
                detail: std::io::Error::last_os_error().to_string(),
            });
        }
        debug!("device closed");
        Ok(())
    }

    /// A pointer to the block containing `addr`, mapping it on first use.
    ///
    /// `addr` must lie inside the peripheral window and be block-aligned.
    /// Repeated calls with the same address return the identical pointer;
    /// in fake mode every address returns the shared scratch pointer.
    pub fn block(&mut self, addr: BusAddr) -> Result<NonNull<u32>, MemoryError> {
        self.check_window(addr)?;
        let block = self.block_size as u32;
        if addr.is_aligned(block) != Some(true) {
            return Err(MemoryError::MisalignedBlock {
                addr,
                block_size: self.block_size,
            });
        }
        if !self.is_fake() && self.phys_base.is_null() {
            return Err(MemoryError::NoBaseAddress);
        }

        let real = self.phys_base.add(u64::from(addr.diff(BUS_BASE)));
        if let Some(ptr) = self.blocks.get(&real.as_u64()) {
            trace!(bus = %addr, "block cache hit");
            return Ok(*ptr);
        }
        let ptr = match &self.fake {
            Some(fake) => fake.base(),
            None => self.map_block(real)?,
        };
        self.blocks.insert(real.as_u64(), ptr);
        debug!(bus = %addr, real = %real, fake = self.is_fake(), "block mapped");
        Ok(ptr)
    }

    /// A pointer to the register at `addr`, word-aligned.
    ///
    /// Computes the containing block and the intra-block word offset, and
    /// returns block pointer plus offset. Addition rather than pointer
    /// masking: the fake scratch region is only word-aligned.
    pub fn register(&mut self, addr: BusAddr) -> Result<NonNull<u32>, MemoryError> {
        if addr.is_aligned(WORD_SIZE) != Some(true) {
            return Err(MemoryError::MisalignedWord { addr });
        }
        let block = self.block_size as u32;
        let Some(block_addr) = addr.align_down(block) else {
            return Err(MemoryError::InvalidBlockSize {
                size: self.block_size,
            });
        };
        let word_offset = (addr.diff(block_addr) / WORD_SIZE) as usize;
        let base = self.block(block_addr)?;
        // SAFETY: word_offset < block_size / 4 and the block (real or
        // scratch) is at least block_size bytes.
        Ok(unsafe { NonNull::new_unchecked(base.as_ptr().add(word_offset)) })
    }

    /// Read the register at `addr`.
    pub fn read(&mut self, addr: BusAddr) -> Result<u32, MemoryError> {
        let reg = self.register(addr)?;
        // SAFETY: register() returned a pointer into a live mapped block.
        Ok(unsafe { reg.as_ptr().read_volatile() })
    }

    /// Write the register at `addr`.
    pub fn write(&mut self, addr: BusAddr, value: u32) -> Result<(), MemoryError> {
        let reg = self.register(addr)?;
        // SAFETY: register() returned a pointer into a live mapped block.
        unsafe { reg.as_ptr().write_volatile(value) };
        Ok(())
    }

    fn check_window(&self, addr: BusAddr) -> Result<(), MemoryError> {
        if addr < BUS_BASE || addr.diff(BUS_BASE) >= BUS_WINDOW_SIZE {
            return Err(MemoryError::AddressOutOfWindow { addr });
        }
        Ok(())
    }

    fn enable_fake(&mut self) {
        if self.fake.is_none() {
            debug!("fake memory enabled");
            self.fake = Some(FakeMemory::new());
        }
    }

    fn map_block(&self, real: PhysAddr) -> Result<NonNull<u32>, MemoryError> {
        let device = self.device.as_ref().ok_or(MemoryError::NotOpen)?;
        // SAFETY: mapping block_size bytes of an open device fd; the
        // device outlives the mapping only logically - mmap keeps the
        // mapping valid independently of the fd.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                self.block_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                device.as_raw_fd(),
                real.as_u64() as libc::off_t,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(MemoryError::Map {
                addr: real,
                detail: std::io::Error::last_os_error().to_string(),
            });
        }
        // SAFETY: a successful mmap never returns a null pointer.
        Ok(unsafe { NonNull::new_unchecked(ptr.cast::<u32>()) })
    }
}

impl Default for PeripheralMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PeripheralMap {
    fn drop(&mut self) {
        if self.fake.is_none() {
            for ptr in self.blocks.values() {
                // SAFETY: every cached pointer in real mode came from an
                // mmap of exactly block_size bytes.
                unsafe {
                    libc::munmap(ptr.as_ptr().cast::<libc::c_void>(), self.block_size);
                }
            }
        }
        self.blocks.clear();
        // The device File, if any, closes on drop.
    }
}
