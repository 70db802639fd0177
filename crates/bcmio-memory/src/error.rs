// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The bcmio authors

//! Error types for the address-space manager.
//!
//! Same taxonomy as `bcmio-core`: `Validation` errors are bad documented
//! addresses, `Resource` errors are OS-level failures carrying the OS error
//! text, `State` errors are contract violations. None of them is ever
//! silently downgraded to the Unknown data state.

use core::fmt;
use std::path::PathBuf;

pub use bcmio_core::ErrorKind;
use bcmio_core::{BusAddr, IdentityError, PhysAddr};

/// Errors from the peripheral address-space manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The documented address lies outside the peripheral window.
    AddressOutOfWindow {
        /// The rejected address.
        addr: BusAddr,
    },
    /// The documented address is not aligned to the family block size.
    MisalignedBlock {
        /// The rejected address.
        addr: BusAddr,
        /// The block size it failed against.
        block_size: usize,
    },
    /// The documented address is not word-aligned.
    MisalignedWord {
        /// The rejected address.
        addr: BusAddr,
    },
    /// The configured block size is not usable (not a power of two, or
    /// larger than the fake scratch region can stand in for).
    InvalidBlockSize {
        /// The rejected size.
        size: usize,
    },
    /// Translation needs a physical base address, but none was configured
    /// and fake memory is not active.
    NoBaseAddress,
    /// The device resource is already open.
    AlreadyOpen,
    /// A mapping was requested before any device was opened.
    NotOpen,
    /// Configuration was attempted after the device was opened or blocks
    /// were mapped.
    Configured,
    /// Neither the requested device file nor the restricted one exists and
    /// the fallback policy forbids substituting fake memory.
    OffTarget {
        /// The device path that was requested.
        path: PathBuf,
    },
    /// Opening the device file failed.
    Open {
        /// The device path.
        path: PathBuf,
        /// OS error text.
        detail: String,
    },
    /// Mapping a block from the device failed.
    Map {
        /// Translated physical address of the block.
        addr: PhysAddr,
        /// OS error text.
        detail: String,
    },
    /// Closing the device failed.
    Close {
        /// OS error text.
        detail: String,
    },
    /// Changing the capability sets failed.
    Capability {
        /// OS error text.
        detail: String,
    },
}

impl MemoryError {
    /// Classify this error within the taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AddressOutOfWindow { .. }
            | Self::MisalignedBlock { .. }
            | Self::MisalignedWord { .. }
            | Self::InvalidBlockSize { .. } => ErrorKind::Validation,
            Self::NoBaseAddress
            | Self::OffTarget { .. }
            | Self::Open { .. }
            | Self::Map { .. }
            | Self::Close { .. }
            | Self::Capability { .. } => ErrorKind::Resource,
            Self::AlreadyOpen | Self::NotOpen | Self::Configured => ErrorKind::State,
        }
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressOutOfWindow { addr } => {
                write!(f, "address {addr} is outside the peripheral window")
            }
            Self::MisalignedBlock { addr, block_size } => {
                write!(f, "address {addr} is not aligned to the {block_size}-byte block size")
            }
            Self::MisalignedWord { addr } => {
                write!(f, "address {addr} is not word-aligned")
            }
            Self::InvalidBlockSize { size } => {
                write!(f, "block size {size} is not usable for mapping")
            }
            Self::NoBaseAddress => {
                write!(f, "no physical base address configured and fake memory inactive")
            }
            Self::AlreadyOpen => write!(f, "peripheral map is already opened"),
            Self::NotOpen => write!(f, "peripheral map has no open device"),
            Self::Configured => {
                write!(f, "peripheral map cannot be reconfigured once in use")
            }
            Self::OffTarget { path } => write!(
                f,
                "device file {} absent and fake-memory fallback disabled",
                path.display()
            ),
            Self::Open { path, detail } => {
                write!(f, "cannot open {}: {detail}", path.display())
            }
            Self::Map { addr, detail } => {
                write!(f, "cannot map block at {addr}: {detail}")
            }
            Self::Close { detail } => write!(f, "cannot close device: {detail}"),
            Self::Capability { detail } => {
                write!(f, "cannot change capabilities: {detail}")
            }
        }
    }
}

impl std::error::Error for MemoryError {}

/// Errors from probing a whole board (identity plus memory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// Hardware identity derivation failed.
    Identity(IdentityError),
    /// Address-space configuration failed.
    Memory(MemoryError),
}

impl BoardError {
    /// Classify this error within the taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Identity(err) => err.kind(),
            Self::Memory(err) => err.kind(),
        }
    }
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity(err) => write!(f, "identity: {err}"),
            Self::Memory(err) => write!(f, "memory: {err}"),
        }
    }
}

impl std::error::Error for BoardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Identity(err) => Some(err),
            Self::Memory(err) => Some(err),
        }
    }
}

impl From<IdentityError> for BoardError {
    fn from(err: IdentityError) -> Self {
        Self::Identity(err)
    }
}

impl From<MemoryError> for BoardError {
    fn from(err: MemoryError) -> Self {
        Self::Memory(err)
    }
}
