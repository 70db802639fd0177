// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The bcmio authors

//! SoC family classification and per-family constants.
//!
//! The board revision code carries a chip-identifier field in bits [15:12].
//! Old-style revision codes (pre-2015 boards) have zeros there, which maps
//! to [`SocFamily::Bcm2835`] - consistent with the hardware those boards
//! actually carry.

use crate::types::PhysAddr;

/// Standard page size (4 KiB).
pub const PAGE_SIZE: usize = 4096;

/// Largest block size across all supported families.
///
/// The synthetic fallback region must be able to stand in for a block of
/// any family, so it is sized to this.
pub const MAX_BLOCK_SIZE: usize = 4 * PAGE_SIZE;

/// Bit position of the chip-identifier field in a revision code.
const CHIP_ID_SHIFT: u32 = 12;

/// Width mask of the chip-identifier field.
const CHIP_ID_MASK: u32 = 0xF;

/// Extract the chip-identifier field from a revision code.
#[inline]
#[must_use]
pub const fn chip_id_of(revision: u32) -> u32 {
    (revision >> CHIP_ID_SHIFT) & CHIP_ID_MASK
}

/// One of the supported SoC generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocFamily {
    /// BCM2835 (Pi 1, Zero, Zero W).
    Bcm2835,
    /// BCM2836 (Pi 2).
    Bcm2836,
    /// BCM2837 (Pi 3, Zero 2 W, later Pi 2).
    Bcm2837,
    /// BCM2711 (Pi 4, Pi 400).
    Bcm2711,
    /// BCM2712 (Pi 5).
    Bcm2712,
}

impl SocFamily {
    /// Map a chip-identifier field to a family.
    ///
    /// Returns `None` for field values no known family uses; a revision
    /// code carrying one of those is a contradiction (real hardware we
    /// cannot classify) and is treated as a hard error by the resolver.
    #[must_use]
    pub const fn from_chip_id(chip_id: u32) -> Option<Self> {
        match chip_id {
            0 => Some(Self::Bcm2835),
            1 => Some(Self::Bcm2836),
            2 => Some(Self::Bcm2837),
            3 => Some(Self::Bcm2711),
            4 => Some(Self::Bcm2712),
            _ => None,
        }
    }

    /// Physical address where this family maps the documented peripheral
    /// window.
    #[must_use]
    pub const fn peripheral_base(self) -> PhysAddr {
        match self {
            Self::Bcm2835 => PhysAddr::new(0x2000_0000),
            Self::Bcm2836 | Self::Bcm2837 => PhysAddr::new(0x3F00_0000),
            Self::Bcm2711 => PhysAddr::new(0xFE00_0000),
            Self::Bcm2712 => PhysAddr::new(0x1F_0000_0000),
        }
    }

    /// Minimum mappable block size for this family.
    ///
    /// One page everywhere except BCM2712, whose atomic register-access
    /// aliases require four-page blocks.
    #[must_use]
    pub const fn block_size(self) -> usize {
        match self {
            Self::Bcm2835 | Self::Bcm2836 | Self::Bcm2837 | Self::Bcm2711 => PAGE_SIZE,
            Self::Bcm2712 => MAX_BLOCK_SIZE,
        }
    }

    /// Marketing-free chip name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bcm2835 => "BCM2835",
            Self::Bcm2836 => "BCM2836",
            Self::Bcm2837 => "BCM2837",
            Self::Bcm2711 => "BCM2711",
            Self::Bcm2712 => "BCM2712",
        }
    }
}

impl core::fmt::Display for SocFamily {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
