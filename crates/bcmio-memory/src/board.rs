// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The bcmio authors

//! Whole-board context.
//!
//! [`Board`] bundles the hardware-identity resolver and the address-space
//! manager into the one explicit context object a process constructs at
//! startup and passes by reference to its peripheral modules. There is no
//! global instance; independent `Board`s (with simulated identities) can
//! coexist under test.

use bcmio_core::HardwareId;
use tracing::debug;

use crate::error::BoardError;
use crate::map::PeripheralMap;

/// The process-wide hardware context.
#[derive(Debug)]
pub struct Board {
    /// Resolved (or resolving) hardware identity.
    pub identity: HardwareId,
    /// The peripheral address-space manager, configured for the identity.
    pub memory: PeripheralMap,
}

impl Board {
    /// Probe the running machine and build a matching manager.
    ///
    /// Runs the identity chain; the manager inherits the family's block
    /// size and physical base. An Unknown identity yields a zero base,
    /// which puts the manager in fake mode - the off-target development
    /// path.
    pub fn probe() -> Result<Self, BoardError> {
        Self::probe_with(HardwareId::new())
    }

    /// Probe with a caller-supplied resolver.
    ///
    /// The resolver may point at a different source file or carry forced
    /// or simulated values.
    pub fn probe_with(mut identity: HardwareId) -> Result<Self, BoardError> {
        let family = identity.soc_family()?;
        let base = identity.peripheral_base()?;
        let mut memory = PeripheralMap::new();
        memory.set_block_size(family.block_size())?;
        memory.configure_base(base)?;
        debug!(%family, %base, fake = memory.is_fake(), "board probed");
        Ok(Self { identity, memory })
    }
}
