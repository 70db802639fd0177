// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The bcmio authors

//! Hardware identity resolution.
//!
//! [`HardwareId`] is the explicit context object for the three derived
//! facts about the running machine: revision code, SoC family, peripheral
//! base address. It is constructed once at process start and passed by
//! reference to everything that needs it; there is no global instance.
//!
//! Detection is a dependency chain, each link memoized independently:
//!
//! ```text
//! revision source file ──> revision ──> soc family ──> peripheral base
//! ```
//!
//! Any link can be forced ([`Derived::force`]) or simulated
//! ([`Derived::simulate`]) before the chain runs; links downstream of a
//! forced value derive from it as if it had been detected.


use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::derived::{Derived, Detection};
use crate::error::IdentityError;
use crate::soc::{self, SocFamily};
use crate::types::PhysAddr;

/// Default revision source on Linux.
pub const DEFAULT_SOURCE: &str = "/proc/cpuinfo";

/// Key that starts a revision line in the source file.
const REVISION_KEY: &str = "Revision";

/// Lazily resolved identity of the running board.
#[derive(Debug)]
pub struct HardwareId {
    source: PathBuf,
    revision: Derived<u32>,
    soc: Derived<SocFamily>,
    base: Derived<PhysAddr>,
}

impl HardwareId {
    /// Create a resolver reading from [`DEFAULT_SOURCE`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_source(DEFAULT_SOURCE)
    }

    /// Create a resolver reading from a specific source file.
    pub fn with_source(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            revision: Derived::new(),
            soc: Derived::new(),
            base: Derived::new(),
        }
    }

    /// The revision code, detecting it on first call.
    ///
    /// Scans the source file for the first line matching
    /// `Revision<anything>:<whitespace>[0x]<hex>`. No matching line (or an
    /// unreadable source) finalizes the cell as Unknown with value zero
    /// unless a default was recorded; a matching line with a malformed
    /// value is a [`IdentityError::MalformedRevision`].
    pub fn revision(&mut self) -> Result<u32, IdentityError> {
        if let Some(value) = self.revision.value() {
            return Ok(value);
        }
        let outcome = detect_revision(&self.source)?;
        let value = self.revision.settle(outcome, 0);
        debug!(
            revision = value,
            unknown = self.revision.is_unknown(),
            "revision code settled"
        );
        Ok(value)
    }

    /// The SoC family, derived from the revision code on first call.
    ///
    /// An Unknown revision propagates: the family finalizes as Unknown with
    /// a [`SocFamily::Bcm2835`] placeholder. A known revision whose
    /// chip-identifier field maps to no family is a hard
    /// [`IdentityError::UnknownChipId`]; the revision cell stays resolved
    /// with its detected value.
    pub fn soc_family(&mut self) -> Result<SocFamily, IdentityError> {
        if let Some(family) = self.soc.value() {
            return Ok(family);
        }
        let revision = self.revision()?;
        if self.revision.is_unknown() {
            let family = self.soc.settle(Detection::NotFound, SocFamily::Bcm2835);
            debug!(%family, "soc family unknown, revision undetected");
            return Ok(family);
        }
        let chip_id = soc::chip_id_of(revision);
        let Some(family) = SocFamily::from_chip_id(chip_id) else {
            return Err(IdentityError::UnknownChipId { revision, chip_id });
        };
        let family = self.soc.settle(Detection::Found(family), family);
        debug!(%family, "soc family settled");
        Ok(family)
    }

    /// The physical peripheral base address, derived from the family on
    /// first call.
    ///
    /// An Unknown family propagates: the base finalizes as Unknown with
    /// value zero, which downstream consumers treat as "no real hardware,
    /// use synthetic memory".
    pub fn peripheral_base(&mut self) -> Result<PhysAddr, IdentityError> {
        if let Some(base) = self.base.value() {
            return Ok(base);
        }
        let family = self.soc_family()?;
        let base = if self.soc.is_unknown() {
            self.base.settle(Detection::NotFound, PhysAddr::null())
        } else {
            self.base
                .settle(Detection::Found(family.peripheral_base()), PhysAddr::null())
        };
        debug!(%base, unknown = self.base.is_unknown(), "peripheral base settled");
        Ok(base)
    }

    /// Direct access to the revision cell, for configuration and tests.
    pub fn revision_cell(&mut self) -> &mut Derived<u32> {
        &mut self.revision
    }

    /// Direct access to the SoC family cell, for configuration and tests.
    pub fn soc_cell(&mut self) -> &mut Derived<SocFamily> {
        &mut self.soc
    }

    /// Direct access to the peripheral base cell, for configuration and
    /// tests.
    pub fn base_cell(&mut self) -> &mut Derived<PhysAddr> {
        &mut self.base
    }
}

impl Default for HardwareId {
    fn default() -> Self {
        Self::new()
    }
}

/// Run revision detection against a source file.
///
/// An unreadable source is the same as a source with no matching line:
/// expected off-target, reported as [`Detection::NotFound`] rather than an
/// error.
fn detect_revision(source: &Path) -> Result<Detection<u32>, IdentityError> {
    let file = match File::open(source) {
        Ok(file) => file,
        Err(err) => {
            debug!(source = %source.display(), %err, "revision source unreadable");
            return Ok(Detection::NotFound);
        }
    };
    for line in BufReader::new(file).lines() {
        let Ok(line) = line else {
            return Ok(Detection::NotFound);
        };
        if let Some(parsed) = parse_revision_line(&line) {
            return parsed.map(Detection::Found);
        }
    }
    Ok(Detection::NotFound)
}

/// Parse one line of the source file.
///
/// Returns `None` if the line is not a revision line at all, `Some(Err)` if
/// it is one but carries a malformed value. Tolerates extra characters
/// between the key and the colon (`/proc/cpuinfo` pads with a tab) and an
/// optional `0x` prefix.
fn parse_revision_line(line: &str) -> Option<Result<u32, IdentityError>> {
    if !line.starts_with(REVISION_KEY) {
        return None;
    }
    let (_, value) = line.split_once(':')?;
    let value = value.trim();
    let digits = value.strip_prefix("0x").unwrap_or(value);
    let malformed = || IdentityError::MalformedRevision {
        text: line.trim().to_owned(),
    };
    // from_str_radix alone would also accept a leading sign.
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Some(Err(malformed()));
    }
    Some(u32::from_str_radix(digits, 16).map_err(|_| malformed()))
}
