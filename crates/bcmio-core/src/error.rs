// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The bcmio authors

//! Error types for hardware-identity derivation.
//!
//! The taxonomy follows three kinds:
//!
//! - `Validation` - malformed input data; never retried.
//! - `Resource` - an OS-level operation failed; fatal to the calling
//!   operation, carries the underlying OS error text.
//! - `State` - a programming-contract violation, not an environmental
//!   condition.
//!
//! "Could not detect the hardware at all" is deliberately NOT an error; it
//! is the `ResolvedUnknown` data state in [`crate::Derived`], which callers
//! must handle explicitly.

use core::fmt;

/// Coarse classification of an error, mirroring the propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input data or an out-of-domain address.
    Validation,
    /// An OS-level operation failed.
    Resource,
    /// A programming contract was violated.
    State,
}

/// Errors from revision parsing and family derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// A revision line was found but its value is not a hexadecimal number
    /// representable in 32 bits.
    MalformedRevision {
        /// The offending line, trimmed.
        text: String,
    },
    /// The revision code was detected, but its chip-identifier field maps
    /// to no known family. Distinct from the off-target Unknown outcome:
    /// this is real hardware we cannot classify.
    UnknownChipId {
        /// The detected revision code.
        revision: u32,
        /// The unmapped chip-identifier field value.
        chip_id: u32,
    },
}

impl IdentityError {
    /// Classify this error within the taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedRevision { .. } | Self::UnknownChipId { .. } => ErrorKind::Validation,
        }
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRevision { text } => {
                write!(f, "malformed revision value in line {text:?}")
            }
            Self::UnknownChipId { revision, chip_id } => write!(
                f,
                "revision code {revision:#010x} carries unknown chip identifier {chip_id}"
            ),
        }
    }
}

impl std::error::Error for IdentityError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = IdentityError::UnknownChipId {
            revision: 0x5010,
            chip_id: 5,
        };
        assert_eq!(
            format!("{err}"),
            "revision code 0x00005010 carries unknown chip identifier 5"
        );
    }

    #[test]
    fn test_kinds() {
        let err = IdentityError::MalformedRevision {
            text: "Revision : xyz".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
