// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The bcmio authors

//! # bcmio-core
//!
//! Foundational types and the hardware-identity resolver for user-space
//! peripheral register access on Raspberry-Pi-class boards.
//!
//! This crate answers three questions about the running machine, lazily and
//! at most once each:
//!
//! - which board revision is this ([`HardwareId::revision`])
//! - which SoC family does that revision belong to ([`HardwareId::soc_family`])
//! - where does that family map its peripherals ([`HardwareId::peripheral_base`])
//!
//! Each answer lives in a [`Derived`] cell that can be overridden for
//! explicit configuration or simulation, so code built on top behaves
//! deterministically off-target.
//!
//! This crate contains no unsafe code and touches nothing but the revision
//! source file; the actual memory mapping lives in `bcmio-memory`.

pub mod derived;
pub mod error;
pub mod revision;
pub mod soc;
pub mod types;

pub use derived::{Derived, Detection};
pub use error::{ErrorKind, IdentityError};
pub use revision::HardwareId;
pub use soc::SocFamily;
pub use types::{BusAddr, PhysAddr};

/// Crate version for runtime queries.
///
/// Uses the git-derived version from the `BCMIO_VERSION` environment variable
/// when available, falling back to "unknown" otherwise.
pub const VERSION: &str = match option_env!("BCMIO_VERSION") {
    Some(v) => v,
    None => "unknown",
};
