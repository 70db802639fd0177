// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The bcmio authors

//! # bcmio-memory
//!
//! The peripheral address-space manager: turns documented (datasheet) bus
//! addresses into safely mapped, cached register pointers, hiding whether
//! the process runs on real target hardware, on restricted hardware access,
//! or fully off-target.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              peripheral modules (GPIO, ...)          │
//! └──────────────────────────────────────────────────────┘
//!                │ block() / register() / read() / write()
//!                ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                    PeripheralMap                     │
//! │   window + alignment checks, translation, cache      │
//! └──────────────────────────────────────────────────────┘
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//! ┌─────────────┐   ┌──────────────┐   ┌─────────────┐
//! │  /dev/mem   │   │ /dev/gpiomem │   │ FakeMemory  │
//! │ (privileged)│   │ (restricted) │   │ (synthetic) │
//! └─────────────┘   └──────────────┘   └─────────────┘
//! ```
//!
//! Pointers handed out by the manager stay valid for the manager's
//! lifetime; the block cache is never evicted. That is a documented
//! contract, not an oversight: peripheral modules extract a register
//! pointer once and keep it.
//!
//! Opening the privileged device optionally raises two capabilities for
//! exactly the duration of the `open` call; see [`caps`].

pub mod board;
pub mod caps;
pub mod error;
pub mod fake;
pub mod map;

pub use board::Board;
pub use error::{BoardError, ErrorKind, MemoryError};
pub use map::{BUS_BASE, BUS_WINDOW_SIZE, DEV_GPIOMEM, DEV_MEM, PeripheralMap};
