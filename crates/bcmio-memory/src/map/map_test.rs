// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The bcmio authors

//! Tests for the address-space manager.
//!
//! Everything here runs off-target: real-hardware mapping is covered by
//! the ignored test in `tests/board_test.rs`. `/dev/null` stands in for a
//! device file that exists and opens but cannot be mapped.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use bcmio_core::soc::PAGE_SIZE;
use bcmio_core::{BusAddr, ErrorKind, PhysAddr, SocFamily};
use proptest::prelude::*;

use super::{BUS_BASE, BUS_WINDOW_SIZE, DEV_GPIOMEM, PeripheralMap};
use crate::error::MemoryError;

/// A manager in fake mode, ready to hand out scratch pointers.
fn fake_map() -> PeripheralMap {
    let mut map = PeripheralMap::new();
    map.force_fake().unwrap();
    map.open("", true).unwrap();
    map
}

const GPIO_BLOCK: BusAddr = BusAddr::new(0x7E20_0000);

#[test]
fn address_below_window_is_rejected() {
    let mut map = fake_map();
    let err = map.block(BusAddr::new(0x7D00_0000)).unwrap_err();
    assert!(matches!(err, MemoryError::AddressOutOfWindow { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn address_above_window_is_rejected() {
    let mut map = fake_map();
    let err = map.block(BusAddr::new(0x7F00_0000)).unwrap_err();
    assert!(matches!(err, MemoryError::AddressOutOfWindow { .. }));
}

#[test]
fn window_end_is_exclusive() {
    let mut map = fake_map();
    let last_block = BUS_BASE.add(BUS_WINDOW_SIZE - PAGE_SIZE as u32);
    assert!(map.block(last_block).is_ok());
    assert!(map.block(BUS_BASE.add(BUS_WINDOW_SIZE)).is_err());
}

#[test]
fn misaligned_block_is_rejected() {
    let mut map = fake_map();
    let err = map.block(GPIO_BLOCK.add(0x100)).unwrap_err();
    assert!(matches!(err, MemoryError::MisalignedBlock { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn misaligned_word_is_rejected() {
    let mut map = fake_map();
    let err = map.register(GPIO_BLOCK.add(0x102)).unwrap_err();
    assert!(matches!(err, MemoryError::MisalignedWord { .. }));
}

#[test]
fn block_cache_returns_identical_pointer() {
    let mut map = fake_map();
    assert_eq!(map.mapped_blocks(), 0);
    let first = map.block(GPIO_BLOCK).unwrap();
    assert_eq!(map.mapped_blocks(), 1);
    let second = map.block(GPIO_BLOCK).unwrap();
    assert_eq!(first, second);
    // The second call must hit the cache, not create a new entry.
    assert_eq!(map.mapped_blocks(), 1);
}

#[test]
fn fake_mode_shares_one_scratch_pointer() {
    let mut map = fake_map();
    let a = map.block(GPIO_BLOCK).unwrap();
    let b = map.block(BusAddr::new(0x7E40_0000)).unwrap();
    let c = map.block(BUS_BASE).unwrap();
    assert_eq!(a, b);
    assert_eq!(b, c);
    // Distinct addresses still get their own cache entries.
    assert_eq!(map.mapped_blocks(), 3);
}

#[test]
fn register_is_block_pointer_plus_word_offset() {
    let mut map = fake_map();
    let block = map.block(GPIO_BLOCK).unwrap();
    let reg = map.register(GPIO_BLOCK.add(0x104)).unwrap();
    // 0x104 bytes into the block is word offset 0x41.
    // SAFETY: pointer arithmetic inside the scratch block, test only.
    let expected = unsafe { block.as_ptr().add(0x41) };
    assert_eq!(reg.as_ptr(), expected);
}

#[test]
fn fake_registers_are_readable_and_writable() {
    let mut map = fake_map();
    assert_eq!(map.read(GPIO_BLOCK.add(0x34)).unwrap(), 0);
    map.write(GPIO_BLOCK.add(0x34), 0xDEAD_BEEF).unwrap();
    assert_eq!(map.read(GPIO_BLOCK.add(0x34)).unwrap(), 0xDEAD_BEEF);
}

#[test]
fn fake_blocks_alias_each_other() {
    // All fake addresses share one scratch region, so the same intra-block
    // offset aliases across blocks.
    let mut map = fake_map();
    map.write(GPIO_BLOCK.add(0x34), 7).unwrap();
    assert_eq!(map.read(BusAddr::new(0x7E40_0034)).unwrap(), 7);
}

#[test]
fn unconfigured_map_has_no_base_address() {
    let mut map = PeripheralMap::new();
    let err = map.block(GPIO_BLOCK).unwrap_err();
    assert!(matches!(err, MemoryError::NoBaseAddress));
    assert_eq!(err.kind(), ErrorKind::Resource);
}

#[test]
fn zero_base_activates_fake() {
    let mut map = PeripheralMap::new();
    map.configure_base(PhysAddr::null()).unwrap();
    assert!(map.is_fake());
    assert!(map.block(GPIO_BLOCK).is_ok());
}

#[test]
fn empty_path_activates_fake() {
    let mut map = PeripheralMap::new();
    map.open("", true).unwrap();
    assert!(map.is_fake());
    assert!(!map.is_open());
}

#[test]
fn open_in_fake_mode_is_noop() {
    let mut map = fake_map();
    // Opening again (any path) stays a no-op, not a state error.
    map.open("/dev/mem", true).unwrap();
    assert!(map.is_fake());
}

#[test]
fn absent_device_files_follow_fallback_policy() {
    if Path::new(DEV_GPIOMEM).exists() {
        // Running on target hardware; the off-target path is not
        // reachable here.
        return;
    }

    let mut map = PeripheralMap::new();
    map.configure_base(PhysAddr::new(0x3F00_0000)).unwrap();
    map.open("/definitely/not/a/device", false).unwrap();
    assert!(map.is_fake());

    let mut strict = PeripheralMap::new();
    strict.configure_base(PhysAddr::new(0x3F00_0000)).unwrap();
    strict.allow_fake_fallback(false);
    let err = strict.open("/definitely/not/a/device", false).unwrap_err();
    assert!(matches!(err, MemoryError::OffTarget { .. }));
    assert_eq!(err.kind(), ErrorKind::Resource);
}

#[test]
fn double_open_is_a_state_error() {
    let mut map = PeripheralMap::new();
    map.configure_base(PhysAddr::new(0x3F00_0000)).unwrap();
    // /dev/null exists and opens without privilege.
    map.open("/dev/null", false).unwrap();
    assert!(map.is_open());

    let err = map.open("/dev/null", false).unwrap_err();
    assert!(matches!(err, MemoryError::AlreadyOpen));
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(format!("{err}"), "peripheral map is already opened");
}

#[test]
fn configure_after_open_is_a_state_error() {
    let mut map = PeripheralMap::new();
    map.configure_base(PhysAddr::new(0x3F00_0000)).unwrap();
    map.open("/dev/null", false).unwrap();
    let err = map.configure_base(PhysAddr::new(0xFE00_0000)).unwrap_err();
    assert!(matches!(err, MemoryError::Configured));
}

#[test]
fn unmappable_device_is_a_resource_error() {
    let mut map = PeripheralMap::new();
    map.configure_base(PhysAddr::new(0x3F00_0000)).unwrap();
    map.open("/dev/null", false).unwrap();
    // /dev/null cannot back a shared mapping.
    let err = map.block(GPIO_BLOCK).unwrap_err();
    assert!(matches!(err, MemoryError::Map { .. }));
    assert_eq!(err.kind(), ErrorKind::Resource);
}

#[test]
fn close_is_idempotent() {
    let mut map = PeripheralMap::new();
    map.configure_base(PhysAddr::new(0x3F00_0000)).unwrap();
    map.open("/dev/null", false).unwrap();
    map.close().unwrap();
    assert!(!map.is_open());
    map.close().unwrap();
}

#[test]
fn reopen_after_close_is_allowed() {
    let mut map = PeripheralMap::new();
    map.configure_base(PhysAddr::new(0x3F00_0000)).unwrap();
    map.open("/dev/null", false).unwrap();
    map.close().unwrap();
    map.open("/dev/null", false).unwrap();
    assert!(map.is_open());
}

#[test]
fn block_size_must_be_a_usable_power_of_two() {
    let mut map = PeripheralMap::new();
    assert!(map.set_block_size(PAGE_SIZE).is_ok());
    assert!(map.set_block_size(4 * PAGE_SIZE).is_ok());
    let err = map.set_block_size(3000).unwrap_err();
    assert!(matches!(err, MemoryError::InvalidBlockSize { .. }));
    // Larger than the fake scratch region could back.
    let err = map.set_block_size(8 * PAGE_SIZE).unwrap_err();
    assert!(matches!(err, MemoryError::InvalidBlockSize { .. }));
}

#[test]
fn block_size_is_frozen_once_blocks_exist() {
    let mut map = fake_map();
    map.block(GPIO_BLOCK).unwrap();
    let err = map.set_block_size(PAGE_SIZE).unwrap_err();
    assert!(matches!(err, MemoryError::Configured));
}

#[test]
fn bcm2712_uses_four_page_blocks() {
    let mut map = PeripheralMap::for_soc(SocFamily::Bcm2712);
    map.force_fake().unwrap();
    // Page-aligned but not 16 KiB-aligned.
    let err = map.block(GPIO_BLOCK.add(PAGE_SIZE as u32)).unwrap_err();
    assert!(matches!(err, MemoryError::MisalignedBlock { .. }));
    assert!(map.block(GPIO_BLOCK).is_ok());
}

proptest! {
    /// Every address outside the 16 MiB window is rejected.
    #[test]
    fn window_violations_always_rejected(addr: u32) {
        prop_assume!(!(BUS_BASE.as_u32()..BUS_BASE.as_u32() + BUS_WINDOW_SIZE).contains(&addr));
        let mut map = fake_map();
        let err = map.block(BusAddr::new(addr)).unwrap_err();
        prop_assert!(matches!(err, MemoryError::AddressOutOfWindow { .. }), "expected AddressOutOfWindow");
    }

    /// Every non-word-aligned address in the window is rejected.
    #[test]
    fn word_misalignment_always_rejected(offset in 0u32..BUS_WINDOW_SIZE) {
        prop_assume!(offset % 4 != 0);
        let mut map = fake_map();
        let err = map.register(BUS_BASE.add(offset)).unwrap_err();
        prop_assert!(matches!(err, MemoryError::MisalignedWord { .. }), "expected MisalignedWord");
    }
}
