// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the image header codec and the slot verifier.

mod common;

use core::cmp::Ordering;

use common::{install_image, make_body};
use duplex_core::flash::Flash;
use duplex_core::image::{ImageHeader, SemVer, HDR_FIELD_LEN, HDR_SIZE, IMG_HDR_MAGIC, IMG_HDR_VER};
use duplex_core::layout::{Slot, VECTOR_WINDOWS};
use duplex_core::sim::SimFlash;
use duplex_core::verify::{inspect, ImageFault};

// =============================================================================
// Header codec
// =============================================================================

fn sample_header() -> ImageHeader {
    ImageHeader {
        magic: IMG_HDR_MAGIC,
        hdr_version: IMG_HDR_VER,
        flags: 0xFFFF,
        ver: SemVer {
            major: 1,
            minor: 2,
            patch: 3,
            reserved: 0,
            build: 123,
        },
        img_size: 0x0001_2345,
        img_crc32: 0xCAFE_F00D,
    }
}

#[test]
fn test_header_roundtrip() {
    let hdr = sample_header();
    assert_eq!(ImageHeader::decode(&hdr.encode()), hdr);
}

#[test]
fn test_header_field_offsets() {
    let b = sample_header().encode();
    assert_eq!(b.len(), HDR_FIELD_LEN);
    assert_eq!(&b[0..4], &IMG_HDR_MAGIC.to_le_bytes());
    assert_eq!(&b[4..6], &IMG_HDR_VER.to_le_bytes());
    assert_eq!(&b[8..10], &1u16.to_le_bytes());
    assert_eq!(&b[16..20], &123u32.to_le_bytes());
    assert_eq!(&b[20..24], &0x0001_2345u32.to_le_bytes());
    // The CRC sits at byte offset 24, the offset external tooling relies on.
    assert_eq!(&b[24..28], &0xCAFE_F00Du32.to_le_bytes());
}

// =============================================================================
// SemVer precedence
// =============================================================================

#[test]
fn test_semver_orders_major_minor_patch() {
    let v110 = SemVer::new(1, 1, 0);
    assert_eq!(SemVer::new(2, 0, 0).cmp_precedence(&v110), Ordering::Greater);
    assert_eq!(SemVer::new(1, 2, 0).cmp_precedence(&v110), Ordering::Greater);
    assert_eq!(SemVer::new(1, 1, 1).cmp_precedence(&v110), Ordering::Greater);
    assert_eq!(SemVer::new(1, 0, 9).cmp_precedence(&v110), Ordering::Less);
    assert_eq!(v110.cmp_precedence(&v110), Ordering::Equal);
}

#[test]
fn test_semver_ignores_build() {
    let mut a = SemVer::new(1, 0, 0);
    let mut b = SemVer::new(1, 0, 0);
    a.build = 10;
    b.build = 900;
    assert_eq!(a.cmp_precedence(&b), Ordering::Equal);
}

// =============================================================================
// Verifier
// =============================================================================

#[test]
fn test_inspect_valid_image() {
    let mut flash = SimFlash::new();
    let crc = install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 7);

    let view = inspect(&mut flash, Slot::active(), &VECTOR_WINDOWS);
    assert!(view.is_valid());
    let hdr = view.valid_header().unwrap();
    assert_eq!(hdr.img_crc32, crc);
    assert_eq!(view.entry, Slot::active().base + HDR_SIZE);
}

#[test]
fn test_inspect_accepts_unaligned_body_size() {
    let mut flash = SimFlash::new();
    // Not a multiple of 4: exercises the 0xFF tail padding of the CRC.
    install_image(&mut flash, Slot::active(), (1, 0, 0), 1001, 3);
    let view = inspect(&mut flash, Slot::active(), &VECTOR_WINDOWS);
    assert!(view.is_valid());
}

#[test]
fn test_inspect_erased_slot_is_invalid() {
    let mut flash = SimFlash::new();
    let view = inspect(&mut flash, Slot::inactive(), &VECTOR_WINDOWS);
    assert!(!view.is_valid());
    assert_eq!(view.fault, Some(ImageFault::Magic));
    assert!(view.hdr.is_none());
}

#[test]
fn test_inspect_bad_magic_skips_body() {
    let mut flash = SimFlash::new();
    install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 7);
    let mut first = [0u8; 4];
    flash.read(Slot::active().base, &mut first);
    first[0] ^= 0xFF;
    flash.fill(Slot::active().base, &first);

    flash.track_reads = true;
    flash.clear_reads();
    let view = inspect(&mut flash, Slot::active(), &VECTOR_WINDOWS);
    assert_eq!(view.fault, Some(ImageFault::Magic));

    // Short-circuit: nothing past the header fields was read.
    let entry = Slot::active().base + HDR_SIZE;
    assert!(flash.reads().iter().all(|&(addr, _)| addr < entry));
}

#[test]
fn test_inspect_wrong_header_version() {
    let mut flash = SimFlash::new();
    install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 7);
    flash.fill(Slot::active().base + 4, &2u16.to_le_bytes());

    let view = inspect(&mut flash, Slot::active(), &VECTOR_WINDOWS);
    assert_eq!(view.fault, Some(ImageFault::Magic));
}

#[test]
fn test_inspect_bad_stack_pointer() {
    let mut flash = SimFlash::new();
    install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 7);
    let entry = Slot::active().base + HDR_SIZE;
    flash.fill(entry, &0x1000_0000u32.to_le_bytes());

    let view = inspect(&mut flash, Slot::active(), &VECTOR_WINDOWS);
    assert_eq!(view.fault, Some(ImageFault::Vector));
}

#[test]
fn test_inspect_reset_handler_outside_flash() {
    let mut flash = SimFlash::new();
    install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 7);
    let entry = Slot::active().base + HDR_SIZE;
    flash.fill(entry + 4, &0x9000_0000u32.to_le_bytes());

    let view = inspect(&mut flash, Slot::active(), &VECTOR_WINDOWS);
    assert_eq!(view.fault, Some(ImageFault::Vector));
}

#[test]
fn test_inspect_zero_size() {
    let mut flash = SimFlash::new();
    install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 7);
    flash.fill(Slot::active().base + 20, &0u32.to_le_bytes());

    let view = inspect(&mut flash, Slot::active(), &VECTOR_WINDOWS);
    assert_eq!(view.fault, Some(ImageFault::Size));
}

#[test]
fn test_inspect_oversized_body() {
    let mut flash = SimFlash::new();
    install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 7);
    let slot = Slot::active();
    let too_big = slot.app_size - HDR_SIZE + 1;
    flash.fill(slot.base + 20, &too_big.to_le_bytes());

    let view = inspect(&mut flash, slot, &VECTOR_WINDOWS);
    assert_eq!(view.fault, Some(ImageFault::Size));
}

#[test]
fn test_inspect_detects_bit_flips_anywhere_in_body() {
    for offset in [8u32, 100, 4095] {
        let mut flash = SimFlash::new();
        install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 7);
        let entry = Slot::active().base + HDR_SIZE;

        let mut byte = [0u8; 1];
        flash.read(entry + offset, &mut byte);
        byte[0] ^= 0x01;
        flash.fill(entry + offset, &byte);

        let view = inspect(&mut flash, Slot::active(), &VECTOR_WINDOWS);
        assert_eq!(view.fault, Some(ImageFault::Crc), "flip at {offset}");
    }
}

#[test]
fn test_inspect_stale_header_crc() {
    let mut flash = SimFlash::new();
    install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 7);
    // Body rewritten without restamping the header.
    let entry = Slot::active().base + HDR_SIZE;
    let body = make_body(entry, 4096, 99);
    flash.fill(entry, &body);

    let view = inspect(&mut flash, Slot::active(), &VECTOR_WINDOWS);
    assert_eq!(view.fault, Some(ImageFault::Crc));
}
